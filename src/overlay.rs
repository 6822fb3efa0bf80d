//! Caption text the renderer draws over a frame.

use std::fmt;

use chrono::NaiveDateTime;

use crate::config::OverlayOptions;
use crate::events::ImageId;
use crate::meta;
use crate::session::Progress;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caption {
    pub date: Option<String>,
    pub folder: Option<String>,
    pub counter: Option<String>,
}

impl Caption {
    /// Build the caption for `id`, reading its capture date from disk when
    /// dates are enabled.
    pub fn compose(id: &ImageId, progress: Progress, options: &OverlayOptions) -> Self {
        let capture = if options.show_date {
            meta::read_capture_date(id.as_path())
        } else {
            None
        };
        Self::compose_with(id, capture, progress, options)
    }

    pub fn compose_with(
        id: &ImageId,
        capture: Option<NaiveDateTime>,
        progress: Progress,
        options: &OverlayOptions,
    ) -> Self {
        Self {
            date: options
                .show_date
                .then(|| meta::format_capture_date(capture)),
            folder: if options.show_folder_name {
                meta::folder_label(id)
            } else {
                None
            },
            counter: options
                .show_image_count
                .then(|| format!("{}/{}", progress.visited, progress.total)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.folder.is_none() && self.counter.is_none()
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.date, &self.folder, &self.counter]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        f.write_str(&parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRESS: Progress = Progress {
        visited: 3,
        total: 10,
    };

    #[test]
    fn full_caption() {
        let id = ImageId::from("/photos/Urlaub/a.jpg");
        let date = meta::parse_exif_datetime(b"2020:07:14 10:00:00");
        let caption = Caption::compose_with(&id, date, PROGRESS, &OverlayOptions::default());
        assert_eq!(caption.to_string(), "14.07.2020 | Urlaub | 3/10");
    }

    #[test]
    fn unknown_date_is_spelled_out() {
        let id = ImageId::from("/photos/Urlaub/a.jpg");
        let caption = Caption::compose_with(&id, None, PROGRESS, &OverlayOptions::default());
        assert_eq!(caption.date.as_deref(), Some("Unknown date"));
    }

    #[test]
    fn toggles_hide_elements() {
        let id = ImageId::from("/photos/Urlaub/a.jpg");
        let options = OverlayOptions {
            show_date: false,
            show_image_count: true,
            show_folder_name: false,
        };
        let caption = Caption::compose_with(&id, None, PROGRESS, &options);
        assert_eq!(caption.to_string(), "3/10");

        let none = OverlayOptions {
            show_image_count: false,
            ..options
        };
        assert!(Caption::compose_with(&id, None, PROGRESS, &none).is_empty());
    }
}
