use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{In, Tag, Value};
use tracing::trace;

use crate::events::ImageId;

const UNKNOWN_DATE: &str = "Unknown date";

/// Capture time from EXIF `DateTimeOriginal`, falling back to `DateTime`.
pub fn read_capture_date(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let found = [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .find_map(|tag| match &exif.get_field(tag, In::PRIMARY)?.value {
            Value::Ascii(parts) => parts.first().and_then(|raw| parse_exif_datetime(raw)),
            _ => None,
        });
    trace!(path = %path.display(), date = ?found, "exif capture date");
    found
}

/// Parse the EXIF `YYYY:MM:DD HH:MM:SS` form.
pub fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let s = std::str::from_utf8(raw).ok()?;
    NaiveDateTime::parse_from_str(s.trim_end_matches('\0').trim(), "%Y:%m:%d %H:%M:%S").ok()
}

/// `DD.MM.YYYY`, or "Unknown date".
pub fn format_capture_date(date: Option<NaiveDateTime>) -> String {
    date.map_or_else(
        || UNKNOWN_DATE.to_string(),
        |d| d.format("%d.%m.%Y").to_string(),
    )
}

/// Name of the folder directly containing the image.
pub fn folder_label(id: &ImageId) -> Option<String> {
    let name = id.as_path().parent()?.file_name()?;
    Some(name.to_string_lossy().into_owned())
}
