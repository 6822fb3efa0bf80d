use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Stable identifier of one catalog entry (the image's file path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(PathBuf);

impl ImageId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for ImageId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for ImageId {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.display(), f)
    }
}

/// A decoded image ready for display: tightly packed RGBA8 rows.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub id: ImageId,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedFrame {
    pub fn from_rgba8(id: ImageId, img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            id,
            width,
            height,
            pixels: img.into_raw(),
        }
    }
}

/// Requests from the input surface to the foreground loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    Next,
    Previous,
    TogglePause,
    Quit,
}

impl ViewerCommand {
    /// Map one line typed on the console to a command.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "n" | "next" => Some(Self::Next),
            "p" | "prev" | "previous" => Some(Self::Previous),
            "space" | "pause" => Some(Self::TogglePause),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}
