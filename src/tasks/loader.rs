use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::debug;

use crate::events::{DecodedFrame, ImageId};

/// Turns a catalog entry into pixels. Called only from the preloader thread.
pub trait FrameDecoder: Send + 'static {
    fn decode(&self, id: &ImageId) -> Result<DecodedFrame>;
}

/// Decoder backed by the `image` crate; honours EXIF orientation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl FrameDecoder for ImageDecoder {
    fn decode(&self, id: &ImageId) -> Result<DecodedFrame> {
        let img = decode_rgba8_apply_exif(id.as_path())
            .with_context(|| format!("failed to decode {id}"))?;
        Ok(DecodedFrame::from_rgba8(id.clone(), img))
    }
}

// Orientation handling is best-effort; without metadata the stored
// orientation is kept.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();

    let img = match read_orientation(path).unwrap_or(1) {
        2 => image::imageops::flip_horizontal(&img),
        3 => image::imageops::rotate180(&img),
        4 => image::imageops::flip_vertical(&img),
        // transpose
        5 => image::imageops::flip_horizontal(&image::imageops::rotate90(&img)),
        6 => image::imageops::rotate90(&img),
        // transverse
        7 => image::imageops::flip_horizontal(&image::imageops::rotate270(&img)),
        8 => image::imageops::rotate270(&img),
        _ => img,
    };
    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = u16::try_from(field.value.get_uint(0)?).ok()?;
    debug!(orientation = o, path = %path.display(), "exif orientation");
    Some(o)
}
