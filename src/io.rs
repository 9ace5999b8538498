use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};

use crate::error::Result;

/// File name offered when exporting the composited image.
pub const DEFAULT_EXPORT_NAME: &str = "watermarked-image.png";

/// Extensions accepted by the upload dialog (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Synchronously decode an image file to RGBA. Animated formats yield
/// their first frame.
pub fn load_image_sync(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)?.to_rgba8();
    log::info!("decoded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

/// Decode an in-memory image (any format the `image` crate can sniff).
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encode as PNG into any writer.
pub fn encode_png<W: Write>(image: &RgbaImage, writer: W) -> Result<()> {
    let encoder = PngEncoder::new(writer);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(())
}

pub fn encode_png_bytes(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_png(image, &mut buf)?;
    Ok(buf)
}

/// Encode and write a PNG file.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_png(image, &mut writer)?;
    writer.flush()?;
    log::info!("wrote {} ({}x{})", path.display(), image.width(), image.height());
    Ok(())
}
