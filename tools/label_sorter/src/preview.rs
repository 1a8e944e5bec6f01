use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, GenericImageView, ImageOutputFormat};

/// Loads `path`, scales it to `max_height` pixels keeping the aspect ratio and
/// returns it as a PNG data URL for the page.
pub fn data_url(path: &Path, max_height: u32) -> Result<String, image::ImageError> {
    let img = image::open(path)?;

    let height = max_height.max(1);
    let ratio = height as f64 / img.height() as f64;
    let width = ((img.width() as f64 * ratio).round() as u32).max(1);
    let img = img.resize_exact(width, height, FilterType::Lanczos3);

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
}
