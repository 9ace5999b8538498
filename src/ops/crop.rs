use image::RgbaImage;

use crate::geometry::CropRegion;

/// Extract the region spanned by the two crop corners into a new image.
///
/// Corners may be given in any order. The rectangle is intersected with
/// the image bounds; `None` when nothing of positive area remains, in
/// which case the caller keeps its current image.
pub fn crop_image(image: &RgbaImage, region: &CropRegion) -> Option<RgbaImage> {
    let rect = region.normalized();
    if rect.is_empty() {
        return None;
    }
    let (x, y, w, h) = rect.clamp_to(image.width(), image.height())?;
    Some(image::imageops::crop_imm(image, x, y, w, h).to_image())
}
