// ============================================================================
// COORDINATE MAPPING — screen space, image pixels, normalized percentages
// ============================================================================

/// A point in image pixel space (sub-pixel precision).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ImagePoint {
    pub x: f32,
    pub y: f32,
}

impl ImagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// On-screen rectangle the bitmap is displayed in. Its size generally
/// differs from the bitmap's pixel size because of display scaling.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct DisplayBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayBox {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    /// Inverse of [`client_to_image`]: where an image pixel lands on screen.
    pub fn image_to_client(&self, point: ImagePoint, bitmap_w: u32, bitmap_h: u32) -> (f32, f32) {
        let sx = if bitmap_w == 0 { 0.0 } else { self.width / bitmap_w as f32 };
        let sy = if bitmap_h == 0 { 0.0 } else { self.height / bitmap_h as f32 };
        (self.left + point.x * sx, self.top + point.y * sy)
    }
}

/// Convert pointer client coordinates to image pixel coordinates, undoing
/// the scale between the display box and the backing bitmap.
/// A degenerate (zero-sized) box maps everything to its origin.
pub fn client_to_image(
    client_x: f32,
    client_y: f32,
    display: &DisplayBox,
    bitmap_w: u32,
    bitmap_h: u32,
) -> ImagePoint {
    let scale_x = if display.width > 0.0 { bitmap_w as f32 / display.width } else { 0.0 };
    let scale_y = if display.height > 0.0 { bitmap_h as f32 / display.height } else { 0.0 };
    ImagePoint {
        x: (client_x - display.left) * scale_x,
        y: (client_y - display.top) * scale_y,
    }
}

/// Pixel offset → percentage of `dimension`, clamped to [0, 100].
pub fn pixel_to_percent(pixel: f32, dimension: u32) -> f32 {
    if dimension == 0 {
        return 0.0;
    }
    clamp_percent(pixel / dimension as f32 * 100.0)
}

pub(crate) fn clamp_percent(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) }
}

/// Normalized watermark anchor, as a percentage of image width/height.
/// Both axes are always within [0, 100].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    x: f32,
    y: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x: clamp_percent(x), y: clamp_percent(y) }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Anchor point in pixels for an image of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> ImagePoint {
        ImagePoint {
            x: self.x / 100.0 * width as f32,
            y: self.y / 100.0 * height as f32,
        }
    }
}

/// Two crop corners as the user dragged them, in image pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRegion {
    pub start: ImagePoint,
    pub end: ImagePoint,
}

impl CropRegion {
    pub fn new(start: ImagePoint, end: ImagePoint) -> Self {
        Self { start, end }
    }

    pub fn normalized(&self) -> CropRect {
        CropRect::from_corners(self.start, self.end)
    }

    /// True when the corners do not span an area.
    pub fn is_degenerate(&self) -> bool {
        self.normalized().is_empty()
    }
}

/// Axis-aligned rectangle with non-negative size.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    /// Rectangle spanned by two arbitrary corners: origin is the
    /// component-wise minimum, size the absolute deltas.
    pub fn from_corners(a: ImagePoint, b: ImagePoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Integer pixel rectangle `(x, y, w, h)` intersected with a
    /// `width × height` image. Corners are rounded to the nearest pixel.
    /// `None` when nothing of the rectangle lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.round().clamp(0.0, width as f32) as u32;
        let y0 = self.y.round().clamp(0.0, height as f32) as u32;
        let x1 = (self.x + self.width).round().clamp(0.0, width as f32) as u32;
        let y1 = (self.y + self.height).round().clamp(0.0, height as f32) as u32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_mapping_undoes_display_scale() {
        // 400×200 bitmap shown at half size, box at (10, 20)
        let display = DisplayBox::new(10.0, 20.0, 200.0, 100.0);
        let p = client_to_image(110.0, 70.0, &display, 400, 200);
        assert_eq!(p, ImagePoint::new(200.0, 100.0));

        let (cx, cy) = display.image_to_client(p, 400, 200);
        assert_eq!((cx, cy), (110.0, 70.0));
    }

    #[test]
    fn client_mapping_with_zero_box() {
        let display = DisplayBox::new(5.0, 5.0, 0.0, 0.0);
        assert_eq!(client_to_image(50.0, 50.0, &display, 100, 100), ImagePoint::new(0.0, 0.0));
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(pixel_to_percent(50.0, 200), 25.0);
        assert_eq!(pixel_to_percent(-10.0, 200), 0.0);
        assert_eq!(pixel_to_percent(900.0, 200), 100.0);
        assert_eq!(pixel_to_percent(10.0, 0), 0.0);
    }

    #[test]
    fn position_always_in_range() {
        let p = Position::new(-3.0, 250.0);
        assert_eq!((p.x(), p.y()), (0.0, 100.0));
        let p = Position::new(f32::NAN, 12.5);
        assert_eq!((p.x(), p.y()), (0.0, 12.5));
    }

    #[test]
    fn anchor_from_position() {
        let a = Position::new(25.0, 50.0).to_pixels(200, 80);
        assert_eq!(a, ImagePoint::new(50.0, 40.0));
    }

    #[test]
    fn corners_normalize_to_min_and_abs_size() {
        let cases = [
            ((10.0, 10.0), (110.0, 60.0)),
            ((110.0, 60.0), (10.0, 10.0)),
            ((110.0, 10.0), (10.0, 60.0)),
            ((10.0, 60.0), (110.0, 10.0)),
        ];
        for ((ax, ay), (bx, by)) in cases {
            let r = CropRect::from_corners(ImagePoint::new(ax, ay), ImagePoint::new(bx, by));
            assert_eq!(r, CropRect { x: 10.0, y: 10.0, width: 100.0, height: 50.0 });
        }
    }

    #[test]
    fn degenerate_regions() {
        let p = ImagePoint::new(4.0, 4.0);
        assert!(CropRegion::new(p, p).is_degenerate());
        assert!(CropRegion::new(p, ImagePoint::new(40.0, 4.0)).is_degenerate());
        assert!(!CropRegion::new(p, ImagePoint::new(40.0, 5.0)).is_degenerate());
    }

    #[test]
    fn clamp_to_image_bounds() {
        let r = CropRect { x: -20.0, y: 150.0, width: 100.0, height: 100.0 };
        assert_eq!(r.clamp_to(200, 200), Some((0, 150, 80, 50)));

        let outside = CropRect { x: 300.0, y: 0.0, width: 10.0, height: 10.0 };
        assert_eq!(outside.clamp_to(200, 200), None);
    }
}
