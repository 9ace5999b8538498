// ============================================================================
// WATERMARK COMPOSITOR — draws the text layer onto a base image
// ============================================================================
//
// Every pass (background box, then text) is rasterized into a coverage mask
// in the watermark's local frame, mapped into image space by inverse
// rotation around the anchor, and composited source-over. A visible shadow
// is the same mask, shifted and blurred, composited first in the shadow
// color.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::geometry::{ImagePoint, Position};
use crate::ops::filters::{blur_radius, gaussian_blur_mask};
use crate::ops::text::GlyphSource;
use crate::style::{Rgb, TextAlignment, WatermarkStyle};

/// Padding between the text block and the edge of its background box.
pub const BACKGROUND_PADDING: f32 = 5.0;

/// Rectangle in the watermark's local (unrotated, anchor-relative) frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LocalRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Overlap with `other`; `None` when they share no area.
    pub fn intersect(&self, other: &LocalRect) -> Option<LocalRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| LocalRect { x, y, width: right - x, height: bottom - y })
    }

    /// Whether the unit pixel at `(px, py)` overlaps this rectangle.
    fn touches_pixel(&self, px: i32, py: i32) -> bool {
        let (fx, fy) = (px as f32, py as f32);
        fx + 1.0 > self.x && fx < self.right() && fy + 1.0 > self.y && fy < self.bottom()
    }
}

/// Where the text block and its lines sit relative to the anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockLayout {
    pub max_width: f32,
    pub line_height_px: f32,
    pub block_height: f32,
    /// Left edge of the block, from the alignment.
    pub offset_x: f32,
    /// Top-left of each line's box.
    pub line_origins: Vec<(f32, f32)>,
    /// Present when the background opacity is above zero.
    pub background: Option<LocalRect>,
}

/// Lay out a block of lines with the given measured widths.
///
/// The block's left edge is `alignment.offset(max_width)`; shorter lines are
/// aligned inside the block the same way. Line `i` starts at
/// `y = i × font_size × line_height`.
pub fn layout_block(line_widths: &[f32], style: &WatermarkStyle) -> BlockLayout {
    let line_count = line_widths.len().max(1);
    let max_width = line_widths.iter().copied().fold(0.0f32, f32::max);
    let line_height_px = style.line_height_px();
    let block_height = line_height_px * line_count as f32;
    let offset_x = style.text_align.offset(max_width);

    let line_origins = line_widths
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let inner = match style.text_align {
                TextAlignment::Left => 0.0,
                TextAlignment::Center => (max_width - w) * 0.5,
                TextAlignment::Right => max_width - w,
            };
            (offset_x + inner, i as f32 * line_height_px)
        })
        .collect();

    let background = (style.background.opacity > 0.0).then(|| LocalRect {
        x: offset_x - BACKGROUND_PADDING,
        y: -BACKGROUND_PADDING,
        width: max_width + BACKGROUND_PADDING * 2.0,
        height: block_height + BACKGROUND_PADDING * 2.0,
    });

    BlockLayout {
        max_width,
        line_height_px,
        block_height,
        offset_x,
        line_origins,
        background,
    }
}

/// Render `style` onto a copy of `image` at `position`.
///
/// The result always has the dimensions of `image`. Without a glyph source
/// the text itself is skipped and every line measures zero wide; the
/// background box is still drawn. Opacities are used as given.
pub fn render(
    image: &RgbaImage,
    style: &WatermarkStyle,
    position: Position,
    glyphs: Option<&dyn GlyphSource>,
) -> RgbaImage {
    let mut out = image.clone();
    let (width, height) = out.dimensions();
    if width == 0 || height == 0 {
        return out;
    }

    let font_size = style.font_size.max(0.0);
    let lines = style.lines();
    let widths: Vec<f32> = lines
        .iter()
        .map(|line| glyphs.map_or(0.0, |g| g.measure(line, font_size)))
        .collect();
    let layout = layout_block(&widths, style);

    let frame = Frame::new(position.to_pixels(width, height), style.rotation);
    let shadow = style.shadow.is_visible().then(|| ShadowPass {
        color: style.shadow.color,
        sigma: style.shadow.blur.max(0.0) * 0.5,
        dx: style.shadow.offset_x.round() as i32,
        dy: style.shadow.offset_y.round() as i32,
    });
    let clip = clip_rect(width, height, shadow.as_ref());
    // Only this part of the local frame can reach a clipped pixel
    let visible = frame.visible_local(clip);

    if let Some(rect) = layout.background.and_then(|r| r.intersect(&visible)) {
        let local = Mask::from_rect(&rect);
        draw_pass(
            &mut out,
            &local,
            &frame,
            clip,
            style.background.color,
            style.background.opacity * style.opacity,
            shadow.as_ref(),
        );
    }

    if let Some(g) = glyphs {
        let mut points: Vec<(i32, i32, f32)> = Vec::new();
        for (line, &(lx, ly)) in lines.iter().zip(&layout.line_origins) {
            let (ox, oy) = (lx.round() as i32, ly.round() as i32);
            // Glyphs overhang their line box by less than a font size
            if oy as f32 - font_size > visible.bottom() || oy as f32 + font_size * 2.0 < visible.y {
                continue;
            }
            let columns = (visible.x - ox as f32)..(visible.right() - ox as f32);
            g.rasterize_line(line, font_size, columns, &mut |x, y, cov| {
                let (px, py) = (x + ox, y + oy);
                if visible.touches_pixel(px, py) {
                    points.push((px, py, cov));
                }
            });
        }
        let local = Mask::from_points(&points);
        draw_pass(&mut out, &local, &frame, clip, style.color, style.opacity, shadow.as_ref());
    }

    out
}

// ---------------------------------------------------------------------------
//  Passes
// ---------------------------------------------------------------------------

struct ShadowPass {
    color: Rgb,
    sigma: f32,
    dx: i32,
    dy: i32,
}

/// Region of image space worth rasterizing: the image plus however far a
/// shadow can reach back into it.
fn clip_rect(width: u32, height: u32, shadow: Option<&ShadowPass>) -> (i32, i32, i32, i32) {
    let (rx, ry) = match shadow {
        Some(s) => {
            let r = blur_radius(s.sigma) as i32;
            (s.dx.abs() + r, s.dy.abs() + r)
        }
        None => (0, 0),
    };
    (-rx, -ry, width as i32 + rx, height as i32 + ry)
}

fn draw_pass(
    out: &mut RgbaImage,
    local: &Mask,
    frame: &Frame,
    clip: (i32, i32, i32, i32),
    color: Rgb,
    alpha: f32,
    shadow: Option<&ShadowPass>,
) {
    if local.is_empty() || alpha <= 0.0 {
        return;
    }
    let projected = project(local, frame, clip);
    if projected.is_empty() {
        return;
    }
    if let Some(s) = shadow {
        let shadow_mask = projected.shadow(s);
        composite_mask(out, &shadow_mask, s.color, alpha);
    }
    composite_mask(out, &projected, color, alpha);
}

/// Source-over of a solid color through a coverage mask.
fn composite_mask(dst: &mut RgbaImage, mask: &Mask, color: Rgb, alpha: f32) {
    let (width, height) = (dst.width() as i32, dst.height() as i32);
    let x_start = mask.x0.max(0);
    let y_start = mask.y0.max(0);
    let x_end = (mask.x0 + mask.w as i32).min(width);
    let y_end = (mask.y0 + mask.h as i32).min(height);

    for y in y_start..y_end {
        for x in x_start..x_end {
            let a = (mask.get(x, y) * alpha).clamp(0.0, 1.0);
            if a <= 0.0 {
                continue;
            }
            blend_over(dst.get_pixel_mut(x as u32, y as u32), color.0, a);
        }
    }
}

fn blend_over(dst: &mut Rgba<u8>, color: [u8; 3], a: f32) {
    let da = dst[3] as f32 / 255.0;
    let out_a = a + da * (1.0 - a);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let v = (color[c] as f32 * a + dst[c] as f32 * da * (1.0 - a)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

// ---------------------------------------------------------------------------
//  Local frame
// ---------------------------------------------------------------------------

/// Translation to the anchor followed by a clockwise rotation.
#[derive(Clone, Copy, Debug)]
struct Frame {
    anchor: ImagePoint,
    cos: f32,
    sin: f32,
}

impl Frame {
    fn new(anchor: ImagePoint, degrees: f32) -> Self {
        let (sin, cos) = (degrees * std::f32::consts::PI / 180.0).sin_cos();
        Self { anchor, cos, sin }
    }

    fn to_image(&self, lx: f32, ly: f32) -> (f32, f32) {
        (
            self.anchor.x + lx * self.cos - ly * self.sin,
            self.anchor.y + lx * self.sin + ly * self.cos,
        )
    }

    fn to_local(&self, ix: f32, iy: f32) -> (f32, f32) {
        let dx = ix - self.anchor.x;
        let dy = iy - self.anchor.y;
        (dx * self.cos + dy * self.sin, -dx * self.sin + dy * self.cos)
    }

    /// Local-frame bounds of the image-space `clip` rectangle, grown by the
    /// bilinear sampling footprint.
    fn visible_local(&self, clip: (i32, i32, i32, i32)) -> LocalRect {
        let (x0, y0, x1, y1) = (clip.0 as f32, clip.1 as f32, clip.2 as f32, clip.3 as f32);
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for (cx, cy) in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
            let (lx, ly) = self.to_local(cx, cy);
            min_x = min_x.min(lx);
            min_y = min_y.min(ly);
            max_x = max_x.max(lx);
            max_y = max_y.max(ly);
        }
        LocalRect {
            x: min_x - 2.0,
            y: min_y - 2.0,
            width: max_x - min_x + 4.0,
            height: max_y - min_y + 4.0,
        }
    }
}

/// Resample a local-frame mask into image space, restricted to `clip`.
fn project(local: &Mask, frame: &Frame, clip: (i32, i32, i32, i32)) -> Mask {
    let lx0 = local.x0 as f32;
    let ly0 = local.y0 as f32;
    let lx1 = lx0 + local.w as f32;
    let ly1 = ly0 + local.h as f32;

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for (cx, cy) in [(lx0, ly0), (lx1, ly0), (lx0, ly1), (lx1, ly1)] {
        let (ix, iy) = frame.to_image(cx, cy);
        min_x = min_x.min(ix);
        min_y = min_y.min(iy);
        max_x = max_x.max(ix);
        max_y = max_y.max(iy);
    }

    // One pixel of slack for bilinear edges.
    let x0 = (min_x.floor() as i32 - 1).max(clip.0);
    let y0 = (min_y.floor() as i32 - 1).max(clip.1);
    let x1 = (max_x.ceil() as i32 + 1).min(clip.2);
    let y1 = (max_y.ceil() as i32 + 1).min(clip.3);
    if x1 <= x0 || y1 <= y0 {
        return Mask::empty();
    }

    let mut mask = Mask::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize);
    let row_len = mask.w;
    mask.data.par_chunks_mut(row_len).enumerate().for_each(|(row, out)| {
        let iy = (y0 + row as i32) as f32 + 0.5;
        for (col, v) in out.iter_mut().enumerate() {
            let ix = (x0 + col as i32) as f32 + 0.5;
            let (lx, ly) = frame.to_local(ix, iy);
            *v = local.sample(lx, ly);
        }
    });
    mask
}

// ---------------------------------------------------------------------------
//  Coverage mask
// ---------------------------------------------------------------------------

/// Single-channel coverage over the pixel rectangle
/// `[x0, x0 + w) × [y0, y0 + h)`.
#[derive(Clone, Debug)]
struct Mask {
    x0: i32,
    y0: i32,
    w: usize,
    h: usize,
    data: Vec<f32>,
}

impl Mask {
    fn new(x0: i32, y0: i32, w: usize, h: usize) -> Self {
        Self { x0, y0, w, h, data: vec![0.0; w * h] }
    }

    fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }

    fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    fn get(&self, x: i32, y: i32) -> f32 {
        let (mx, my) = (x - self.x0, y - self.y0);
        if mx < 0 || my < 0 || mx as usize >= self.w || my as usize >= self.h {
            return 0.0;
        }
        self.data[my as usize * self.w + mx as usize]
    }

    /// Bilinear sample at a continuous position; pixel `i` spans `[i, i + 1)`.
    fn sample(&self, fx: f32, fy: f32) -> f32 {
        let sx = fx - 0.5;
        let sy = fy - 0.5;
        let x0 = sx.floor();
        let y0 = sy.floor();
        let tx = sx - x0;
        let ty = sy - y0;
        let (xi, yi) = (x0 as i32, y0 as i32);

        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let top = lerp(self.get(xi, yi), self.get(xi + 1, yi), tx);
        let bot = lerp(self.get(xi, yi + 1), self.get(xi + 1, yi + 1), tx);
        lerp(top, bot, ty)
    }

    /// Area coverage of an axis-aligned rectangle with fractional edges.
    fn from_rect(r: &LocalRect) -> Self {
        let x0 = r.x.floor() as i32;
        let y0 = r.y.floor() as i32;
        let x1 = (r.x + r.width.max(0.0)).ceil() as i32;
        let y1 = (r.y + r.height.max(0.0)).ceil() as i32;
        let mut mask = Mask::new(x0, y0, (x1 - x0).max(0) as usize, (y1 - y0).max(0) as usize);

        let overlap = |p: i32, lo: f32, hi: f32| -> f32 {
            let a = (p as f32).max(lo);
            let b = (p as f32 + 1.0).min(hi);
            (b - a).max(0.0)
        };
        for my in 0..mask.h {
            let oy = overlap(y0 + my as i32, r.y, r.y + r.height);
            for mx in 0..mask.w {
                let ox = overlap(x0 + mx as i32, r.x, r.x + r.width);
                mask.data[my * mask.w + mx] = ox * oy;
            }
        }
        mask
    }

    /// Mask covering every plotted point; overlapping plots keep the maximum.
    fn from_points(points: &[(i32, i32, f32)]) -> Self {
        if points.is_empty() {
            return Mask::empty();
        }
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for &(x, y, _) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let mut mask = Mask::new(
            min_x,
            min_y,
            (max_x - min_x + 1) as usize,
            (max_y - min_y + 1) as usize,
        );
        for &(x, y, cov) in points {
            let idx = (y - min_y) as usize * mask.w + (x - min_x) as usize;
            mask.data[idx] = mask.data[idx].max(cov.clamp(0.0, 1.0));
        }
        mask
    }

    /// Shifted, blurred copy used as the drop shadow.
    fn shadow(&self, pass: &ShadowPass) -> Mask {
        let pad = blur_radius(pass.sigma);
        let mut padded = Mask::new(
            self.x0 - pad as i32 + pass.dx,
            self.y0 - pad as i32 + pass.dy,
            self.w + pad * 2,
            self.h + pad * 2,
        );
        for row in 0..self.h {
            let src = &self.data[row * self.w..(row + 1) * self.w];
            let start = (row + pad) * padded.w + pad;
            padded.data[start..start + self.w].copy_from_slice(src);
        }
        if pass.sigma > 0.0 {
            padded.data = gaussian_blur_mask(&padded.data, padded.w, padded.h, pass.sigma);
        }
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Background;

    fn style_with(align: TextAlignment, bg_opacity: f32) -> WatermarkStyle {
        WatermarkStyle {
            text_align: align,
            font_size: 20.0,
            line_height: 1.5,
            background: Background { color: Rgb::WHITE, opacity: bg_opacity },
            ..WatermarkStyle::default()
        }
    }

    #[test]
    fn alignment_offset_law() {
        let widths = [30.0, 80.0, 10.0];
        assert_eq!(layout_block(&widths, &style_with(TextAlignment::Left, 0.0)).offset_x, 0.0);
        assert_eq!(layout_block(&widths, &style_with(TextAlignment::Center, 0.0)).offset_x, -40.0);
        assert_eq!(layout_block(&widths, &style_with(TextAlignment::Right, 0.0)).offset_x, -80.0);
    }

    #[test]
    fn lines_stack_by_line_height() {
        let layout = layout_block(&[30.0, 80.0, 10.0], &style_with(TextAlignment::Right, 0.0));
        assert_eq!(layout.line_height_px, 30.0);
        assert_eq!(layout.block_height, 90.0);
        assert_eq!(layout.line_origins, vec![(-30.0, 0.0), (-80.0, 30.0), (-10.0, 60.0)]);
    }

    #[test]
    fn background_rect_pads_block_by_five() {
        let layout = layout_block(&[30.0, 80.0], &style_with(TextAlignment::Center, 0.3));
        assert_eq!(
            layout.background,
            Some(LocalRect { x: -45.0, y: -5.0, width: 90.0, height: 70.0 })
        );
        assert!(layout_block(&[30.0], &style_with(TextAlignment::Center, 0.0)).background.is_none());
    }

    #[test]
    fn empty_text_still_gets_a_background_box() {
        let layout = layout_block(&[0.0], &style_with(TextAlignment::Left, 1.0));
        assert_eq!(layout.max_width, 0.0);
        assert_eq!(
            layout.background,
            Some(LocalRect { x: -5.0, y: -5.0, width: 10.0, height: 40.0 })
        );
    }

    #[test]
    fn rect_mask_has_fractional_edges() {
        let m = Mask::from_rect(&LocalRect { x: 0.5, y: 0.0, width: 2.0, height: 1.0 });
        assert_eq!((m.x0, m.w, m.h), (0, 3, 1));
        assert_eq!(m.data, vec![0.5, 1.0, 0.5]);
    }

    #[test]
    fn frame_round_trips() {
        let f = Frame::new(ImagePoint::new(10.0, 20.0), 37.0);
        let (ix, iy) = f.to_image(5.0, -3.0);
        let (lx, ly) = f.to_local(ix, iy);
        assert!((lx - 5.0).abs() < 1e-4 && (ly + 3.0).abs() < 1e-4);
    }

    #[test]
    fn rect_intersection() {
        let a = LocalRect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = LocalRect { x: 5.0, y: -5.0, width: 20.0, height: 8.0 };
        assert_eq!(a.intersect(&b), Some(LocalRect { x: 5.0, y: 0.0, width: 5.0, height: 3.0 }));
        let far = LocalRect { x: 50.0, y: 0.0, width: 1.0, height: 1.0 };
        assert_eq!(a.intersect(&far), None);
    }

    #[test]
    fn visible_window_covers_rotated_clip() {
        let f = Frame::new(ImagePoint::new(0.0, 0.0), 45.0);
        let visible = f.visible_local((0, 0, 64, 64));
        for (ix, iy) in [(0.0, 0.0), (64.0, 0.0), (0.0, 64.0), (64.0, 64.0), (32.0, 10.0)] {
            let (lx, ly) = f.to_local(ix, iy);
            assert!(lx > visible.x && lx < visible.right());
            assert!(ly > visible.y && ly < visible.bottom());
        }
        // Bounded by the clip, not by anything drawn
        assert!(visible.width < 100.0 && visible.height < 100.0);
    }

    #[test]
    fn clockwise_quarter_turn_maps_x_to_y() {
        let f = Frame::new(ImagePoint::new(0.0, 0.0), 90.0);
        let (ix, iy) = f.to_image(10.0, 0.0);
        assert!(ix.abs() < 1e-4 && (iy - 10.0).abs() < 1e-4);
    }
}
