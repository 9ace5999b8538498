// ============================================================================
// IMAGE FILTERS — Gaussian blur for drop shadows
// ============================================================================

use rayon::prelude::*;

/// Build a 1-D Gaussian kernel truncated at ceil(3*sigma).
fn build_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let mut kernel = vec![0.0f32; len];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        let v = (-x * x / s2).exp();
        *k = v;
        sum += v;
    }
    let inv = 1.0 / sum;
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Pixels a blur of `sigma` can spread coverage by, per side.
pub fn blur_radius(sigma: f32) -> usize {
    if sigma <= 0.0 { 0 } else { (sigma * 3.0).ceil() as usize }
}

/// Rayon-parallelized separable Gaussian blur of a single-channel
/// `w × h` coverage buffer. Samples outside the buffer count as zero, so
/// the caller pads by [`blur_radius`] to keep the tails.
pub fn gaussian_blur_mask(src: &[f32], w: usize, h: usize, sigma: f32) -> Vec<f32> {
    if w == 0 || h == 0 || sigma <= 0.0 {
        return src.to_vec();
    }
    let kernel = build_gaussian_kernel(sigma);
    let radius = kernel.len() / 2;

    // --- Horizontal pass (parallel by row) ---
    let mut buf_h = vec![0.0f32; w * h];
    buf_h.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
        let row_in = &src[y * w..(y + 1) * w];
        for (x, out) in row_out.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = x as isize + ki as isize - radius as isize;
                if sx >= 0 && (sx as usize) < w {
                    acc += row_in[sx as usize] * kv;
                }
            }
            *out = acc;
        }
    });

    // --- Vertical pass (parallel by row) ---
    let mut buf_v = vec![0.0f32; w * h];
    buf_v.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
        for (x, out) in row_out.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = y as isize + ki as isize - radius as isize;
                if sy >= 0 && (sy as usize) < h {
                    acc += buf_h[sy as usize * w + x] * kv;
                }
            }
            *out = acc;
        }
    });

    buf_v
}
