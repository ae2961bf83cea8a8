//! SIMD-accelerated resampling of extracted PDF page images.
//!
//! Uses fast_image_resize, which picks AVX2/NEON kernels when available.

use fast_image_resize::{images::Image, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::RgbImage;

/// Resample `source` to exactly `width` × `height` RGB pixels
pub(crate) fn resize_rgb(source: &RgbImage, width: u32, height: u32) -> Result<RgbImage, String> {
    let (src_width, src_height) = source.dimensions();
    if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
        return Err("cannot resample an empty image".to_string());
    }
    if (src_width, src_height) == (width, height) {
        return Ok(source.clone());
    }

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        source.as_raw().clone(),
        PixelType::U8x3,
    )
    .map_err(|e| format!("invalid source image: {}", e))?;

    let mut dst_image = Image::new(width, height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));

    Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| format!("resize failed: {}", e))?;

    RgbImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| "resized buffer has the wrong size".to_string())
}

/// Largest `(w, h)` with the aspect of `source` that fits inside `bounds`
pub(crate) fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let (bw, bh) = (bounds.0.max(1) as f64, bounds.1.max(1) as f64);
    let scale = (bw / sw).min(bh / sh);
    (
        ((sw * scale).round() as u32).max(1),
        ((sh * scale).round() as u32).max(1),
    )
}
