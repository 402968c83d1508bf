use image::{ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};

use crate::errors::TransformError;

/// Float mask with values in `[0, 1]`, one per pixel.
pub type FloatMask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Attach `mask` to `image` as its alpha channel.
pub fn apply_alpha_mask(image: &RgbImage, mask: &FloatMask) -> Result<RgbaImage, TransformError> {
    if image.dimensions() != mask.dimensions() {
        let (iw, ih) = image.dimensions();
        let (mw, mh) = mask.dimensions();
        return Err(TransformError::Other(format!(
            "image and mask dimensions do not match: image {}x{}, mask {}x{}",
            iw, ih, mw, mh
        )));
    }

    let pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|(&Rgb([red, green, blue]), &Luma([alpha]))| {
            let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
            [red, green, blue, alpha]
        })
        .collect::<Vec<u8>>();

    ImageBuffer::<Rgba<u8>, _>::from_raw(image.width(), image.height(), pixels).ok_or_else(|| {
        TransformError::Other("failed to create RGBA buffer from processed pixels".to_string())
    })
}

/// Stretch raw model output to `[0, 1]`.
///
/// A flat mask (max == min) maps to all zeros.
pub fn min_max_normalize(values: &mut [f32]) {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if !range.is_finite() || range <= f32::EPSILON {
        values.iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    values.iter_mut().for_each(|v| *v = (*v - min) / range);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_alpha_mask() -> Result<(), TransformError> {
        let image = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let mask = FloatMask::from_raw(2, 1, vec![0.0, 1.0]).unwrap();

        let rgba = apply_alpha_mask(&image, &mask)?;
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(rgba.get_pixel(1, 0), &Rgba([10, 20, 30, 255]));
        Ok(())
    }

    #[test]
    fn test_apply_alpha_mask_dimension_mismatch() {
        let image = RgbImage::new(4, 4);
        let mask = FloatMask::new(2, 2);
        assert!(apply_alpha_mask(&image, &mask).is_err());
    }

    #[test]
    fn test_min_max_normalize() {
        let mut values = vec![2.0, 4.0, 6.0];
        min_max_normalize(&mut values);
        assert_eq!(values, vec![0.0, 0.5, 1.0]);

        let mut flat = vec![3.0, 3.0];
        min_max_normalize(&mut flat);
        assert_eq!(flat, vec![0.0, 0.0]);
    }
}
