//! Light cleanup of a rendered page before OCR.
//!
//! Grayscale, a small blur to suppress scanner noise, then an adaptive
//! threshold: each pixel is compared with the mean of its `BLOCK`×`BLOCK`
//! neighbourhood minus `OFFSET`. A local mean copes with uneven lighting
//! where one global threshold would black out a shaded margin.

use image::{imageops, DynamicImage, GrayImage, Luma};

const BLUR_SIGMA: f32 = 1.0;
const BLOCK: u32 = 31;
const OFFSET: i64 = 10;

pub fn prepare_for_ocr(img: &DynamicImage) -> DynamicImage {
    let gray = img.to_luma8();
    let smooth = imageops::blur(&gray, BLUR_SIGMA);
    DynamicImage::ImageLuma8(adaptive_threshold(&smooth, BLOCK, OFFSET))
}

/// Mean-based adaptive threshold using a summed-area table.
fn adaptive_threshold(gray: &GrayImage, block: u32, offset: i64) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let (wu, hu) = (w as usize, h as usize);

    // integral[(y+1)*(w+1) + (x+1)] = sum of pixels in [0..=x, 0..=y]
    let stride = wu + 1;
    let mut integral = vec![0u64; stride * (hu + 1)];
    for y in 0..hu {
        let mut row = 0u64;
        for x in 0..wu {
            row += u64::from(gray.get_pixel(x as u32, y as u32)[0]);
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row;
        }
    }

    let radius = (block / 2) as usize;
    let mut out = GrayImage::new(w, h);
    for y in 0..hu {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(hu);
        for x in 0..wu {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(wu);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let area = ((x1 - x0) * (y1 - y0)) as u64;
            let mean = (sum / area) as i64;
            let value = i64::from(gray.get_pixel(x as u32, y as u32)[0]);
            let bit = if value > mean - offset { 255 } else { 0 };
            out.put_pixel(x as u32, y as u32, Luma([bit]));
        }
    }
    out
}
