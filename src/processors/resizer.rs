// pixconv/src/processors/resizer.rs
use crate::core::ResizeAlgorithm;
use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgba, RgbaImage};

/// How a resize target box is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFit {
    /// Scale to fit inside the box; the result may be smaller on one axis.
    Inside,
    /// Scale to fit inside the box, then pad to exactly the box size with white.
    Exact,
}

pub struct Resizer {
    algorithm: ResizeAlgorithm,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn resize(&self, image: &DynamicImage, width: u32, height: u32, fit: ResizeFit) -> DynamicImage {
        let (orig_width, orig_height) = image.dimensions();
        let (fit_width, fit_height) = Self::fit_inside(orig_width, orig_height, width, height);

        log::debug!(
            "Resizing image from {}x{} to {}x{} ({:?})",
            orig_width, orig_height, width, height, fit
        );

        let scaled = if (fit_width, fit_height) == (orig_width, orig_height) {
            image.clone()
        } else {
            image.resize_exact(fit_width, fit_height, self.get_filter_type())
        };

        match fit {
            ResizeFit::Inside => scaled,
            ResizeFit::Exact if (fit_width, fit_height) == (width, height) => scaled,
            ResizeFit::Exact => {
                let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
                let x = (width - fit_width) / 2;
                let y = (height - fit_height) / 2;
                image::imageops::overlay(&mut canvas, &scaled.to_rgba8(), x as i64, y as i64);
                DynamicImage::ImageRgba8(canvas)
            }
        }
    }

    /// Largest size with the original aspect ratio that fits in the box.
    pub fn fit_inside(orig_w: u32, orig_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
        if orig_w == 0 || orig_h == 0 {
            return (target_w, target_h);
        }

        let ratio_w = target_w as f64 / orig_w as f64;
        let ratio_h = target_h as f64 / orig_h as f64;

        if ratio_w <= ratio_h {
            let new_h = (orig_h as f64 * ratio_w).round() as u32;
            (target_w, new_h.clamp(1, target_h))
        } else {
            let new_w = (orig_w as f64 * ratio_h).round() as u32;
            (new_w.clamp(1, target_w), target_h)
        }
    }

    fn get_filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}
