//! Pixel comparison for rendered images

use ::image::codecs::png::PngEncoder;
use ::image::{ColorType, ImageEncoder, ImageFormat, Pixel, Rgba, RgbaImage};
use tracing::{debug, warn};

use refsnap::{Attachment, Difference, Rendering, Snapshotting, StrategyError};

use crate::data::sha256_hex;

/// `RgbaImage` values stored as PNG references.
#[derive(Debug, Clone, Copy)]
pub struct Image {
    /// Largest per-channel difference still treated as equal
    /// (anti-aliasing, compression)
    pub tolerance: u8,
    /// Percentage of differing pixels still accepted (0.0 - 100.0)
    pub threshold: f64,
}

impl Default for Image {
    fn default() -> Self {
        Self {
            tolerance: 5,
            threshold: 0.0,
        }
    }
}

impl Image {
    /// Exact match within the default channel tolerance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn threshold(mut self, percent: f64) -> Self {
        self.threshold = percent;
        self
    }

    fn pixels_differ(&self, a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
        a.channels()
            .iter()
            .zip(b.channels())
            .any(|(x, y)| x.abs_diff(*y) > self.tolerance)
    }
}

/// Summary of a pixel comparison
#[derive(Debug, Clone)]
pub struct PixelComparison {
    pub diff_pixels: u64,
    pub total_pixels: u64,
    pub diff_percent: f64,
    /// Differing pixels in red over the dimmed candidate
    pub diff_image: RgbaImage,
}

impl Image {
    /// Compare two images of equal dimensions.
    pub fn compare(&self, reference: &RgbaImage, candidate: &RgbaImage) -> PixelComparison {
        let (width, height) = candidate.dimensions();
        let mut diff_image = RgbaImage::new(width, height);
        let mut diff_pixels = 0u64;
        let total_pixels = (width as u64) * (height as u64);

        for (x, y, candidate_pixel) in candidate.enumerate_pixels() {
            let reference_pixel = reference.get_pixel(x, y);
            if self.pixels_differ(candidate_pixel, reference_pixel) {
                diff_pixels += 1;
                diff_image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            } else {
                let c = candidate_pixel.channels();
                diff_image.put_pixel(x, y, Rgba([c[0] / 2, c[1] / 2, c[2] / 2, 128]));
            }
        }

        let diff_percent = if total_pixels == 0 {
            0.0
        } else {
            (diff_pixels as f64 / total_pixels as f64) * 100.0
        };

        PixelComparison {
            diff_pixels,
            total_pixels,
            diff_percent,
            diff_image,
        }
    }
}

impl Snapshotting<RgbaImage> for Image {
    type Format = RgbaImage;

    fn path_extension(&self) -> Option<&str> {
        Some("png")
    }

    fn render(&self, value: RgbaImage) -> Rendering<RgbaImage> {
        Rendering::ready(value)
    }

    fn to_bytes(&self, format: &RgbaImage) -> Result<Vec<u8>, StrategyError> {
        encode_png(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<RgbaImage, StrategyError> {
        ::image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map(|decoded| decoded.to_rgba8())
            .map_err(|e| StrategyError::new(format!("reference is not a PNG image: {}", e)))
    }

    fn diff(&self, reference: &RgbaImage, candidate: &RgbaImage) -> Option<Difference> {
        if reference.dimensions() == candidate.dimensions()
            && reference.as_raw() == candidate.as_raw()
        {
            return None;
        }

        let difference = if reference.dimensions() != candidate.dimensions() {
            let (rw, rh) = reference.dimensions();
            let (cw, ch) = candidate.dimensions();
            warn!("Image dimensions differ: reference {}x{} vs candidate {}x{}", rw, rh, cw, ch);
            Difference::new(format!(
                "Expected image of size {}x{}, got {}x{}",
                rw, rh, cw, ch
            ))
        } else {
            let comparison = self.compare(reference, candidate);
            if comparison.diff_pixels == 0 || comparison.diff_percent <= self.threshold {
                debug!(
                    "Images match within tolerance ({:.2}% of pixels differ)",
                    comparison.diff_percent
                );
                return None;
            }

            let mut difference = Difference::new(format!(
                "{} of {} pixels differ ({:.2}%, threshold {:.2}%)\n\
                 reference sha256 {}\n\
                 candidate sha256 {}",
                comparison.diff_pixels,
                comparison.total_pixels,
                comparison.diff_percent,
                self.threshold,
                sha256_hex(reference.as_raw()),
                sha256_hex(candidate.as_raw()),
            ));
            if let Some(attachment) = png_attachment("difference.png", &comparison.diff_image) {
                difference = difference.with_attachment(attachment);
            }
            difference
        };

        let mut difference = difference;
        for (name, image) in [("reference.png", reference), ("failure.png", candidate)] {
            if let Some(attachment) = png_attachment(name, image) {
                difference = difference.with_attachment(attachment);
            }
        }
        Some(difference)
    }
}

/// Encode an image as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, StrategyError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| StrategyError::new(format!("Couldn't encode PNG: {}", e)))?;
    Ok(buffer)
}

fn png_attachment(name: &str, image: &RgbaImage) -> Option<Attachment> {
    match encode_png(image) {
        Ok(data) => Some(Attachment::new(name, data)),
        Err(e) => {
            warn!("Skipping attachment {}: {}", name, e);
            None
        }
    }
}
