//! Page re-encoding
//!
//! Viewer images arrive in whatever format the server felt like (JPEG, PNG,
//! sometimes palette GIFs). Every page is normalized to 8-bit RGB, optionally
//! scaled, and written out as a baseline JPEG so the PDF can embed it with a
//! plain `DCTDecode` filter.

use crate::config::EncodeOptions;
use crate::error::PageCodecError;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// One re-encoded page, tagged with the counter that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPage {
    pub counter: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl CompressedPage {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decodes fetched bodies and re-encodes them as JPEG
#[derive(Debug, Clone)]
pub struct PageEncoder {
    options: EncodeOptions,
}

impl PageEncoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn encode(&self, counter: u64, body: &[u8]) -> Result<CompressedPage, PageCodecError> {
        let decoded = image::load_from_memory(body).map_err(PageCodecError::Decode)?;

        let rgb = match decoded {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };

        let rgb = if self.options.resize_factor == 1.0 {
            rgb
        } else {
            let (width, height) = scaled_dimensions(rgb.width(), rgb.height(), self.options.resize_factor);
            image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
        };

        let mut data = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut data, self.options.jpeg_quality);
        rgb.write_with_encoder(encoder).map_err(PageCodecError::Encode)?;

        Ok(CompressedPage {
            counter,
            width: rgb.width(),
            height: rgb.height(),
            data,
        })
    }
}

impl PageEncoder {
    /// [`PageEncoder::encode`] on the blocking pool, keeping decode, resize
    /// and JPEG work off the async workers
    pub async fn encode_in_background(
        &self,
        counter: u64,
        body: Bytes,
    ) -> Result<CompressedPage, PageCodecError> {
        let encoder = self.clone();
        tokio::task::spawn_blocking(move || encoder.encode(counter, &body))
            .await
            .map_err(|e| PageCodecError::Worker(e.to_string()))?
    }
}

impl Default for PageEncoder {
    fn default() -> Self {
        Self::new(EncodeOptions::default())
    }
}

/// Truncating scale, never below one pixel
fn scaled_dimensions(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * factor as f64) as u32).max(1);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_encode_rgba_png_to_rgb_jpeg() {
        let body = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            20,
            10,
            Rgba([200, 10, 10, 128]),
        )));
        let page = PageEncoder::default().encode(4, &body).unwrap();

        assert_eq!(page.counter, 4);
        assert_eq!((page.width, page.height), (20, 10));
        assert!(page.data.starts_with(&[0xFF, 0xD8]));

        let decoded = image::load_from_memory(&page.data).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_grayscale_is_converted_to_three_channels() {
        let body = png_bytes(DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([90]))));
        let page = PageEncoder::default().encode(1, &body).unwrap();
        let decoded = image::load_from_memory(&page.data).unwrap();
        assert_eq!(decoded.color().channel_count(), 3);
    }

    #[test]
    fn test_resize_factor_scales_dimensions() {
        let body = png_bytes(DynamicImage::ImageRgba8(RgbaImage::new(40, 30)));
        let encoder = PageEncoder::new(EncodeOptions::default().with_resize_factor(0.5));
        let page = encoder.encode(1, &body).unwrap();
        assert_eq!((page.width, page.height), (20, 15));
    }

    #[test]
    fn test_scaled_dimensions_never_zero() {
        assert_eq!(scaled_dimensions(3, 1, 0.1), (1, 1));
        assert_eq!(scaled_dimensions(101, 51, 1.0), (101, 51));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = PageEncoder::default()
            .encode(1, b"<html>not an image</html>")
            .unwrap_err();
        assert!(matches!(err, PageCodecError::Decode(_)));
    }

    #[test]
    fn test_lower_quality_gives_smaller_output() {
        let mut img = RgbaImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8, 255]);
        }
        let body = png_bytes(DynamicImage::ImageRgba8(img));

        let low = PageEncoder::new(EncodeOptions::default().with_jpeg_quality(10))
            .encode(1, &body)
            .unwrap();
        let high = PageEncoder::new(EncodeOptions::default().with_jpeg_quality(95))
            .encode(1, &body)
            .unwrap();
        assert!(low.len() < high.len());
    }

    #[tokio::test]
    async fn test_background_encode_matches_inline_encode() {
        let body = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            12,
            9,
            Rgba([1, 2, 3, 255]),
        )));
        let encoder = PageEncoder::default();

        let inline = encoder.encode(3, &body).unwrap();
        let background = encoder
            .encode_in_background(3, Bytes::from(body))
            .await
            .unwrap();
        assert_eq!(inline, background);
    }

    #[tokio::test]
    async fn test_background_encode_leaves_runtime_free() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut img = RgbaImage::new(600, 800);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([x as u8, y as u8, (x ^ y) as u8, 255]);
        }
        let body = Bytes::from(png_bytes(DynamicImage::ImageRgba8(img)));

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let page = PageEncoder::new(EncodeOptions::default().with_resize_factor(0.5))
            .encode_in_background(1, body)
            .await
            .unwrap();
        ticker.abort();

        assert_eq!((page.width, page.height), (300, 400));
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }
}
