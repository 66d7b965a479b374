//! Image payloads: tightly packed RGBA8 pixels.

use penumbra_core::{RenderError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, no padding.
    pub pixels: Vec<u8>,
}

impl Image {
    /// Wraps raw RGBA8 pixels, checking the buffer length against the dimensions.
    pub fn new(label: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let label = label.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected || width == 0 || height == 0 {
            return Err(RenderError::load_failure(
                label,
                format!(
                    "pixel buffer is {} bytes, expected {expected} for {width}x{height} RGBA8",
                    pixels.len()
                ),
            ));
        }
        Ok(Self {
            label,
            width,
            height,
            pixels,
        })
    }

    /// A 1x1 image of a single color.
    #[must_use]
    pub fn solid(label: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    /// Decodes an encoded image (PNG, JPEG, HDR) into RGBA8.
    pub fn decode(label: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let label = label.into();
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| RenderError::load_failure(label.clone(), e))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self {
            label,
            width,
            height,
            pixels: decoded.into_raw(),
        })
    }

    #[inline]
    #[must_use]
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_short_buffer() {
        let err = Image::new("bad", 2, 2, vec![0; 8]).unwrap_err();
        assert!(matches!(err, RenderError::ResourceLoadFailure { .. }));
    }

    #[test]
    fn solid_is_one_pixel() {
        let img = Image::solid("white", [255; 4]);
        assert_eq!((img.width, img.height), (1, 1));
        assert_eq!(img.bytes_per_row(), 4);
    }
}
