use anyhow::{bail, Context, Result};

/// CPU-side RGBA8 image, ready for upload as one GPU texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed rows, 4 bytes per pixel, top row first.
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Wraps already decoded pixels, checking the size matches.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("texture image is empty ({width}x{height})");
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            bail!("texture image is {} bytes, expected {expected} for {width}x{height}", rgba.len());
        }
        Ok(Self { width, height, rgba })
    }

    #[inline]
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

/// Decodes an encoded image (PNG, JPEG) into RGBA8.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory(bytes).context("failed to decode texture image")?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    DecodedImage::from_rgba(width, height, rgba.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_2x1() -> Vec<u8> {
        let img = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 128]).unwrap();
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba() {
        let decoded = decode(&png_2x1()).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 1));
        assert_eq!(decoded.rgba, vec![255, 0, 0, 255, 0, 0, 255, 128]);
        assert_eq!(decoded.bytes_per_row(), 8);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode(b"not an image").is_err());
    }

    #[test]
    fn from_rgba_checks_length() {
        assert!(DecodedImage::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(DecodedImage::from_rgba(0, 2, Vec::new()).is_err());
        assert!(DecodedImage::from_rgba(1, 1, vec![0; 4]).is_ok());
    }
}
