use crate::error::IoError;

/// An interleaved 8-bit RGB image.
///
/// Data is row-major with shape (height, width, 3).
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl RgbImage {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `width` - Width of the image in pixels.
    /// * `height` - Height of the image in pixels.
    /// * `data` - Interleaved RGB bytes, `width * height * 3` of them.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, IoError> {
        if data.len() != width * height * 3 {
            return Err(IoError::InvalidImageBuffer(data.len(), width, height, 3));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Width of the image in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the image in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the RGB triplet at a pixel position.
    ///
    /// The caller is responsible for bounds; out-of-image sampling is
    /// decided before this call.
    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        let base = (row * self.width + col) * 3;
        [self.data[base], self.data[base + 1], self.data[base + 2]]
    }

    /// The raw interleaved buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}
