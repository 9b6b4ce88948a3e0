//! Pixel transcoding from indexed frames to the panel's transfer format
//!
//! A [`DisplayFrame`] holds 2-bit palette indices at the panel's native
//! resolution, four pixels per byte. The panel wants one 4-bit color code per
//! pixel, two pixels per byte, so every frame byte becomes two transfer bytes:
//!
//! ```text
//! frame byte:     [p0 p0 | p1 p1 | p2 p2 | p3 p3]
//! transfer bytes: [code(p0) | code(p1)] [code(p2) | code(p3)]
//! ```
//!
//! The [`PixelTranscoder`] accumulates transfer bytes in a fixed
//! [`CHUNK_SIZE`]-byte buffer and hands each full chunk (and the final partial
//! one) to a sink, so memory use does not depend on the image size.
//!
//! ## Example
//!
//! ```
//! use epaper_updater::{Dimensions, DisplayFrame, PixelTranscoder};
//!
//! let pixels = [0x55u8; Dimensions::NATIVE.frame_size()]; // all white
//! let frame = match DisplayFrame::new(640, 384, &pixels[..]) {
//!     Ok(frame) => frame,
//!     Err(_) => return,
//! };
//!
//! let mut total = 0;
//! let result: Result<usize, ()> = PixelTranscoder::new().transcode(&frame, |chunk| {
//!     assert!(chunk.iter().all(|&byte| byte == 0x33));
//!     total += chunk.len();
//!     Ok(())
//! });
//! assert_eq!(result, Ok(Dimensions::NATIVE.transfer_size()));
//! ```

use heapless::Vec;

use crate::color::Color;
use crate::config::Dimensions;
use crate::error::FrameError;

/// Maximum number of bytes handed to the panel per data burst
pub const CHUNK_SIZE: usize = 64;

/// Bounded buffer holding one chunk of transfer bytes
pub type TransferBuffer = Vec<u8, CHUNK_SIZE>;

/// A frame of 2-bit palette indices at the panel's native resolution
///
/// Construction fails for any other size; frames are never clipped or scaled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayFrame<B> {
    pixels: B,
}

impl<B: AsRef<[u8]>> DisplayFrame<B> {
    /// Wrap packed indices of a `width` x `height` image
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::DimensionMismatch`] if the image is not exactly the
    /// native resolution, or [`FrameError::BufferSize`] if `pixels` does not hold
    /// exactly `width * height / 4` bytes.
    pub fn new(width: u32, height: u32, pixels: B) -> Result<Self, FrameError> {
        let dims = Dimensions::NATIVE;
        if !dims.matches(width, height) {
            return Err(FrameError::DimensionMismatch { width, height });
        }
        let provided = pixels.as_ref().len();
        if provided != dims.frame_size() {
            return Err(FrameError::BufferSize {
                expected: dims.frame_size(),
                provided,
            });
        }
        Ok(Self { pixels })
    }

    /// Frame dimensions (always the native resolution)
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::NATIVE
    }

    /// Packed palette indices
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_ref()
    }

    /// Palette index of the pixel at (`x`, `y`), `None` outside the frame
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        let (byte, shift) = locate(x, y)?;
        Some((self.pixels.as_ref()[byte] >> shift) & 0x03)
    }

    /// Color the panel will show at (`x`, `y`), `None` outside the frame
    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        self.index_at(x, y).map(Color::from_palette_index)
    }

    /// Unwrap the pixel storage
    pub fn into_inner(self) -> B {
        self.pixels
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> DisplayFrame<B> {
    /// Set the palette index of the pixel at (`x`, `y`)
    ///
    /// Out-of-frame coordinates are ignored.
    pub fn set_index(&mut self, x: u32, y: u32, index: u8) {
        if let Some((byte, shift)) = locate(x, y) {
            let slot = &mut self.pixels.as_mut()[byte];
            *slot = (*slot & !(0x03 << shift)) | ((index & 0x03) << shift);
        }
    }

    /// Set every pixel to `index`
    pub fn fill(&mut self, index: u8) {
        let index = index & 0x03;
        let byte = (index << 6) | (index << 4) | (index << 2) | index;
        self.pixels.as_mut().fill(byte);
    }
}

/// Byte offset and bit shift of a pixel, leftmost pixel in the high bits
fn locate(x: u32, y: u32) -> Option<(usize, u32)> {
    let dims = Dimensions::NATIVE;
    if x >= u32::from(dims.cols) || y >= u32::from(dims.rows) {
        return None;
    }
    let offset = y as usize * dims.cols as usize + x as usize;
    Some((offset / 4, 6 - 2 * (x % 4)))
}

/// Transcode one frame byte (four indices) into two transfer bytes
///
/// ```
/// use epaper_updater::transcode::transcode_byte;
///
/// // black, white, red, unused -> [black|white] [red|black]
/// assert_eq!(transcode_byte(0b00_01_10_11), [0x03, 0x40]);
/// ```
pub const fn transcode_byte(indices: u8) -> [u8; 2] {
    let p0 = Color::from_palette_index(indices >> 6);
    let p1 = Color::from_palette_index(indices >> 4);
    let p2 = Color::from_palette_index(indices >> 2);
    let p3 = Color::from_palette_index(indices);
    [Color::pack(p0, p1), Color::pack(p2, p3)]
}

/// Streams a frame to a sink in bounded chunks
#[derive(Debug, Default)]
pub struct PixelTranscoder {
    chunk: TransferBuffer,
}

impl PixelTranscoder {
    /// Create a transcoder with an empty chunk buffer
    pub const fn new() -> Self {
        Self { chunk: Vec::new() }
    }

    /// Transcode `frame`, passing each chunk of at most [`CHUNK_SIZE`] bytes to `sink`
    ///
    /// Returns the total number of transfer bytes produced, always
    /// `width * height / 2` when the sink never fails.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error from `sink`.
    pub fn transcode<B, E, F>(&mut self, frame: &DisplayFrame<B>, mut sink: F) -> Result<usize, E>
    where
        B: AsRef<[u8]>,
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        self.chunk.clear();
        let mut sent = 0;

        for &indices in frame.as_bytes() {
            for packed in transcode_byte(indices) {
                if self.chunk.is_full() {
                    sent += self.flush(&mut sink)?;
                }
                // Cannot fail: the buffer was flushed when full
                let _ = self.chunk.push(packed);
            }
        }

        if !self.chunk.is_empty() {
            sent += self.flush(&mut sink)?;
        }

        Ok(sent)
    }

    fn flush<E, F>(&mut self, sink: &mut F) -> Result<usize, E>
    where
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        let len = self.chunk.len();
        sink(&self.chunk)?;
        self.chunk.clear();
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec as AllocVec;

    fn blank_frame() -> DisplayFrame<AllocVec<u8>> {
        DisplayFrame::new(640, 384, vec![0u8; Dimensions::NATIVE.frame_size()]).unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_dimensions() {
        let pixels = vec![0u8; Dimensions::NATIVE.frame_size()];
        let result = DisplayFrame::new(384, 640, pixels);
        assert!(matches!(
            result,
            Err(FrameError::DimensionMismatch {
                width: 384,
                height: 640
            })
        ));
    }

    #[test]
    fn test_new_rejects_wrong_buffer_length() {
        let pixels = vec![0u8; 100];
        let result = DisplayFrame::new(640, 384, pixels);
        assert!(matches!(
            result,
            Err(FrameError::BufferSize {
                expected: 61_440,
                provided: 100
            })
        ));
    }

    #[test]
    fn test_transcode_byte_maps_every_index() {
        assert_eq!(transcode_byte(0x00), [0x00, 0x00]);
        assert_eq!(transcode_byte(0x55), [0x33, 0x33]);
        assert_eq!(transcode_byte(0xAA), [0x44, 0x44]);
        // Index 3 is the black fallback
        assert_eq!(transcode_byte(0xFF), [0x00, 0x00]);
    }

    #[test]
    fn test_known_row_packs_to_expected_bytes() {
        // 8 pixels: white, red, black, white | red, red, unused, white
        let row = [0b01_10_00_01u8, 0b10_10_11_01u8];
        let packed: AllocVec<u8> = row.iter().flat_map(|&b| transcode_byte(b)).collect();
        assert_eq!(packed, [0x34, 0x03, 0x44, 0x03]);
    }

    #[test]
    fn test_index_accessors() {
        let mut frame = blank_frame();
        frame.set_index(0, 0, 1);
        frame.set_index(3, 0, 2);
        frame.set_index(639, 383, 2);

        assert_eq!(frame.as_bytes()[0], 0b01_00_00_10);
        assert_eq!(frame.index_at(3, 0), Some(2));
        assert_eq!(frame.color_at(639, 383), Some(Color::Red));
        assert_eq!(frame.index_at(640, 0), None);
        assert_eq!(frame.index_at(0, 384), None);
    }

    #[test]
    fn test_set_index_out_of_bounds_is_ignored() {
        let mut frame = blank_frame();
        frame.set_index(640, 10, 1);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fill() {
        let mut frame = blank_frame();
        frame.fill(2);
        assert!(frame.as_bytes().iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_transcode_streams_bounded_chunks() {
        let mut frame = blank_frame();
        frame.fill(1);

        let mut chunks = 0;
        let mut total = 0;
        let result: Result<usize, ()> = PixelTranscoder::new().transcode(&frame, |chunk| {
            assert!(chunk.len() <= CHUNK_SIZE);
            assert!(chunk.iter().all(|&b| b == 0x33));
            chunks += 1;
            total += chunk.len();
            Ok(())
        });

        assert_eq!(result, Ok(Dimensions::NATIVE.transfer_size()));
        assert_eq!(total, 122_880);
        assert_eq!(chunks, 122_880 / CHUNK_SIZE);
    }

    #[test]
    fn test_transcode_preserves_pixel_order() {
        let mut frame = blank_frame();
        frame.fill(1);
        frame.set_index(0, 0, 2);
        frame.set_index(639, 383, 0);

        let mut stream = AllocVec::new();
        let result: Result<usize, ()> = PixelTranscoder::new().transcode(&frame, |chunk| {
            stream.extend_from_slice(chunk);
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(stream.first(), Some(&0x43));
        assert_eq!(stream.last(), Some(&0x30));
    }

    #[test]
    fn test_transcode_stops_at_first_sink_error() {
        let frame = blank_frame();
        let mut calls = 0;
        let result = PixelTranscoder::new().transcode(&frame, |_| {
            calls += 1;
            if calls == 3 { Err("line fault") } else { Ok(()) }
        });
        assert_eq!(result, Err("line fault"));
        assert_eq!(calls, 3);
    }
}
