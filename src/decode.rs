//! Image decoding collaborator
//!
//! The server sends a PNG with a 4-entry palette at 2 bits per pixel. A
//! [`FrameDecoder`] turns it into raw palette indices without any color
//! conversion; the update loop then checks the result against the panel's
//! native resolution before anything is sent to the panel.

use core::fmt::Debug;

/// A decoded indexed image, not yet checked against the panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage<B> {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Packed 2-bit palette indices, 4 pixels per byte, leftmost pixel in the
    /// two most significant bits, rows without padding
    pub pixels: B,
}

/// Decoder for the server's indexed image payload
pub trait FrameDecoder {
    /// Error type for malformed payloads
    type Error: Debug;
    /// Storage of the decoded pixels
    type Buffer: AsRef<[u8]>;

    /// Decode `payload` into 2-bit palette indices
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid 2-bit indexed image.
    fn decode(&mut self, payload: &[u8]) -> Result<DecodedImage<Self::Buffer>, Self::Error>;
}
