//! Error types for the driver and the update loop
//!
//! ## Error Types
//!
//! - [`Error`] - Panel driver errors during display operations
//! - [`InterfaceError`](crate::interface::InterfaceError) - Low-level line and busy-wait errors
//! - [`FrameError`] - A decoded image that cannot be shown on the panel
//! - [`BuilderError`] - Errors during updater configuration construction
//! - [`UpdateError`] - Everything that can abort one fetch-and-render cycle
//!
//! No error ends the update loop: a failed cycle is logged and the next
//! attempt is scheduled after the fallback interval.
//!
//! ## Example
//!
//! ```
//! use epaper_updater::{DisplayFrame, FrameError};
//!
//! let pixels = [0u8; 16];
//! let result = DisplayFrame::new(8, 8, &pixels[..]);
//! assert!(matches!(result, Err(FrameError::DimensionMismatch { width: 8, height: 8 })));
//! ```

use crate::decode::FrameDecoder;
use crate::display::PanelState;
use crate::http::HttpClient;
use crate::interface::DisplayInterface;

/// Errors that can occur when driving the panel
///
/// Generic over the interface type to preserve the specific error type.
#[derive(Debug)]
pub enum Error<I: DisplayInterface> {
    /// Interface error (GPIO or busy-wait timeout)
    ///
    /// Wraps the underlying error from the [`DisplayInterface`] implementation.
    Interface(I::Error),
    /// Operation not allowed in the panel's current lifecycle state
    InvalidState {
        /// Operation that was refused
        operation: &'static str,
        /// State the panel was in
        state: PanelState,
    },
}

impl<I: DisplayInterface> core::fmt::Display for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Interface(e) => write!(f, "Interface error: {e:?}"),
            Self::InvalidState { operation, state } => {
                write!(f, "Cannot {operation} while panel is {state:?}")
            }
        }
    }
}

impl<I: DisplayInterface + core::fmt::Debug> core::error::Error for Error<I> {}

/// A decoded image that does not fit the panel's fixed format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Image dimensions differ from the native resolution
    DimensionMismatch {
        /// Width of the rejected image
        width: u32,
        /// Height of the rejected image
        height: u32,
    },
    /// Pixel buffer length does not match `width * height / 4`
    BufferSize {
        /// Required buffer size in bytes
        expected: usize,
        /// Provided buffer size in bytes
        provided: usize,
    },
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DimensionMismatch { width, height } => write!(
                f,
                "Display of size {}x{}, got image of {width}x{height}",
                crate::config::PANEL_WIDTH,
                crate::config::PANEL_HEIGHT
            ),
            Self::BufferSize { expected, provided } => write!(
                f,
                "Frame buffer size mismatch: expected {expected} bytes, provided {provided}"
            ),
        }
    }
}

impl core::error::Error for FrameError {}

/// Errors that can occur when building the updater configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    /// Server URL was not specified
    MissingServerUrl,
    /// Device identity token was not specified
    MissingDisplayId,
    /// Server URL plus `get/` exceeds the endpoint capacity
    UrlTooLong {
        /// Maximum endpoint length in bytes
        max: usize,
    },
    /// Device identity token exceeds its capacity
    DisplayIdTooLong {
        /// Maximum token length in bytes
        max: usize,
    },
    /// Fallback interval must be non-zero
    ZeroFallbackInterval,
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingServerUrl => write!(f, "Server URL must be specified"),
            Self::MissingDisplayId => write!(f, "Display ID must be specified"),
            Self::UrlTooLong { max } => {
                write!(f, "Update endpoint URL longer than {max} bytes")
            }
            Self::DisplayIdTooLong { max } => {
                write!(f, "Display ID longer than {max} bytes")
            }
            Self::ZeroFallbackInterval => write!(f, "Fallback interval must be non-zero"),
        }
    }
}

impl core::error::Error for BuilderError {}

/// Errors that abort a single fetch-and-render cycle
///
/// Generic over the HTTP client, the image decoder and the panel interface so
/// the underlying error of each collaborator is preserved.
#[derive(Debug)]
pub enum UpdateError<H: HttpClient, F: FrameDecoder, I: DisplayInterface> {
    /// Connection to the server could not be opened
    TransportOpen(H::Error),
    /// Server answered with something other than 200 or 304
    UnexpectedStatus(u16),
    /// Reading the response body failed
    Read(H::Error),
    /// Fewer body bytes arrived than the server advertised
    ReadShortfall {
        /// Advertised content length
        expected: usize,
        /// Bytes actually read
        read: usize,
    },
    /// Payload does not fit the pre-allocated body buffer
    Allocation {
        /// Bytes needed for the payload (at least)
        required: usize,
        /// Capacity of the body buffer
        capacity: usize,
    },
    /// Payload is not a valid indexed image
    Decode(F::Error),
    /// Decoded image does not match the panel format
    Frame(FrameError),
    /// Panel driver failed while rendering
    Panel(Error<I>),
}

impl<H: HttpClient, F: FrameDecoder, I: DisplayInterface> core::fmt::Display
    for UpdateError<H, F, I>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TransportOpen(e) => write!(f, "Error while connecting to server: {e:?}"),
            Self::UnexpectedStatus(status) => write!(f, "Server returned code {status}"),
            Self::Read(e) => write!(f, "Error while reading response: {e:?}"),
            Self::ReadShortfall { expected, read } => {
                write!(f, "Expected to read {expected} bytes, but got {read}")
            }
            Self::Allocation { required, capacity } => write!(
                f,
                "Could not fit {required} byte payload into {capacity} byte buffer"
            ),
            Self::Decode(e) => write!(f, "Error while decoding image: {e:?}"),
            Self::Frame(e) => write!(f, "{e}"),
            Self::Panel(e) => write!(f, "Panel error: {e}"),
        }
    }
}

impl<H, F, I> core::error::Error for UpdateError<H, F, I>
where
    H: HttpClient + core::fmt::Debug,
    F: FrameDecoder + core::fmt::Debug,
    I: DisplayInterface + core::fmt::Debug,
{
}

impl<H: HttpClient, F: FrameDecoder, I: DisplayInterface> From<FrameError>
    for UpdateError<H, F, I>
{
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

impl<H: HttpClient, F: FrameDecoder, I: DisplayInterface> From<Error<I>>
    for UpdateError<H, F, I>
{
    fn from(e: Error<I>) -> Self {
        Self::Panel(e)
    }
}
