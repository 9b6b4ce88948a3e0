//! Conditional fetch collaborator
//!
//! The update loop issues exactly one kind of request: a `GET` of the server's
//! `get/` endpoint carrying the device identity and the held validator token.
//! Connection handling, TLS and header parsing belong to the [`HttpClient`]
//! implementation; this module only fixes the request shape and the headers
//! the loop reads back.

use core::fmt::Debug;

/// Path appended to the server base URL
pub const UPDATE_PATH: &str = "get/";

/// Request header carrying the device identity token
pub const DISPLAY_ID_HEADER: &str = "X-Display-ID";

/// Request header carrying the held validator token (empty when none)
pub const VALIDATOR_HEADER: &str = "ETag";

/// Response header carrying the new validator token
pub const ETAG_HEADER: &str = "ETag";

/// Response header carrying `max-age=<seconds>`
pub const CACHE_CONTROL_HEADER: &str = "Cache-Control";

/// Status for new content with a body
pub const STATUS_OK: u16 = 200;

/// Status for content matching the held validator token
pub const STATUS_NOT_MODIFIED: u16 = 304;

/// A conditional `GET` of the update endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request<'a> {
    /// Full endpoint URL, ending in [`UPDATE_PATH`]
    pub url: &'a str,
    /// Device identity token
    pub display_id: &'a str,
    /// Held validator token, empty for an unconditional fetch
    pub validator: &'a str,
}

impl<'a> Request<'a> {
    /// Request headers in the order they are sent
    pub fn headers(&self) -> [(&'static str, &'a str); 2] {
        [
            (DISPLAY_ID_HEADER, self.display_id),
            (VALIDATOR_HEADER, self.validator),
        ]
    }
}

/// Blocking HTTP client used for the update request
///
/// One exchange is `open`, then any number of `header`/`content_length`/`read`
/// calls, then `close`. The update loop always calls `close` after a
/// successful `open`.
pub trait HttpClient {
    /// Error type for transport failures
    type Error: Debug;

    /// Connect, send `request` and read the response head
    ///
    /// Returns the HTTP status code.
    fn open(&mut self, request: &Request<'_>) -> Result<u16, Self::Error>;

    /// Value of a response header from the last `open`, matched case-insensitively
    fn header(&self, name: &str) -> Option<&str>;

    /// Advertised body length, if the server sent one
    fn content_length(&self) -> Option<usize>;

    /// Read body bytes into `buf`, returning 0 at end of stream
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Close the connection and release its resources
    fn close(&mut self);
}
