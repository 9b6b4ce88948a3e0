//! State retained across low-power suspension
//!
//! Waking from suspension is a cold start: only a small retained memory
//! region survives. [`RetainedState`] is the record kept there. It carries
//! the validator token and nothing else, since the monotonic clock restarts
//! at wake and every cycle recomputes its deadline anyway.
//!
//! Place a `static` of it in the board's retained RAM section, for example
//! RTC fast memory on ESP32 targets, and hand it to the scheduler as a
//! [`StateStore`]. A record with a wrong magic number, such as uninitialized
//! memory after power loss, reads as "no token".
//!
//! ```
//! use epaper_updater::retained::{RetainedState, StateStore};
//!
//! let mut state = RetainedState::new();
//! assert_eq!(state.restore(), "");
//!
//! state.commit("\"v7\"");
//! assert_eq!(state.restore(), "\"v7\"");
//! ```

use crate::cache::{MAX_TOKEN_LEN, ValidatorToken, truncate_token};

/// Magic number marking a valid record
pub const RETAINED_STATE_MAGIC: u32 = 0xE9A9_E001;

/// Record persisted in retained memory across suspension
#[repr(C)]
#[derive(Clone, Debug)]
pub struct RetainedState {
    /// Magic number to validate the record
    magic: u32,
    /// Token length in bytes
    len: u8,
    /// Token bytes, UTF-8
    token: [u8; MAX_TOKEN_LEN],
}

impl Default for RetainedState {
    fn default() -> Self {
        Self::new()
    }
}

impl RetainedState {
    /// An invalid (empty) record, suitable as a `static` initializer
    pub const fn new() -> Self {
        Self {
            magic: 0,
            len: 0,
            token: [0; MAX_TOKEN_LEN],
        }
    }

    /// Whether the record was written by [`save`](Self::save)
    pub fn is_valid(&self) -> bool {
        self.magic == RETAINED_STATE_MAGIC
    }

    /// Read the token back, `None` if the record is invalid or corrupt
    pub fn load(&self) -> Option<ValidatorToken> {
        if !self.is_valid() {
            return None;
        }
        let bytes = self.token.get(..usize::from(self.len))?;
        let text = core::str::from_utf8(bytes).ok()?;
        Some(truncate_token(text))
    }

    /// Store `token`, truncated to [`MAX_TOKEN_LEN`] bytes
    pub fn save(&mut self, token: &str) {
        let token = truncate_token(token);
        let bytes = token.as_bytes();
        self.token = [0; MAX_TOKEN_LEN];
        self.token[..bytes.len()].copy_from_slice(bytes);
        // MAX_TOKEN_LEN fits in a u8
        self.len = u8::try_from(bytes.len()).unwrap_or(0);
        self.magic = RETAINED_STATE_MAGIC;
    }

    /// Mark the record invalid
    pub fn invalidate(&mut self) {
        self.magic = 0;
    }
}

/// Storage for the validator token across suspension
pub trait StateStore {
    /// Token saved before the last suspension, empty if none
    fn restore(&mut self) -> ValidatorToken;

    /// Persist `token` before suspending
    fn commit(&mut self, token: &str);
}

impl StateStore for RetainedState {
    fn restore(&mut self) -> ValidatorToken {
        self.load().unwrap_or_default()
    }

    fn commit(&mut self, token: &str) {
        self.save(token);
    }
}

impl<T: StateStore + ?Sized> StateStore for &mut T {
    fn restore(&mut self) -> ValidatorToken {
        (**self).restore()
    }

    fn commit(&mut self, token: &str) {
        (**self).commit(token);
    }
}
