//! Cache validation of update responses
//!
//! [`CacheValidator`] holds the validator token the server assigned to the
//! image currently on the panel, and the earliest instant the next request
//! should be made. Both are updated from the status and headers of each
//! response:
//!
//! | Status | Result | Token | Next request |
//! |--------|--------|-------|--------------|
//! | 304 | [`Classification::Unchanged`] | `ETag` if sent | `max-age`, else fallback |
//! | 200 | [`Classification::NewContent`] | `ETag` if sent | `max-age`, else fallback |
//! | other | [`Classification::Rejected`] | cleared | fallback |
//!
//! ## Example
//!
//! ```
//! use core::time::Duration;
//! use epaper_updater::cache::{CacheValidator, Classification, ValidatorToken};
//! use epaper_updater::clock::Instant;
//!
//! let mut cache = CacheValidator::new(Duration::from_secs(60), ValidatorToken::new());
//! let now = Instant::from_secs(3);
//!
//! let class = cache.classify(200, Some("\"abc\""), Some("max-age=120"), now);
//! assert_eq!(class, Classification::NewContent);
//! assert_eq!(cache.token(), "\"abc\"");
//! assert_eq!(cache.next_request(), Instant::from_secs(123));
//! ```

use core::time::Duration;
use heapless::String;
use log::{debug, warn};

use crate::clock::Instant;
use crate::http::{STATUS_NOT_MODIFIED, STATUS_OK};

/// Maximum validator token length in bytes; longer tokens are truncated
pub const MAX_TOKEN_LEN: usize = 127;

/// Bounded validator token storage
pub type ValidatorToken = String<MAX_TOKEN_LEN>;

/// Validator token and next-request deadline
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheState {
    /// Token of the image on the panel, empty when none is held
    pub token: ValidatorToken,
    /// Earliest instant for the next request
    pub next_request: Instant,
}

/// What a response means for the image on the panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Content matches the held token, nothing to render
    Unchanged,
    /// New content in the response body
    NewContent,
    /// Any other status
    Rejected(u16),
}

/// A `max-age` directive whose value is not a non-negative integer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidMaxAge;

impl core::fmt::Display for InvalidMaxAge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "max-age is not a non-negative integer")
    }
}

impl core::error::Error for InvalidMaxAge {}

/// Tracks the validator token and the next-request deadline
#[derive(Clone, Debug)]
pub struct CacheValidator {
    state: CacheState,
    fallback: Duration,
}

impl CacheValidator {
    /// Create a validator holding `token`, typically restored from retained memory
    pub fn new(fallback: Duration, token: ValidatorToken) -> Self {
        Self {
            state: CacheState {
                token,
                next_request: Instant::default(),
            },
            fallback,
        }
    }

    /// Held token, empty when none
    pub fn token(&self) -> &str {
        &self.state.token
    }

    /// Earliest instant for the next request
    pub fn next_request(&self) -> Instant {
        self.state.next_request
    }

    /// Token and deadline together
    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// Interval used when the server gives no lifetime or the exchange fails
    pub fn fallback(&self) -> Duration {
        self.fallback
    }

    /// Time left until the next request, zero if it is due
    pub fn remaining(&self, now: Instant) -> Duration {
        self.state.next_request.saturating_duration_since(now)
    }

    /// Schedule the fallback deadline before an exchange starts
    ///
    /// Covers exchanges that fail before any header is seen.
    pub fn begin_attempt(&mut self, now: Instant) {
        self.state.next_request = now + self.fallback;
    }

    /// Interpret a response head
    ///
    /// On 200 and 304 the `etag` value, if any, becomes the held token and the
    /// deadline is set from `cache_control`. Other statuses leave the state
    /// alone; the caller decides whether to [`invalidate`](Self::invalidate).
    pub fn classify(
        &mut self,
        status: u16,
        etag: Option<&str>,
        cache_control: Option<&str>,
        now: Instant,
    ) -> Classification {
        let class = match status {
            STATUS_NOT_MODIFIED => Classification::Unchanged,
            STATUS_OK => Classification::NewContent,
            other => return Classification::Rejected(other),
        };

        if let Some(etag) = etag {
            self.state.token = truncate_token(etag);
        }

        let lifetime = match cache_control.map(parse_max_age) {
            Some(Ok(Some(secs))) => Duration::from_secs(secs),
            Some(Err(e)) => {
                warn!(
                    "Could not parse Cache-Control header \"{}\": {e}",
                    cache_control.unwrap_or_default()
                );
                self.fallback
            }
            Some(Ok(None)) | None => self.fallback,
        };
        self.state.next_request = now + lifetime;
        debug!("Next request in {}s", lifetime.as_secs());

        class
    }

    /// Drop the held token and fall back to the default deadline
    ///
    /// The next request is then unconditional.
    pub fn invalidate(&mut self, now: Instant) {
        self.state.token.clear();
        self.state.next_request = now + self.fallback;
    }
}

/// Copy a header value into token storage, truncating on a character boundary
pub fn truncate_token(value: &str) -> ValidatorToken {
    let mut token = ValidatorToken::new();
    for c in value.chars() {
        if token.push(c).is_err() {
            break;
        }
    }
    token
}

/// Extract the `max-age` lifetime in seconds from a `Cache-Control` value
///
/// Returns `Ok(None)` when there is no `max-age` directive.
///
/// ```
/// use epaper_updater::cache::parse_max_age;
///
/// assert_eq!(parse_max_age("max-age=120"), Ok(Some(120)));
/// assert_eq!(parse_max_age("public, max-age=30"), Ok(Some(30)));
/// assert_eq!(parse_max_age("no-cache"), Ok(None));
/// assert!(parse_max_age("max-age=soon").is_err());
/// ```
///
/// # Errors
///
/// Returns [`InvalidMaxAge`] if the directive value is not a non-negative
/// integer that fits in a `u64`.
pub fn parse_max_age(value: &str) -> Result<Option<u64>, InvalidMaxAge> {
    for directive in value.split(',') {
        let Some((name, arg)) = directive.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("max-age") {
            continue;
        }
        let arg = arg.trim();
        if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidMaxAge);
        }
        return arg.parse().map(Some).map_err(|_| InvalidMaxAge);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String as AllocString;

    const FALLBACK: Duration = Duration::from_secs(60);

    fn validator(token: &str) -> CacheValidator {
        CacheValidator::new(FALLBACK, truncate_token(token))
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age("max-age=0"), Ok(Some(0)));
        assert_eq!(parse_max_age("Max-Age = 45"), Ok(Some(45)));
        assert_eq!(parse_max_age("no-store, max-age=7, private"), Ok(Some(7)));
        assert_eq!(parse_max_age("s-maxage=10"), Ok(None));
        assert_eq!(parse_max_age(""), Ok(None));
    }

    #[test]
    fn test_parse_max_age_malformed() {
        assert_eq!(parse_max_age("max-age="), Err(InvalidMaxAge));
        assert_eq!(parse_max_age("max-age=-5"), Err(InvalidMaxAge));
        assert_eq!(parse_max_age("max-age=12s"), Err(InvalidMaxAge));
        assert_eq!(
            parse_max_age("max-age=99999999999999999999999"),
            Err(InvalidMaxAge)
        );
    }

    #[test]
    fn test_begin_attempt_sets_fallback_deadline() {
        let mut cache = validator("");
        cache.begin_attempt(Instant::from_secs(5));
        assert_eq!(cache.next_request(), Instant::from_secs(65));
    }

    #[test]
    fn test_new_content_with_max_age() {
        let mut cache = validator("");
        let now = Instant::from_secs(10);
        let class = cache.classify(200, Some("v2"), Some("max-age=120"), now);

        assert_eq!(class, Classification::NewContent);
        assert_eq!(cache.token(), "v2");
        assert_eq!(cache.next_request(), Instant::from_secs(130));
    }

    #[test]
    fn test_missing_cache_control_uses_fallback() {
        let mut cache = validator("");
        let now = Instant::from_secs(10);
        cache.classify(200, Some("v2"), None, now);
        assert_eq!(cache.next_request(), Instant::from_secs(70));
    }

    #[test]
    fn test_malformed_max_age_uses_fallback() {
        let mut cache = validator("");
        let now = Instant::from_secs(10);
        let class = cache.classify(200, None, Some("max-age=later"), now);
        assert_eq!(class, Classification::NewContent);
        assert_eq!(cache.next_request(), Instant::from_secs(70));
    }

    #[test]
    fn test_repeated_not_modified_is_stable() {
        let mut cache = validator("\"abc\"");
        for i in 0..3 {
            let now = Instant::from_secs(100 * i);
            let class = cache.classify(304, Some("\"abc\""), None, now);
            assert_eq!(class, Classification::Unchanged);
            assert_eq!(cache.token(), "\"abc\"");
            assert_eq!(cache.remaining(now), FALLBACK);
        }
    }

    #[test]
    fn test_missing_etag_keeps_token() {
        let mut cache = validator("old");
        cache.classify(304, None, None, Instant::from_secs(1));
        assert_eq!(cache.token(), "old");
    }

    #[test]
    fn test_rejected_status_leaves_state() {
        let mut cache = validator("keep");
        cache.begin_attempt(Instant::from_secs(1));
        let class = cache.classify(500, Some("other"), Some("max-age=5"), Instant::from_secs(2));

        assert_eq!(class, Classification::Rejected(500));
        assert_eq!(cache.token(), "keep");
        assert_eq!(cache.next_request(), Instant::from_secs(61));
    }

    #[test]
    fn test_invalidate_clears_token() {
        let mut cache = validator("abc");
        cache.classify(200, None, Some("max-age=600"), Instant::from_secs(0));
        cache.invalidate(Instant::from_secs(8));

        assert_eq!(cache.token(), "");
        assert_eq!(cache.next_request(), Instant::from_secs(68));
    }

    #[test]
    fn test_long_token_is_truncated() {
        let long: AllocString = "x".repeat(200);
        let mut cache = validator("");
        cache.classify(200, Some(&long), None, Instant::from_secs(0));
        assert_eq!(cache.token().len(), MAX_TOKEN_LEN);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        let mut value: AllocString = "a".repeat(MAX_TOKEN_LEN - 1);
        value.push('é');
        let token = truncate_token(&value);
        assert_eq!(token.len(), MAX_TOKEN_LEN - 1);
    }

    #[test]
    fn test_remaining_saturates() {
        let mut cache = validator("");
        cache.begin_attempt(Instant::from_secs(0));
        assert_eq!(cache.remaining(Instant::from_secs(90)), Duration::ZERO);
    }
}
