//! Fetch, render and sleep loop
//!
//! [`UpdateScheduler`] runs one cycle per wake:
//!
//! 1. Schedule the fallback deadline, in case the exchange fails early
//! 2. `GET` the update endpoint, presenting the held validator token
//! 3. Classify the response; on new content read and decode the body, check it
//!    against the panel resolution, then power on, render, refresh and shut down
//! 4. On any error, log it, clear the token and reschedule at the fallback
//! 5. Decide between waiting in place and suspending until the deadline
//!
//! No error ends the loop. Only the validator token survives suspension; it
//! is committed to the [`StateStore`] right before the platform suspends.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use core::convert::Infallible;
//! # use embedded_hal::delay::DelayNs;
//! # use embedded_hal::digital::{InputPin, OutputPin};
//! # use epaper_updater::clock::{Clock, Instant};
//! # use epaper_updater::decode::{DecodedImage, FrameDecoder};
//! # use epaper_updater::http::{HttpClient, Request};
//! # use epaper_updater::power::{Platform, SuspendPlan};
//! use epaper_updater::{
//!     BitBangInterface, Builder, Display, RetainedState, UpdateScheduler, UpdaterBuilder,
//! };
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl InputPin for MockPin {
//! #     fn is_high(&mut self) -> Result<bool, Self::Error> { Ok(true) }
//! #     fn is_low(&mut self) -> Result<bool, Self::Error> { Ok(false) }
//! # }
//! # struct Client;
//! # impl HttpClient for Client {
//! #     type Error = ();
//! #     fn open(&mut self, _request: &Request<'_>) -> Result<u16, ()> { Ok(304) }
//! #     fn header(&self, _name: &str) -> Option<&str> { None }
//! #     fn content_length(&self) -> Option<usize> { None }
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> { Ok(0) }
//! #     fn close(&mut self) {}
//! # }
//! # struct Png;
//! # impl FrameDecoder for Png {
//! #     type Error = ();
//! #     type Buffer = Vec<u8>;
//! #     fn decode(&mut self, _payload: &[u8]) -> Result<DecodedImage<Vec<u8>>, ()> { Err(()) }
//! # }
//! # struct Board;
//! # impl Clock for Board { fn now(&self) -> Instant { Instant::from_secs(0) } }
//! # impl DelayNs for Board { fn delay_ns(&mut self, _ns: u32) {} }
//! # impl Platform for Board {
//! #     type Error = ();
//! #     fn shutdown_link_for_suspend(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn suspend(&mut self, _plan: &SuspendPlan) {}
//! # }
//! let config = match UpdaterBuilder::new()
//!     .server_url("http://192.168.100.1:8080/")
//!     .display_id("kitchen")
//!     .build()
//! {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//! let interface = BitBangInterface::new(MockPin, MockPin, MockPin, MockPin, MockPin, MockPin);
//! let display = Display::new(interface, Builder::new().build());
//! let mut retained = RetainedState::new();
//!
//! let mut scheduler = UpdateScheduler::new(
//!     config,
//!     Client,
//!     Png,
//!     display,
//!     &mut retained,
//!     Board,
//!     vec![0u8; 32 * 1024],
//! );
//! scheduler.run();
//! ```

use core::time::Duration;
use log::{error, info, warn};

use crate::cache::{CacheValidator, Classification};
use crate::clock::Instant;
use crate::config::UpdaterConfig;
use crate::decode::FrameDecoder;
use crate::display::Display;
use crate::error::{Error, UpdateError};
use crate::http::{CACHE_CONTROL_HEADER, ETAG_HEADER, HttpClient, Request};
use crate::interface::DisplayInterface;
use crate::power::{Platform, SuspendPlan, WakeSources};
use crate::retained::StateStore;
use crate::transcode::DisplayFrame;

/// Waits longer than this suspend the device; shorter ones wait in place
pub const SUSPEND_THRESHOLD: Duration = Duration::from_secs(5);

type UpdateResult<H, F, I, T> = core::result::Result<T, UpdateError<H, F, I>>;

/// What to do after a cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// The next request is due now
    Continue,
    /// Wait in place this long, then run the next cycle
    RetryAfterShortDelay(Duration),
    /// Suspend until `deadline` or an external wake input
    SuspendUntil {
        /// Next request deadline
        deadline: Instant,
        /// Timer and wake inputs for the platform
        plan: SuspendPlan,
    },
}

/// Result of a successful exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Server confirmed the held token; the panel was not touched
    Unchanged,
    /// A new image was rendered
    Rendered,
}

/// Decide how to wait for `deadline`
///
/// ```
/// use core::time::Duration;
/// use epaper_updater::clock::Instant;
/// use epaper_updater::power::WakeSources;
/// use epaper_updater::scheduler::{schedule, ScheduleDecision};
///
/// let wake = WakeSources::new([2, 4]);
/// let now = Instant::from_secs(100);
/// assert_eq!(
///     schedule(Instant::from_secs(104), now, wake),
///     ScheduleDecision::RetryAfterShortDelay(Duration::from_secs(4))
/// );
/// assert!(matches!(
///     schedule(Instant::from_secs(106), now, wake),
///     ScheduleDecision::SuspendUntil { .. }
/// ));
/// ```
pub fn schedule(deadline: Instant, now: Instant, wake: WakeSources) -> ScheduleDecision {
    let remaining = deadline.saturating_duration_since(now);
    if remaining > SUSPEND_THRESHOLD {
        ScheduleDecision::SuspendUntil {
            deadline,
            plan: SuspendPlan {
                duration: remaining,
                wake,
            },
        }
    } else if remaining.is_zero() {
        ScheduleDecision::Continue
    } else {
        ScheduleDecision::RetryAfterShortDelay(remaining)
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// The update loop and everything it owns
///
/// ## Type Parameters
///
/// * `H` - HTTP client implementing [`HttpClient`]
/// * `F` - Image decoder implementing [`FrameDecoder`]
/// * `I` - Panel interface implementing [`DisplayInterface`]
/// * `S` - Retained token storage implementing [`StateStore`]
/// * `P` - Board services implementing [`Platform`]
/// * `B` - Pre-allocated response body buffer
pub struct UpdateScheduler<H, F, I, S, P, B>
where
    H: HttpClient,
    F: FrameDecoder,
    I: DisplayInterface,
    S: StateStore,
    P: Platform,
    B: AsMut<[u8]>,
{
    config: UpdaterConfig,
    http: H,
    decoder: F,
    display: Display<I>,
    store: S,
    platform: P,
    body: B,
    cache: CacheValidator,
}

impl<H, F, I, S, P, B> UpdateScheduler<H, F, I, S, P, B>
where
    H: HttpClient,
    F: FrameDecoder,
    I: DisplayInterface,
    S: StateStore,
    P: Platform,
    B: AsMut<[u8]>,
{
    /// Create the loop, restoring the validator token from `store`
    ///
    /// `body` bounds the largest payload that can be accepted.
    pub fn new(
        config: UpdaterConfig,
        http: H,
        decoder: F,
        display: Display<I>,
        mut store: S,
        platform: P,
        body: B,
    ) -> Self {
        let token = store.restore();
        if !token.is_empty() {
            info!("Restored ETag {token}");
        }
        let cache = CacheValidator::new(config.fallback_interval, token);

        Self {
            config,
            http,
            decoder,
            display,
            store,
            platform,
            body,
            cache,
        }
    }

    /// Drive the panel lines to their idle levels
    pub fn initialize(&mut self) -> Result<(), Error<I>> {
        self.display.initialize()
    }

    /// Run cycles forever
    pub fn run(&mut self) -> ! {
        if let Err(e) = self.initialize() {
            error!("Could not initialize panel lines: {e}");
        }
        loop {
            let decision = self.run_cycle();
            self.apply(decision);
        }
    }

    /// Run one fetch-and-render cycle and decide how to wait for the next
    ///
    /// Errors are logged and reset the cache state; they never escape.
    pub fn run_cycle(&mut self) -> ScheduleDecision {
        let started = self.platform.now();
        self.cache.begin_attempt(started);

        match self.update() {
            Ok(UpdateOutcome::Unchanged) => info!("Image did not change, skipping"),
            Ok(UpdateOutcome::Rendered) => {
                let took = self.platform.now().saturating_duration_since(started);
                info!("Update took {} ms", took.as_millis());
            }
            Err(e) => {
                error!("Error while updating: {e}");
                self.cache.invalidate(self.platform.now());
            }
        }

        self.decide(self.platform.now())
    }

    /// Fetch once and render new content, without touching the schedule on error
    ///
    /// # Errors
    ///
    /// Returns the [`UpdateError`] that aborted the exchange or the render.
    pub fn update(&mut self) -> UpdateResult<H, F, I, UpdateOutcome> {
        let Some(len) = self.fetch()? else {
            return Ok(UpdateOutcome::Unchanged);
        };

        let payload = &self.body.as_mut()[..len];
        let image = self.decoder.decode(payload).map_err(UpdateError::Decode)?;
        let frame = DisplayFrame::new(image.width, image.height, image.pixels)?;

        info!("Passing the new image to the panel");
        self.display.update(&frame, &mut self.platform)?;
        Ok(UpdateOutcome::Rendered)
    }

    /// Issue the conditional request and read the body of new content
    ///
    /// Returns the body length, or `None` when the content is unchanged.
    fn fetch(&mut self) -> UpdateResult<H, F, I, Option<usize>> {
        let request = Request {
            url: self.config.endpoint(),
            display_id: self.config.display_id(),
            validator: self.cache.token(),
        };
        info!("Requesting new status");
        let status = self
            .http
            .open(&request)
            .map_err(UpdateError::TransportOpen)?;

        let class = self.cache.classify(
            status,
            self.http.header(ETAG_HEADER),
            self.http.header(CACHE_CONTROL_HEADER),
            self.platform.now(),
        );
        info!(
            "Status = {status}, content_length = {:?}, ETag = {}",
            self.http.content_length(),
            self.cache.token()
        );

        let result = match class {
            Classification::Unchanged => Ok(None),
            Classification::NewContent => Self::read_body(&mut self.http, self.body.as_mut()).map(Some),
            Classification::Rejected(status) => Err(UpdateError::UnexpectedStatus(status)),
        };

        self.http.close();
        result
    }

    /// Read the response body into `buf`
    ///
    /// With a content length, exactly that many bytes must arrive. Without one,
    /// the body is read to end of stream and must fit `buf`.
    fn read_body(http: &mut H, buf: &mut [u8]) -> UpdateResult<H, F, I, usize> {
        let capacity = buf.len();

        let Some(expected) = http.content_length() else {
            let read = Self::read_into(http, buf)?;
            if read == capacity {
                let mut probe = [0u8; 1];
                let extra = http.read(&mut probe).map_err(UpdateError::Read)?;
                if extra > 0 {
                    return Err(UpdateError::Allocation {
                        required: capacity + extra,
                        capacity,
                    });
                }
            }
            return Ok(read);
        };

        let Some(window) = buf.get_mut(..expected) else {
            return Err(UpdateError::Allocation {
                required: expected,
                capacity,
            });
        };

        let read = Self::read_into(http, window)?;
        if read != expected {
            return Err(UpdateError::ReadShortfall { expected, read });
        }
        Ok(read)
    }

    fn read_into(http: &mut H, buf: &mut [u8]) -> UpdateResult<H, F, I, usize> {
        let mut filled = 0;
        while let Some(rest) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
            let n = http.read(rest).map_err(UpdateError::Read)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// Decide how to wait for the next request deadline
    pub fn decide(&self, now: Instant) -> ScheduleDecision {
        schedule(
            self.cache.next_request(),
            now,
            WakeSources::new(self.config.wake_pins),
        )
    }

    /// Carry out a [`ScheduleDecision`]
    ///
    /// For [`ScheduleDecision::SuspendUntil`] this only returns if the platform
    /// could not suspend, after waiting out the remaining time in place.
    pub fn apply(&mut self, decision: ScheduleDecision) {
        match decision {
            ScheduleDecision::Continue => {}
            ScheduleDecision::RetryAfterShortDelay(wait) => {
                self.platform.delay_ms(millis(wait));
            }
            ScheduleDecision::SuspendUntil { deadline, plan } => {
                self.suspend(deadline, plan.wake);
            }
        }
    }

    fn suspend(&mut self, deadline: Instant, wake: WakeSources) {
        self.store.commit(self.cache.token());

        if let Err(e) = self.platform.shutdown_link_for_suspend() {
            warn!("Could not stop the network link: {e:?}");
        }

        let duration = deadline.saturating_duration_since(self.platform.now());
        info!(
            "Going to deep sleep {}.{:03} seconds until next update",
            duration.as_secs(),
            duration.subsec_millis()
        );
        self.platform.suspend(&SuspendPlan { duration, wake });

        error!("This should not be reachable!");
        let remaining = deadline.saturating_duration_since(self.platform.now());
        self.platform.delay_ms(millis(remaining));
    }

    /// Cache state: held token and next request deadline
    pub fn cache(&self) -> &CacheValidator {
        &self.cache
    }

    /// The panel driver
    pub fn display(&self) -> &Display<I> {
        &self.display
    }

    /// The update configuration
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }
}
