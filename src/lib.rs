//! E-Paper Image Updater
//!
//! Firmware core for a battery-powered 640x384 tri-color e-paper frame that
//! polls a server for a new image, renders it and sleeps until the next
//! scheduled update.
//!
//! ## Features
//!
//! - `no_std` compatible
//! - `embedded-hal` v1.0 support
//! - Bit-banged panel protocol with bounded busy-wait
//! - Streaming pixel transcoding in fixed 64-byte bursts
//! - `ETag`/`Cache-Control` driven conditional fetch
//! - Validator token retained across low-power suspension
//! - `embedded-graphics` drawing onto frames (with `graphics` feature)
//!
//! Network transport, image decoding and the board's sleep controller are
//! supplied by the application through the [`HttpClient`], [`FrameDecoder`]
//! and [`Platform`] traits.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core::convert::Infallible;
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::{InputPin, OutputPin};
//! use epaper_updater::{BitBangInterface, Builder, Dimensions, Display, DisplayFrame};
//!
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
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let (cs, dc, rst, busy, clk, din) = (MockPin, MockPin, MockPin, MockPin, MockPin, MockPin);
//! # let mut delay = MockDelay;
//! let interface = BitBangInterface::new(cs, dc, rst, busy, clk, din);
//! let mut display = Display::new(interface, Builder::new().build());
//!
//! let pixels = [0x55u8; Dimensions::NATIVE.frame_size()];
//! let frame = match DisplayFrame::new(640, 384, &pixels[..]) {
//!     Ok(frame) => frame,
//!     Err(_) => return,
//! };
//!
//! let _ = display.initialize();
//! let _ = display.update(&frame, &mut delay);
//! ```

#![no_std]

#[cfg(test)]
extern crate alloc;

/// Cache validation of update responses
pub mod cache;
/// Monotonic time since boot
pub mod clock;
/// Color types for tri-color e-paper displays
pub mod color;
/// Panel command definitions
pub mod command;
/// Panel and updater configuration types and builders
pub mod config;
/// Image decoding collaborator
pub mod decode;
/// Core display operations
pub mod display;
/// Error types for the driver and the update loop
pub mod error;
/// Conditional fetch collaborator
pub mod http;
/// Hardware interface abstraction
pub mod interface;
/// Platform services for the update loop
pub mod power;
/// State retained across low-power suspension
pub mod retained;
/// Fetch, render and sleep loop
pub mod scheduler;
/// Pixel transcoding to the panel transfer format
pub mod transcode;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

pub use cache::{CacheState, CacheValidator, Classification, ValidatorToken};
pub use clock::{Clock, Instant};
pub use color::Color;
pub use config::{
    Builder, Config, DEFAULT_FALLBACK_INTERVAL, Dimensions, PANEL_HEIGHT, PANEL_WIDTH,
    UpdaterBuilder, UpdaterConfig,
};
pub use decode::{DecodedImage, FrameDecoder};
pub use display::{Display, PanelState};
pub use error::{BuilderError, Error, FrameError, UpdateError};
pub use http::{HttpClient, Request};
pub use interface::InterfaceError;
pub use interface::{BitBangInterface, BusyTimeout, DEFAULT_BUSY_TIMEOUT_MS, DisplayInterface};
pub use power::{Platform, SuspendPlan, WakeSources};
pub use retained::{RetainedState, StateStore};
pub use scheduler::{ScheduleDecision, SUSPEND_THRESHOLD, UpdateOutcome, UpdateScheduler};
pub use transcode::{CHUNK_SIZE, DisplayFrame, PixelTranscoder};
