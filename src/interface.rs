//! Hardware interface abstraction
//!
//! This module provides the [`DisplayInterface`] trait and the
//! [`BitBangInterface`] struct for talking to the panel controller.
//!
//! ## Hardware Requirements
//!
//! The panel has no SPI peripheral wiring; every byte is strobed out by hand on
//! six GPIO lines:
//! - **CS**: Chip select (output, active low)
//! - **DC**: Data/Command select (output, low=command, high=data)
//! - **RST**: Reset (output, active low)
//! - **BUSY**: Busy status (input, low while the controller is busy)
//! - **CLK**: Serial clock (output, idles low)
//! - **DIN**: Serial data (output)
//!
//! Bits are sent MSB first: DIN is set to the bit value, then CLK is pulsed
//! high and low. This strobe sequence is the bus protocol itself.
//!
//! ## Example
//!
//! ```rust,no_run
//! use embedded_hal::delay::DelayNs;
//! use epaper_updater::{BitBangInterface, BusyTimeout, DisplayInterface};
//! # use core::convert::Infallible;
//! # use embedded_hal::digital::{InputPin, OutputPin};
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
//! # let mut delay = MockDelay;
//! let mut interface = BitBangInterface::new(MockPin, MockPin, MockPin, MockPin, MockPin, MockPin);
//! interface.set_busy_timeout(BusyTimeout::Bounded(30_000));
//!
//! let _ = interface.init_lines();
//! let _ = interface.send_command(0x30, &[0x3C]);
//! let _ = interface.send_data(&[0x33, 0x40]);
//! let _ = interface.busy_wait(&mut delay);
//! ```

use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

type InterfaceResult<T, E> = core::result::Result<T, E>;

/// Trait for the hardware interface to the panel controller
///
/// This trait abstracts over different pin implementations, allowing the
/// [`Display`](crate::display::Display) to work with any GPIO set that
/// satisfies the embedded-hal traits, or with a recording mock in tests.
pub trait DisplayInterface {
    /// Error type for interface operations
    type Error: Debug;

    /// Drive the control lines to their idle levels
    ///
    /// CS high (deselected) and CLK low. Does not touch the controller itself.
    fn init_lines(&mut self) -> InterfaceResult<(), Self::Error>;

    /// Send a command byte with an optional payload in one CS frame
    ///
    /// The implementation must:
    /// 1. Assert CS and set DC low (command mode)
    /// 2. Send the command byte
    /// 3. If `data` is not empty, set DC high and send the payload
    /// 4. Deassert CS
    fn send_command(&mut self, command: u8, data: &[u8]) -> InterfaceResult<(), Self::Error>;

    /// Send a burst of data bytes in one CS frame with DC high
    fn send_data(&mut self, data: &[u8]) -> InterfaceResult<(), Self::Error>;

    /// Perform hardware reset
    ///
    /// Pulls RST low, waits, releases it and waits again so the controller can
    /// come out of deep sleep.
    fn reset<D: DelayNs>(&mut self, delay: &mut D);

    /// Block until the controller reports ready
    ///
    /// # Errors
    ///
    /// Returns an error if the busy line cannot be read or the configured
    /// [`BusyTimeout`] elapses first.
    fn busy_wait<D: DelayNs>(&mut self, delay: &mut D) -> InterfaceResult<(), Self::Error>;
}

/// Errors that can occur at the interface level
#[derive(Debug)]
pub enum InterfaceError<PinErr> {
    /// GPIO pin error
    Pin(PinErr),
    /// The controller never reported ready within the busy timeout
    NotReady {
        /// Time spent polling, in milliseconds
        waited_ms: u32,
    },
}

impl<PinErr: Debug> core::fmt::Display for InterfaceError<PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pin(e) => write!(f, "Pin error: {e:?}"),
            Self::NotReady { waited_ms } => {
                write!(f, "Panel not ready after {waited_ms}ms")
            }
        }
    }
}

impl<PinErr: Debug> core::error::Error for InterfaceError<PinErr> {}

/// Upper bound on a busy-wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusyTimeout {
    /// Poll until the controller reports ready, however long that takes
    Unbounded,
    /// Give up with [`InterfaceError::NotReady`] after this many milliseconds
    Bounded(u32),
}

impl Default for BusyTimeout {
    fn default() -> Self {
        Self::Bounded(DEFAULT_BUSY_TIMEOUT_MS)
    }
}

/// Default timeout for busy-wait in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 60_000;

/// Interval between busy line polls in milliseconds
pub const BUSY_POLL_INTERVAL_MS: u32 = 100;

/// Time RST is held low, and the settle time after release, in milliseconds
pub const RESET_SETTLE_MS: u32 = 200;

/// Bit-banged interface implementation
///
/// Implements [`DisplayInterface`] over six embedded-hal v1.0 GPIO lines.
///
/// ## Type Parameters
///
/// * `CS` - Chip select pin implementing [`OutputPin`]
/// * `DC` - Data/Command pin implementing [`OutputPin`]
/// * `RST` - Reset pin implementing [`OutputPin`]
/// * `BUSY` - Busy pin implementing [`InputPin`]
/// * `CLK` - Clock pin implementing [`OutputPin`]
/// * `DIN` - Data pin implementing [`OutputPin`]
pub struct BitBangInterface<CS, DC, RST, BUSY, CLK, DIN> {
    /// Chip select pin (active low)
    cs: CS,
    /// Data/Command select pin (low=command, high=data)
    dc: DC,
    /// Reset pin (active low)
    rst: RST,
    /// Busy pin
    busy: BUSY,
    /// Serial clock pin
    clk: CLK,
    /// Serial data pin
    din: DIN,
    /// Upper bound on busy-wait
    busy_timeout: BusyTimeout,
    /// Busy pin polarity (true = busy while high, false = busy while low)
    busy_active_high: bool,
}

impl<CS, DC, RST, BUSY, CLK, DIN> BitBangInterface<CS, DC, RST, BUSY, CLK, DIN>
where
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    CLK: OutputPin,
    DIN: OutputPin,
{
    /// Create a new interface from its six lines
    pub fn new(cs: CS, dc: DC, rst: RST, busy: BUSY, clk: CLK, din: DIN) -> Self {
        Self {
            cs,
            dc,
            rst,
            busy,
            clk,
            din,
            busy_timeout: BusyTimeout::default(),
            busy_active_high: false,
        }
    }

    /// Set the busy-wait timeout policy
    ///
    /// Default is [`BusyTimeout::Bounded`] with [`DEFAULT_BUSY_TIMEOUT_MS`].
    pub fn set_busy_timeout(&mut self, timeout: BusyTimeout) -> &mut Self {
        self.busy_timeout = timeout;
        self
    }

    /// Get the current busy-wait timeout policy
    pub fn busy_timeout(&self) -> BusyTimeout {
        self.busy_timeout
    }

    /// Set busy pin polarity
    ///
    /// Default is active-low (the controller pulls BUSY low while working).
    pub fn set_busy_active_high(&mut self, active_high: bool) -> &mut Self {
        self.busy_active_high = active_high;
        self
    }

    /// Get busy pin polarity (true = active high)
    pub fn busy_active_high(&self) -> bool {
        self.busy_active_high
    }

    /// Release the pins
    pub fn release(self) -> (CS, DC, RST, BUSY, CLK, DIN) {
        (self.cs, self.dc, self.rst, self.busy, self.clk, self.din)
    }
}

impl<CS, DC, RST, BUSY, CLK, DIN, PinErr> BitBangInterface<CS, DC, RST, BUSY, CLK, DIN>
where
    CS: OutputPin<Error = PinErr>,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    BUSY: InputPin<Error = PinErr>,
    CLK: OutputPin<Error = PinErr>,
    DIN: OutputPin<Error = PinErr>,
{
    /// Clock one byte out, MSB first
    fn write_byte(&mut self, byte: u8) -> InterfaceResult<(), InterfaceError<PinErr>> {
        for bit in 0..8 {
            let level = PinState::from((byte << bit) & 0x80 != 0);
            self.din.set_state(level).map_err(InterfaceError::Pin)?;
            self.clk.set_high().map_err(InterfaceError::Pin)?;
            self.clk.set_low().map_err(InterfaceError::Pin)?;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> InterfaceResult<(), InterfaceError<PinErr>> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Run `body` with CS asserted, deasserting CS even if `body` fails
    fn framed<F>(&mut self, body: F) -> InterfaceResult<(), InterfaceError<PinErr>>
    where
        F: FnOnce(&mut Self) -> InterfaceResult<(), InterfaceError<PinErr>>,
    {
        self.cs.set_low().map_err(InterfaceError::Pin)?;
        let result = body(self);
        let release = self.cs.set_high().map_err(InterfaceError::Pin);
        result.and(release)
    }
}

impl<CS, DC, RST, BUSY, CLK, DIN, PinErr> DisplayInterface
    for BitBangInterface<CS, DC, RST, BUSY, CLK, DIN>
where
    CS: OutputPin<Error = PinErr>,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    BUSY: InputPin<Error = PinErr>,
    CLK: OutputPin<Error = PinErr>,
    DIN: OutputPin<Error = PinErr>,
    PinErr: Debug,
{
    type Error = InterfaceError<PinErr>;

    fn init_lines(&mut self) -> InterfaceResult<(), Self::Error> {
        self.cs.set_high().map_err(InterfaceError::Pin)?;
        self.clk.set_low().map_err(InterfaceError::Pin)?;
        Ok(())
    }

    fn send_command(&mut self, command: u8, data: &[u8]) -> InterfaceResult<(), Self::Error> {
        self.framed(|this| {
            this.dc.set_low().map_err(InterfaceError::Pin)?;
            this.write_byte(command)?;
            if !data.is_empty() {
                this.dc.set_high().map_err(InterfaceError::Pin)?;
                this.write_bytes(data)?;
            }
            Ok(())
        })
    }

    fn send_data(&mut self, data: &[u8]) -> InterfaceResult<(), Self::Error> {
        self.framed(|this| {
            this.dc.set_high().map_err(InterfaceError::Pin)?;
            this.write_bytes(data)
        })
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) {
        let _ = self.rst.set_low();
        delay.delay_ms(RESET_SETTLE_MS);
        let _ = self.rst.set_high();
        delay.delay_ms(RESET_SETTLE_MS);
    }

    fn busy_wait<D: DelayNs>(&mut self, delay: &mut D) -> InterfaceResult<(), Self::Error> {
        let mut waited_ms = 0u32;

        loop {
            let is_busy = if self.busy_active_high {
                self.busy.is_high()
            } else {
                self.busy.is_low()
            };

            if !is_busy.map_err(InterfaceError::Pin)? {
                return Ok(());
            }

            if let BusyTimeout::Bounded(limit) = self.busy_timeout {
                if waited_ms >= limit {
                    return Err(InterfaceError::NotReady { waited_ms });
                }
            }

            delay.delay_ms(BUSY_POLL_INTERVAL_MS);
            waited_ms = waited_ms.saturating_add(BUSY_POLL_INTERVAL_MS);
        }
    }
}
