//! Panel command definitions
//!
//! This module defines the opcodes and fixed payloads used to drive the
//! 640x384 tri-color panel controller. Commands are clocked out with the DC
//! line low, their payload (if any) with DC high, all inside one CS frame.
//!
//! ## Command Structure
//!
//! 1. Assert CS (Chip Select, active low)
//! 2. Set DC low (command mode)
//! 3. Clock out the opcode, MSB first
//! 4. Set DC high (data mode), only when a payload follows
//! 5. Clock out the payload bytes
//! 6. Deassert CS
//!
//! ## Example
//!
//! ```rust,no_run
//! use epaper_updater::{command, BitBangInterface, DisplayInterface};
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
//! # let mut interface = BitBangInterface::new(MockPin, MockPin, MockPin, MockPin, MockPin, MockPin);
//! let _ = interface.send_command(command::PLL_CONTROL, &[command::PLL_DEFAULT]);
//! let _ = interface.send_command(command::DISPLAY_REFRESH, &[]);
//! ```

// Power and panel setup

/// Panel setting command (0x00)
///
/// Requires 2 bytes: resolution/LUT source selection and VCOM behavior.
pub const PANEL_SETTING: u8 = 0x00;

/// Power setting command (0x01)
///
/// Requires 2 bytes: internal DC/DC and gate/source voltage selection.
pub const POWER_SETTING: u8 = 0x01;

/// Power off command (0x02)
///
/// Turns off the booster and gate/source drivers. Wait for ready afterwards.
pub const POWER_OFF: u8 = 0x02;

/// Power on command (0x04)
///
/// Turns on the booster. The panel reports busy until the supplies are stable.
pub const POWER_ON: u8 = 0x04;

/// Booster soft-start command (0x06)
///
/// Requires 3 bytes: soft-start timing for phases A, B and C.
pub const BOOSTER_SOFT_START: u8 = 0x06;

/// Deep sleep command (0x07)
///
/// Requires the [`DEEP_SLEEP_CHECK_CODE`] payload. Only a hardware reset wakes
/// the controller again.
pub const DEEP_SLEEP: u8 = 0x07;

/// Check code that must follow [`DEEP_SLEEP`]
pub const DEEP_SLEEP_CHECK_CODE: u8 = 0xA5;

// Pixel data and refresh

/// Data start transmission command (0x10)
///
/// Followed by `width * height / 2` bytes, two 4-bit pixel codes per byte.
pub const DATA_START_TRANSMISSION_1: u8 = 0x10;

/// Display refresh command (0x12)
///
/// Drives the panel from the frame RAM. Busy for the whole waveform.
pub const DISPLAY_REFRESH: u8 = 0x12;

// Timing and analog configuration

/// PLL control command (0x30)
///
/// Requires 1 byte selecting the frame rate.
pub const PLL_CONTROL: u8 = 0x30;

/// Temperature calibration command (0x41)
///
/// Requires 1 byte: 0x00 selects the internal sensor.
pub const TEMPERATURE_CALIBRATION: u8 = 0x41;

/// VCOM and data interval setting command (0x50)
///
/// Requires 1 byte: border output and data polarity.
pub const VCOM_AND_DATA_INTERVAL_SETTING: u8 = 0x50;

/// TCON setting command (0x60)
///
/// Requires 1 byte: source/gate non-overlap periods.
pub const TCON_SETTING: u8 = 0x60;

/// Resolution setting command (0x61)
///
/// Requires 4 bytes: [width MSB, width LSB, height MSB, height LSB]
pub const TCON_RESOLUTION: u8 = 0x61;

/// VCM DC setting command (0x82)
///
/// Requires 1 byte. The value depends on the panel LUT.
pub const VCM_DC_SETTING: u8 = 0x82;

/// Flash mode command (0xE5)
///
/// Requires 1 byte.
pub const FLASH_MODE: u8 = 0xE5;

// Default payloads for the 640x384 tri-color panel

/// Default [`POWER_SETTING`] payload
pub const POWER_SETTING_DEFAULT: [u8; 2] = [0x37, 0x00];

/// Default [`PANEL_SETTING`] payload
pub const PANEL_SETTING_DEFAULT: [u8; 2] = [0xCF, 0x08];

/// Default [`BOOSTER_SOFT_START`] payload
pub const BOOSTER_SOFT_START_DEFAULT: [u8; 3] = [0xC7, 0xCC, 0x28];

/// Default [`PLL_CONTROL`] payload
pub const PLL_DEFAULT: u8 = 0x3C;

/// Default [`TEMPERATURE_CALIBRATION`] payload
pub const TEMPERATURE_CALIBRATION_DEFAULT: u8 = 0x00;

/// Default [`VCOM_AND_DATA_INTERVAL_SETTING`] payload
pub const VCOM_AND_DATA_INTERVAL_DEFAULT: u8 = 0x77;

/// Default [`TCON_SETTING`] payload
pub const TCON_DEFAULT: u8 = 0x22;

/// Default [`VCM_DC_SETTING`] payload
pub const VCM_DC_DEFAULT: u8 = 0x1E;

/// Default [`FLASH_MODE`] payload
pub const FLASH_MODE_DEFAULT: u8 = 0x03;
