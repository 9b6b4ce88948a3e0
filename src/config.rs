//! Panel and updater configuration types and builders

use core::time::Duration;

use heapless::String;

use crate::command::{
    BOOSTER_SOFT_START_DEFAULT, FLASH_MODE_DEFAULT, PANEL_SETTING_DEFAULT, PLL_DEFAULT,
    POWER_SETTING_DEFAULT, TCON_DEFAULT, TEMPERATURE_CALIBRATION_DEFAULT,
    VCM_DC_DEFAULT, VCOM_AND_DATA_INTERVAL_DEFAULT,
};
pub use crate::error::BuilderError;
use crate::http::UPDATE_PATH;

/// Native panel width in pixels (source outputs)
pub const PANEL_WIDTH: u16 = 640;

/// Native panel height in pixels (gate outputs)
pub const PANEL_HEIGHT: u16 = 384;

/// Maximum length of the full update endpoint URL, including `get/`
pub const MAX_URL_LEN: usize = 128;

/// Maximum length of the device identity token
pub const MAX_DISPLAY_ID_LEN: usize = 64;

/// Default interval until the next request when the server gives no lifetime
pub const DEFAULT_FALLBACK_INTERVAL: Duration = Duration::from_secs(60);

/// Default external wake inputs (GPIO numbers)
pub const DEFAULT_WAKE_PINS: [u8; 2] = [2, 4];

/// Display dimensions
///
/// The panel has one fixed resolution; frames of any other size are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    /// Number of rows (height in pixels, corresponds to gate outputs)
    pub rows: u16,
    /// Number of columns (width in pixels, corresponds to source outputs)
    pub cols: u16,
}

impl Dimensions {
    /// The panel's native 640x384 resolution
    pub const NATIVE: Self = Self {
        rows: PANEL_HEIGHT,
        cols: PANEL_WIDTH,
    };

    /// Total number of pixels
    pub const fn pixel_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Size in bytes of a 2-bit indexed frame (4 pixels per byte)
    pub const fn frame_size(&self) -> usize {
        self.pixel_count() / 4
    }

    /// Size in bytes of the device transfer stream (2 pixels per byte)
    pub const fn transfer_size(&self) -> usize {
        self.pixel_count() / 2
    }

    /// Payload for the resolution command: width then height, MSB first
    pub const fn resolution_payload(&self) -> [u8; 4] {
        [
            (self.cols >> 8) as u8,
            (self.cols & 0xFF) as u8,
            (self.rows >> 8) as u8,
            (self.rows & 0xFF) as u8,
        ]
    }

    /// Whether a `width` x `height` image matches these dimensions exactly
    pub const fn matches(&self, width: u32, height: u32) -> bool {
        width == self.cols as u32 && height == self.rows as u32
    }
}

/// Panel configuration
///
/// Holds the register payloads replayed on every power-on and the fixed
/// settle delays around data transfer and refresh. Use [`Builder`] to create one;
/// the defaults reproduce the panel's initialization script byte for byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Display dimensions
    pub dimensions: Dimensions,
    /// Power setting payload (command 0x01)
    pub power_setting: [u8; 2],
    /// Panel setting payload (command 0x00)
    pub panel_setting: [u8; 2],
    /// Booster soft-start payload (command 0x06)
    pub booster_soft_start: [u8; 3],
    /// PLL control (command 0x30)
    pub pll: u8,
    /// Temperature calibration (command 0x41)
    pub temperature_calibration: u8,
    /// VCOM and data interval (command 0x50)
    pub vcom_data_interval: u8,
    /// TCON setting (command 0x60)
    pub tcon: u8,
    /// VCM DC setting (command 0x82)
    pub vcm_dc: u8,
    /// Flash mode (command 0xE5)
    pub flash_mode: u8,
    /// Delay after starting data transmission, in milliseconds
    pub transfer_settle_ms: u32,
    /// Delay between issuing refresh and polling busy, in milliseconds
    pub refresh_settle_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Builder::new().build()
    }
}

/// Builder for constructing panel configuration
///
/// # Example
///
/// ```rust
/// use epaper_updater::{Builder, Dimensions};
///
/// let config = Builder::new().vcm_dc(0x1E).build();
/// assert_eq!(config.dimensions, Dimensions::NATIVE);
/// ```
#[must_use]
pub struct Builder {
    power_setting: [u8; 2],
    panel_setting: [u8; 2],
    booster_soft_start: [u8; 3],
    pll: u8,
    temperature_calibration: u8,
    vcom_data_interval: u8,
    tcon: u8,
    vcm_dc: u8,
    flash_mode: u8,
    transfer_settle_ms: u32,
    refresh_settle_ms: u32,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            power_setting: POWER_SETTING_DEFAULT,
            panel_setting: PANEL_SETTING_DEFAULT,
            booster_soft_start: BOOSTER_SOFT_START_DEFAULT,
            pll: PLL_DEFAULT,
            temperature_calibration: TEMPERATURE_CALIBRATION_DEFAULT,
            vcom_data_interval: VCOM_AND_DATA_INTERVAL_DEFAULT,
            tcon: TCON_DEFAULT,
            vcm_dc: VCM_DC_DEFAULT,
            flash_mode: FLASH_MODE_DEFAULT,
            transfer_settle_ms: 2,
            refresh_settle_ms: 100,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set power setting payload
    pub fn power_setting(mut self, values: [u8; 2]) -> Self {
        self.power_setting = values;
        self
    }

    /// Set panel setting payload
    pub fn panel_setting(mut self, values: [u8; 2]) -> Self {
        self.panel_setting = values;
        self
    }

    /// Set booster soft-start payload
    pub fn booster_soft_start(mut self, values: [u8; 3]) -> Self {
        self.booster_soft_start = values;
        self
    }

    /// Set PLL control value
    pub fn pll(mut self, value: u8) -> Self {
        self.pll = value;
        self
    }

    /// Set temperature calibration value
    pub fn temperature_calibration(mut self, value: u8) -> Self {
        self.temperature_calibration = value;
        self
    }

    /// Set VCOM and data interval value
    pub fn vcom_data_interval(mut self, value: u8) -> Self {
        self.vcom_data_interval = value;
        self
    }

    /// Set TCON value
    pub fn tcon(mut self, value: u8) -> Self {
        self.tcon = value;
        self
    }

    /// Set VCM DC value
    pub fn vcm_dc(mut self, value: u8) -> Self {
        self.vcm_dc = value;
        self
    }

    /// Set flash mode value
    pub fn flash_mode(mut self, value: u8) -> Self {
        self.flash_mode = value;
        self
    }

    /// Set the delay after starting data transmission
    pub fn transfer_settle_ms(mut self, value: u32) -> Self {
        self.transfer_settle_ms = value;
        self
    }

    /// Set the delay between refresh and the first busy poll
    pub fn refresh_settle_ms(mut self, value: u32) -> Self {
        self.refresh_settle_ms = value;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        Config {
            dimensions: Dimensions::NATIVE,
            power_setting: self.power_setting,
            panel_setting: self.panel_setting,
            booster_soft_start: self.booster_soft_start,
            pll: self.pll,
            temperature_calibration: self.temperature_calibration,
            vcom_data_interval: self.vcom_data_interval,
            tcon: self.tcon,
            vcm_dc: self.vcm_dc,
            flash_mode: self.flash_mode,
            transfer_settle_ms: self.transfer_settle_ms,
            refresh_settle_ms: self.refresh_settle_ms,
        }
    }
}

/// Update loop configuration
///
/// Use [`UpdaterBuilder`] to create one.
#[derive(Clone, Debug)]
pub struct UpdaterConfig {
    endpoint: String<MAX_URL_LEN>,
    display_id: String<MAX_DISPLAY_ID_LEN>,
    /// Interval until the next request after an error or without a server lifetime
    pub fallback_interval: Duration,
    /// External wake inputs that end suspension early
    pub wake_pins: [u8; 2],
}

impl UpdaterConfig {
    /// Full update endpoint, base URL followed by `get/`
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Device identity token sent with every request
    pub fn display_id(&self) -> &str {
        &self.display_id
    }
}

/// Builder for [`UpdaterConfig`]
///
/// # Example
///
/// ```rust
/// use epaper_updater::UpdaterBuilder;
///
/// let config = match UpdaterBuilder::new()
///     .server_url("http://192.168.100.1:8080/")
///     .display_id("kitchen")
///     .build()
/// {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// assert_eq!(config.endpoint(), "http://192.168.100.1:8080/get/");
/// ```
#[must_use]
#[derive(Default)]
pub struct UpdaterBuilder<'a> {
    server_url: Option<&'a str>,
    display_id: Option<&'a str>,
    fallback_interval: Option<Duration>,
    wake_pins: Option<[u8; 2]>,
}

impl<'a> UpdaterBuilder<'a> {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server base URL (required); `get/` is appended to it
    pub fn server_url(mut self, url: &'a str) -> Self {
        self.server_url = Some(url);
        self
    }

    /// Set the device identity token (required)
    pub fn display_id(mut self, id: &'a str) -> Self {
        self.display_id = Some(id);
        self
    }

    /// Set the fallback interval (default 60 seconds)
    pub fn fallback_interval(mut self, interval: Duration) -> Self {
        self.fallback_interval = Some(interval);
        self
    }

    /// Set the two external wake inputs (default GPIO 2 and 4)
    pub fn wake_pins(mut self, pins: [u8; 2]) -> Self {
        self.wake_pins = Some(pins);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns a [`BuilderError`] if a required field is missing, a value does
    /// not fit its bounded storage, or the fallback interval is zero.
    pub fn build(self) -> Result<UpdaterConfig, BuilderError> {
        let server_url = self.server_url.ok_or(BuilderError::MissingServerUrl)?;
        let display_id = self.display_id.ok_or(BuilderError::MissingDisplayId)?;

        let mut endpoint = String::new();
        endpoint
            .push_str(server_url)
            .and_then(|()| endpoint.push_str(UPDATE_PATH))
            .map_err(|()| BuilderError::UrlTooLong {
                max: MAX_URL_LEN,
            })?;

        let mut id = String::new();
        id.push_str(display_id)
            .map_err(|()| BuilderError::DisplayIdTooLong {
                max: MAX_DISPLAY_ID_LEN,
            })?;

        let fallback_interval = self.fallback_interval.unwrap_or(DEFAULT_FALLBACK_INTERVAL);
        if fallback_interval.is_zero() {
            return Err(BuilderError::ZeroFallbackInterval);
        }

        Ok(UpdaterConfig {
            endpoint,
            display_id: id,
            fallback_interval,
            wake_pins: self.wake_pins.unwrap_or(DEFAULT_WAKE_PINS),
        })
    }
}
