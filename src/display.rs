//! Core display operations
//!
//! [`Display`] sequences the panel through its power lifecycle:
//!
//! ```text
//! Uninitialized --initialize--> LinesReady --power_on--> PoweredOn
//!     --render--> Rendering --refresh--> Idle --shutdown--> PoweredOff
//! ```
//!
//! `power_on` and `shutdown` are accepted from any initialized state.
//! `power_on` always starts with a hardware reset, so a panel left mid-render
//! by a failed refresh and shutdown is recovered on the next attempt.
//! [`Display::update`] runs the whole sequence and always ends with
//! `shutdown`.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::command::{
    BOOSTER_SOFT_START, DATA_START_TRANSMISSION_1, DEEP_SLEEP, DEEP_SLEEP_CHECK_CODE,
    DISPLAY_REFRESH, FLASH_MODE, PANEL_SETTING, PLL_CONTROL, POWER_OFF, POWER_ON, POWER_SETTING,
    TCON_RESOLUTION, TCON_SETTING, TEMPERATURE_CALIBRATION, VCM_DC_SETTING,
    VCOM_AND_DATA_INTERVAL_SETTING,
};
use crate::config::{Config, Dimensions};
use crate::error::Error;
use crate::interface::DisplayInterface;
use crate::transcode::{DisplayFrame, PixelTranscoder};

type DisplayResult<I> = core::result::Result<(), Error<I>>;

/// Lifecycle state of the panel controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelState {
    /// Control lines not yet driven
    #[default]
    Uninitialized,
    /// Control lines at idle levels, controller not powered
    LinesReady,
    /// Controller configured and powered
    PoweredOn,
    /// Pixel data transfer started
    Rendering,
    /// Refresh finished, controller still powered
    Idle,
    /// Controller powered off and in deep sleep
    PoweredOff,
}

/// Driver for the 640x384 tri-color panel controller
///
/// Owns the [`DisplayInterface`] exclusively; every operation blocks until the
/// controller has accepted it.
pub struct Display<I>
where
    I: DisplayInterface,
{
    /// Hardware interface
    interface: I,
    /// Register values and settle delays
    config: Config,
    /// Current lifecycle state
    state: PanelState,
}

impl<I> Display<I>
where
    I: DisplayInterface,
{
    /// Create a new Display instance
    pub fn new(interface: I, config: Config) -> Self {
        Self {
            interface,
            config,
            state: PanelState::Uninitialized,
        }
    }

    /// Drive the control lines to their idle levels
    ///
    /// Does not power the controller.
    pub fn initialize(&mut self) -> DisplayResult<I> {
        self.interface.init_lines().map_err(Error::Interface)?;
        if self.state == PanelState::Uninitialized {
            self.state = PanelState::LinesReady;
        }
        debug!("Panel lines initialized");
        Ok(())
    }

    /// Reset the controller, replay the initialization script and power on
    ///
    /// Blocks until the controller reports ready after the power-on command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before [`initialize`](Self::initialize),
    /// or [`Error::Interface`] if a line or the busy-wait fails.
    pub fn power_on<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require("power on", self.state != PanelState::Uninitialized)?;

        self.interface.reset(delay);

        let c = self.config;
        self.send_command(POWER_SETTING, &c.power_setting)?;
        self.send_command(PANEL_SETTING, &c.panel_setting)?;
        self.send_command(BOOSTER_SOFT_START, &c.booster_soft_start)?;

        self.send_command(POWER_ON, &[])?;
        self.busy_wait(delay)?;

        self.send_command(PLL_CONTROL, &[c.pll])?;
        self.send_command(TEMPERATURE_CALIBRATION, &[c.temperature_calibration])?;
        self.send_command(VCOM_AND_DATA_INTERVAL_SETTING, &[c.vcom_data_interval])?;
        self.send_command(TCON_SETTING, &[c.tcon])?;
        self.send_command(TCON_RESOLUTION, &c.dimensions.resolution_payload())?;
        self.send_command(VCM_DC_SETTING, &[c.vcm_dc])?;
        self.send_command(FLASH_MODE, &[c.flash_mode])?;

        self.state = PanelState::PoweredOn;
        debug!("Panel powered on");
        Ok(())
    }

    /// Start a pixel data transmission
    ///
    /// After this, transfer bytes may be streamed with [`send_chunk`](Self::send_chunk).
    pub fn begin_transfer<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require(
            "begin transfer",
            matches!(self.state, PanelState::PoweredOn | PanelState::Idle),
        )?;
        self.send_command(DATA_START_TRANSMISSION_1, &[])?;
        delay.delay_ms(self.config.transfer_settle_ms);
        self.state = PanelState::Rendering;
        Ok(())
    }

    /// Stream one chunk of transfer bytes
    pub fn send_chunk(&mut self, chunk: &[u8]) -> DisplayResult<I> {
        self.require("send pixel data", self.state == PanelState::Rendering)?;
        self.interface.send_data(chunk).map_err(Error::Interface)
    }

    /// Begin a transfer and stream a whole frame through the transcoder
    pub fn render<B, D>(&mut self, frame: &DisplayFrame<B>, delay: &mut D) -> DisplayResult<I>
    where
        B: AsRef<[u8]>,
        D: DelayNs,
    {
        self.begin_transfer(delay)?;

        let interface = &mut self.interface;
        let sent = PixelTranscoder::new()
            .transcode(frame, |chunk| interface.send_data(chunk))
            .map_err(Error::Interface)?;

        debug!("Streamed {sent} bytes of pixel data");
        Ok(())
    }

    /// Show the transferred frame
    ///
    /// Blocks until the controller has finished the refresh.
    pub fn refresh<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require("refresh", self.state == PanelState::Rendering)?;
        self.send_command(DISPLAY_REFRESH, &[])?;
        delay.delay_ms(self.config.refresh_settle_ms);
        self.busy_wait(delay)?;
        self.state = PanelState::Idle;
        debug!("Panel refreshed");
        Ok(())
    }

    /// Power off the controller and put it into deep sleep
    ///
    /// Accepted from any initialized state.
    pub fn shutdown<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require("shut down", self.state != PanelState::Uninitialized)?;
        self.send_command(POWER_OFF, &[])?;
        self.busy_wait(delay)?;
        self.send_command(DEEP_SLEEP, &[DEEP_SLEEP_CHECK_CODE])?;
        self.state = PanelState::PoweredOff;
        debug!("Panel in deep sleep");
        Ok(())
    }

    /// Power on, render `frame`, refresh, then shut down
    ///
    /// Shutdown is issued even when an earlier step fails, so the panel is never
    /// left energized.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. A shutdown failure that follows a
    /// render failure is logged and the render failure is returned.
    pub fn update<B, D>(&mut self, frame: &DisplayFrame<B>, delay: &mut D) -> DisplayResult<I>
    where
        B: AsRef<[u8]>,
        D: DelayNs,
    {
        let drawn = self.draw(frame, delay);
        let shutdown = self.shutdown(delay);

        if let (Err(_), Err(e)) = (&drawn, &shutdown) {
            warn!("Panel shutdown after failed render also failed: {e}");
        }

        drawn.and(shutdown)
    }

    fn draw<B, D>(&mut self, frame: &DisplayFrame<B>, delay: &mut D) -> DisplayResult<I>
    where
        B: AsRef<[u8]>,
        D: DelayNs,
    {
        self.power_on(delay)?;
        self.render(frame, delay)?;
        self.refresh(delay)
    }

    fn require(&self, operation: &'static str, allowed: bool) -> DisplayResult<I> {
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Send a command to the display controller
    fn send_command(&mut self, cmd: u8, data: &[u8]) -> DisplayResult<I> {
        self.interface.send_command(cmd, data).map_err(Error::Interface)
    }

    fn busy_wait<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.interface.busy_wait(delay).map_err(Error::Interface)
    }

    /// Current lifecycle state
    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Get display dimensions
    pub fn dimensions(&self) -> &Dimensions {
        &self.config.dimensions
    }

    /// Access the underlying configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Access the hardware interface
    pub fn interface(&self) -> &I {
        &self.interface
    }

    /// Mutable access to the hardware interface
    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.interface
    }

    /// Consume the driver and return the hardware interface
    pub fn release(self) -> I {
        self.interface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::*;
    use crate::config::Builder;
    use alloc::vec;
    use alloc::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum MockError {
        NotReady,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Lines,
        Reset,
        Command(u8, Vec<u8>),
        Data(usize),
        BusyWait,
    }

    #[derive(Debug)]
    struct MockInterface {
        events: Vec<Event>,
        data: Vec<u8>,
        /// Busy-waits to fail, by 0-based index
        failing_busy_waits: Vec<usize>,
        busy_waits: usize,
    }

    impl MockInterface {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                data: Vec::new(),
                failing_busy_waits: Vec::new(),
                busy_waits: 0,
            }
        }

        fn commands(&self) -> Vec<u8> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Command(c, _) => Some(*c),
                    _ => None,
                })
                .collect()
        }

        fn command_data(&self, command: u8) -> Option<&[u8]> {
            self.events.iter().find_map(|e| match e {
                Event::Command(c, data) if *c == command => Some(data.as_slice()),
                _ => None,
            })
        }
    }

    impl DisplayInterface for MockInterface {
        type Error = MockError;

        fn init_lines(&mut self) -> Result<(), Self::Error> {
            self.events.push(Event::Lines);
            Ok(())
        }

        fn send_command(&mut self, command: u8, data: &[u8]) -> Result<(), Self::Error> {
            self.events.push(Event::Command(command, data.to_vec()));
            Ok(())
        }

        fn send_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.events.push(Event::Data(data.len()));
            self.data.extend_from_slice(data);
            Ok(())
        }

        fn reset<D: DelayNs>(&mut self, _delay: &mut D) {
            self.events.push(Event::Reset);
        }

        fn busy_wait<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), Self::Error> {
            let index = self.busy_waits;
            self.busy_waits += 1;
            self.events.push(Event::BusyWait);
            if self.failing_busy_waits.contains(&index) {
                Err(MockError::NotReady)
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct MockDelay {
        elapsed_ms: u32,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.elapsed_ms += ns / 1_000_000;
        }
    }

    fn test_display() -> Display<MockInterface> {
        let mut display = Display::new(MockInterface::new(), Builder::new().build());
        display.initialize().unwrap();
        display
    }

    fn white_frame() -> DisplayFrame<Vec<u8>> {
        DisplayFrame::new(640, 384, vec![0x55u8; Dimensions::NATIVE.frame_size()]).unwrap()
    }

    #[test]
    fn test_initialize_only_drives_lines() {
        let display = test_display();
        assert_eq!(display.state(), PanelState::LinesReady);
        assert_eq!(display.interface().events, vec![Event::Lines]);
    }

    #[test]
    fn test_power_on_replays_init_script() {
        let mut display = test_display();
        display.power_on(&mut MockDelay::default()).unwrap();

        let expected = vec![
            Event::Lines,
            Event::Reset,
            Event::Command(POWER_SETTING, vec![0x37, 0x00]),
            Event::Command(PANEL_SETTING, vec![0xCF, 0x08]),
            Event::Command(BOOSTER_SOFT_START, vec![0xC7, 0xCC, 0x28]),
            Event::Command(POWER_ON, vec![]),
            Event::BusyWait,
            Event::Command(PLL_CONTROL, vec![0x3C]),
            Event::Command(TEMPERATURE_CALIBRATION, vec![0x00]),
            Event::Command(VCOM_AND_DATA_INTERVAL_SETTING, vec![0x77]),
            Event::Command(TCON_SETTING, vec![0x22]),
            Event::Command(TCON_RESOLUTION, vec![0x02, 0x80, 0x01, 0x80]),
            Event::Command(VCM_DC_SETTING, vec![0x1E]),
            Event::Command(FLASH_MODE, vec![0x03]),
        ];
        assert_eq!(display.interface().events, expected);
        assert_eq!(display.state(), PanelState::PoweredOn);
    }

    #[test]
    fn test_power_on_uses_configured_registers() {
        let config = Builder::new().pll(0x29).vcm_dc(0x12).build();
        let mut display = Display::new(MockInterface::new(), config);
        display.initialize().unwrap();
        display.power_on(&mut MockDelay::default()).unwrap();

        assert_eq!(display.interface().command_data(PLL_CONTROL), Some(&[0x29][..]));
        assert_eq!(display.interface().command_data(VCM_DC_SETTING), Some(&[0x12][..]));
    }

    #[test]
    fn test_power_on_before_initialize_is_refused() {
        let mut display = Display::new(MockInterface::new(), Builder::new().build());
        let result = display.power_on(&mut MockDelay::default());
        assert!(matches!(
            result,
            Err(Error::InvalidState {
                state: PanelState::Uninitialized,
                ..
            })
        ));
        assert!(display.interface().events.is_empty());
    }

    #[test]
    fn test_power_on_timeout_keeps_state() {
        let mut display = test_display();
        display.interface.failing_busy_waits = vec![0];
        let result = display.power_on(&mut MockDelay::default());
        assert!(matches!(result, Err(Error::Interface(MockError::NotReady))));
        assert_eq!(display.state(), PanelState::LinesReady);
    }

    #[test]
    fn test_begin_transfer_waits_settle_delay() {
        let mut display = test_display();
        let mut delay = MockDelay::default();
        display.power_on(&mut delay).unwrap();

        let before = delay.elapsed_ms;
        display.begin_transfer(&mut delay).unwrap();
        assert_eq!(delay.elapsed_ms - before, 2);
        assert_eq!(display.state(), PanelState::Rendering);
    }

    #[test]
    fn test_send_chunk_requires_transfer() {
        let mut display = test_display();
        let result = display.send_chunk(&[0x33]);
        assert!(matches!(result, Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_render_streams_whole_frame_in_bursts() {
        let mut display = test_display();
        let mut delay = MockDelay::default();
        display.power_on(&mut delay).unwrap();
        display.render(&white_frame(), &mut delay).unwrap();

        let interface = display.interface();
        assert_eq!(interface.data.len(), 122_880);
        assert!(interface.data.iter().all(|&b| b == 0x33));
        assert!(interface.events.iter().all(|e| match e {
            Event::Data(len) => *len <= crate::transcode::CHUNK_SIZE,
            _ => true,
        }));

        let start = interface
            .events
            .iter()
            .position(|e| *e == Event::Command(DATA_START_TRANSMISSION_1, vec![]))
            .unwrap();
        assert!(matches!(interface.events[start + 1], Event::Data(_)));
    }

    #[test]
    fn test_refresh_requires_rendering() {
        let mut display = test_display();
        let mut delay = MockDelay::default();
        display.power_on(&mut delay).unwrap();
        let result = display.refresh(&mut delay);
        assert!(matches!(
            result,
            Err(Error::InvalidState {
                state: PanelState::PoweredOn,
                ..
            })
        ));
    }

    #[test]
    fn test_refresh_settles_then_waits() {
        let mut display = test_display();
        let mut delay = MockDelay::default();
        display.power_on(&mut delay).unwrap();
        display.begin_transfer(&mut delay).unwrap();

        let before = delay.elapsed_ms;
        display.refresh(&mut delay).unwrap();
        assert_eq!(delay.elapsed_ms - before, 100);
        assert_eq!(
            &display.interface().events[display.interface().events.len() - 2..],
            &[Event::Command(DISPLAY_REFRESH, vec![]), Event::BusyWait]
        );
        assert_eq!(display.state(), PanelState::Idle);
    }

    #[test]
    fn test_shutdown_sequence() {
        let mut display = test_display();
        display.shutdown(&mut MockDelay::default()).unwrap();

        assert_eq!(
            display.interface().events,
            vec![
                Event::Lines,
                Event::Command(POWER_OFF, vec![]),
                Event::BusyWait,
                Event::Command(DEEP_SLEEP, vec![0xA5]),
            ]
        );
        assert_eq!(display.state(), PanelState::PoweredOff);
    }

    #[test]
    fn test_update_full_sequence() {
        let mut display = test_display();
        display.update(&white_frame(), &mut MockDelay::default()).unwrap();

        let commands = display.interface().commands();
        assert_eq!(commands.first(), Some(&POWER_SETTING));
        assert_eq!(
            &commands[commands.len() - 4..],
            &[DATA_START_TRANSMISSION_1, DISPLAY_REFRESH, POWER_OFF, DEEP_SLEEP]
        );
        assert_eq!(display.state(), PanelState::PoweredOff);
    }

    #[test]
    fn test_update_can_repeat_after_shutdown() {
        let mut display = test_display();
        let mut delay = MockDelay::default();
        display.update(&white_frame(), &mut delay).unwrap();
        display.update(&white_frame(), &mut delay).unwrap();
        assert_eq!(display.interface().data.len(), 2 * 122_880);
    }

    #[test]
    fn test_update_shuts_down_after_failed_refresh() {
        let mut display = test_display();
        // 0: power on, 1: refresh
        display.interface.failing_busy_waits = vec![1];
        let result = display.update(&white_frame(), &mut MockDelay::default());

        assert!(matches!(result, Err(Error::Interface(MockError::NotReady))));
        let commands = display.interface().commands();
        assert_eq!(&commands[commands.len() - 2..], &[POWER_OFF, DEEP_SLEEP]);
        assert_eq!(display.state(), PanelState::PoweredOff);
    }

    #[test]
    fn test_update_shuts_down_after_failed_power_on() {
        let mut display = test_display();
        display.interface.failing_busy_waits = vec![0];
        let result = display.update(&white_frame(), &mut MockDelay::default());

        assert!(result.is_err());
        assert!(display.interface().data.is_empty());
        assert_eq!(display.interface().commands().last(), Some(&DEEP_SLEEP));
    }

    #[test]
    fn test_update_recovers_after_failed_refresh_and_shutdown() {
        let mut display = test_display();
        let mut delay = MockDelay::default();
        // 0: power on, 1: refresh, 2: power off
        display.interface.failing_busy_waits = vec![1, 2];
        assert!(display.update(&white_frame(), &mut delay).is_err());
        assert_eq!(display.state(), PanelState::Rendering);

        display.interface.failing_busy_waits.clear();
        display.update(&white_frame(), &mut delay).unwrap();

        let resets = display
            .interface()
            .events
            .iter()
            .filter(|e| **e == Event::Reset)
            .count();
        assert_eq!(resets, 2);
        assert_eq!(display.interface().data.len(), 2 * 122_880);
        assert_eq!(display.interface().commands().last(), Some(&DEEP_SLEEP));
        assert_eq!(display.state(), PanelState::PoweredOff);
    }

    #[test]
    fn test_power_on_mid_render_resets_panel() {
        let mut display = test_display();
        let mut delay = MockDelay::default();
        display.power_on(&mut delay).unwrap();
        display.begin_transfer(&mut delay).unwrap();

        display.power_on(&mut delay).unwrap();
        let events = &display.interface().events;
        let last_reset = events.iter().rposition(|e| *e == Event::Reset).unwrap();
        assert!(events[..last_reset].contains(&Event::Command(DATA_START_TRANSMISSION_1, vec![])));
        assert_eq!(display.state(), PanelState::PoweredOn);
    }
}
