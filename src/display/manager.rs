/*
 *  display/manager.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display lifecycle manager - owns the panel handle, (re)initializes it
 *  and absorbs device errors
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::config::DisplayConfig;
use crate::display::canvas::{draw_frame, FontSet};
use crate::display::error::DisplayError;
use crate::display::traits::{
    DeviceOpener,
    DisplayDevice,
    CMD_COM_SCAN_NORMAL,
    CMD_COM_SCAN_REMAPPED,
    CMD_SEGMENT_REMAP_MIRRORED,
    CMD_SEGMENT_REMAP_NORMAL,
    CMD_SET_DISPLAY_OFFSET,
};
use crate::frame::Frame;

use log::{debug, error, info, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Pause between retiring a handle and opening its replacement
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Owns at most one live panel handle.
///
/// Every public operation reports a plain `bool`; device errors are logged
/// where they happen and never escape. A new handle is opened and fully
/// configured as a local value before it replaces the old one, so a
/// half-configured panel is never installed.
pub struct DisplayManager<O: DeviceOpener> {
    opener: O,
    config: DisplayConfig,
    fonts: FontSet,
    device: Option<O::Device>,
    last_reset: Instant,
    settle_delay: Duration,
    recoveries: u64,
}

impl<O: DeviceOpener> DisplayManager<O> {
    pub fn new(opener: O, config: DisplayConfig, fonts: FontSet) -> Self {
        info!(
            "DisplayManager: {}x{} on {} @ 0x{:02X}",
            config.width, config.height, config.bus_path(), config.i2c_address
        );
        Self {
            opener,
            config,
            fonts,
            device: None,
            last_reset: Instant::now(),
            settle_delay: SETTLE_DELAY,
            recoveries: 0,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// A live handle is installed
    pub fn is_ready(&self) -> bool {
        self.device.is_some()
    }

    pub fn last_reset(&self) -> Instant {
        self.last_reset
    }

    /// Recovery actions taken after draw failures
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    /// (Re)initialize the panel. Any existing handle is retired first.
    pub fn init_display(&mut self) -> bool {
        self.init_display_at(Instant::now())
    }

    fn init_display_at(&mut self, now: Instant) -> bool {
        if let Some(old) = self.device.take() {
            Self::retire(old);
            if !self.settle_delay.is_zero() {
                thread::sleep(self.settle_delay);
            }
        }

        match self.open_configured() {
            Ok(device) => {
                self.device = Some(device);
                self.last_reset = now;
                info!(
                    "Display initialized (I2C-{} @ 0x{:02X})",
                    self.config.i2c_port, self.config.i2c_address
                );
                info!(
                    "Display settings: hmirror={}, vmirror={}, x_offset={}, y_offset={}",
                    self.config.horizontal_mirror as u8,
                    self.config.vertical_mirror as u8,
                    self.config.x_offset,
                    self.config.y_offset
                );
                true
            }
            Err(e) => {
                error!("Display initialization failed: {}", e);
                false
            }
        }
    }

    fn open_configured(&mut self) -> Result<O::Device, DisplayError> {
        let mut device = self.opener.open(self.config.i2c_port, self.config.i2c_address)?;
        if let Err(e) = self.configure(&mut device) {
            if let Err(close_err) = device.close() {
                debug!("Closing half-configured display: {}", close_err);
            }
            return Err(e);
        }
        Ok(device)
    }

    fn configure(&self, device: &mut O::Device) -> Result<(), DisplayError> {
        let segment = if self.config.horizontal_mirror {
            CMD_SEGMENT_REMAP_MIRRORED
        } else {
            CMD_SEGMENT_REMAP_NORMAL
        };
        let com_scan = if self.config.vertical_mirror {
            CMD_COM_SCAN_REMAPPED
        } else {
            CMD_COM_SCAN_NORMAL
        };
        device.command(segment)?;
        device.command(com_scan)?;
        device.command(CMD_SET_DISPLAY_OFFSET)?;
        device.command(self.config.display_offset())?;
        Ok(())
    }

    /// Best-effort blank and close of a handle that is going away.
    fn retire(mut device: O::Device) {
        Self::blank(&mut device);
        if let Err(e) = device.close() {
            warn!("Error closing display: {}", e);
        }
    }

    fn blank(device: &mut O::Device) {
        match device.hide().and_then(|_| device.clear()) {
            Ok(()) => info!("Screen cleared"),
            Err(e) => error!("Failed to clear screen: {}", e),
        }
    }

    /// Hide and blank the panel, keeping the handle.
    pub fn clear(&mut self) -> bool {
        match self.device.as_mut() {
            Some(device) => {
                Self::blank(device);
                true
            }
            None => false,
        }
    }

    /// Periodic health check: reinitialize once the reset interval has passed.
    pub fn check_and_reset(&mut self) -> bool {
        self.check_and_reset_at(Instant::now())
    }

    pub fn check_and_reset_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_reset) > self.config.reset_interval() {
            info!("Periodic display reset");
            return self.init_display_at(now);
        }
        true
    }

    /// Draw one frame. Returns false when nothing reached the panel.
    pub fn display_frame(&mut self, frame: &Frame) -> bool {
        let ready = self.device.is_some() && self.check_and_reset();
        if !ready {
            error!("Display unavailable, reinitializing");
            if !self.init_display() {
                return false;
            }
        }

        let Some(device) = self.device.as_mut() else {
            return false;
        };
        match draw_frame(device, frame, &self.fonts) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to display frame: {}", e);
                self.recover();
                false
            }
        }
    }

    /// One explicit recovery attempt after a failed draw.
    pub fn recover(&mut self) -> bool {
        self.recoveries += 1;
        warn!("Display recovery #{}", self.recoveries);
        self.init_display()
    }

    /// Blank and release the panel. Safe to call any number of times.
    pub fn shutdown(&mut self) -> bool {
        match self.device.take() {
            Some(device) => {
                Self::retire(device);
                info!("Display released");
            }
            None => debug!("Display already released"),
        }
        true
    }
}
