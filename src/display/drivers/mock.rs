/*
 *  display/drivers/mock.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock panel for testing without hardware
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

use embedded_graphics::pixelcolor::BinaryColor;

use crate::display::error::DisplayError;
use crate::display::traits::{DeviceOpener, DisplayDevice, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::vframebuf::VarFrameBuf;

use std::sync::{Arc, Mutex};

/// Everything the mock saw, shared between the opener, its devices and the test.
#[derive(Debug, Default)]
pub struct MockState {
    /// Successful opens
    pub opens: usize,
    /// Last (port, address) asked for
    pub last_open: Option<(u8, u8)>,
    /// Raw command bytes in send order, across every handle
    pub commands: Vec<u8>,
    pub flush_attempts: usize,
    pub flushes: usize,
    pub hides: usize,
    pub clears: usize,
    pub closes: usize,
    /// Lit pixels in the most recent successful flush
    pub last_lit: usize,
    /// Whether the panel is currently switched on
    pub visible: bool,

    /// Failure injection
    pub fail_open: bool,
    pub fail_commands: bool,
    pub flush_failures: usize,
}

impl MockState {
    /// Handles opened and not yet closed
    pub fn live_handles(&self) -> usize {
        self.opens - self.closes
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockOpener {
    state: Arc<Mutex<MockState>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }
}

impl DeviceOpener for MockOpener {
    type Device = MockDevice;

    fn open(&mut self, port: u8, address: u8) -> Result<MockDevice, DisplayError> {
        let mut state = self.state.lock().unwrap();
        state.last_open = Some((port, address));
        if state.fail_open {
            return Err(DisplayError::OpenFailed(format!("/dev/i2c-{}: simulated", port)));
        }
        state.opens += 1;
        Ok(MockDevice {
            framebuffer: VarFrameBuf::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, BinaryColor::Off),
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct MockDevice {
    framebuffer: VarFrameBuf<BinaryColor>,
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockDevice {
    fn live(&self) -> Result<std::sync::MutexGuard<'_, MockState>, DisplayError> {
        if self.closed {
            return Err(DisplayError::Closed);
        }
        Ok(self.state.lock().unwrap())
    }
}

impl DisplayDevice for MockDevice {
    fn command(&mut self, byte: u8) -> Result<(), DisplayError> {
        let mut state = self.live()?;
        if state.fail_commands {
            return Err(DisplayError::I2cError("simulated NACK".into()));
        }
        state.commands.push(byte);
        Ok(())
    }

    fn canvas(&mut self) -> &mut VarFrameBuf<BinaryColor> {
        &mut self.framebuffer
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let lit = self.framebuffer.lit_pixels();
        let mut state = self.live()?;
        state.flush_attempts += 1;
        if state.flush_failures > 0 {
            state.flush_failures -= 1;
            return Err(DisplayError::I2cError("simulated bus timeout".into()));
        }
        state.flushes += 1;
        state.last_lit = lit;
        state.visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        let mut state = self.live()?;
        state.hides += 1;
        state.visible = false;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.framebuffer.clear_color(BinaryColor::Off);
        let mut state = self.live()?;
        state.clears += 1;
        state.last_lit = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        let mut state = self.live()?;
        state.closes += 1;
        drop(state);
        self.closed = true;
        Ok(())
    }
}
