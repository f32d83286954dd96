/*
 *  display/drivers/ssd1306.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 128x64 panel on a Linux i2c-dev bus
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

use display_interface::{DataFormat, WriteOnlyDataCommand};
use linux_embedded_hal::I2cdev;
use ssd1306::{
    command::AddrMode,
    mode::BasicMode,
    prelude::*,
    size::DisplaySize128x64,
    I2CDisplayInterface,
    Ssd1306,
};

use embedded_graphics::pixelcolor::BinaryColor;

use crate::display::error::DisplayError;
use crate::display::traits::{DeviceOpener, DisplayDevice, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::vframebuf::VarFrameBuf;

use log::{debug, info};

type Panel<DI> = Ssd1306<DI, DisplaySize128x64, BasicMode>;

/// Opens SSD1306 panels on `/dev/i2c-<port>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ssd1306Opener;

impl DeviceOpener for Ssd1306Opener {
    type Device = Ssd1306Device;

    fn open(&mut self, port: u8, address: u8) -> Result<Ssd1306Device, DisplayError> {
        Ssd1306Device::new_i2c(&format!("/dev/i2c-{}", port), address)
    }
}

/// SSD1306 handle.
///
/// Drawing goes to a local framebuffer which is page-packed and written in
/// one horizontal-addressing burst on flush. The driver runs in basic mode so
/// the interface can be borrowed back for raw command bytes.
pub struct Ssd1306Device<DI = I2CInterface<I2cdev>> {
    /// `None` once closed
    panel: Option<Panel<DI>>,

    framebuffer: VarFrameBuf<BinaryColor>,

    /// Panel switched on
    visible: bool,

    bus: String,
}

impl Ssd1306Device<I2CInterface<I2cdev>> {
    /// Open the bus node and run the controller init sequence.
    ///
    /// # Arguments
    ///
    /// * `i2c_bus_path` - Path to I2C device (e.g., "/dev/i2c-6")
    /// * `address` - I2C address (typically 0x3C or 0x3D)
    pub fn new_i2c(i2c_bus_path: &str, address: u8) -> Result<Self, DisplayError> {
        info!("Initializing SSD1306 on {} at address 0x{:02X}", i2c_bus_path, address);

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::OpenFailed(format!("{}: {}", i2c_bus_path, e)))?;

        let device = Self::with_interface(
            I2CDisplayInterface::new_custom_address(i2c, address),
            i2c_bus_path,
        )?;
        info!("SSD1306 initialized successfully ({}x{})", DISPLAY_WIDTH, DISPLAY_HEIGHT);
        Ok(device)
    }
}

impl<DI: WriteOnlyDataCommand> Ssd1306Device<DI> {
    /// Initialize a panel behind any command/data interface.
    pub fn with_interface(interface: DI, bus: &str) -> Result<Self, DisplayError> {
        let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0);

        // init ends with display-on
        panel.init_with_addr_mode(AddrMode::Horizontal)?;

        Ok(Self {
            panel: Some(panel),
            framebuffer: VarFrameBuf::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, BinaryColor::Off),
            visible: true,
            bus: bus.to_string(),
        })
    }

    fn write_pages(&mut self) -> Result<(), DisplayError> {
        let pages = self.framebuffer.to_pages();
        let panel = self.panel.as_mut().ok_or(DisplayError::Closed)?;
        // A rebuilt wrapper believes it is in page mode and would skip the page
        // window, leaving the controller pointer wherever the last burst stopped.
        panel.set_addr_mode(AddrMode::Horizontal)?;
        panel.set_draw_area((0, 0), (DISPLAY_WIDTH as u8, DISPLAY_HEIGHT as u8))?;
        panel.draw(&pages)?;
        Ok(())
    }
}

impl<DI: WriteOnlyDataCommand + Send> DisplayDevice for Ssd1306Device<DI> {
    fn command(&mut self, byte: u8) -> Result<(), DisplayError> {
        let panel = self.panel.take().ok_or(DisplayError::Closed)?;
        let mut interface = panel.release();
        let sent = interface.send_commands(DataFormat::U8(&[byte]));
        // the controller keeps its state, only the driver wrapper is rebuilt
        self.panel = Some(Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0));
        sent?;
        debug!("{}: command 0x{:02X}", self.bus, byte);
        Ok(())
    }

    fn canvas(&mut self) -> &mut VarFrameBuf<BinaryColor> {
        &mut self.framebuffer
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.write_pages()?;
        if !self.visible {
            let panel = self.panel.as_mut().ok_or(DisplayError::Closed)?;
            panel.set_display_on(true)?;
            self.visible = true;
        }
        Ok(())
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        let panel = self.panel.as_mut().ok_or(DisplayError::Closed)?;
        panel.set_display_on(false)?;
        self.visible = false;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.framebuffer.clear_color(BinaryColor::Off);
        self.write_pages()
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        match self.panel.take() {
            Some(panel) => {
                // dropping the interface closes the i2c-dev file descriptor
                drop(panel.release());
                info!("Closed SSD1306 on {}", self.bus);
                Ok(())
            }
            None => Err(DisplayError::Closed),
        }
    }
}
