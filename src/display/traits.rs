/*
 *  display/traits.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Device abstraction consumed by the lifecycle manager
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
use crate::vframebuf::VarFrameBuf;

/// Panel width in pixels
pub const DISPLAY_WIDTH: u32 = 128;

/// Panel height in pixels
pub const DISPLAY_HEIGHT: u32 = 64;

/// Segment remap, column 0 mapped to SEG0
pub const CMD_SEGMENT_REMAP_NORMAL: u8 = 0xA0;
/// Segment remap, column 127 mapped to SEG0 (horizontal mirror)
pub const CMD_SEGMENT_REMAP_MIRRORED: u8 = 0xA1;
/// COM scan COM0 -> COM[N-1]
pub const CMD_COM_SCAN_NORMAL: u8 = 0xC0;
/// COM scan COM[N-1] -> COM0 (vertical mirror)
pub const CMD_COM_SCAN_REMAPPED: u8 = 0xC8;
/// Display offset, followed by one byte of vertical shift
pub const CMD_SET_DISPLAY_OFFSET: u8 = 0xD3;

/// An open, exclusively owned connection to one monochrome panel.
///
/// Drawing happens against `canvas()`; nothing reaches the glass until
/// `flush()`. Use [`crate::display::canvas::DrawSession`] rather than
/// touching the canvas directly so the flush is never skipped.
pub trait DisplayDevice: Send {
    /// Send a single raw control byte
    fn command(&mut self, byte: u8) -> Result<(), DisplayError>;

    /// Off-screen drawing surface
    fn canvas(&mut self) -> &mut VarFrameBuf<BinaryColor>;

    /// Push the canvas to the panel and make sure the panel is on
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Switch the panel off without touching its RAM
    fn hide(&mut self) -> Result<(), DisplayError>;

    /// Blank the canvas and the panel RAM
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Release the bus. Any later call returns `DisplayError::Closed`.
    fn close(&mut self) -> Result<(), DisplayError>;
}

/// Opens devices on a bus. Each successful call yields a brand new handle.
pub trait DeviceOpener {
    type Device: DisplayDevice;

    fn open(&mut self, port: u8, address: u8) -> Result<Self::Device, DisplayError>;
}
