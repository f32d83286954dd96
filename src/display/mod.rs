/*
 *  display/mod.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem: device traits, drivers, drawing and lifecycle
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

// Core trait definitions
pub mod traits;
pub mod error;

// Display drivers (real panels are feature gated)
pub mod drivers;

// Scoped drawing onto a device canvas
pub mod canvas;

// Panel lifecycle
pub mod manager;

// Re-exports for convenience
pub use traits::{DeviceOpener, DisplayDevice, DISPLAY_HEIGHT, DISPLAY_WIDTH};
pub use error::DisplayError;
pub use canvas::{draw_frame, DrawSession, FontSet};
pub use manager::DisplayManager;

#[cfg(feature = "driver-ssd1306")]
pub use drivers::ssd1306::{Ssd1306Device, Ssd1306Opener};
