/*
 *  display/error.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the display subsystem
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

use std::fmt;
use std::error::Error;

/// Error raised by a display device. The lifecycle manager logs and absorbs
/// these; they never cross its public surface.
#[derive(Debug)]
pub enum DisplayError {
    /// Bus device could not be opened
    OpenFailed(String),

    /// I2C communication error
    I2cError(String),

    /// Display interface (command/data write) error
    InterfaceError(display_interface::DisplayError),

    /// Operation attempted on a handle that was already closed
    Closed,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::OpenFailed(msg) =>
                write!(f, "Display open failed: {}", msg),
            DisplayError::I2cError(msg) =>
                write!(f, "I2C communication error: {}", msg),
            DisplayError::InterfaceError(err) =>
                write!(f, "Display interface error: {:?}", err),
            DisplayError::Closed =>
                write!(f, "Display handle already closed"),
        }
    }
}

impl Error for DisplayError {
    // display_interface::DisplayError doesn't implement std::error::Error
    // so we can't provide it as a source
}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(err: display_interface::DisplayError) -> Self {
        DisplayError::InterfaceError(err)
    }
}

impl From<linux_embedded_hal::I2CError> for DisplayError {
    fn from(err: linux_embedded_hal::I2CError) -> Self {
        DisplayError::I2cError(format!("{:?}", err))
    }
}
