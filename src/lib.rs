/*
 *  lib.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
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

//! Small-panel system monitor: network address, SoC temperature and clock
//! speed, and the local time on a 128x64 SSD1306, refreshed on a fixed
//! period and kept alive through bus faults.

pub mod config;
pub mod display;
pub mod frame;
pub mod supervisor;
pub mod telemetry;
pub mod vframebuf;
