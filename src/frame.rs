/*
 *  frame.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Three-row monitor page: network, SoC, clock
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

use crate::telemetry::TelemetrySample;

/// Top of the network row
pub const ROW_NETWORK_Y: i32 = 16;
/// Top of the temperature / frequency row
pub const ROW_CPU_Y: i32 = 26;
/// Top of the clock row
pub const ROW_CLOCK_Y: i32 = 36;
/// Column where the frequency reading starts
pub const FREQ_COLUMN_X: i32 = 72;

/// Which face a glyph run is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Label,
    Clock,
}

/// One positioned run of text; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub role: FontRole,
}

/// Ordered draw list for a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    glyphs: Vec<Glyph>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: i32, y: i32, text: impl Into<String>, role: FontRole) {
        self.glyphs.push(Glyph { x, y, text: text.into(), role });
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }
}

/// Placement knobs for the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    pub x_offset: i32,
}

/// Compose the monitor page from one telemetry sample.
pub fn build_frame(sample: &TelemetrySample, layout: &FrameLayout) -> Frame {
    let x = layout.x_offset;
    let mut frame = Frame::new();

    frame.push(
        x,
        ROW_NETWORK_Y,
        format!("{}:{}", sample.interface, sample.ip_address),
        FontRole::Label,
    );
    frame.push(
        x,
        ROW_CPU_Y,
        format!("soc:{:.1}°C", sample.temperature_c),
        FontRole::Label,
    );
    frame.push(
        FREQ_COLUMN_X.saturating_add(x),
        ROW_CPU_Y,
        format!("{:.0}MHz", sample.frequency_mhz),
        FontRole::Label,
    );
    frame.push(x, ROW_CLOCK_Y, sample.timestamp.clone(), FontRole::Clock);

    frame
}
