/*
 *  display/canvas.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Scoped draw sessions and frame rendering
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

use core::convert::Infallible;

use embedded_graphics::{
    mono_font::{iso_8859_1, MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use log::warn;

use crate::display::error::DisplayError;
use crate::display::traits::DisplayDevice;
use crate::frame::{FontRole, Frame};

/// Faces used per glyph role. Latin-1 so the degree sign renders.
#[derive(Clone, Copy)]
pub struct FontSet {
    pub label: &'static MonoFont<'static>,
    pub clock: &'static MonoFont<'static>,
}

impl FontSet {
    /// Pick the closest built-in face for a requested pixel height.
    pub fn for_size(size: u32) -> Self {
        let face = match size {
            0..=7 => &iso_8859_1::FONT_5X7,
            8 => &iso_8859_1::FONT_5X8,
            9 => &iso_8859_1::FONT_6X9,
            10 => &iso_8859_1::FONT_6X10,
            11..=12 => &iso_8859_1::FONT_6X12,
            13 => &iso_8859_1::FONT_6X13,
            14 => &iso_8859_1::FONT_7X14,
            15..=17 => &iso_8859_1::FONT_9X15,
            18..=19 => &iso_8859_1::FONT_9X18,
            _ => &iso_8859_1::FONT_10X20,
        };
        Self { label: face, clock: face }
    }

    pub fn face(&self, role: FontRole) -> &'static MonoFont<'static> {
        match role {
            FontRole::Label => self.label,
            FontRole::Clock => self.clock,
        }
    }
}

impl core::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FontSet")
            .field("label", &self.label.character_size)
            .field("clock", &self.clock.character_size)
            .finish()
    }
}

/// A blank canvas that is always pushed to the panel.
///
/// `begin` clears the canvas. `finish` flushes and reports the result; a
/// session dropped early (an error or a panic mid-draw) still flushes on
/// a best-effort basis.
pub struct DrawSession<'a, D: DisplayDevice + ?Sized> {
    device: &'a mut D,
    size: Size,
    finished: bool,
}

impl<'a, D: DisplayDevice + ?Sized> DrawSession<'a, D> {
    pub fn begin(device: &'a mut D) -> Self {
        let canvas = device.canvas();
        canvas.clear_color(BinaryColor::Off);
        let size = Size::new(canvas.width() as u32, canvas.height() as u32);
        Self { device, size, finished: false }
    }

    pub fn finish(mut self) -> Result<(), DisplayError> {
        self.finished = true;
        self.device.flush()
    }
}

impl<D: DisplayDevice + ?Sized> Drop for DrawSession<'_, D> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.device.flush() {
                warn!("Flush of abandoned draw session failed: {}", e);
            }
        }
    }
}

impl<D: DisplayDevice + ?Sized> DrawTarget for DrawSession<'_, D> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.device.canvas().draw_iter(pixels)
    }
}

impl<D: DisplayDevice + ?Sized> OriginDimensions for DrawSession<'_, D> {
    fn size(&self) -> Size {
        self.size
    }
}

/// Render every glyph run of `frame` and push it to the panel.
pub fn draw_frame<D: DisplayDevice + ?Sized>(
    device: &mut D,
    frame: &Frame,
    fonts: &FontSet,
) -> Result<(), DisplayError> {
    let mut session = DrawSession::begin(device);
    for glyph in frame.glyphs() {
        let style = MonoTextStyle::new(fonts.face(glyph.role), BinaryColor::On);
        Text::with_baseline(&glyph.text, Point::new(glyph.x, glyph.y), style, Baseline::Top)
            .draw(&mut session)
            .map_err(|e: Infallible| -> DisplayError { match e {} })?;
    }
    session.finish()
}
