/*
 *  vframebuf.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{BinaryColor, PixelColor};
use embedded_graphics::prelude::*;

/// A runtime-sized framebuffer for embedded-graphics.
#[derive(Debug, Clone)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor + Clone> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Immutable raw access
    pub fn as_slice(&self) -> &[C] { &self.buf }

    /// Clear to a color
    pub fn clear_color(&mut self, color: C) {
        self.buf.fill(color);
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<C> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }
}

impl VarFrameBuf<BinaryColor> {
    /// Pack into SSD1306 page order: one byte per column per 8-row page,
    /// LSB is the top row of the page.
    pub fn to_pages(&self) -> Vec<u8> {
        let pages = self.h.div_ceil(8);
        let mut out = vec![0u8; pages * self.w];
        for y in 0..self.h {
            let row = &self.buf[y * self.w..(y + 1) * self.w];
            for (x, px) in row.iter().enumerate() {
                if px.is_on() {
                    out[(y / 8) * self.w + x] |= 1 << (y % 8);
                }
            }
        }
        out
    }

    pub fn lit_pixels(&self) -> usize {
        self.buf.iter().filter(|p| p.is_on()).count()
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor + Clone> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_pack_column_bits() {
        let mut fb = VarFrameBuf::new(128, 64, BinaryColor::Off);
        fb.draw_iter([
            Pixel(Point::new(0, 0), BinaryColor::On),
            Pixel(Point::new(0, 7), BinaryColor::On),
            Pixel(Point::new(5, 9), BinaryColor::On),
        ]).unwrap();

        let pages = fb.to_pages();
        assert_eq!(pages.len(), 1024);
        assert_eq!(pages[0], 0b1000_0001);
        assert_eq!(pages[128 + 5], 0b0000_0010);
        assert_eq!(fb.lit_pixels(), 3);
    }

    #[test]
    fn test_out_of_bounds_pixels_ignored() {
        let mut fb = VarFrameBuf::new(128, 64, BinaryColor::Off);
        fb.draw_iter([
            Pixel(Point::new(-1, 0), BinaryColor::On),
            Pixel(Point::new(128, 3), BinaryColor::On),
            Pixel(Point::new(3, 64), BinaryColor::On),
        ]).unwrap();
        assert_eq!(fb.lit_pixels(), 0);
        assert_eq!(fb.pixel(200, 0), None);
    }
}
