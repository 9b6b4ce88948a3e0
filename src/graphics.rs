//! Graphics support via embedded-graphics
//!
//! With the `graphics` feature, a mutable [`DisplayFrame`] implements
//! [`DrawTarget`](embedded_graphics_core::draw_target::DrawTarget), so frames can be
//! composed locally with embedded-graphics primitives and rendered through the
//! same path as downloaded images.
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::{
//!     prelude::*,
//!     primitives::{PrimitiveStyle, Rectangle},
//! };
//! use epaper_updater::{Color, Dimensions, DisplayFrame};
//!
//! let mut pixels = vec![0u8; Dimensions::NATIVE.frame_size()];
//! let mut frame = match DisplayFrame::new(640, 384, &mut pixels[..]) {
//!     Ok(frame) => frame,
//!     Err(_) => return,
//! };
//!
//! let _ = frame.clear(Color::White);
//! let _ = Rectangle::new(Point::new(10, 10), Size::new(50, 30))
//!     .into_styled(PrimitiveStyle::with_fill(Color::Red))
//!     .draw(&mut frame);
//!
//! assert_eq!(frame.color_at(20, 20), Some(Color::Red));
//! assert_eq!(frame.color_at(0, 0), Some(Color::White));
//! ```

use core::convert::Infallible;
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    prelude::Pixel,
};

use crate::color::Color;
use crate::transcode::DisplayFrame;

impl<B> DrawTarget for DisplayFrame<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    type Color = Color;
    type Error = Infallible;

    fn draw_iter<Iter>(&mut self, pixels: Iter) -> Result<(), Self::Error>
    where
        Iter: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                continue;
            };
            self.set_index(x, y, color.palette_index());
        }

        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.palette_index());
        Ok(())
    }
}

impl<B> OriginDimensions for DisplayFrame<B>
where
    B: AsRef<[u8]>,
{
    fn size(&self) -> Size {
        let dims = self.dimensions();
        Size::new(u32::from(dims.cols), u32::from(dims.rows))
    }
}
