//! Color types for tri-color e-paper panels
//!
//! This module defines the [`Color`] enum for the black, white, and red pixels
//! the panel can show, and the fixed palette that maps decoded image indices
//! onto those colors.
//!
//! ## Color Representation
//!
//! Images arrive as 2-bit palette indices. The panel expects one 4-bit color
//! code per pixel, two pixels per transfer byte:
//!
//! | Palette index | Color | Device code |
//! |---------------|-------|-------------|
//! | 0             | Black | 0x0         |
//! | 1             | White | 0x3         |
//! | 2             | Red   | 0x4         |
//! | 3             | Black | 0x0         |
//!
//! Index 3 is unused by the server palette and renders as black.
//!
//! ## Example
//!
//! ```
//! use epaper_updater::Color;
//!
//! assert_eq!(Color::from_palette_index(2), Color::Red);
//! assert_eq!(Color::Red.code(), 0x04);
//! assert_eq!(Color::pack(Color::White, Color::Red), 0x34);
//! ```

/// Colors supported by the panel
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    /// Black pixels
    Black,
    /// White pixels
    White,
    /// Red pixels
    Red,
}

/// Palette index to color lookup, indexed by the 2-bit pixel value
pub const PALETTE: [Color; 4] = [Color::Black, Color::White, Color::Red, Color::Black];

#[cfg(feature = "graphics")]
impl embedded_graphics_core::prelude::PixelColor for Color {
    type Raw = embedded_graphics_core::pixelcolor::raw::RawU8;
}

impl Color {
    /// Look up the color for a 2-bit palette index
    ///
    /// Only the two low bits of `index` are used.
    pub const fn from_palette_index(index: u8) -> Self {
        PALETTE[(index & 0x03) as usize]
    }

    /// Palette index used when writing this color into a frame
    pub const fn palette_index(self) -> u8 {
        match self {
            Self::Black => 0,
            Self::White => 1,
            Self::Red => 2,
        }
    }

    /// Get the 4-bit device code sent to the panel
    ///
    /// ```
    /// use epaper_updater::Color;
    ///
    /// assert_eq!(Color::Black.code(), 0x00);
    /// assert_eq!(Color::White.code(), 0x03);
    /// assert_eq!(Color::Red.code(), 0x04);
    /// ```
    pub const fn code(self) -> u8 {
        match self {
            Self::Black => 0x00,
            Self::White => 0x03,
            Self::Red => 0x04,
        }
    }

    /// Pack two pixels into one transfer byte, `high` in the upper nibble
    pub const fn pack(high: Self, low: Self) -> u8 {
        (high.code() << 4) | low.code()
    }
}
