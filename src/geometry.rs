//! Bounding box representations and conversions.
//!
//! Boxes enter and leave the tracker in corner form `[x, y, w, h]` with a
//! 1-indexed top-left corner. Internally the tracker works in 0-indexed center
//! form `(cy, cx, h, w)`. The conversions are
//!
//! ```text
//! cy = y - 1 + (h - 1) / 2        y = cy + 1 - (h - 1) / 2
//! cx = x - 1 + (w - 1) / 2        x = cx + 1 - (w - 1) / 2
//! ```

use crate::util::{SiamError, SiamResult};

/// A point in 0-indexed image coordinates, row first.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// Row coordinate.
    pub y: f64,
    /// Column coordinate.
    pub x: f64,
}

impl Point {
    /// Creates a point from row and column coordinates.
    pub fn new(y: f64, x: f64) -> Self {
        Self { y, x }
    }
}

/// Target extent, height first.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    /// Height in pixels.
    pub height: f64,
    /// Width in pixels.
    pub width: f64,
}

impl Size {
    /// Creates a size from height and width.
    pub fn new(height: f64, width: f64) -> Self {
        Self { height, width }
    }

    /// Multiplies both extents by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            height: self.height * factor,
            width: self.width * factor,
        }
    }
}

/// Corner-form box `[x, y, w, h]` with a 1-indexed top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    /// Left edge, 1-indexed.
    pub x: f64,
    /// Top edge, 1-indexed.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl BoundingBox {
    /// Creates a box from `x, y, w, h`.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a box from an `[x, y, w, h]` array.
    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Returns the box as `[x, y, w, h]`.
    pub fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Fails unless width and height are finite and strictly positive.
    pub fn validate(&self) -> SiamResult<()> {
        let finite = self.x.is_finite() && self.y.is_finite();
        if !finite || !(self.width.is_finite() && self.width > 0.0)
            || !(self.height.is_finite() && self.height > 0.0)
        {
            return Err(SiamError::InvalidBox {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Converts to 0-indexed center form.
    pub fn to_center(self) -> CenterBox {
        CenterBox {
            center: Point::new(
                self.y - 1.0 + (self.height - 1.0) / 2.0,
                self.x - 1.0 + (self.width - 1.0) / 2.0,
            ),
            size: Size::new(self.height, self.width),
        }
    }
}

/// Center-form box `(cy, cx, h, w)` in 0-indexed coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CenterBox {
    /// Box center.
    pub center: Point,
    /// Box extent.
    pub size: Size,
}

impl CenterBox {
    /// Converts back to 1-indexed corner form.
    pub fn to_corner(self) -> BoundingBox {
        BoundingBox {
            x: self.center.x + 1.0 - (self.size.width - 1.0) / 2.0,
            y: self.center.y + 1.0 - (self.size.height - 1.0) / 2.0,
            width: self.size.width,
            height: self.size.height,
        }
    }
}
