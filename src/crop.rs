//! Square patch extraction with constant-color padding.
//!
//! The requested side length is rounded to whole pixels (ties to even) and the
//! top-left corner to `round(center - (side - 1) / 2)` on each axis. Any part of
//! the square that falls outside the frame takes the fill color, and the square
//! is resampled to the output resolution with a bicubic kernel. The square is
//! never materialized, so arbitrarily large or distant regions are cheap.

use crate::geometry::Point;
use crate::image::resize::resample_cubic;
use crate::image::{ImageView, OwnedImage};
use crate::util::{SiamError, SiamResult};

/// Integer square region in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    /// Top row, may be negative.
    pub top: i64,
    /// Left column, may be negative.
    pub left: i64,
    /// Side length in pixels.
    pub side: usize,
}

impl CropRegion {
    /// Computes the pixel-aligned square for `center` and `side_length`.
    pub fn around(center: Point, side_length: f64) -> SiamResult<Self> {
        if !side_length.is_finite() || side_length <= 0.0 {
            return Err(SiamError::InvalidConfig {
                name: "side_length",
                reason: "must be finite and positive",
            });
        }
        if !center.y.is_finite() || !center.x.is_finite() {
            return Err(SiamError::InvalidConfig {
                name: "center",
                reason: "must be finite",
            });
        }
        let side = side_length.round_ties_even().max(1.0);
        let half = (side - 1.0) / 2.0;
        Ok(Self {
            top: (center.y - half).round_ties_even() as i64,
            left: (center.x - half).round_ties_even() as i64,
            side: side as usize,
        })
    }

    /// Frame pixel under offset `(dx, dy)` of the region, if any.
    fn frame_pixel(&self, dx: usize, dy: usize) -> Option<(usize, usize)> {
        Some((offset(self.left, dx)?, offset(self.top, dy)?))
    }

    /// Whether any pixel of the region lies inside a `width x height` frame.
    fn intersects(&self, width: usize, height: usize) -> bool {
        let side = i64::try_from(self.side).unwrap_or(i64::MAX);
        let overlaps = |origin: i64, len: usize| {
            let len = i64::try_from(len).unwrap_or(i64::MAX);
            origin < len && origin.saturating_add(side) > 0
        };
        overlaps(self.top, height) && overlaps(self.left, width)
    }
}

fn offset(origin: i64, delta: usize) -> Option<usize> {
    let delta = i64::try_from(delta).ok()?;
    usize::try_from(origin.checked_add(delta)?).ok()
}

/// Crops a square of `side_length` centered at `center` and resizes it to
/// `output_size x output_size`.
///
/// `fill_color` holds one value per channel. The output always has
/// `output_size x output_size x channels` elements, however far the square
/// extends beyond the frame.
pub fn crop_and_resize(
    image: ImageView<'_, u8>,
    center: Point,
    side_length: f64,
    output_size: usize,
    fill_color: &[f64],
) -> SiamResult<OwnedImage<f32>> {
    let channels = image.channels();
    if fill_color.len() != channels {
        return Err(SiamError::InvalidConfig {
            name: "fill_color",
            reason: "must have one value per image channel",
        });
    }
    let region = CropRegion::around(center, side_length)?;

    if !region.intersects(image.width(), image.height()) {
        let fill: Vec<f32> = fill_color.iter().map(|&v| v as f32).collect();
        let data = fill.repeat(output_size * output_size);
        return OwnedImage::new(data, output_size, output_size, channels);
    }

    resample_cubic(
        region.side,
        region.side,
        channels,
        output_size,
        output_size,
        fill_color,
        |dx, dy| {
            let (x, y) = region.frame_pixel(dx, dy)?;
            image.pixel(x, y)
        },
    )
}
