//! Template/search region sizing and the scale ladder.

use crate::config::TrackerConfig;
use crate::geometry::Size;

/// Side lengths of the template and search squares in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchGeometry {
    /// Side of the square cropped around the target for the template.
    pub template_size: f64,
    /// Side of the square searched in each new frame at scale 1.0.
    pub search_size: f64,
}

impl SearchGeometry {
    /// Derives both sides from the target extent.
    ///
    /// `context = context_ratio * (h + w)`, the template side is the geometric
    /// mean of the context-padded extents, and the search side keeps the
    /// `instance_resolution / exemplar_resolution` ratio.
    pub fn from_target(target: Size, cfg: &TrackerConfig) -> Self {
        let context = cfg.context_ratio * (target.height + target.width);
        let template_size = ((target.width + context) * (target.height + context)).sqrt();
        let search_size = template_size * cfg.size_ratio();
        Self {
            template_size,
            search_size,
        }
    }

    /// Multiplies both sides by `factor`, preserving their ratio.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            template_size: self.template_size * factor,
            search_size: self.search_size * factor,
        }
    }
}

/// Geometric scale ladder `step^(i - count / 2)` for `i` in `0..count`.
///
/// The center entry at `count / 2` is exactly `1.0`.
pub fn scale_ladder(scale_step: f64, scale_count: usize) -> Vec<f64> {
    let center = (scale_count / 2) as i32;
    (0..scale_count)
        .map(|i| scale_step.powi(i as i32 - center))
        .collect()
}
