//! Response-map decoding into a displacement and a scale update.
//!
//! The steps run in a fixed order: bicubic upsampling of every map, penalty on
//! the non-center scales, peak-scale selection, min/sum normalization of the
//! chosen map, cosine-window fusion, peak location, and the displacement chain
//! response cells -> instance pixels -> frame pixels.

use crate::config::TrackerConfig;
use crate::geometry::Point;
use crate::image::resize::resize_cubic_grid;
use crate::scorer::ResponseMap;
use crate::trace::trace_event;
use crate::util::math::{argmax_first, hann1d};
use crate::util::{SiamError, SiamResult};

/// Added to the normalization denominator of the chosen response.
pub const NORMALIZATION_EPS: f64 = 1e-16;

/// Outer product of two Hann windows, normalized to sum to one.
#[derive(Clone, Debug, PartialEq)]
pub struct CosineWindow {
    data: Vec<f64>,
    size: usize,
}

impl CosineWindow {
    /// Builds a `size x size` window.
    pub fn new(size: usize) -> Self {
        let hann = hann1d(size);
        let mut data = Vec::with_capacity(size * size);
        for &wy in &hann {
            for &wx in &hann {
                data.push(wy * wx);
            }
        }
        let total: f64 = data.iter().sum();
        if total > 0.0 {
            data.iter_mut().for_each(|v| *v /= total);
        }
        Self { data, size }
    }

    /// Returns the side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the weights in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Result of decoding one frame's responses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decoded {
    /// Index of the selected scale in the ladder.
    pub scale_id: usize,
    /// Peak `(row, col)` in the upsampled response.
    pub peak: (usize, usize),
    /// Center displacement in frame pixels.
    pub displacement: Point,
    /// Damped scale multiplier for the target, template and search sizes.
    pub applied_scale: f64,
}

/// Converts per-scale response maps into a target displacement and scale.
#[derive(Clone, Debug)]
pub struct ResponseDecoder {
    upscale_size: usize,
    center_index: usize,
    scale_penalty: f64,
    window_influence: f64,
    total_stride: f64,
    response_upsample: f64,
    instance_resolution: f64,
    scale_lr: f64,
}

impl ResponseDecoder {
    /// Captures the decoding parameters from a validated config.
    pub fn new(cfg: &TrackerConfig) -> Self {
        Self {
            upscale_size: cfg.upscale_size(),
            center_index: cfg.center_scale_index(),
            scale_penalty: cfg.scale_penalty,
            window_influence: cfg.window_influence,
            total_stride: cfg.total_stride as f64,
            response_upsample: cfg.response_upsample as f64,
            instance_resolution: cfg.instance_resolution as f64,
            scale_lr: cfg.scale_lr,
        }
    }

    /// Side of the upsampled maps and of the matching cosine window.
    pub fn upscale_size(&self) -> usize {
        self.upscale_size
    }

    /// Decodes `maps`, one per entry of `scale_factors`, searched with a
    /// unit-scale side of `search_size` frame pixels.
    pub fn decode(
        &self,
        maps: &[ResponseMap],
        scale_factors: &[f64],
        search_size: f64,
        window: &CosineWindow,
    ) -> SiamResult<Decoded> {
        if maps.len() != scale_factors.len() {
            return Err(SiamError::ScaleCountMismatch {
                expected: scale_factors.len(),
                got: maps.len(),
            });
        }
        if window.size() != self.upscale_size {
            return Err(SiamError::InvalidDimensions {
                width: window.size(),
                height: window.size(),
                channels: 1,
            });
        }

        let up = self.upscale_size;
        let mut upsampled: Vec<Vec<f64>> = maps
            .iter()
            .map(|map| {
                let grid: Vec<f64> = map.as_slice().iter().map(|&v| v as f64).collect();
                resize_cubic_grid(&grid, map.width(), map.height(), up, up)
            })
            .collect();

        for (idx, grid) in upsampled.iter_mut().enumerate() {
            if idx != self.center_index {
                grid.iter_mut().for_each(|v| *v *= self.scale_penalty);
            }
        }

        let peaks: Vec<f64> = upsampled
            .iter()
            .map(|grid| grid.iter().copied().fold(f64::NAN, f64::max))
            .collect();
        let scale_id = argmax_first(&peaks).ok_or_else(|| SiamError::Scorer {
            reason: "response maps contain no finite values".to_string(),
        })?;

        let mut response = upsampled.swap_remove(scale_id);
        let min = response.iter().copied().fold(f64::NAN, f64::min);
        response.iter_mut().for_each(|v| *v -= min);
        let denom = response.iter().sum::<f64>() + NORMALIZATION_EPS;
        response.iter_mut().for_each(|v| *v /= denom);

        let wi = self.window_influence;
        for (v, &w) in response.iter_mut().zip(window.as_slice()) {
            *v = (1.0 - wi) * *v + wi * w;
        }

        let flat = argmax_first(&response).ok_or(SiamError::EmptyResponse)?;
        let peak = (flat / up, flat % up);

        let half = (up as f64 - 1.0) / 2.0;
        let to_instance = self.total_stride / self.response_upsample;
        let to_image = search_size * scale_factors[scale_id] / self.instance_resolution;
        let disp_response = Point::new(peak.0 as f64 - half, peak.1 as f64 - half);
        let disp_instance = Point::new(disp_response.y * to_instance, disp_response.x * to_instance);
        let displacement = Point::new(disp_instance.y * to_image, disp_instance.x * to_image);

        let applied_scale = (1.0 - self.scale_lr) * 1.0 + self.scale_lr * scale_factors[scale_id];

        trace_event!(
            "scale_selected",
            scale_id = scale_id,
            row = peak.0,
            col = peak.1,
            applied_scale = applied_scale
        );

        Ok(Decoded {
            scale_id,
            peak,
            displacement,
            applied_scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CosineWindow, ResponseDecoder};
    use crate::config::TrackerConfig;
    use crate::plan::scale_ladder;
    use crate::scorer::ResponseMap;
    use crate::util::SiamError;

    fn peaked(size: usize, row: usize, col: usize, value: f32) -> ResponseMap {
        let mut map = ResponseMap::filled(0.0, size, size).unwrap();
        map.set(row, col, value);
        map
    }

    fn odd_config() -> TrackerConfig {
        TrackerConfig {
            response_upsample: 3,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn window_sums_to_one() {
        let w = CosineWindow::new(272);
        let sum: f64 = w.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(w.as_slice().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn centered_peak_decodes_to_zero_displacement() {
        let cfg = odd_config();
        let decoder = ResponseDecoder::new(&cfg);
        let window = CosineWindow::new(cfg.upscale_size());
        let ladder = scale_ladder(cfg.scale_step, cfg.scale_count);
        let maps: Vec<_> = (0..3).map(|_| peaked(17, 8, 8, 1.0)).collect();
        let d = decoder.decode(&maps, &ladder, 200.0, &window).unwrap();
        assert_eq!(d.scale_id, 1);
        assert_eq!(d.peak, (25, 25));
        assert_eq!(d.displacement.x, 0.0);
        assert_eq!(d.displacement.y, 0.0);
        assert_eq!(d.applied_scale, 1.0);
    }

    #[test]
    fn off_center_peak_follows_displacement_chain() {
        let cfg = TrackerConfig {
            window_influence: 0.0,
            ..odd_config()
        };
        let decoder = ResponseDecoder::new(&cfg);
        let window = CosineWindow::new(cfg.upscale_size());
        let ladder = scale_ladder(cfg.scale_step, cfg.scale_count);
        let maps: Vec<_> = (0..3).map(|_| peaked(17, 10, 5, 1.0)).collect();
        let d = decoder.decode(&maps, &ladder, 255.0, &window).unwrap();
        // Row 10 -> 31, col 5 -> 16 in the 51-cell map centered at 25.
        assert_eq!(d.peak, (31, 16));
        let cell = 8.0 / 3.0;
        assert!((d.displacement.y - 6.0 * cell).abs() < 1e-9);
        assert!((d.displacement.x + 9.0 * cell).abs() < 1e-9);
    }

    #[test]
    fn strong_side_scale_wins_and_is_damped() {
        let cfg = odd_config();
        let decoder = ResponseDecoder::new(&cfg);
        let window = CosineWindow::new(cfg.upscale_size());
        let ladder = scale_ladder(cfg.scale_step, cfg.scale_count);
        let maps = vec![
            peaked(17, 8, 8, 1.0),
            peaked(17, 8, 8, 1.0),
            peaked(17, 8, 8, 2.0),
        ];
        let d = decoder.decode(&maps, &ladder, 200.0, &window).unwrap();
        assert_eq!(d.scale_id, 2);
        let expected = (1.0 - cfg.scale_lr) + cfg.scale_lr * cfg.scale_step;
        assert!((d.applied_scale - expected).abs() < 1e-12);
    }

    #[test]
    fn uniform_maps_do_not_fail() {
        let cfg = TrackerConfig::default();
        let decoder = ResponseDecoder::new(&cfg);
        let window = CosineWindow::new(cfg.upscale_size());
        let ladder = scale_ladder(cfg.scale_step, cfg.scale_count);
        let maps: Vec<_> = (0..3)
            .map(|_| ResponseMap::filled(0.0, 17, 17).unwrap())
            .collect();
        let d = decoder.decode(&maps, &ladder, 200.0, &window).unwrap();
        // Equal maxima resolve to the first scale.
        assert_eq!(d.scale_id, 0);
        assert!(d.displacement.x.abs() < 1.0);
        assert!(d.displacement.y.abs() < 1.0);
    }

    #[test]
    fn map_count_must_match_ladder() {
        let cfg = TrackerConfig::default();
        let decoder = ResponseDecoder::new(&cfg);
        let window = CosineWindow::new(cfg.upscale_size());
        let maps = vec![ResponseMap::filled(0.0, 17, 17).unwrap()];
        let err = decoder
            .decode(&maps, &[0.9, 1.0, 1.1], 100.0, &window)
            .unwrap_err();
        assert_eq!(
            err,
            SiamError::ScaleCountMismatch {
                expected: 3,
                got: 1,
            }
        );
    }
}
