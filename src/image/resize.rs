//! Separable bicubic resampling.
//!
//! Destination pixel centers map to source coordinates with
//! `src = (dst + 0.5) * (src_len / dst_len) - 0.5`. Taps that fall outside the
//! source are clamped to the nearest edge sample. Resampling to the same size
//! reproduces the input exactly.
//!
//! Only the source rows referenced by the vertical taps are filtered
//! horizontally, so the work and memory depend on the output size and not on
//! the source size.

use crate::image::OwnedImage;
use crate::util::math::cubic_weights;
use crate::util::{SiamError, SiamResult};

/// Precomputed source taps and weights for one output axis.
struct AxisTaps {
    index: Vec<[usize; 4]>,
    weight: Vec<[f64; 4]>,
}

impl AxisTaps {
    fn new(src_len: usize, dst_len: usize) -> Self {
        let scale = src_len as f64 / dst_len as f64;
        let last = src_len.saturating_sub(1) as f64;
        let mut index = Vec::with_capacity(dst_len);
        let mut weight = Vec::with_capacity(dst_len);
        for dst in 0..dst_len {
            let src = (dst as f64 + 0.5) * scale - 0.5;
            let base = src.floor();
            let t = src - base;
            let mut taps = [0usize; 4];
            for (k, tap) in taps.iter_mut().enumerate() {
                *tap = (base + k as f64 - 1.0).clamp(0.0, last) as usize;
            }
            index.push(taps);
            weight.push(cubic_weights(t));
        }
        Self { index, weight }
    }

    /// Distinct source indices referenced by any tap, in ascending order.
    fn referenced(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self.index.iter().flatten().copied().collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}

/// Resamples a virtual `src_width x src_height` interleaved source to
/// `out_width x out_height` with a bicubic kernel.
///
/// `pixel(x, y)` returns the channel values of a source pixel, or `None` for
/// pixels that take `fill` instead. Only pixels under a tap are requested.
pub(crate) fn resample_cubic<'a, T, P>(
    src_width: usize,
    src_height: usize,
    channels: usize,
    out_width: usize,
    out_height: usize,
    fill: &[f64],
    pixel: P,
) -> SiamResult<OwnedImage<f32>>
where
    T: Copy + Into<f64> + 'a,
    P: Fn(usize, usize) -> Option<&'a [T]>,
{
    if out_width == 0 || out_height == 0 || src_width == 0 || src_height == 0 {
        return Err(SiamError::InvalidDimensions {
            width: out_width,
            height: out_height,
            channels,
        });
    }

    let x_taps = AxisTaps::new(src_width, out_width);
    let y_taps = AxisTaps::new(src_height, out_height);
    let rows = y_taps.referenced();
    let out_row_len = out_width * channels;
    let fill_value = |c: usize| fill.get(c).copied().unwrap_or(0.0);

    // Horizontal pass over the referenced source rows.
    let mut horizontal = vec![0.0f64; rows.len() * out_row_len];
    for (slot, &y) in rows.iter().enumerate() {
        let dst_row = &mut horizontal[slot * out_row_len..(slot + 1) * out_row_len];
        for (x, (taps, weights)) in x_taps.index.iter().zip(&x_taps.weight).enumerate() {
            let acc = &mut dst_row[x * channels..(x + 1) * channels];
            for (&tap, &w) in taps.iter().zip(weights) {
                match pixel(tap, y) {
                    Some(px) => {
                        for (a, &v) in acc.iter_mut().zip(px) {
                            *a += w * v.into();
                        }
                    }
                    None => {
                        for (c, a) in acc.iter_mut().enumerate() {
                            *a += w * fill_value(c);
                        }
                    }
                }
            }
        }
    }

    // Vertical pass.
    let mut out = vec![0.0f32; out_height * out_row_len];
    for (y, (taps, weights)) in y_taps.index.iter().zip(&y_taps.weight).enumerate() {
        let slots = taps.map(|tap| rows.binary_search(&tap).unwrap_or_else(|slot| slot));
        let dst_row = &mut out[y * out_row_len..(y + 1) * out_row_len];
        for (i, value) in dst_row.iter_mut().enumerate() {
            let mut acc = 0.0f64;
            for (&slot, &w) in slots.iter().zip(weights) {
                acc += w * horizontal[slot * out_row_len + i];
            }
            *value = acc as f32;
        }
    }

    OwnedImage::new(out, out_width, out_height, channels)
}

/// Resamples a single-channel `f64` grid, used for response upsampling.
pub(crate) fn resize_cubic_grid(
    src: &[f64],
    width: usize,
    height: usize,
    out_width: usize,
    out_height: usize,
) -> Vec<f64> {
    let x_taps = AxisTaps::new(width, out_width);
    let y_taps = AxisTaps::new(height, out_height);

    let mut horizontal = vec![0.0f64; height * out_width];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for (x, (taps, weights)) in x_taps.index.iter().zip(&x_taps.weight).enumerate() {
            horizontal[y * out_width + x] = taps
                .iter()
                .zip(weights)
                .map(|(&tap, &w)| w * row[tap])
                .sum();
        }
    }

    let mut out = vec![0.0f64; out_height * out_width];
    for (y, (taps, weights)) in y_taps.index.iter().zip(&y_taps.weight).enumerate() {
        for x in 0..out_width {
            out[y * out_width + x] = taps
                .iter()
                .zip(weights)
                .map(|(&tap, &w)| w * horizontal[tap * out_width + x])
                .sum();
        }
    }
    out
}
