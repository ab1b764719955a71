//! Numeric helpers shared by resampling and decoding.

/// Free parameter of the bicubic convolution kernel.
pub(crate) const CUBIC_A: f64 = -0.75;

/// Returns the four bicubic tap weights for a fractional offset `t` in `[0, 1)`.
///
/// Taps apply to samples at `-1, 0, +1, +2` relative to the floor position.
/// The weights sum to one and reduce to `[0, 1, 0, 0]` at `t == 0`.
pub(crate) fn cubic_weights(t: f64) -> [f64; 4] {
    let a = CUBIC_A;
    let u = t + 1.0;
    let w0 = ((a * u - 5.0 * a) * u + 8.0 * a) * u - 4.0 * a;
    let w1 = ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0;
    let v = 1.0 - t;
    let w2 = ((a + 2.0) * v - (a + 3.0)) * v * v + 1.0;
    let w3 = 1.0 - w0 - w1 - w2;
    [w0, w1, w2, w3]
}

/// Symmetric Hann window of length `len`.
///
/// `w[n] = 0.5 - 0.5 * cos(2 * pi * n / (len - 1))`; a single-sample window
/// is `[1.0]`.
pub(crate) fn hann1d(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * n as f64 / denom).cos())
        .collect()
}

/// Index of the first maximum, or `None` for an empty slice.
///
/// NaN values never win.
pub(crate) fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, current)| value > current) {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::{argmax_first, cubic_weights, hann1d};

    #[test]
    fn cubic_weights_are_identity_at_zero() {
        assert_eq!(cubic_weights(0.0), [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn cubic_weights_sum_to_one() {
        for i in 0..10 {
            let t = i as f64 / 10.0;
            let sum: f64 = cubic_weights(t).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn hann_is_symmetric_with_zero_ends() {
        let w = hann1d(7);
        assert!(w[0].abs() < 1e-12);
        assert!(w[6].abs() < 1e-12);
        assert!((w[3] - 1.0).abs() < 1e-12);
        for i in 0..7 {
            assert!((w[i] - w[6 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn argmax_prefers_first_occurrence() {
        assert_eq!(argmax_first(&[0.0, 2.0, 1.0, 2.0]), Some(1));
        assert_eq!(argmax_first(&[f64::NAN, -1.0]), Some(1));
        assert_eq!(argmax_first(&[]), None);
    }
}
