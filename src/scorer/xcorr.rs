//! Deterministic normalized cross-correlation scorer.
//!
//! Patches are reduced to grayscale; the template is stored zero-mean. Each
//! response cell is the ZNCC between the template and the search window whose
//! top-left corner sits at `(row * stride, col * stride)`, multiplied by the
//! output scale. Windows with (near) zero variance score 0.

use crate::config::TrackerConfig;
use crate::image::{ImageView, OwnedImage};
use crate::scorer::{ExecutionMode, ResponseMap, SimilarityScorer};
use crate::util::{SiamError, SiamResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

const MIN_VARIANCE: f32 = 1e-6;

/// Grayscale patch with precomputed zero-mean values and energy.
#[derive(Clone, Debug)]
pub struct PixelEmbedding {
    width: usize,
    height: usize,
    gray: Vec<f32>,
    zero_mean: Vec<f32>,
    energy: f32,
}

impl PixelEmbedding {
    fn from_view(patch: ImageView<'_, f32>) -> SiamResult<Self> {
        let width = patch.width();
        let height = patch.height();
        let channels = patch.channels();
        let mut gray = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = patch.row(y).ok_or(SiamError::BufferTooSmall {
                needed: (y + 1) * patch.stride(),
                got: patch.as_slice().len(),
            })?;
            for px in row.chunks_exact(channels) {
                gray.push(px.iter().sum::<f32>() / channels as f32);
            }
        }
        let mean = gray.iter().map(|&v| v as f64).sum::<f64>() / gray.len() as f64;
        let zero_mean: Vec<f32> = gray.iter().map(|&v| v - mean as f32).collect();
        let energy = zero_mean.iter().map(|&v| v * v).sum();
        Ok(Self {
            width,
            height,
            gray,
            zero_mean,
            energy,
        })
    }

    /// Returns the patch width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the patch height.
    pub fn height(&self) -> usize {
        self.height
    }
}

/// Built-in scorer using normalized cross-correlation of raw pixels.
#[derive(Clone, Debug)]
pub struct PixelCorrelation {
    out_scale: f32,
    stride: usize,
}

impl PixelCorrelation {
    /// Creates a scorer with an explicit output scale and window stride.
    pub fn new(out_scale: f32, stride: usize) -> SiamResult<Self> {
        if !out_scale.is_finite() || out_scale <= 0.0 {
            return Err(SiamError::InvalidConfig {
                name: "out_scale",
                reason: "must be finite and positive",
            });
        }
        if stride == 0 {
            return Err(SiamError::InvalidConfig {
                name: "total_stride",
                reason: "must be at least 1",
            });
        }
        Ok(Self { out_scale, stride })
    }

    /// Creates a scorer matching the tracker's output scale and stride.
    pub fn from_config(cfg: &TrackerConfig) -> SiamResult<Self> {
        Self::new(cfg.out_scale as f32, cfg.total_stride)
    }

    fn correlate(
        &self,
        template: &PixelEmbedding,
        search: &PixelEmbedding,
    ) -> SiamResult<ResponseMap> {
        if search.width < template.width || search.height < template.height {
            return Err(SiamError::Scorer {
                reason: format!(
                    "search patch {}x{} smaller than template {}x{}",
                    search.width, search.height, template.width, template.height
                ),
            });
        }
        let out_w = (search.width - template.width) / self.stride + 1;
        let out_h = (search.height - template.height) / self.stride + 1;
        let n = (template.width * template.height) as f32;

        let mut data = Vec::with_capacity(out_w * out_h);
        for row in 0..out_h {
            for col in 0..out_w {
                let (dot, sum, sum_sq) =
                    window_stats(template, search, col * self.stride, row * self.stride);
                let var = sum_sq - sum * sum / n;
                let score = if var <= MIN_VARIANCE || template.energy <= MIN_VARIANCE {
                    0.0
                } else {
                    let value = dot / (template.energy * var).sqrt();
                    if value.is_finite() {
                        value
                    } else {
                        0.0
                    }
                };
                data.push(score * self.out_scale);
            }
        }
        ResponseMap::new(data, out_w, out_h)
    }
}

impl SimilarityScorer for PixelCorrelation {
    type Embedding = PixelEmbedding;

    fn encode(
        &self,
        patch: ImageView<'_, f32>,
        _mode: ExecutionMode,
    ) -> SiamResult<Self::Embedding> {
        PixelEmbedding::from_view(patch)
    }

    fn encode_batch(
        &self,
        patches: &[OwnedImage<f32>],
        _mode: ExecutionMode,
    ) -> SiamResult<Vec<Self::Embedding>> {
        #[cfg(feature = "rayon")]
        {
            patches
                .par_iter()
                .map(|patch| PixelEmbedding::from_view(patch.view()))
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            patches
                .iter()
                .map(|patch| PixelEmbedding::from_view(patch.view()))
                .collect()
        }
    }

    fn score(
        &self,
        template: &Self::Embedding,
        search: &[Self::Embedding],
        _mode: ExecutionMode,
    ) -> SiamResult<Vec<ResponseMap>> {
        #[cfg(feature = "rayon")]
        {
            search
                .par_iter()
                .map(|emb| self.correlate(template, emb))
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            search
                .iter()
                .map(|emb| self.correlate(template, emb))
                .collect()
        }
    }
}

/// Returns `(dot(t', I), sum(I), sum(I^2))` over the window at `(x0, y0)`.
#[cfg(not(feature = "simd"))]
fn window_stats(
    template: &PixelEmbedding,
    search: &PixelEmbedding,
    x0: usize,
    y0: usize,
) -> (f32, f32, f32) {
    let tw = template.width;
    let mut dot = 0.0f32;
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    for ty in 0..template.height {
        let start = (y0 + ty) * search.width + x0;
        let img_row = &search.gray[start..start + tw];
        let tpl_row = &template.zero_mean[ty * tw..(ty + 1) * tw];
        for (&t, &v) in tpl_row.iter().zip(img_row) {
            dot += t * v;
            sum += v;
            sum_sq += v * v;
        }
    }
    (dot, sum, sum_sq)
}

#[cfg(feature = "simd")]
fn window_stats(
    template: &PixelEmbedding,
    search: &PixelEmbedding,
    x0: usize,
    y0: usize,
) -> (f32, f32, f32) {
    use wide::f32x8;
    const LANES: usize = 8;

    let tw = template.width;
    let simd_end = tw / LANES * LANES;
    let mut dot_vec = f32x8::ZERO;
    let mut sum_vec = f32x8::ZERO;
    let mut sum_sq_vec = f32x8::ZERO;
    let mut dot = 0.0f32;
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;

    for ty in 0..template.height {
        let start = (y0 + ty) * search.width + x0;
        let img_row = &search.gray[start..start + tw];
        let tpl_row = &template.zero_mean[ty * tw..(ty + 1) * tw];

        let mut tx = 0;
        while tx < simd_end {
            let mut v = [0.0f32; LANES];
            let mut t = [0.0f32; LANES];
            v.copy_from_slice(&img_row[tx..tx + LANES]);
            t.copy_from_slice(&tpl_row[tx..tx + LANES]);
            let v = f32x8::from(v);
            let t = f32x8::from(t);
            dot_vec += t * v;
            sum_vec += v;
            sum_sq_vec += v * v;
            tx += LANES;
        }
        while tx < tw {
            let v = img_row[tx];
            dot += tpl_row[tx] * v;
            sum += v;
            sum_sq += v * v;
            tx += 1;
        }
    }

    (dot + hsum(dot_vec), sum + hsum(sum_vec), sum_sq + hsum(sum_sq_vec))
}

#[cfg(feature = "simd")]
#[inline]
fn hsum(v: wide::f32x8) -> f32 {
    v.to_array().iter().sum()
}

#[cfg(test)]
mod tests {
    use super::PixelCorrelation;
    use crate::image::OwnedImage;
    use crate::scorer::{ExecutionMode, SimilarityScorer};

    fn textured(width: usize, height: usize) -> Vec<f32> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push((((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as f32);
            }
        }
        data
    }

    #[test]
    fn exact_window_scores_highest() {
        let search_data = textured(40, 40);
        let search = OwnedImage::new(search_data.clone(), 40, 40, 1).unwrap();
        let mut tpl = Vec::with_capacity(16 * 16);
        for y in 0..16 {
            let start = (8 + y) * 40 + 12;
            tpl.extend_from_slice(&search_data[start..start + 16]);
        }
        let tpl = OwnedImage::new(tpl, 16, 16, 1).unwrap();

        let scorer = PixelCorrelation::new(1.0, 4).unwrap();
        let t = scorer.encode(tpl.view(), ExecutionMode::Inference).unwrap();
        let s = scorer
            .encode(search.view(), ExecutionMode::Inference)
            .unwrap();
        let maps = scorer.score(&t, &[s], ExecutionMode::Inference).unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].shape(), (7, 7));
        let best = maps[0].get(2, 3).unwrap();
        assert!((best - 1.0).abs() < 1e-4);
        assert!(maps[0].as_slice().iter().all(|&v| v <= best + 1e-6));
    }

    #[test]
    fn flat_search_scores_zero() {
        let scorer = PixelCorrelation::new(0.5, 1).unwrap();
        let tpl = OwnedImage::new(textured(4, 4), 4, 4, 1).unwrap();
        let flat = OwnedImage::new(vec![9.0; 36], 6, 6, 1).unwrap();
        let t = scorer.encode(tpl.view(), ExecutionMode::Inference).unwrap();
        let s = scorer.encode(flat.view(), ExecutionMode::Inference).unwrap();
        let maps = scorer.score(&t, &[s], ExecutionMode::Inference).unwrap();
        assert!(maps[0].as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn default_geometry_gives_default_response_size() {
        let scorer = PixelCorrelation::new(0.001, 8).unwrap();
        let tpl = OwnedImage::new(textured(127, 127), 127, 127, 1).unwrap();
        let search = OwnedImage::new(textured(255, 255), 255, 255, 1).unwrap();
        let t = scorer.encode(tpl.view(), ExecutionMode::Inference).unwrap();
        let s = scorer
            .encode(search.view(), ExecutionMode::Inference)
            .unwrap();
        let maps = scorer.score(&t, &[s], ExecutionMode::Inference).unwrap();
        assert_eq!(maps[0].shape(), (17, 17));
    }
}
