//! Embedding and similarity capability used by the tracker.
//!
//! The tracker never looks inside an embedding: it encodes patches, keeps the
//! template embedding for the session, and asks the scorer for one response
//! map per search embedding. A learned network binding, a deterministic test
//! stub, and the built-in [`PixelCorrelation`] all plug in through
//! [`SimilarityScorer`].

use crate::image::{ImageView, OwnedImage};
use crate::util::{SiamError, SiamResult};

mod xcorr;

pub use xcorr::{PixelCorrelation, PixelEmbedding};

/// Whether a call is part of inference or of a training forward pass.
///
/// Inference calls never need gradient bookkeeping; training calls may record
/// whatever the scorer needs for a later [`TrainableScorer::backward`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Tracking or evaluation.
    Inference,
    /// Forward pass of a training step.
    Training,
}

/// Row-major 2D grid of similarity scores.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseMap {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl ResponseMap {
    /// Wraps a row-major buffer of exactly `width * height` scores.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> SiamResult<Self> {
        if width == 0 || height == 0 {
            return Err(SiamError::EmptyResponse);
        }
        let needed = width * height;
        if data.len() != needed {
            return Err(SiamError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates a map filled with `value`.
    pub fn filled(value: f32, width: usize, height: usize) -> SiamResult<Self> {
        Self::new(vec![value; width * height], width, height)
    }

    /// Returns the map width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the map height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Returns the scores in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the scores mutably in row-major order.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the score at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Sets the score at `(row, col)`; out-of-range writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if row < self.height && col < self.width {
            self.data[row * self.width + col] = value;
        }
    }
}

/// Encoder plus cross-correlation head.
pub trait SimilarityScorer {
    /// Opaque patch encoding.
    type Embedding;

    /// Encodes one patch.
    fn encode(&self, patch: ImageView<'_, f32>, mode: ExecutionMode)
        -> SiamResult<Self::Embedding>;

    /// Encodes a batch of patches; the default encodes them one by one.
    fn encode_batch(
        &self,
        patches: &[OwnedImage<f32>],
        mode: ExecutionMode,
    ) -> SiamResult<Vec<Self::Embedding>> {
        patches
            .iter()
            .map(|patch| self.encode(patch.view(), mode))
            .collect()
    }

    /// Scores `template` against each search embedding, returning one map per
    /// search embedding in the same order, already multiplied by the output
    /// scale.
    fn score(
        &self,
        template: &Self::Embedding,
        search: &[Self::Embedding],
        mode: ExecutionMode,
    ) -> SiamResult<Vec<ResponseMap>>;
}

impl<S: SimilarityScorer + ?Sized> SimilarityScorer for &S {
    type Embedding = S::Embedding;

    fn encode(
        &self,
        patch: ImageView<'_, f32>,
        mode: ExecutionMode,
    ) -> SiamResult<Self::Embedding> {
        (**self).encode(patch, mode)
    }

    fn encode_batch(
        &self,
        patches: &[OwnedImage<f32>],
        mode: ExecutionMode,
    ) -> SiamResult<Vec<Self::Embedding>> {
        (**self).encode_batch(patches, mode)
    }

    fn score(
        &self,
        template: &Self::Embedding,
        search: &[Self::Embedding],
        mode: ExecutionMode,
    ) -> SiamResult<Vec<ResponseMap>> {
        (**self).score(template, search, mode)
    }
}

/// A scorer whose parameters can be updated from response gradients.
pub trait TrainableScorer: SimilarityScorer {
    /// Back-propagates `d loss / d response` for the maps returned by the most
    /// recent training-mode `score` calls, in call order, and applies one
    /// optimizer step.
    fn backward(&mut self, response_grads: &[ResponseMap]) -> SiamResult<()>;
}
