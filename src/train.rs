//! Training-step hook for learned scorers.
//!
//! The epoch loop, data loading and checkpointing live outside this crate.
//! [`Trainer::train_step`] runs one forward pass over a batch of
//! exemplar/instance pairs, scores it against block-distance labels with a
//! class-balanced logistic loss, and optionally hands the loss gradient back to
//! the scorer.

use crate::config::TrackerConfig;
use crate::image::OwnedImage;
use crate::label::{LabelCache, LabelGrid};
use crate::scorer::{ExecutionMode, ResponseMap, TrainableScorer};
use crate::trace::{trace_event, trace_span};
use crate::util::{SiamError, SiamResult};

/// Paired exemplar and instance patches; entry `i` of each forms one pair.
#[derive(Clone, Debug, Default)]
pub struct TrainingBatch {
    /// Template patches at `exemplar_resolution`.
    pub exemplars: Vec<OwnedImage<f32>>,
    /// Search patches at `instance_resolution`.
    pub instances: Vec<OwnedImage<f32>>,
}

/// Loss value and per-cell gradients for a batch of responses.
#[derive(Clone, Debug)]
pub struct LossOutput {
    /// Summed weighted binary cross-entropy.
    pub loss: f64,
    /// `d loss / d response`, one map per response.
    pub grads: Vec<ResponseMap>,
}

/// Class-balanced binary cross-entropy with logits.
///
/// Every positive (`1.0`) cell weighs `1 / num_pos`, every negative (`0.0`)
/// cell `1 / num_neg`, and cells with any other label weigh zero. Weights are
/// then normalized to sum to one over the batch.
pub fn balanced_loss(responses: &[ResponseMap], labels: &LabelGrid) -> SiamResult<LossOutput> {
    let cells = labels.as_slice();
    for map in responses {
        if map.shape() != labels.shape() {
            let (height, width) = map.shape();
            return Err(SiamError::InvalidDimensions {
                width,
                height,
                channels: 1,
            });
        }
    }

    let pos = cells.iter().filter(|&&t| t == 1.0).count();
    let neg = cells.iter().filter(|&&t| t == 0.0).count();
    let pos_w = if pos > 0 { 1.0 / pos as f64 } else { 0.0 };
    let neg_w = if neg > 0 { 1.0 / neg as f64 } else { 0.0 };
    let cell_weight = |t: f32| -> f64 {
        if t == 1.0 {
            pos_w
        } else if t == 0.0 {
            neg_w
        } else {
            0.0
        }
    };
    let total: f64 = cells.iter().map(|&t| cell_weight(t)).sum::<f64>() * responses.len() as f64;
    let norm = if total > 0.0 { 1.0 / total } else { 0.0 };

    let mut loss = 0.0f64;
    let mut grads = Vec::with_capacity(responses.len());
    for map in responses {
        let mut grad = Vec::with_capacity(cells.len());
        for (&x, &t) in map.as_slice().iter().zip(cells) {
            let w = cell_weight(t) * norm;
            let x = x as f64;
            let t = t as f64;
            let bce = x.max(0.0) - x * t + (-x.abs()).exp().ln_1p();
            loss += w * bce;
            let sigmoid = 1.0 / (1.0 + (-x).exp());
            grad.push((w * (sigmoid - t)) as f32);
        }
        grads.push(ResponseMap::new(grad, map.width(), map.height())?);
    }

    Ok(LossOutput { loss, grads })
}

/// Training session owning a scorer and its label cache.
pub struct Trainer<S: TrainableScorer> {
    cfg: TrackerConfig,
    scorer: S,
    labels: LabelCache,
}

impl<S: TrainableScorer> Trainer<S> {
    /// Creates a session, validating `cfg` first.
    pub fn new(scorer: S, cfg: TrackerConfig) -> SiamResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            scorer,
            labels: LabelCache::new(),
        })
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.cfg
    }

    /// Returns the scorer.
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Consumes the session and returns the scorer.
    pub fn into_scorer(self) -> S {
        self.scorer
    }

    /// Returns the label cache.
    pub fn label_cache(&self) -> &LabelCache {
        &self.labels
    }

    /// Runs one step and returns the batch loss.
    ///
    /// With `backward == false` this is a validation pass: the scorer runs in
    /// inference mode and is not updated.
    pub fn train_step(&mut self, batch: &TrainingBatch, backward: bool) -> SiamResult<f64> {
        let _span = trace_span!("train_step", pairs = batch.exemplars.len()).entered();
        let pairs = batch.exemplars.len();
        if pairs == 0 || pairs != batch.instances.len() {
            return Err(SiamError::BatchMismatch {
                exemplars: pairs,
                instances: batch.instances.len(),
            });
        }

        let mode = if backward {
            ExecutionMode::Training
        } else {
            ExecutionMode::Inference
        };
        let exemplars = self.scorer.encode_batch(&batch.exemplars, mode)?;
        let instances = self.scorer.encode_batch(&batch.instances, mode)?;

        let mut responses = Vec::with_capacity(pairs);
        for (z, x) in exemplars.iter().zip(&instances) {
            let mut maps = self.scorer.score(z, std::slice::from_ref(x), mode)?;
            if maps.len() != 1 {
                return Err(SiamError::ScaleCountMismatch {
                    expected: 1,
                    got: maps.len(),
                });
            }
            responses.extend(maps.pop());
        }

        let (r_pos, r_neg) = self.cfg.label_radii();
        let labels = self.labels.labels(responses[0].shape(), r_pos, r_neg);
        let out = balanced_loss(&responses, labels)?;

        if backward {
            self.scorer.backward(&out.grads)?;
        }
        trace_event!("train_loss", loss = out.loss, backward = backward);
        Ok(out.loss)
    }
}

#[cfg(test)]
mod tests {
    use super::balanced_loss;
    use crate::label::LabelGrid;
    use crate::scorer::ResponseMap;

    #[test]
    fn zero_logits_give_ln_two() {
        let labels = LabelGrid::logistic((5, 5), 1.0, 0.0);
        let maps = vec![ResponseMap::filled(0.0, 5, 5).unwrap(); 2];
        let out = balanced_loss(&maps, &labels).unwrap();
        assert!((out.loss - std::f64::consts::LN_2).abs() < 1e-9);
    }

    #[test]
    fn gradients_push_toward_labels() {
        let labels = LabelGrid::logistic((5, 5), 1.0, 0.0);
        let maps = vec![ResponseMap::filled(0.0, 5, 5).unwrap()];
        let out = balanced_loss(&maps, &labels).unwrap();
        let g = &out.grads[0];
        assert!(g.get(2, 2).unwrap() < 0.0);
        assert!(g.get(0, 0).unwrap() > 0.0);
    }

    #[test]
    fn half_labels_carry_no_weight() {
        let labels = LabelGrid::logistic((5, 5), 0.0, 2.0);
        let mut map = ResponseMap::filled(0.0, 5, 5).unwrap();
        // Distance 1 from center is labelled 0.5.
        map.set(1, 2, 50.0);
        let out = balanced_loss(&[map], &labels).unwrap();
        assert_eq!(out.grads[0].get(1, 2), Some(0.0));
        assert!((out.loss - std::f64::consts::LN_2).abs() < 1e-9);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let labels = LabelGrid::logistic((5, 5), 1.0, 0.0);
        let maps = vec![ResponseMap::filled(0.0, 4, 5).unwrap()];
        assert!(balanced_loss(&maps, &labels).is_err());
    }
}
