use siamtrack::{
    ExecutionMode, ImageView, OwnedImage, ResponseMap, SiamError, SiamResult, SimilarityScorer,
    TrackerConfig, TrainableScorer, Trainer, TrainingBatch,
};
use std::cell::RefCell;

/// Scorer with a single bias added to every response cell.
struct BiasScorer {
    bias: f32,
    lr: f32,
    modes: RefCell<Vec<ExecutionMode>>,
    backward_calls: usize,
}

impl BiasScorer {
    fn new(bias: f32) -> Self {
        Self {
            bias,
            lr: 1.0,
            modes: RefCell::new(Vec::new()),
            backward_calls: 0,
        }
    }
}

impl SimilarityScorer for BiasScorer {
    type Embedding = usize;

    fn encode(&self, patch: ImageView<'_, f32>, mode: ExecutionMode) -> SiamResult<usize> {
        self.modes.borrow_mut().push(mode);
        Ok(patch.width())
    }

    fn score(
        &self,
        template: &usize,
        search: &[usize],
        _mode: ExecutionMode,
    ) -> SiamResult<Vec<ResponseMap>> {
        search
            .iter()
            .map(|&x| {
                let side = (x - template) / 8 + 1;
                ResponseMap::filled(self.bias, side, side)
            })
            .collect()
    }
}

impl TrainableScorer for BiasScorer {
    fn backward(&mut self, response_grads: &[ResponseMap]) -> SiamResult<()> {
        let grad: f32 = response_grads
            .iter()
            .flat_map(|g| g.as_slice().iter())
            .sum();
        self.bias -= self.lr * grad;
        self.backward_calls += 1;
        Ok(())
    }
}

fn batch(pairs: usize) -> TrainingBatch {
    let patch = |side: usize| OwnedImage::new(vec![0.5f32; side * side * 3], side, side, 3).unwrap();
    TrainingBatch {
        exemplars: (0..pairs).map(|_| patch(15)).collect(),
        instances: (0..pairs).map(|_| patch(47)).collect(),
    }
}

#[test]
fn zero_bias_loss_is_ln_two() {
    let mut trainer = Trainer::new(BiasScorer::new(0.0), TrackerConfig::default()).unwrap();
    let loss = trainer.train_step(&batch(2), false).unwrap();
    assert!((loss - std::f64::consts::LN_2).abs() < 1e-9);
}

#[test]
fn backward_runs_only_when_requested() {
    let mut trainer = Trainer::new(BiasScorer::new(0.0), TrackerConfig::default()).unwrap();

    trainer.train_step(&batch(3), false).unwrap();
    assert_eq!(trainer.scorer().backward_calls, 0);
    assert!(trainer
        .scorer()
        .modes
        .borrow()
        .iter()
        .all(|&m| m == ExecutionMode::Inference));

    trainer.train_step(&batch(3), true).unwrap();
    assert_eq!(trainer.scorer().backward_calls, 1);
    assert_eq!(
        trainer.scorer().modes.borrow().last(),
        Some(&ExecutionMode::Training)
    );
}

#[test]
fn labels_follow_response_shape() {
    let mut trainer = Trainer::new(BiasScorer::new(0.0), TrackerConfig::default()).unwrap();
    assert!(trainer.label_cache().cached().is_none());
    trainer.train_step(&batch(1), false).unwrap();
    // (47 - 15) / 8 + 1 = 5 cells per side.
    let labels = trainer.label_cache().cached().unwrap();
    assert_eq!(labels.shape(), (5, 5));
    assert_eq!(labels.get(2, 2), Some(1.0));
    assert_eq!(labels.get(0, 0), Some(0.0));
}

#[test]
fn balanced_bias_stays_put() {
    // With positives and negatives weighted equally, the bias gradient of a
    // uniform response is zero at zero logits.
    let mut trainer = Trainer::new(BiasScorer::new(0.0), TrackerConfig::default()).unwrap();
    trainer.train_step(&batch(2), true).unwrap();
    assert!(trainer.scorer().bias.abs() < 1e-6);

    // A positive bias is pulled back toward zero.
    let mut trainer = Trainer::new(BiasScorer::new(2.0), TrackerConfig::default()).unwrap();
    let before = trainer.train_step(&batch(2), true).unwrap();
    assert!(trainer.scorer().bias < 2.0);
    let after = trainer.train_step(&batch(2), false).unwrap();
    assert!(after < before);
}

#[test]
fn mismatched_batch_is_rejected() {
    let mut trainer = Trainer::new(BiasScorer::new(0.0), TrackerConfig::default()).unwrap();
    let mut b = batch(2);
    b.instances.pop();
    let err = trainer.train_step(&b, true).unwrap_err();
    assert_eq!(
        err,
        SiamError::BatchMismatch {
            exemplars: 2,
            instances: 1,
        }
    );
    let err = trainer.train_step(&TrainingBatch::default(), true).unwrap_err();
    assert!(matches!(err, SiamError::BatchMismatch { .. }));
}
