//! SiamTrack is a CPU-first single-object tracker built around a Siamese
//! similarity function.
//!
//! A template patch is cropped around the target in the first frame and
//! encoded once. Every later frame is searched at a small ladder of scales;
//! the scorer's response maps are upsampled, penalized, fused with a cosine
//! window and decoded into a new center and size. The similarity function is
//! pluggable through [`SimilarityScorer`]; [`PixelCorrelation`] is a
//! deterministic built-in. Per-scale work can run in parallel via the `rayon`
//! feature.

pub mod config;
pub mod crop;
pub mod decode;
pub mod geometry;
pub mod image;
pub mod label;
pub mod plan;
pub mod scorer;
mod trace;
pub mod tracker;
pub mod train;
pub mod util;

#[cfg(feature = "image-io")]
pub use image::io;

pub use config::{TrackerConfig, PARAMETER_NAMES};
pub use crop::{crop_and_resize, CropRegion};
pub use decode::{CosineWindow, Decoded, ResponseDecoder};
pub use geometry::{BoundingBox, CenterBox, Point, Size};
pub use image::{ImageView, OwnedImage};
pub use label::{LabelCache, LabelGrid};
pub use plan::{scale_ladder, SearchGeometry};
pub use scorer::{
    ExecutionMode, PixelCorrelation, PixelEmbedding, ResponseMap, SimilarityScorer,
    TrainableScorer,
};
pub use tracker::{SiamTracker, TrackOutput, TrackerPhase, TrackerState};
pub use train::{balanced_loss, LossOutput, Trainer, TrainingBatch};
pub use util::{SiamError, SiamResult};
