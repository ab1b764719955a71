//! Single-object tracking session.
//!
//! A [`SiamTracker`] owns one session: the config, the scorer, and the state
//! created by `init` and mutated by every `update`. Frames must be fed in
//! temporal order; each update depends on the state left by the previous one.
//! Independent sessions each own their own tracker.

use crate::config::TrackerConfig;
use crate::crop::crop_and_resize;
use crate::decode::{CosineWindow, Decoded, ResponseDecoder};
use crate::geometry::{BoundingBox, CenterBox, Point, Size};
use crate::image::{ImageView, OwnedImage};
use crate::plan::{scale_ladder, SearchGeometry};
use crate::scorer::{ExecutionMode, SimilarityScorer};
use crate::trace::{trace_event, trace_span};
use crate::util::{SiamError, SiamResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::time::Instant;

/// Lifecycle of a tracking session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerPhase {
    /// No frame has been seen yet.
    Uninitialized,
    /// `init` succeeded; no update yet.
    Initialized,
    /// At least one `update` has run.
    Tracking,
}

/// Mutable per-session tracking state.
#[derive(Clone, Debug)]
pub struct TrackerState<E> {
    center: Point,
    target_size: Size,
    geometry: SearchGeometry,
    scale_factors: Vec<f64>,
    cosine_window: CosineWindow,
    average_color: Vec<f64>,
    template_embedding: E,
}

impl<E> TrackerState<E> {
    /// Current target center in 0-indexed frame coordinates.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Current target extent.
    pub fn target_size(&self) -> Size {
        self.target_size
    }

    /// Current template side in frame pixels.
    pub fn template_size(&self) -> f64 {
        self.geometry.template_size
    }

    /// Current unit-scale search side in frame pixels.
    pub fn search_size(&self) -> f64 {
        self.geometry.search_size
    }

    /// Scale ladder searched on every update.
    pub fn scale_factors(&self) -> &[f64] {
        &self.scale_factors
    }

    /// Cosine window fused into the chosen response.
    pub fn cosine_window(&self) -> &CosineWindow {
        &self.cosine_window
    }

    /// Per-channel mean of the initializing frame.
    pub fn average_color(&self) -> &[f64] {
        &self.average_color
    }

    /// Embedding of the template patch.
    pub fn template_embedding(&self) -> &E {
        &self.template_embedding
    }

    /// Current target as a 1-indexed corner-form box.
    pub fn bounding_box(&self) -> BoundingBox {
        CenterBox {
            center: self.center,
            size: self.target_size,
        }
        .to_corner()
    }

    fn apply(&mut self, decoded: &Decoded) {
        self.center.y += decoded.displacement.y;
        self.center.x += decoded.displacement.x;
        self.target_size = self.target_size.scaled(decoded.applied_scale);
        self.geometry = self.geometry.scaled(decoded.applied_scale);
    }
}

/// Boxes and per-frame latencies produced by [`SiamTracker::track`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackOutput {
    /// One box per frame; the first is the initial box.
    pub boxes: Vec<BoundingBox>,
    /// Wall-clock seconds spent in `init`/`update` per frame.
    pub latencies: Vec<f64>,
}

/// Siamese single-object tracker over a pluggable scorer.
pub struct SiamTracker<S: SimilarityScorer> {
    cfg: TrackerConfig,
    scorer: S,
    decoder: ResponseDecoder,
    state: Option<TrackerState<S::Embedding>>,
    phase: TrackerPhase,
}

impl<S: SimilarityScorer> SiamTracker<S> {
    /// Creates a session, validating `cfg` first.
    pub fn new(scorer: S, cfg: TrackerConfig) -> SiamResult<Self> {
        cfg.validate()?;
        let decoder = ResponseDecoder::new(&cfg);
        Ok(Self {
            cfg,
            scorer,
            decoder,
            state: None,
            phase: TrackerPhase::Uninitialized,
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

    /// Returns the current phase.
    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    /// Returns the state, if `init` has run.
    pub fn state(&self) -> Option<&TrackerState<S::Embedding>> {
        self.state.as_ref()
    }

    /// Starts a session on `frame` with the 1-indexed corner-form `init_box`.
    ///
    /// Any previous state is replaced.
    pub fn init(&mut self, frame: ImageView<'_, u8>, init_box: BoundingBox) -> SiamResult<()> {
        let _span = trace_span!("tracker_init").entered();
        init_box.validate()?;

        let target = init_box.to_center();
        let geometry = SearchGeometry::from_target(target.size, &self.cfg);
        let cosine_window = CosineWindow::new(self.decoder.upscale_size());
        let scale_factors = scale_ladder(self.cfg.scale_step, self.cfg.scale_count);
        let average_color = frame.channel_means();

        let patch = crop_and_resize(
            frame,
            target.center,
            geometry.template_size,
            self.cfg.exemplar_resolution,
            &average_color,
        )?;
        let template_embedding = self.scorer.encode(patch.view(), ExecutionMode::Inference)?;

        trace_event!(
            "template_cached",
            template_size = geometry.template_size,
            search_size = geometry.search_size
        );

        self.state = Some(TrackerState {
            center: target.center,
            target_size: target.size,
            geometry,
            scale_factors,
            cosine_window,
            average_color,
            template_embedding,
        });
        self.phase = TrackerPhase::Initialized;
        Ok(())
    }

    /// Locates the target in `frame` and returns its 1-indexed corner-form box.
    pub fn update(&mut self, frame: ImageView<'_, u8>) -> SiamResult<BoundingBox> {
        let _span = trace_span!("tracker_update").entered();
        let state = self.state.as_mut().ok_or(SiamError::NotInitialized)?;

        let patches = search_patches(
            frame,
            state.center,
            state.geometry.search_size,
            &state.scale_factors,
            self.cfg.instance_resolution,
            &state.average_color,
        )?;
        let embeddings = self
            .scorer
            .encode_batch(&patches, ExecutionMode::Inference)?;
        let maps = self.scorer.score(
            &state.template_embedding,
            &embeddings,
            ExecutionMode::Inference,
        )?;

        let decoded = self.decoder.decode(
            &maps,
            &state.scale_factors,
            state.geometry.search_size,
            &state.cosine_window,
        )?;
        state.apply(&decoded);
        self.phase = TrackerPhase::Tracking;

        Ok(state.bounding_box())
    }

    /// Runs `init` on the first frame and `update` on the rest.
    ///
    /// Frame loading errors are returned unchanged; the first failure aborts
    /// the sequence.
    pub fn track<I, E>(&mut self, frames: I, init_box: BoundingBox) -> Result<TrackOutput, E>
    where
        I: IntoIterator<Item = Result<OwnedImage<u8>, E>>,
        E: From<SiamError>,
    {
        self.track_with(frames, init_box, |_, _, _| {})
    }

    /// Like [`SiamTracker::track`], calling `visualize` after every frame.
    ///
    /// The callback only observes; it cannot influence tracking.
    pub fn track_with<I, E, F>(
        &mut self,
        frames: I,
        init_box: BoundingBox,
        mut visualize: F,
    ) -> Result<TrackOutput, E>
    where
        I: IntoIterator<Item = Result<OwnedImage<u8>, E>>,
        E: From<SiamError>,
        F: FnMut(usize, ImageView<'_, u8>, &BoundingBox),
    {
        let _span = trace_span!("track_sequence").entered();
        let mut output = TrackOutput::default();

        for (idx, frame) in frames.into_iter().enumerate() {
            let frame = frame?;
            let begin = Instant::now();
            let bbox = if idx == 0 {
                self.init(frame.view(), init_box)?;
                init_box
            } else {
                self.update(frame.view())?
            };
            output.latencies.push(begin.elapsed().as_secs_f64());
            output.boxes.push(bbox);

            trace_event!(
                "frame_tracked",
                frame = idx,
                x = bbox.x,
                y = bbox.y,
                width = bbox.width,
                height = bbox.height
            );
            visualize(idx, frame.view(), &bbox);
        }

        if output.boxes.is_empty() {
            return Err(SiamError::EmptySequence.into());
        }
        Ok(output)
    }
}

/// Crops one search patch per scale factor.
fn search_patches(
    frame: ImageView<'_, u8>,
    center: Point,
    search_size: f64,
    scale_factors: &[f64],
    instance_resolution: usize,
    fill: &[f64],
) -> SiamResult<Vec<OwnedImage<f32>>> {
    let crop = |&factor: &f64| {
        crop_and_resize(frame, center, search_size * factor, instance_resolution, fill)
    };
    #[cfg(feature = "rayon")]
    {
        scale_factors.par_iter().map(crop).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        scale_factors.iter().map(crop).collect()
    }
}
