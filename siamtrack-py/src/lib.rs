//! Python bindings for the siamtrack single-object tracker.
//!
//! Exposes a `Tracker` class with the built-in correlation scorer. Frames are
//! `height x width x channels` uint8 arrays; boxes are 1-indexed
//! `[x, y, width, height]`.

use numpy::{PyArray1, PyArrayMethods, PyReadonlyArray3, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use ::siamtrack::io::load_rgb_image;
use ::siamtrack::{
    BoundingBox, ImageView, PixelCorrelation, SiamError, SiamTracker, TrackerConfig,
    PARAMETER_NAMES,
};

fn to_py_err(err: SiamError) -> PyErr {
    match err {
        SiamError::InvalidBox { .. }
        | SiamError::InvalidConfig { .. }
        | SiamError::UnknownParameter { .. }
        | SiamError::InvalidDimensions { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn frame_view<'a>(frame: &'a PyReadonlyArray3<'_, u8>) -> PyResult<ImageView<'a, u8>> {
    let shape = frame.shape();
    let (height, width, channels) = (shape[0], shape[1], shape[2]);
    let data = frame.as_slice()?;
    ImageView::from_slice(data, width, height, channels).map_err(to_py_err)
}

/// Hands one tracked frame to a Python callable as an `H x W x C` array.
fn show_frame(
    callback: &Bound<'_, PyAny>,
    idx: usize,
    frame: ImageView<'_, u8>,
    bbox: &BoundingBox,
) -> PyResult<()> {
    let py = callback.py();
    let data: Vec<u8> = (0..frame.height())
        .filter_map(|y| frame.row(y))
        .flatten()
        .copied()
        .collect();
    let pixels =
        PyArray1::from_vec(py, data).reshape([frame.height(), frame.width(), frame.channels()])?;
    callback.call1((idx, pixels, bbox.to_array()))?;
    Ok(())
}

/// Siamese single-object tracker.
#[pyclass]
pub struct Tracker {
    inner: SiamTracker<PixelCorrelation>,
    /// Tracker name reported by benchmarks.
    #[pyo3(get)]
    name: String,
}

#[pymethods]
impl Tracker {
    /// Create a tracker.
    ///
    /// Keyword arguments override named parameters, e.g.
    /// `Tracker(scale_count=5, window_influence=0.3)`. Unknown names raise
    /// ValueError.
    #[new]
    #[pyo3(signature = (name = "SiamFC".to_string(), **params))]
    fn new(name: String, params: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let mut overrides = Vec::new();
        if let Some(params) = params {
            for (key, value) in params.iter() {
                let key: String = key.extract()?;
                let value: f64 = value.extract()?;
                overrides.push((key, value));
            }
        }
        let cfg = TrackerConfig::from_overrides(overrides.iter().map(|(k, v)| (k.as_str(), *v)))
            .map_err(to_py_err)?;
        let scorer = PixelCorrelation::from_config(&cfg).map_err(to_py_err)?;
        let inner = SiamTracker::new(scorer, cfg).map_err(to_py_err)?;
        Ok(Self { inner, name })
    }

    /// Names accepted as keyword arguments.
    #[staticmethod]
    fn parameter_names() -> Vec<&'static str> {
        PARAMETER_NAMES.to_vec()
    }

    /// Start tracking `bbox` in `frame`.
    fn init(&mut self, frame: PyReadonlyArray3<'_, u8>, bbox: [f64; 4]) -> PyResult<()> {
        let view = frame_view(&frame)?;
        self.inner
            .init(view, BoundingBox::from_array(bbox))
            .map_err(to_py_err)
    }

    /// Locate the target in `frame` and return its box.
    fn update(&mut self, frame: PyReadonlyArray3<'_, u8>) -> PyResult<[f64; 4]> {
        let view = frame_view(&frame)?;
        let bbox = self.inner.update(view).map_err(to_py_err)?;
        Ok(bbox.to_array())
    }

    /// Track a sequence of image files.
    ///
    /// Args:
    ///     img_files: frame paths in temporal order
    ///     bbox: initial box in the first frame
    ///     visualize: optional callable invoked as `visualize(index, frame, box)`
    ///         after every frame; the first exception it raises is re-raised
    ///         once tracking finishes
    ///
    /// Returns:
    ///     (boxes, times): one box and one latency in seconds per frame
    #[pyo3(signature = (img_files, bbox, visualize = None))]
    fn track(
        &mut self,
        img_files: Vec<String>,
        bbox: [f64; 4],
        visualize: Option<Bound<'_, PyAny>>,
    ) -> PyResult<(Vec<[f64; 4]>, Vec<f64>)> {
        let init_box = BoundingBox::from_array(bbox);
        let mut callback_err: Option<PyErr> = None;
        let out = self
            .inner
            .track_with(
                img_files.iter().map(load_rgb_image),
                init_box,
                |idx, frame, bbox| {
                    let Some(callback) = &visualize else {
                        return;
                    };
                    if callback_err.is_none() {
                        callback_err = show_frame(callback, idx, frame, bbox).err();
                    }
                },
            )
            .map_err(to_py_err)?;
        if let Some(err) = callback_err {
            return Err(err);
        }
        let boxes = out.boxes.iter().map(|b| b.to_array()).collect();
        Ok((boxes, out.latencies))
    }

    fn __repr__(&self) -> String {
        let cfg = self.inner.config();
        format!(
            "Tracker(name='{}', scale_count={}, scale_step={}, window_influence={})",
            self.name, cfg.scale_count, cfg.scale_step, cfg.window_influence
        )
    }
}

/// Python module for the siamtrack tracker.
#[pymodule]
fn siamtrack(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Tracker>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
