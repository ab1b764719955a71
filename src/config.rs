//! Tracker configuration.
//!
//! A `TrackerConfig` is built once per session, validated, and never mutated
//! afterwards. Named overrides are applied on top of the defaults and the
//! result is validated as a whole; unknown names are rejected.

use crate::util::{SiamError, SiamResult};

/// Names accepted by [`TrackerConfig::with_override`].
pub const PARAMETER_NAMES: &[&str] = &[
    "out_scale",
    "exemplar_resolution",
    "instance_resolution",
    "context_ratio",
    "scale_count",
    "scale_step",
    "scale_lr",
    "scale_penalty",
    "window_influence",
    "response_size",
    "response_upsample",
    "total_stride",
    "r_pos",
    "r_neg",
    "epoch_count",
    "batch_size",
    "initial_lr",
    "ultimate_lr",
    "weight_decay",
    "momentum",
];

/// Tracking and training hyperparameters.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Multiplier applied by the scorer to raw correlation values.
    pub out_scale: f64,
    /// Side of the template patch fed to the encoder.
    pub exemplar_resolution: usize,
    /// Side of each search patch fed to the encoder.
    pub instance_resolution: usize,
    /// Context margin as a fraction of `h + w`.
    pub context_ratio: f64,
    /// Number of scales searched per frame.
    pub scale_count: usize,
    /// Ratio between adjacent scales.
    pub scale_step: f64,
    /// Damping of the size update toward the selected scale.
    pub scale_lr: f64,
    /// Multiplier applied to every non-center scale response.
    pub scale_penalty: f64,
    /// Weight of the cosine window in the fused response.
    pub window_influence: f64,
    /// Side of the raw response map.
    pub response_size: usize,
    /// Upsampling factor applied to response maps.
    pub response_upsample: usize,
    /// Total stride of the embedding network in instance pixels.
    pub total_stride: usize,
    /// Positive label radius in instance pixels.
    pub r_pos: f64,
    /// Negative label radius in instance pixels.
    pub r_neg: f64,
    /// Training epochs (training only).
    pub epoch_count: usize,
    /// Pairs per training batch (training only).
    pub batch_size: usize,
    /// Learning rate of the first epoch (training only).
    pub initial_lr: f64,
    /// Learning rate reached after the last epoch (training only).
    pub ultimate_lr: f64,
    /// L2 weight decay (training only).
    pub weight_decay: f64,
    /// SGD momentum (training only).
    pub momentum: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            out_scale: 0.001,
            exemplar_resolution: 127,
            instance_resolution: 255,
            context_ratio: 0.5,
            scale_count: 3,
            scale_step: 1.0375,
            scale_lr: 0.59,
            scale_penalty: 0.9745,
            window_influence: 0.176,
            response_size: 17,
            response_upsample: 16,
            total_stride: 8,
            r_pos: 16.0,
            r_neg: 0.0,
            epoch_count: 50,
            batch_size: 8,
            initial_lr: 1e-2,
            ultimate_lr: 1e-5,
            weight_decay: 5e-4,
            momentum: 0.9,
        }
    }
}

impl TrackerConfig {
    /// Builds a validated configuration from defaults plus named overrides.
    pub fn from_overrides<'a, I>(overrides: I) -> SiamResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut cfg = Self::default();
        for (name, value) in overrides {
            cfg = cfg.with_override(name, value)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Returns a copy with the named field set to `value`.
    ///
    /// Integer fields accept only non-negative whole numbers. The result is
    /// not validated; call [`TrackerConfig::validate`] once all overrides are
    /// applied.
    pub fn with_override(mut self, name: &str, value: f64) -> SiamResult<Self> {
        match name {
            "out_scale" => self.out_scale = value,
            "exemplar_resolution" => self.exemplar_resolution = as_count("exemplar_resolution", value)?,
            "instance_resolution" => self.instance_resolution = as_count("instance_resolution", value)?,
            "context_ratio" => self.context_ratio = value,
            "scale_count" => self.scale_count = as_count("scale_count", value)?,
            "scale_step" => self.scale_step = value,
            "scale_lr" => self.scale_lr = value,
            "scale_penalty" => self.scale_penalty = value,
            "window_influence" => self.window_influence = value,
            "response_size" => self.response_size = as_count("response_size", value)?,
            "response_upsample" => self.response_upsample = as_count("response_upsample", value)?,
            "total_stride" => self.total_stride = as_count("total_stride", value)?,
            "r_pos" => self.r_pos = value,
            "r_neg" => self.r_neg = value,
            "epoch_count" => self.epoch_count = as_count("epoch_count", value)?,
            "batch_size" => self.batch_size = as_count("batch_size", value)?,
            "initial_lr" => self.initial_lr = value,
            "ultimate_lr" => self.ultimate_lr = value,
            "weight_decay" => self.weight_decay = value,
            "momentum" => self.momentum = value,
            _ => {
                return Err(SiamError::UnknownParameter {
                    name: name.to_string(),
                })
            }
        }
        Ok(self)
    }

    /// Checks every field against its valid range.
    pub fn validate(&self) -> SiamResult<()> {
        positive("out_scale", self.out_scale)?;
        nonzero("exemplar_resolution", self.exemplar_resolution)?;
        nonzero("instance_resolution", self.instance_resolution)?;
        if self.instance_resolution < self.exemplar_resolution {
            return Err(SiamError::InvalidConfig {
                name: "instance_resolution",
                reason: "must be at least exemplar_resolution",
            });
        }
        non_negative("context_ratio", self.context_ratio)?;
        nonzero("scale_count", self.scale_count)?;
        positive("scale_step", self.scale_step)?;
        if self.scale_count > 1 && self.scale_step <= 1.0 {
            return Err(SiamError::InvalidConfig {
                name: "scale_step",
                reason: "must exceed 1.0 when more than one scale is searched",
            });
        }
        unit_interval("scale_lr", self.scale_lr)?;
        positive("scale_penalty", self.scale_penalty)?;
        if self.scale_penalty > 1.0 {
            return Err(SiamError::InvalidConfig {
                name: "scale_penalty",
                reason: "must not exceed 1.0",
            });
        }
        unit_interval("window_influence", self.window_influence)?;
        nonzero("response_size", self.response_size)?;
        nonzero("response_upsample", self.response_upsample)?;
        nonzero("total_stride", self.total_stride)?;
        non_negative("r_pos", self.r_pos)?;
        non_negative("r_neg", self.r_neg)?;
        nonzero("epoch_count", self.epoch_count)?;
        nonzero("batch_size", self.batch_size)?;
        positive("initial_lr", self.initial_lr)?;
        positive("ultimate_lr", self.ultimate_lr)?;
        non_negative("weight_decay", self.weight_decay)?;
        unit_interval("momentum", self.momentum)?;
        Ok(())
    }

    /// Side of the upsampled response map.
    pub fn upscale_size(&self) -> usize {
        self.response_upsample * self.response_size
    }

    /// Index of the unit scale in the ladder.
    pub fn center_scale_index(&self) -> usize {
        self.scale_count / 2
    }

    /// Ratio `instance_resolution / exemplar_resolution`.
    pub fn size_ratio(&self) -> f64 {
        self.instance_resolution as f64 / self.exemplar_resolution as f64
    }

    /// Label radii in response cells.
    pub fn label_radii(&self) -> (f64, f64) {
        let stride = self.total_stride as f64;
        (self.r_pos / stride, self.r_neg / stride)
    }

    /// Per-epoch exponential learning-rate decay factor.
    pub fn lr_gamma(&self) -> f64 {
        (self.ultimate_lr / self.initial_lr).powf(1.0 / self.epoch_count as f64)
    }
}

fn as_count(name: &'static str, value: f64) -> SiamResult<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(SiamError::InvalidConfig {
            name,
            reason: "must be a non-negative integer",
        });
    }
    Ok(value as usize)
}

fn nonzero(name: &'static str, value: usize) -> SiamResult<()> {
    if value == 0 {
        return Err(SiamError::InvalidConfig {
            name,
            reason: "must be at least 1",
        });
    }
    Ok(())
}

fn positive(name: &'static str, value: f64) -> SiamResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SiamError::InvalidConfig {
            name,
            reason: "must be finite and positive",
        });
    }
    Ok(())
}

fn non_negative(name: &'static str, value: f64) -> SiamResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SiamError::InvalidConfig {
            name,
            reason: "must be finite and non-negative",
        });
    }
    Ok(())
}

fn unit_interval(name: &'static str, value: f64) -> SiamResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SiamError::InvalidConfig {
            name,
            reason: "must lie in [0, 1]",
        });
    }
    Ok(())
}
