//! Model description, sidecar metadata and output decoding.
//!
//! A model may ship a TOML sidecar next to it (`model.onnx` → `model.toml`):
//!
//! ```toml
//! input_name = "audio"
//! output_name = "visemes"
//! sample_rate = 16000
//! window = 3200
//! activation = "softmax"
//! output_count = 15
//! ```
//!
//! Every field is optional. Without a sidecar the defaults below apply and the first model
//! input and output are used.

use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use visemes_core::{Error, Result, VisemeWeights, LAUGHTER_INDEX};

/// Rate the bundled viseme models consume.
pub const DEFAULT_MODEL_SAMPLE_RATE: u32 = 16_000;

/// Rolling input window in model-rate samples (200 ms at 16 kHz).
pub const DEFAULT_WINDOW: usize = 3_200;

/// Visemes the model predicts. Laughter is not among them.
pub const MODEL_OUTPUT_COUNT: usize = LAUGHTER_INDEX;

/// Post-processing applied to the model's last time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Logits over mutually exclusive visemes.
    #[default]
    Softmax,
    /// Independent per-viseme logits.
    Sigmoid,
    /// The model already emits weights.
    None,
}

impl Activation {
    pub fn apply(self, values: &mut [f32]) {
        match self {
            Activation::Softmax => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                if !max.is_finite() {
                    return;
                }
                let mut sum = 0.0;
                for v in values.iter_mut() {
                    *v = (*v - max).exp();
                    sum += *v;
                }
                if sum > 0.0 {
                    for v in values.iter_mut() {
                        *v /= sum;
                    }
                }
            }
            Activation::Sigmoid => {
                for v in values.iter_mut() {
                    *v = 1.0 / (1.0 + (-*v).exp());
                }
            }
            Activation::None => {}
        }
    }
}

/// Model input/output description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelIo {
    /// Input tensor name. `None` feeds the first input positionally.
    pub input_name: Option<String>,
    /// Output tensor name. `None` reads the first output.
    pub output_name: Option<String>,
    pub sample_rate: u32,
    /// Samples per inference at the model rate.
    pub window: usize,
    pub activation: Activation,
    pub output_count: usize,
}

impl Default for ModelIo {
    fn default() -> Self {
        Self {
            input_name: None,
            output_name: None,
            sample_rate: DEFAULT_MODEL_SAMPLE_RATE,
            window: DEFAULT_WINDOW,
            activation: Activation::default(),
            output_count: MODEL_OUTPUT_COUNT,
        }
    }
}

impl ModelIo {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample_rate must be non-zero".into());
        }
        if self.window == 0 {
            return Err("window must be non-zero".into());
        }
        if self.output_count == 0 || self.output_count > MODEL_OUTPUT_COUNT {
            return Err(format!(
                "output_count must be in 1..={}, got {}",
                MODEL_OUTPUT_COUNT, self.output_count
            ));
        }
        Ok(())
    }
}

/// Sidecar location for a model file.
pub fn sidecar_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("toml")
}

/// Reads the model's sidecar, or the defaults when there is none.
pub fn load_model_io(model_path: &Path) -> Result<ModelIo> {
    let sidecar = sidecar_path(model_path);
    if !sidecar.is_file() {
        return Ok(ModelIo::default());
    }

    let contents = std::fs::read_to_string(&sidecar)?;
    let io: ModelIo = toml::from_str(&contents).map_err(|e| Error::ModelLoad {
        path: sidecar.clone(),
        reason: e.to_string(),
    })?;
    io.validate().map_err(|reason| Error::ModelLoad {
        path: sidecar.clone(),
        reason,
    })?;

    tracing::debug!("Loaded model metadata from {}", sidecar.display());
    Ok(io)
}

/// Builds an inference session for `model_path`.
pub fn load_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    let model_error = |reason: String| Error::ModelLoad {
        path: model_path.to_path_buf(),
        reason,
    };

    if !model_path.is_file() {
        return Err(model_error("file not found".into()));
    }

    let session = Session::builder()
        .map_err(|e| model_error(format!("failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| model_error(format!("failed to set optimization level: {e}")))?
        .with_intra_threads(intra_threads.max(1))
        .map_err(|e| model_error(format!("failed to set thread count: {e}")))?
        .commit_from_file(model_path)
        .map_err(|e| model_error(e.to_string()))?;

    tracing::info!("Loaded viseme model {}", model_path.display());
    Ok(session)
}

/// Decodes the last time step of a model output into weights.
///
/// `dims` is the output shape; its last dimension is the class count. Laughter stays 0.
pub fn decode_output(dims: &[i64], data: &[f32], io: &ModelIo) -> Result<VisemeWeights> {
    let classes = match dims.last() {
        Some(&d) if d > 0 => d as usize,
        _ => {
            return Err(Error::Inference(format!(
                "unexpected output shape {:?}",
                dims
            )))
        }
    };
    if classes < io.output_count || data.len() < classes {
        return Err(Error::Inference(format!(
            "output shape {:?} holds fewer than {} visemes",
            dims, io.output_count
        )));
    }

    let last_step = &data[data.len() - classes..];
    let mut values = last_step[..io.output_count].to_vec();
    io.activation.apply(&mut values);
    Ok(VisemeWeights::from_model_output(&values))
}
