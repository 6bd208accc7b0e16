//! ONNX Runtime implementation of [`VisemeBackend`].

use crate::model::{decode_output, load_model_io, load_session, ModelIo};
use crate::native::{self, SearchRoots};
use crate::resample::{RollingWindow, StreamResampler, DEFAULT_CHUNK};
use ort::session::Session;
use ort::value::Tensor;
use visemes_core::{
    BackendCapabilities, BackendConfig, Error, Result, VisemeBackend, VisemeWeights,
};

/// Options that are fixed for every backend a factory builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnnxOptions {
    /// Where to look for the runtime library.
    pub search_roots: SearchRoots,
    /// Threads ONNX Runtime may use inside one inference.
    pub intra_threads: usize,
    /// Host-rate samples per resampler chunk.
    pub resample_chunk: usize,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            search_roots: SearchRoots::default(),
            intra_threads: 1,
            resample_chunk: DEFAULT_CHUNK,
        }
    }
}

pub struct OnnxBackend {
    session: Option<Session>,
    io: ModelIo,
    resampler: StreamResampler,
    window: RollingWindow,
}

// Runs the session with the configured input binding and copies out the requested output.
macro_rules! run_session {
    ($session:expr, $inputs:expr, $output_name:expr) => {{
        let outputs = $session
            .run($inputs)
            .map_err(|e| Error::Inference(format!("onnx inference failed: {e}")))?;
        let value = match $output_name {
            Some(name) => outputs
                .get(name)
                .ok_or_else(|| Error::Inference(format!("model has no output '{}'", name)))?,
            None => {
                if outputs.len() == 0 {
                    return Err(Error::Inference("onnx model returned no outputs".into()));
                }
                &outputs[0]
            }
        };
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference(format!("failed to extract output tensor<f32>: {e}")))?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        (dims, data.to_vec())
    }};
}

impl OnnxBackend {
    /// Resolves the model, makes the runtime resident and opens a session.
    pub fn initialize(config: &BackendConfig, options: &OnnxOptions) -> Result<Self> {
        let model_path = config.resolve_model_path();
        if !model_path.is_file() {
            return Err(Error::ModelLoad {
                path: model_path,
                reason: "file not found".into(),
            });
        }

        let io = load_model_io(&model_path)?;
        native::ensure_loaded(&options.search_roots)?;
        let session = load_session(&model_path, options.intra_threads)?;
        let resampler = StreamResampler::new(config.sample_rate, io.sample_rate, options.resample_chunk)?;

        tracing::info!(
            "ONNX viseme backend ready (host sr={} Hz, model sr={} Hz, window={}, activation={:?})",
            config.sample_rate,
            io.sample_rate,
            io.window,
            io.activation
        );

        Ok(Self {
            session: Some(session),
            window: RollingWindow::new(io.window),
            io,
            resampler,
        })
    }

    pub fn model_io(&self) -> &ModelIo {
        &self.io
    }

    /// Resamples `frame` to the model rate and appends it to the rolling window.
    fn advance(&mut self, frame: &[f32]) -> Result<()> {
        let resampled = self.resampler.process(frame)?;
        self.window.push(&resampled);
        Ok(())
    }
}

impl VisemeBackend for OnnxBackend {
    fn infer(&mut self, frame: &[f32]) -> Result<VisemeWeights> {
        if self.session.is_none() {
            return Err(Error::Inference("backend released".into()));
        }
        self.advance(frame)?;

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::Inference("backend released".into()))?;
        let input = self.window.as_slice().to_vec();
        let tensor = Tensor::from_array(([1usize, input.len()], input))
            .map_err(|e| Error::Inference(format!("failed to create input tensor: {e}")))?;

        let output_name = self.io.output_name.as_deref();
        let (dims, data) = match self.io.input_name.as_deref() {
            Some(input_name) => run_session!(session, ort::inputs![input_name => tensor], output_name),
            None => run_session!(session, ort::inputs![tensor], output_name),
        };

        decode_output(&dims, &data, &self.io)
    }

    fn observe(&mut self, frame: &[f32]) {
        if let Err(e) = self.advance(frame) {
            tracing::debug!("Dropping buffered audio after resampler error: {}", e);
            self.resampler.reset();
            self.window.clear();
        }
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            self.resampler.reset();
            self.window.clear();
            tracing::debug!("ONNX viseme session released");
        }
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "ONNX Runtime".into(),
            model_sample_rate: self.io.sample_rate,
        }
    }
}
