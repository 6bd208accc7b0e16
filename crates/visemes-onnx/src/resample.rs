//! Streaming resampling from the host rate to the model rate using rubato.
//!
//! Host frames arrive with arbitrary lengths. Input is buffered until a full resampler chunk
//! is available, so each call returns whatever output the buffered input produced (possibly
//! nothing). Equal rates pass samples straight through.

use rubato::{FftFixedIn, Resampler};
use visemes_core::{Error, Result};

/// Input chunk size fed to the FFT resampler.
pub const DEFAULT_CHUNK: usize = 1024;

const SUB_CHUNKS: usize = 2;

pub struct StreamResampler {
    inner: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
    from_rate: u32,
    to_rate: u32,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32, chunk: usize) -> Result<Self> {
        if from_rate == 0 || to_rate == 0 {
            return Err(Error::InterfaceInit(format!(
                "cannot resample {} Hz -> {} Hz",
                from_rate, to_rate
            )));
        }

        let inner = if from_rate == to_rate {
            None
        } else {
            let resampler = FftFixedIn::<f32>::new(
                from_rate as usize,
                to_rate as usize,
                chunk.max(1),
                SUB_CHUNKS,
                1,
            )
            .map_err(|e| Error::InterfaceInit(format!("resampler: {}", e)))?;
            Some(resampler)
        };

        Ok(Self {
            inner,
            pending: Vec::new(),
            from_rate,
            to_rate,
        })
    }

    pub fn from_rate(&self) -> u32 {
        self.from_rate
    }

    pub fn to_rate(&self) -> u32 {
        self.to_rate
    }

    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Samples waiting for a full chunk.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Feeds host samples and returns the model-rate samples produced so far.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let resampler = match self.inner.as_mut() {
            Some(resampler) => resampler,
            None => return Ok(input.to_vec()),
        };

        self.pending.extend_from_slice(input);
        let mut output = Vec::new();

        loop {
            let needed = resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            let input_channels = vec![chunk];
            let resampled = resampler
                .process(&input_channels, None)
                .map_err(|e| Error::Inference(format!("resampling failed: {}", e)))?;
            if let Some(channel) = resampled.into_iter().next() {
                output.extend(channel);
            }
        }

        Ok(output)
    }

    /// Drops buffered input and resampler history.
    pub fn reset(&mut self) {
        self.pending.clear();
        if let Some(resampler) = self.inner.as_mut() {
            resampler.reset();
        }
    }
}

/// Fixed-length window over the most recent model-rate samples.
///
/// Starts zero-filled, so inference can run before a full window of audio has arrived.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: Vec<f32>,
}

impl RollingWindow {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Appends samples, discarding the oldest ones.
    pub fn push(&mut self, input: &[f32]) {
        let len = self.samples.len();
        if input.len() >= len {
            self.samples.copy_from_slice(&input[input.len() - len..]);
        } else {
            self.samples.copy_within(input.len().., 0);
            self.samples[len - input.len()..].copy_from_slice(input);
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }
}
