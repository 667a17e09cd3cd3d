use crate::MosaicError;

/// Per-channel sample value used throughout the pipeline.
pub type Sample = f32;

/// Interleaved multi-channel audio held fully in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples: Vec<Sample>,
    channels: usize,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<Sample>, channels: usize, sample_rate: u32) -> Self {
        debug_assert!(channels > 0, "waveform requires at least one channel");
        debug_assert_eq!(samples.len() % channels, 0, "samples must form whole frames");
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of multi-channel frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }
}

/// A contiguous run of frames cut from a [`Waveform`].
///
/// Chunks are immutable values once cut; the refiner only moves them
/// between positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    samples: Vec<Sample>,
    channels: usize,
}

impl Chunk {
    pub fn from_samples(samples: Vec<Sample>, channels: usize) -> Self {
        debug_assert!(channels > 0, "chunk requires at least one channel");
        debug_assert_eq!(samples.len() % channels, 0, "samples must form whole frames");
        Self { samples, channels }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Append zero-valued frames until the chunk holds `frames` frames.
    /// Chunks already at or above the requested length are left untouched.
    pub fn pad_to_frames(&mut self, frames: usize) {
        let wanted = frames * self.channels;
        if self.samples.len() < wanted {
            self.samples.resize(wanted, 0.0);
        }
    }

    /// Mean squared per-sample error against another chunk of the same
    /// shape. Accumulates in f64 so long chunks do not lose precision.
    pub fn mean_squared_error(&self, other: &Chunk) -> Result<f64, MosaicError> {
        if self.channels != other.channels || self.samples.len() != other.samples.len() {
            return Err(MosaicError::ShapeMismatch {
                left_frames: self.frames(),
                left_channels: self.channels,
                right_frames: other.frames(),
                right_channels: other.channels,
            });
        }

        let sum: f64 = self
            .samples
            .iter()
            .zip(&other.samples)
            .map(|(a, b)| {
                let diff = f64::from(a - b);
                diff * diff
            })
            .sum();
        Ok(sum / self.samples.len() as f64)
    }
}

/// Split a waveform into chunks of `frames_per_chunk` frames.
///
/// Every frame appears exactly once, in the original order; only the last
/// chunk may be shorter. An empty waveform yields an empty sequence.
pub fn split_into_chunks(waveform: &Waveform, frames_per_chunk: usize) -> Vec<Chunk> {
    debug_assert!(frames_per_chunk > 0, "chunk length must be positive");
    waveform
        .samples()
        .chunks(frames_per_chunk * waveform.channels())
        .map(|samples| Chunk::from_samples(samples.to_vec(), waveform.channels()))
        .collect()
}

/// Bring every chunk in the sequence up to a uniform frame count by
/// zero-padding short chunks in place.
pub fn pad_chunks(chunks: &mut [Chunk], frames_per_chunk: usize) {
    for chunk in chunks {
        chunk.pad_to_frames(frames_per_chunk);
    }
}

/// Concatenate a chunk sequence back into a single waveform.
pub fn assemble(chunks: &[Chunk], channels: usize, sample_rate: u32) -> Waveform {
    let total: usize = chunks.iter().map(|chunk| chunk.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);
    for chunk in chunks {
        samples.extend_from_slice(&chunk.samples);
    }
    Waveform::new(samples, channels, sample_rate)
}
