//! Core pipeline for rebuilding one recording out of chunks of another.
//!
//! The target and palette recordings are cut into fixed-length chunks, a
//! weighted random draw produces an initial arrangement of palette chunks,
//! and a patience-terminated hill climb swaps arrangement positions until
//! it stops finding improvements. No new samples are synthesized; the
//! output is always a rearrangement of palette material.

mod codec;
mod refine;
mod select;
mod waveform;

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

pub use crate::refine::{refine, RefineStats, RefineUpdate};
pub use crate::select::select_from_palette;
pub use crate::waveform::{assemble, pad_chunks, split_into_chunks, Chunk, Sample, Waveform};

/// Errors that can occur while building an audio mosaic.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// Wrapper around errors produced by the Symphonia decoding library.
    #[error(transparent)]
    Symphonia(#[from] SymphoniaError),

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper around errors raised while writing the output WAV file.
    #[error(transparent)]
    Wav(#[from] hound::Error),

    /// Error raised while constructing the palette resampler.
    #[error("failed to construct resampler: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    /// Error raised while resampling the palette.
    #[error("failed to resample palette: {0}")]
    Resample(#[from] rubato::ResampleError),

    /// Error returned when the decoder track lacks a sample rate.
    #[error("input stream does not advertise a sample rate")]
    MissingSampleRate,

    /// Error returned when the container does not expose any default track.
    #[error("input stream does not provide a default track")]
    MissingDefaultTrack,

    /// Error returned when the codec of the track cannot be handled.
    #[error("unsupported codec")]
    UnsupportedCodec,

    /// Error returned when the chunk length does not cover a single frame.
    #[error("chunk length must cover at least one frame at the target sample rate")]
    InvalidChunkLength,

    /// Error returned when a recording holds no audio frames at all.
    #[error("'{}' contains no audio frames", .0.display())]
    EmptyRecording(PathBuf),

    /// Error returned when the palette holds no chunks to draw from.
    #[error("palette contains no usable chunks after trimming")]
    EmptyPalette,

    /// Internal invariant violation: the selection weights were rejected.
    #[error("palette selection weights must be strictly positive: {0}")]
    InvalidWeights(#[from] rand::distributions::WeightedError),

    /// Error returned when the two recordings disagree on channel layout.
    #[error("channel layout mismatch: target has {target} channel(s), palette has {palette}")]
    ChannelMismatch { target: usize, palette: usize },

    /// Internal invariant violation: two compared chunks differ in shape.
    #[error(
        "chunk shape mismatch: {left_frames}x{left_channels} vs {right_frames}x{right_channels}"
    )]
    ShapeMismatch {
        left_frames: usize,
        left_channels: usize,
        right_frames: usize,
        right_channels: usize,
    },

    /// Internal invariant violation: target and arrangement differ in length.
    #[error("sequence length mismatch: target has {target} chunks, arrangement has {candidate}")]
    SequenceLengthMismatch { target: usize, candidate: usize },
}

/// Configuration for one mosaic run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Recording the output should approximate.
    pub target_path: PathBuf,
    /// Recording whose chunks are rearranged.
    pub palette_path: PathBuf,
    /// Where the rearranged audio is written, as a float WAV file.
    pub output_path: PathBuf,
    /// Nominal length of each chunk.
    pub chunk_length: Duration,
    /// Seed for the random number generator; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Consecutive rejected swap trials before refinement stops.
    pub max_swap_failures: u32,
}

impl Config {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        target: P,
        palette: Q,
        output: R,
        chunk_length: Duration,
        seed: Option<u64>,
        max_swap_failures: u32,
    ) -> Result<Self, MosaicError> {
        if chunk_length.is_zero() {
            return Err(MosaicError::InvalidChunkLength);
        }

        Ok(Self {
            target_path: target.as_ref().to_path_buf(),
            palette_path: palette.as_ref().to_path_buf(),
            output_path: output.as_ref().to_path_buf(),
            chunk_length,
            seed,
            max_swap_failures,
        })
    }
}

/// Progress notifications emitted over the course of a run.
///
/// Purely cosmetic; dropping every event changes nothing about the result.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// The palette is being brought to the target's sample rate.
    Resampling { palette_rate: u32, target_rate: u32 },
    /// Both recordings have been cut into chunks.
    Chunked {
        target_chunks: usize,
        palette_chunks: usize,
    },
    /// The initial weighted draw from the palette is done.
    Selected { drawn: usize },
    /// All chunks have been padded to a uniform length.
    Normalized,
    /// The refinement loop is about to start.
    RefineStart { max_failures: u32 },
    /// One swap trial finished; emitted after every trial.
    RefineTrial {
        consecutive_failures: u32,
        swaps: u64,
        trials: u64,
    },
    /// The final arrangement has been concatenated.
    Assembled { frames: usize },
}

/// Summary figures returned by a completed run.
#[derive(Clone, Copy, Debug)]
pub struct MosaicMetrics {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames_per_chunk: usize,
    pub target_chunks: usize,
    pub palette_chunks: usize,
    pub swaps: u64,
    pub trials: u64,
    pub output_frames: usize,
}

/// Run the whole pipeline without progress reporting.
pub fn run(config: Config) -> Result<MosaicMetrics, MosaicError> {
    run_with_progress(config, |_| {})
}

/// Run the whole pipeline, forwarding [`ProgressEvent`]s to `on_event`.
pub fn run_with_progress(
    config: Config,
    mut on_event: impl FnMut(ProgressEvent),
) -> Result<MosaicMetrics, MosaicError> {
    let target = codec::read_audio(&config.target_path)?;
    let mut palette = codec::read_audio(&config.palette_path)?;

    if target.frames() == 0 {
        return Err(MosaicError::EmptyRecording(config.target_path.clone()));
    }
    if palette.frames() == 0 {
        return Err(MosaicError::EmptyRecording(config.palette_path.clone()));
    }
    if target.channels() != palette.channels() {
        return Err(MosaicError::ChannelMismatch {
            target: target.channels(),
            palette: palette.channels(),
        });
    }

    if palette.sample_rate() != target.sample_rate() {
        info!(
            "resampling palette from {} Hz to {} Hz",
            palette.sample_rate(),
            target.sample_rate()
        );
        on_event(ProgressEvent::Resampling {
            palette_rate: palette.sample_rate(),
            target_rate: target.sample_rate(),
        });
        palette = codec::resample(&palette, target.sample_rate())?;
    }

    let frames_per_chunk = frames_per_chunk(target.sample_rate(), config.chunk_length)?;
    let mut target_chunks = split_into_chunks(&target, frames_per_chunk);
    let palette_chunks = split_into_chunks(&palette, frames_per_chunk);
    info!(
        "cut target into {} and palette into {} chunks of {} frames",
        target_chunks.len(),
        palette_chunks.len(),
        frames_per_chunk
    );
    on_event(ProgressEvent::Chunked {
        target_chunks: target_chunks.len(),
        palette_chunks: palette_chunks.len(),
    });

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut arrangement = select_from_palette(&palette_chunks, target_chunks.len(), &mut rng)?;
    on_event(ProgressEvent::Selected {
        drawn: arrangement.len(),
    });

    pad_chunks(&mut target_chunks, frames_per_chunk);
    pad_chunks(&mut arrangement, frames_per_chunk);
    on_event(ProgressEvent::Normalized);

    on_event(ProgressEvent::RefineStart {
        max_failures: config.max_swap_failures,
    });
    let stats = refine(
        &target_chunks,
        &mut arrangement,
        config.max_swap_failures,
        &mut rng,
        |update| {
            on_event(ProgressEvent::RefineTrial {
                consecutive_failures: update.consecutive_failures,
                swaps: update.swaps,
                trials: update.trials,
            });
        },
    )?;
    info!(
        "refinement accepted {} swaps over {} trials",
        stats.swaps, stats.trials
    );

    let output = assemble(&arrangement, target.channels(), target.sample_rate());
    on_event(ProgressEvent::Assembled {
        frames: output.frames(),
    });
    codec::write_wav(&config.output_path, &output)?;

    Ok(MosaicMetrics {
        sample_rate: target.sample_rate(),
        channels: target.channels(),
        frames_per_chunk,
        target_chunks: target_chunks.len(),
        palette_chunks: palette_chunks.len(),
        swaps: stats.swaps,
        trials: stats.trials,
        output_frames: output.frames(),
    })
}

/// Nominal chunk length in frames: `sample_rate * chunk_ms / 1000`,
/// rounded down. Durations too short to cover one frame are rejected.
fn frames_per_chunk(sample_rate: u32, chunk_length: Duration) -> Result<usize, MosaicError> {
    let frames = u128::from(sample_rate) * chunk_length.as_millis() / 1_000;
    if frames == 0 {
        return Err(MosaicError::InvalidChunkLength);
    }
    Ok(frames as usize)
}
