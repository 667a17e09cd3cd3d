use std::fs::File;
use std::path::Path;

use log::debug;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use crate::waveform::{Sample, Waveform};
use crate::MosaicError;

/// Frames fed to the resampler per call.
const RESAMPLE_BLOCK_FRAMES: usize = 1024;

/// Decode an audio file into an interleaved in-memory waveform.
///
/// The container format is probed from the file contents with the
/// extension as a hint; the default track is decoded in full. Corrupt
/// packets are skipped the way most players do.
pub fn read_audio(path: &Path) -> Result<Waveform, MosaicError> {
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut reader = probed.format;

    let track = reader
        .default_track()
        .ok_or(MosaicError::MissingDefaultTrack)?;
    if track.codec_params.codec == CODEC_TYPE_NULL {
        return Err(MosaicError::UnsupportedCodec);
    }

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(MosaicError::MissingSampleRate)?;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<Sample> = Vec::new();
    let mut channels = 0usize;
    let mut sample_buf: Option<SampleBuffer<Sample>> = None;

    while let Ok(packet) = reader.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    channels = spec.channels.count();
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(MosaicError::from(err)),
        }
    }

    if channels == 0 {
        return Err(MosaicError::EmptyRecording(path.to_path_buf()));
    }

    debug!(
        "decoded '{}': {} frames, {} channel(s) at {} Hz",
        path.display(),
        samples.len() / channels,
        channels,
        sample_rate
    );
    Ok(Waveform::new(samples, channels, sample_rate))
}

/// Write a waveform as a 32-bit float WAV file.
pub fn write_wav(path: &Path, waveform: &Waveform) -> Result<(), MosaicError> {
    let spec = hound::WavSpec {
        channels: waveform.channels() as u16,
        sample_rate: waveform.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in waveform.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Resample a waveform to `target_rate` with a windowed-sinc converter.
///
/// Input is consumed in fixed-size blocks; the trailing partial block and
/// the converter's internal delay are flushed at the end, so the output
/// covers the whole input.
pub fn resample(waveform: &Waveform, target_rate: u32) -> Result<Waveform, MosaicError> {
    let ratio = f64::from(target_rate) / f64::from(waveform.sample_rate());
    let channels = waveform.channels();
    let planar = deinterleave(waveform);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 160,
        window: WindowFunction::Hann2,
    };
    let mut resampler =
        SincFixedIn::<Sample>::new(ratio, 2.0, params, RESAMPLE_BLOCK_FRAMES, channels)?;

    let frames = waveform.frames();
    let mut out_planar: Vec<Vec<Sample>> = vec![Vec::new(); channels];
    let mut position = 0usize;

    while frames - position >= resampler.input_frames_next() {
        let take = resampler.input_frames_next();
        let block: Vec<&[Sample]> = planar
            .iter()
            .map(|channel| &channel[position..position + take])
            .collect();
        append_planar(&mut out_planar, resampler.process(&block, None)?);
        position += take;
    }

    if position < frames {
        let block: Vec<&[Sample]> = planar.iter().map(|channel| &channel[position..]).collect();
        append_planar(&mut out_planar, resampler.process_partial(Some(&block), None)?);
    }
    append_planar(
        &mut out_planar,
        resampler.process_partial::<&[Sample]>(None, None)?,
    );

    Ok(Waveform::new(
        interleave(&out_planar),
        channels,
        target_rate,
    ))
}

fn deinterleave(waveform: &Waveform) -> Vec<Vec<Sample>> {
    let channels = waveform.channels();
    let mut planar = vec![Vec::with_capacity(waveform.frames()); channels];
    for frame in waveform.samples().chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<Sample>]) -> Vec<Sample> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut samples = Vec::with_capacity(frames * planar.len());
    for frame in 0..frames {
        for channel in planar {
            samples.push(channel[frame]);
        }
    }
    samples
}

fn append_planar(out: &mut [Vec<Sample>], block: Vec<Vec<Sample>>) {
    for (channel, produced) in out.iter_mut().zip(block) {
        channel.extend(produced);
    }
}
