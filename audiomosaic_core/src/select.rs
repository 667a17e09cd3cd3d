use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::waveform::Chunk;
use crate::MosaicError;

/// Draw `count` chunks from the palette with replacement.
///
/// When the palette holds more chunks than requested, the sequence is
/// first trimmed symmetrically so the draw centers on the middle of the
/// recording. The remaining positions are weighted with a tent profile
/// peaking at the central index, so edge chunks are picked less often.
/// The output order lines up 1:1 with target positions but is only a
/// starting guess; the refiner rearranges it afterwards.
///
/// Requesting zero chunks yields an empty sequence without touching the
/// palette; a window left empty by trimming is a degenerate input.
pub fn select_from_palette(
    chunks: &[Chunk],
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Chunk>, MosaicError> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let window = centered_window(chunks, count);
    if window.is_empty() {
        return Err(MosaicError::EmptyPalette);
    }

    let weights = tent_weights(window.len());
    let distribution = WeightedIndex::new(&weights)?;

    Ok((0..count)
        .map(|_| window[distribution.sample(rng)].clone())
        .collect())
}

/// Trim `floor((len - count) / 2)` chunks off each end when the palette
/// is larger than the request. The remainder may still exceed `count`.
fn centered_window(chunks: &[Chunk], count: usize) -> &[Chunk] {
    if chunks.len() > count {
        let snip = (chunks.len() - count) / 2;
        &chunks[snip..chunks.len() - snip]
    } else {
        chunks
    }
}

/// Index weights `sqrt(h - |h - i| + 1)` with `h = len / 2`. The `+ 1`
/// keeps every weight strictly positive, ends included.
fn tent_weights(len: usize) -> Vec<f64> {
    let half = len as f64 / 2.0;
    (0..len)
        .map(|i| (half - (half - i as f64).abs() + 1.0).sqrt())
        .collect()
}
