use audiomosaic_core::{refine, select_from_palette, Chunk, Sample};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

const CHANNELS: usize = 2;
const FRAMES_PER_CHUNK: usize = 220;

fn tone_chunks(count: usize, frequency: f32) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(count);
    for index in 0..count {
        let mut samples = Vec::with_capacity(FRAMES_PER_CHUNK * CHANNELS);
        for frame in 0..FRAMES_PER_CHUNK {
            let n = index * FRAMES_PER_CHUNK + frame;
            let value =
                (n as Sample / 44_100.0 * std::f32::consts::TAU * frequency).sin() * 0.6;
            for _ in 0..CHANNELS {
                samples.push(value);
            }
        }
        chunks.push(Chunk::from_samples(samples, CHANNELS));
    }
    chunks
}

fn bench_refine(c: &mut Criterion) {
    let mut group = c.benchmark_group("refine");

    for &positions in &[64usize, 256] {
        let target = tone_chunks(positions, 440.0);
        let palette = tone_chunks(positions, 220.0);
        let initial =
            select_from_palette(&palette, positions, &mut StdRng::seed_from_u64(1))
                .expect("palette is not empty");

        group.bench_with_input(
            BenchmarkId::from_parameter(positions),
            &positions,
            |b, _| {
                b.iter_batched(
                    || (initial.clone(), StdRng::seed_from_u64(2)),
                    |(mut arrangement, mut rng)| {
                        refine(&target, &mut arrangement, 100, &mut rng, |_| {})
                            .expect("shapes are uniform")
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_refine);
criterion_main!(benches);
