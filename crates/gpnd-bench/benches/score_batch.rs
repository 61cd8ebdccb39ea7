// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gpnd_core::{Dataset, ExecutionContext, LabeledImage, PipelineConfig};
use gpnd_model::{AffineEncoder, AffineGenerator, AffineMap};
use gpnd_score::{NoveltyScorer, fit_reference_statistics};

const IMAGE_SIZE: usize = 16;
const PIXELS: usize = IMAGE_SIZE * IMAGE_SIZE;
const LATENT: usize = 16;
const SAMPLES: usize = 256;

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

fn lcg_unit(state: &mut u64) -> f32 {
    (lcg_next(state) >> 40) as f32 / (1u64 << 24) as f32
}

fn model_pair(state: &mut u64) -> (AffineEncoder, AffineGenerator) {
    let enc_weights: Vec<f32> = (0..LATENT * PIXELS)
        .map(|_| lcg_unit(state) * 0.1 - 0.05)
        .collect();
    let enc = AffineEncoder::new(
        AffineMap::new(enc_weights, vec![0.0; LATENT], PIXELS, LATENT)
            .expect("encoder map should be valid"),
    );

    let gen_weights: Vec<f32> = (0..PIXELS * LATENT)
        .map(|_| lcg_unit(state) * 0.2 - 0.1)
        .collect();
    let gen = AffineGenerator::new(
        AffineMap::new(gen_weights, vec![0.0; PIXELS], LATENT, PIXELS)
            .expect("generator map should be valid"),
    );
    (enc, gen)
}

fn synthetic_dataset(state: &mut u64) -> Dataset {
    let samples: Vec<LabeledImage> = (0..SAMPLES)
        .map(|_| LabeledImage {
            label: 0,
            pixels: (0..PIXELS).map(|_| lcg_unit(state)).collect(),
        })
        .collect();
    Dataset::new(samples, PIXELS).expect("benchmark dataset should be valid")
}

fn benchmark_scoring(c: &mut Criterion) {
    let mut state = 0xfeed_f00d_dead_beef_u64;
    let (encoder, generator) = model_pair(&mut state);
    let dataset = synthetic_dataset(&mut state);
    let config = PipelineConfig {
        image_size: IMAGE_SIZE,
        latent_size: LATENT,
        ..PipelineConfig::default()
    };
    let ctx = ExecutionContext::new();

    let mut group = c.benchmark_group("scoring");
    group.sample_size(20);

    group.bench_function("fit_reference_statistics_n256_p256_l16", |b| {
        b.iter(|| {
            let (stats, _) = fit_reference_statistics(
                black_box(&ctx),
                black_box(&encoder),
                black_box(&generator),
                black_box(&dataset),
                black_box(&config),
            )
            .expect("fit should succeed");
            black_box(stats);
        })
    });

    let (stats, _) = fit_reference_statistics(&ctx, &encoder, &generator, &dataset, &config)
        .expect("fit should succeed");
    let scorer = NoveltyScorer::new(&stats, &config).expect("scorer should build");

    group.bench_function("score_dataset_n256_p256_l16", |b| {
        b.iter(|| {
            let scored = scorer
                .score_dataset(
                    black_box(&ctx),
                    black_box(&encoder),
                    black_box(&generator),
                    black_box(&dataset),
                    black_box(&[0u32][..]),
                )
                .expect("scoring should succeed");
            black_box(scored);
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_scoring);
criterion_main!(benches);
