//! DSP Benchmarks
//!
//! Performance benchmarks for the heavier stages and the full chain.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxfx::dsp::{self, EffectChain, EffectParameters};
use voxfx::engine::AudioBuffer;

fn benchmark_time_stretch(c: &mut Criterion) {
    let buffer = AudioBuffer::sine(440.0, 0.5, 5.0, 44100);

    c.bench_function("stretch_5s_rate_0.8", |b| {
        b.iter(|| dsp::stretch(black_box(buffer.clone()), 0.8).unwrap())
    });
}

fn benchmark_equalizer(c: &mut Criterion) {
    let buffer = AudioBuffer::sine(440.0, 0.5, 5.0, 44100);

    c.bench_function("eq_5s", |b| {
        b.iter(|| dsp::equalize(black_box(buffer.clone()), 3.0, -2.0, 4.0).unwrap())
    });
}

fn benchmark_full_chain(c: &mut Criterion) {
    let buffer = AudioBuffer::sine(440.0, 0.5, 2.0, 44100);
    let params = EffectParameters {
        pitch_shift_semitones: 2.0,
        gain_db: 3.0,
        bass_db: 2.0,
        noise_reduction_strength: 0.5,
        reverb_amount: 0.3,
        echo_delay_ms: 200.0,
        echo_decay: 0.4,
        ..Default::default()
    };
    let chain = EffectChain::new(&params).unwrap().with_seed(1);

    c.bench_function("chain_all_2s", |b| {
        b.iter(|| chain.process(black_box(buffer.clone())).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_time_stretch,
    benchmark_equalizer,
    benchmark_full_chain
);
criterion_main!(benches);
