use criterion::{black_box, criterion_group, criterion_main, Criterion};
use inference_api::{NativeConfig, PaddlePredictor, PaddleTensor};
use inference_engine::{to_tract, IdentityProgram, NativePredictor};
use std::sync::Arc;

fn bench_to_tract(c: &mut Criterion) {
    let values: Vec<f32> = (0..224 * 224 * 3).map(|i| i as f32).collect();
    let tensor = PaddleTensor::from_f32("image", vec![1, 3, 224, 224], &values);

    c.bench_function("to_tract_f32_1x3x224x224", |b| {
        b.iter(|| to_tract(black_box(&tensor)).unwrap())
    });
}

fn bench_identity_run(c: &mut Criterion) {
    let mut predictor = NativePredictor::with_program(
        &NativeConfig::new("bench"),
        Arc::new(IdentityProgram::new(["x"])),
    )
    .unwrap();
    let input = PaddleTensor::from_f32("x", vec![64, 128], &[0.5; 64 * 128]);
    let mut outputs = Vec::new();

    c.bench_function("native_identity_run_64x128", |b| {
        b.iter(|| {
            predictor
                .run(std::slice::from_ref(black_box(&input)), &mut outputs, None)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_to_tract, bench_identity_run);
criterion_main!(benches);
