use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use topic_perplexity::topic::{
    CountModel, Corpus, FoldInConfig, FoldInEstimator, PerplexityCalculator, PerplexityConfig,
    ScoringMode, UniformEstimator,
};

const VOCABULARY: usize = 2_000;
const TOPICS: usize = 50;

fn synthetic_corpus(rng: &mut StdRng, documents: usize, length: usize) -> Corpus<u32> {
    Corpus::from_tokens((0..documents).map(|_| {
        (0..length)
            .map(|_| rng.gen_range(0..VOCABULARY as u32))
            .collect::<Vec<_>>()
    }))
}

fn synthetic_model(rng: &mut StdRng) -> CountModel<Corpus<u32>> {
    let mut training = Corpus::new();
    for word in 0..VOCABULARY as u32 {
        training.intern(word);
    }
    let counts = Array2::from_shape_fn((TOPICS, VOCABULARY), |_| rng.gen_range(0..20));
    CountModel::from_counts(training, counts).unwrap()
}

fn bench_perplexity(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let model = synthetic_model(&mut rng);
    let test = synthetic_corpus(&mut rng, 200, 100);

    let mut group = c.benchmark_group("perplexity");
    for mode in [ScoringMode::FullDocument, ScoringMode::HeldOutWord] {
        group.bench_with_input(BenchmarkId::new("uniform", format!("{mode:?}")), &mode, |b, &mode| {
            let mut calculator =
                PerplexityCalculator::with_seed(PerplexityConfig::new(mode), UniformEstimator, 7);
            b.iter(|| black_box(calculator.compute_perplexity(&test, &model).unwrap()))
        });
    }

    let estimator = FoldInEstimator::new(FoldInConfig::new(1).with_iterations(10)).unwrap();
    let calculator = PerplexityCalculator::with_seed(PerplexityConfig::default(), estimator, 7);
    group.bench_function("fold_in_parallel", |b| {
        b.iter(|| black_box(calculator.par_evaluate(&test, &model, 3).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_perplexity);
criterion_main!(benches);
