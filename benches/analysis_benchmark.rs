use criterion::{black_box, criterion_group, criterion_main, Criterion};
use csv_sentiment::{
    analyze_table, BuiltinModel, Classification, ClassifierError, ModelManager, OptimizationLevel,
    RuntimeConfig, SentimentClassifier, Table, TextClassifier,
};

struct ConstantClassifier;

impl TextClassifier for ConstantClassifier {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>, ClassifierError> {
        Ok(texts.iter()
            .map(|_| Classification { label: "POSITIVE".to_string(), score: 0.98765 })
            .collect())
    }
}

fn sample_csv(rows: usize) -> String {
    let mut csv = String::from("id,text,rating\n");
    for i in 0..rows {
        csv.push_str(&format!("{},\"review number {}, with a comma\",{}\n", i, i, i % 5));
    }
    csv
}

fn bench_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("Table");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for rows in [100, 1_000, 10_000] {
        let csv = sample_csv(rows);
        group.bench_function(format!("load_{}", rows), |b| b.iter(|| {
            Table::from_reader(black_box(csv.as_bytes())).unwrap()
        }));
    }

    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Analysis");
    group.sample_size(20);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    for rows in [1_000, 10_000] {
        let table = Table::from_reader(sample_csv(rows).as_bytes()).unwrap();
        group.bench_function(format!("augment_and_write_{}", rows), |b| b.iter(|| {
            analyze_table(&ConstantClassifier, black_box(table.clone()), "text", &output).unwrap()
        }));
    }

    group.finish();
}

fn bench_model(c: &mut Criterion) {
    let manager = ModelManager::new_default().unwrap();
    if !manager.is_model_downloaded(&BuiltinModel::DistilBertSst2.get_model_info().name) {
        eprintln!("Sentiment model not downloaded; run `csv-sentiment download` to benchmark inference");
        return;
    }

    let mut group = c.benchmark_group("Inference");
    group.sample_size(10);

    let texts: Vec<String> = (0..64)
        .map(|i| format!("Review {}: the delivery was quick but the packaging was damaged.", i))
        .collect();

    let configs = [
        ("single_thread", 8, RuntimeConfig {
            inter_threads: 1,
            intra_threads: 1,
            optimization_level: OptimizationLevel::Level1,
        }),
        ("batch_8", 8, RuntimeConfig::default()),
        ("batch_32", 32, RuntimeConfig::default()),
    ];

    for (name, batch_size, config) in configs {
        let classifier = SentimentClassifier::builder()
            .with_runtime_config(config)
            .with_batch_size(batch_size)
            .unwrap()
            .with_model_in(&manager, BuiltinModel::DistilBertSst2)
            .unwrap()
            .build()
            .unwrap();

        group.bench_function(format!("classify_64_{}", name), |b| b.iter(|| {
            classifier.classify_batch(black_box(&texts)).unwrap()
        }));
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_table,
    bench_analysis,
    bench_model
);
criterion_main!(benches);
