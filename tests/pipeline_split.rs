//! End-to-end pipeline test over a synthetic snapshot and a loopback Klass
//! service.

use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use arrow::array::{Array, StringArray};
use flate2::{Compression, write::GzEncoder};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tempfile::tempdir;

use brreg_dataset::config::PipelineConfig;
use brreg_dataset::pipeline;

const HEADER: &str = "\"organisasjonsnummer\",\"navn\",\"organisasjonsform.kode\",\"naeringskode1.kode\",\"naeringskode1.beskrivelse\",\"hjemmeside\",\"stiftelsesdato\",\"antallAnsatte\",\"institusjonellSektorkode.kode\",\"institusjonellSektorkode.beskrivelse\",\"aktivitet\",\"vedtektsfestetFormaal\",\"konkurs\",\"registrertIForetaksregisteret\"";

fn snapshot_row(orgnr: u32, nace: &str, bankrupt: &str, registered: &str) -> String {
    format!(
        "\"{orgnr}\",\"Selskap {orgnr} AS\",\"AS\",\"{nace}\",\"\",\"\",\"2010-01-01\",\"5\",\"2100\",\"Private AS\",\"Drift\",\"Formaal\",\"{bankrupt}\",\"{registered}\""
    )
}

/// 12 clean records: NACE 62.010 x 9, 47.111 x 2, 01.110 x 1, plus three rows
/// the cleaning step must drop.
fn write_snapshot(path: &Path) {
    let mut lines = vec![HEADER.to_string()];
    for orgnr in 1..=9 {
        lines.push(snapshot_row(orgnr, "62.010", "false", "true"));
    }
    for orgnr in 10..=11 {
        lines.push(snapshot_row(orgnr, "47.111", "false", "true"));
    }
    lines.push(snapshot_row(12, "01.110", "false", "true"));
    lines.push(snapshot_row(13, "62.010", "true", "true"));
    lines.push(snapshot_row(14, "62.010", "false", "false"));
    lines.push(snapshot_row(15, "", "false", "true"));

    let file = File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(lines.join("\n").as_bytes()).unwrap();
    encoder.finish().unwrap();
}

/// Serve the same Klass `codesAt` payload for a fixed number of requests.
fn serve_klass(requests: usize) -> String {
    let body = r#"{"codes":[
        {"code":"62.010","name":"Computer programming activities"},
        {"code":"47.111","name":"Retail sale, non-specialised stores"},
        {"code":"01.110","name":"Growing of cereals"},
        {"code":"2100","name":"Private non-financial corporations"},
        {"code":"AS","name":"Private limited company"}
    ]}"#;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for _ in 0..requests {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        }
    });
    format!("http://{}", addr)
}

fn read_string_column(path: &Path, column: &str) -> Vec<String> {
    let file = File::open(path).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let mut values = Vec::new();
    for batch in reader {
        let batch = batch.unwrap();
        let idx = batch.schema().index_of(column).unwrap();
        let array = batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .clone();
        for i in 0..array.len() {
            if array.is_null(i) {
                values.push(String::new());
            } else {
                values.push(array.value(i).to_string());
            }
        }
    }
    values
}

fn test_config(out_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output_location = out_dir.to_path_buf();
    config.klass_date = Some("2026-01-01".to_string());
    config.split.train_fraction = 0.8;
    config.split.seed = 42;
    config.split.min_splittable_count = 0;
    config
}

#[test]
fn pipeline_builds_stratified_partitions_from_snapshot() {
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.csv.gz");
    write_snapshot(&snapshot);

    let mut config = test_config(&dir.path().join("out"));
    config.klass_base_url = serve_klass(3);

    let summary = pipeline::run_from_snapshot(&config, &snapshot).unwrap();

    assert_eq!(summary.total_rows, 15);
    assert_eq!(summary.clean_rows, 12);
    // 47.111 (2 records, rounds to train 2/test 0) stays whole in train and
    // the 01.110 singleton is rescued; 62.010 splits 7/2.
    assert_eq!(summary.export.train_rows, 10);
    assert_eq!(summary.export.test_rows, 2);
    assert_eq!(summary.train_categories, 3);
    assert_eq!(summary.test_categories, 1);
    assert_eq!(summary.rescued_records, 1);

    let train_orgnr = read_string_column(&summary.export.train_path, "orgnr");
    let test_orgnr = read_string_column(&summary.export.test_path, "orgnr");
    assert_eq!(train_orgnr.len() + test_orgnr.len(), 12);
    let mut all: Vec<String> = train_orgnr.iter().chain(test_orgnr.iter()).cloned().collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 12, "partitions must be disjoint and exhaustive");
    assert!(train_orgnr.contains(&"12".to_string()), "singleton NACE goes to train");
    assert!(test_orgnr.iter().all(|orgnr| {
        let n: u32 = orgnr.parse().unwrap();
        (1..=9).contains(&n)
    }));

    // The label join resolved the NACE codes served by the fixture.
    let train_labels = read_string_column(&summary.export.train_path, "nace_21_description_en");
    assert!(train_labels.iter().any(|label| label == "Growing of cereals"));
    assert!(!train_labels.iter().any(String::is_empty));
}

#[test]
fn rerun_with_same_seed_is_identical() {
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.csv.gz");
    write_snapshot(&snapshot);

    let mut first_config = test_config(&dir.path().join("out_a"));
    first_config.klass_base_url = serve_klass(3);
    let first = pipeline::run_from_snapshot(&first_config, &snapshot).unwrap();

    let mut second_config = test_config(&dir.path().join("out_b"));
    second_config.klass_base_url = serve_klass(3);
    let second = pipeline::run_from_snapshot(&second_config, &snapshot).unwrap();

    assert_eq!(
        read_string_column(&first.export.train_path, "orgnr"),
        read_string_column(&second.export.train_path, "orgnr")
    );
    assert_eq!(
        read_string_column(&first.export.test_path, "orgnr"),
        read_string_column(&second.export.test_path, "orgnr")
    );
}

#[test]
fn high_floor_degenerates_to_all_train() {
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.csv.gz");
    write_snapshot(&snapshot);

    let mut config = test_config(&dir.path().join("out"));
    config.klass_base_url = serve_klass(3);
    config.split.min_splittable_count = 50;

    let summary = pipeline::run_from_snapshot(&config, &snapshot).unwrap();
    assert_eq!(summary.export.train_rows, 12);
    assert_eq!(summary.export.test_rows, 0);
    assert!(summary.export.test_path.is_file());
}
