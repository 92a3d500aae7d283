//! Command-line entry point for building the registry train/test dataset.

use std::path::PathBuf;

use brreg_dataset::config::PipelineConfig;
use brreg_dataset::logging;
use brreg_dataset::pipeline;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

struct CliArgs {
    config_path: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    workspace_dir: Option<PathBuf>,
    file_prefix: Option<String>,
    seed: Option<u64>,
    train_fraction: Option<f64>,
    min_splittable_count: Option<usize>,
}

fn run() -> Result<(), String> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let mut config = PipelineConfig::load_or_default(args.config_path.as_deref())
        .map_err(|err| err.to_string())?;
    if let Some(out_dir) = args.out_dir {
        config.output_location = out_dir;
    }
    if let Some(workspace_dir) = args.workspace_dir {
        config.workspace_dir = Some(workspace_dir);
    }
    if let Some(prefix) = args.file_prefix {
        config.file_prefix = prefix;
    }
    if let Some(seed) = args.seed {
        config.split.seed = seed;
    }
    if let Some(fraction) = args.train_fraction {
        config.split.train_fraction = fraction;
    }
    if let Some(min) = args.min_splittable_count {
        config.split.min_splittable_count = min;
    }

    let summary = match args.snapshot {
        Some(snapshot) => pipeline::run_from_snapshot(&config, &snapshot),
        None => pipeline::run(&config),
    }
    .map_err(|err| err.to_string())?;

    println!(
        "Cleaned {} of {} snapshot rows",
        summary.clean_rows, summary.total_rows
    );
    println!(
        "Train: {} records ({} NACE groups, {} rescued) -> {}",
        summary.export.train_rows,
        summary.train_categories,
        summary.rescued_records,
        summary.export.train_path.display()
    );
    println!(
        "Test:  {} records ({} NACE groups) -> {}",
        summary.export.test_rows,
        summary.test_categories,
        summary.export.test_path.display()
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        config_path: None,
        snapshot: None,
        out_dir: None,
        workspace_dir: None,
        file_prefix: None,
        seed: None,
        train_fraction: None,
        min_splittable_count: None,
    };
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            "--snapshot" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--snapshot requires a value".to_string())?;
                parsed.snapshot = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                parsed.out_dir = Some(PathBuf::from(value));
            }
            "--workspace" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--workspace requires a value".to_string())?;
                parsed.workspace_dir = Some(PathBuf::from(value));
            }
            "--prefix" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--prefix requires a value".to_string())?;
                parsed.file_prefix = Some(value.to_string());
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                parsed.seed =
                    Some(value.parse::<u64>().map_err(|_| format!("Invalid --seed value: {value}"))?);
            }
            "--train-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--train-fraction requires a value".to_string())?;
                parsed.train_fraction = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --train-fraction value: {value}"))?,
                );
            }
            "--min-splittable-count" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--min-splittable-count requires a value".to_string())?;
                parsed.min_splittable_count = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --min-splittable-count value: {value}"))?,
                );
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(parsed)
}

fn help_text() -> String {
    [
        "brreg-dataset",
        "",
        "Builds a stratified train/test dataset from the Norwegian business registry.",
        "",
        "Usage:",
        "  brreg-dataset [options]",
        "",
        "Options:",
        "  --config <file>              TOML configuration file.",
        "  --snapshot <file>            Reuse an already-downloaded snapshot (.csv or .csv.gz).",
        "  --out <dir>                  Output directory for the Parquet partitions.",
        "  --workspace <dir>            Scratch directory for snapshot downloads.",
        "  --prefix <name>              File name stem (default: brreg_entities).",
        "  --seed <u64>                 Split seed (default: 42).",
        "  --train-fraction <f64>       Train proportion in (0, 1) (default: 0.8).",
        "  --min-splittable-count <n>   NACE groups at or below this size go wholly to train (default: 5).",
    ]
    .join("\n")
}
