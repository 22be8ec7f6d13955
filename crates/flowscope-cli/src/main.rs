mod display;
mod logging;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use flowscope_ai::evaluate::{ClassificationReport, feature_differences, top_features};
use flowscope_ai::{Classifier, Pipeline, load_classifier};
use flowscope_client::{PredictClient, Status, run_smoke};
use flowscope_core::samples::{LABEL_BRUTE_FORCE, LABEL_XSS, XSS_KEY_FEATURES, demo_samples};
use flowscope_core::{FeatureSchema, Sample, samples};
use flowscope_store::{Dataset, ExtractOptions, extract_samples};
use flowscope_web::AppState;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "flowscope")]
#[command(about = "Web attack detection over network flow features")]
#[command(version)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, env = "FLOWSCOPE_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Classifier artifact: a `.json` forest export, or `.onnx` with the `onnx` feature
    #[arg(long, env = "FLOWSCOPE_MODEL", default_value = "models/demo_forest.json")]
    model: PathBuf,
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Labeled CSV dataset with a `Label` column
    #[arg(long, env = "FLOWSCOPE_DATASET", default_value = "web_attacks_balanced.csv")]
    dataset: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the prediction web form
    Serve {
        #[command(flatten)]
        model: ModelArgs,

        /// Listen address
        #[arg(long, env = "FLOWSCOPE_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },

    /// Classify samples locally through the inference pipeline
    Predict {
        #[command(flatten)]
        model: ModelArgs,

        /// JSON sample file (defaults to the built-in demo samples)
        #[arg(long)]
        samples: Option<PathBuf>,

        /// Only samples with this label
        #[arg(long)]
        label: Option<String>,

        /// Override a field before inference, as `NAME=VALUE` (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Print each input as a grouped feature card
        #[arg(long)]
        card: bool,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate the model against a labeled dataset
    Evaluate {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        dataset: DatasetArgs,

        /// JSON sample file to run after the report (defaults to the demo samples)
        #[arg(long)]
        samples: Option<PathBuf>,

        /// Number of top features to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Extract one complete sample per label from a dataset
    ExtractSamples {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Rows per label to try before giving up
        #[arg(long, default_value_t = 5)]
        max_attempts: usize,

        /// Only extract this label
        #[arg(long)]
        label: Option<String>,

        /// Write the samples here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Submit samples to a running web form and compare with local inference
    Smoke {
        /// Base URL of the web form
        #[arg(long, env = "FLOWSCOPE_URL", default_value = "http://127.0.0.1:5000")]
        url: String,

        #[command(flatten)]
        model: ModelArgs,

        /// JSON sample file (defaults to the built-in demo samples)
        #[arg(long)]
        samples: Option<PathBuf>,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(cli.log_file.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "flowscope");

    match cli.command {
        Command::Serve { model, bind } => {
            let state = AppState::load(&model.model);
            flowscope_web::serve(bind, Arc::new(state))
                .await
                .with_context(|| format!("serving on {bind}"))?;
        }
        Command::Predict {
            model,
            samples,
            label,
            fields,
            card,
            json,
        } => {
            let pipeline = local_pipeline(&model.model)?;
            let samples = filter_label(load_samples(samples.as_deref())?, label.as_deref())?;
            predict(&pipeline, &samples, &fields, card, json)?;
        }
        Command::Evaluate {
            model,
            dataset,
            samples,
            top,
        } => {
            let samples = load_samples(samples.as_deref())?;
            evaluate(&model.model, &dataset.dataset, &samples, top)?;
        }
        Command::ExtractSamples {
            dataset,
            max_attempts,
            label,
            out,
        } => {
            let options = ExtractOptions {
                max_attempts,
                label,
            };
            extract(&dataset.dataset, &options, out.as_deref())?;
        }
        Command::Smoke {
            url,
            model,
            samples,
        } => {
            let samples = load_samples(samples.as_deref())?;
            smoke(&url, &model.model, &samples).await?;
        }
    }

    Ok(())
}

fn local_pipeline(model: &Path) -> anyhow::Result<Pipeline> {
    let classifier = load_classifier(model)
        .with_context(|| format!("loading model {}", model.display()))?;
    Ok(Pipeline::new(FeatureSchema::flow(), Some(classifier)))
}

fn load_samples(path: Option<&Path>) -> anyhow::Result<Vec<Sample>> {
    let Some(path) = path else {
        return Ok(demo_samples());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading samples {}", path.display()))?;
    samples::samples_from_json(&json).with_context(|| format!("parsing samples {}", path.display()))
}

fn filter_label(samples: Vec<Sample>, label: Option<&str>) -> anyhow::Result<Vec<Sample>> {
    let Some(label) = label else {
        return Ok(samples);
    };
    let kept: Vec<Sample> = samples.into_iter().filter(|s| s.label == label).collect();
    if kept.is_empty() {
        bail!("no sample labelled {label:?}");
    }
    Ok(kept)
}

fn predict(
    pipeline: &Pipeline,
    samples: &[Sample],
    overrides: &[(String, String)],
    card: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut results = Vec::with_capacity(samples.len());
    for sample in samples {
        let mut record = sample.to_raw_record();
        for (name, value) in overrides {
            record.insert(name.clone(), value.clone());
        }

        if card && !json && let Ok(vector) = pipeline.validate(&record) {
            display::print_flow_card(&sample.label, &vector);
        }

        let outcome = pipeline.infer(&record);
        if json {
            results.push(match &outcome {
                Ok(prediction) => serde_json::json!({
                    "label": sample.label,
                    "prediction": prediction,
                }),
                Err(e) => serde_json::json!({
                    "label": sample.label,
                    "error": e.to_string(),
                }),
            });
            continue;
        }
        match outcome {
            Ok(prediction) => {
                display::print_prediction(&format!("Label: {}", sample.label), &prediction)
            }
            Err(e) => println!("Label: {}\n  Error: {e}", sample.label),
        }
        println!();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

fn evaluate(model: &Path, dataset: &Path, samples: &[Sample], top: usize) -> anyhow::Result<()> {
    let classifier: Arc<dyn Classifier> = load_classifier(model)
        .with_context(|| format!("loading model {}", model.display()))?;
    let schema = FeatureSchema::flow();
    let data = Dataset::from_csv(dataset, &schema)
        .with_context(|| format!("loading dataset {}", dataset.display()))?;

    let (features, labels) = data.complete_rows()?;
    if labels.len() < data.num_rows() {
        warn!(
            skipped = data.num_rows() - labels.len(),
            "rows with missing values left out of evaluation"
        );
    }
    let predicted = classifier
        .predict(&features)
        .context("predicting dataset rows")?;
    display::print_report(&ClassificationReport::from_labels(&labels, &predicted));

    if let Some(importances) = classifier.feature_importances() {
        println!();
        display::print_top_features(&top_features(&importances, top));
    }

    let pipeline = Pipeline::new(schema, Some(classifier));
    for sample in samples {
        println!();
        match pipeline.infer(&sample.to_raw_record()) {
            Ok(prediction) => {
                display::print_prediction(&format!("Label: {}", sample.label), &prediction);
                if sample.label == LABEL_XSS
                    && prediction.label != LABEL_XSS
                    && let Some(bf) = samples.iter().find(|s| s.label == LABEL_BRUTE_FORCE)
                {
                    println!("Feature differences for key features:");
                    for (name, diff) in feature_differences(sample, bf, &XSS_KEY_FEATURES) {
                        println!("  {:<30} {}", name, diff);
                    }
                }
            }
            Err(e) => println!("Label: {}\n  Error: {e}", sample.label),
        }
    }
    Ok(())
}

fn extract(dataset: &Path, options: &ExtractOptions, out: Option<&Path>) -> anyhow::Result<()> {
    let data = Dataset::from_csv(dataset, &FeatureSchema::flow())
        .with_context(|| format!("loading dataset {}", dataset.display()))?;
    let extraction = extract_samples(&data, options);
    for label in &extraction.skipped {
        eprintln!("Warning: No valid sample found for {label}");
    }

    let json = samples::samples_to_json(&extraction.samples)?;
    match out {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            info!(
                count = extraction.samples.len(),
                path = %path.display(),
                "wrote samples"
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn smoke(url: &str, model: &Path, samples: &[Sample]) -> anyhow::Result<()> {
    let pipeline = match local_pipeline(model) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "running smoke test without a local model");
            None
        }
    };

    println!("Running prediction tests...\n");
    let client = PredictClient::new(url);
    let cases = run_smoke(&client, pipeline.as_ref(), samples).await;
    for case in &cases {
        display::print_smoke_case(case);
    }

    let failed = cases
        .iter()
        .filter(|c| c.http_status() == Status::Fail || c.direct_status() == Status::Fail)
        .count();
    if failed > 0 {
        bail!("{failed} of {} samples failed", cases.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_field_splits_on_first_equals() {
        assert_eq!(
            parse_field("Destination Port=80").unwrap(),
            ("Destination Port".to_string(), "80".to_string())
        );
        assert_eq!(
            parse_field("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(parse_field("novalue").is_err());
    }

    #[test]
    fn predict_accepts_repeated_fields() {
        let cli = Cli::try_parse_from([
            "flowscope",
            "predict",
            "--model",
            "m.json",
            "--field",
            "Protocol=abc",
            "--field",
            "Flow ID=",
        ])
        .unwrap();
        let Command::Predict { model, fields, .. } = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(model.model, PathBuf::from("m.json"));
        assert_eq!(
            fields,
            vec![
                ("Protocol".to_string(), "abc".to_string()),
                ("Flow ID".to_string(), String::new())
            ]
        );
    }

    #[test]
    fn extract_samples_options() {
        let cli = Cli::try_parse_from([
            "flowscope",
            "extract-samples",
            "--dataset",
            "flows.csv",
            "--max-attempts",
            "10",
            "--label",
            "Web Attack – XSS",
        ])
        .unwrap();
        let Command::ExtractSamples {
            dataset,
            max_attempts,
            label,
            ..
        } = cli.command
        else {
            panic!("expected extract-samples");
        };
        assert_eq!(dataset.dataset, PathBuf::from("flows.csv"));
        assert_eq!(max_attempts, 10);
        assert_eq!(label.as_deref(), Some("Web Attack – XSS"));
    }

    #[test]
    fn sample_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.json");
        std::fs::write(&path, samples::samples_to_json(&demo_samples()).unwrap()).unwrap();
        let loaded = load_samples(Some(&path)).unwrap();
        assert_eq!(loaded, demo_samples());

        let only = filter_label(loaded, Some(LABEL_XSS)).unwrap();
        assert_eq!(only.len(), 1);
        assert!(filter_label(only, Some("nope")).is_err());
    }
}
