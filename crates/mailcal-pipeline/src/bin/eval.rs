//! mailcal detection evaluation runner
//!
//! Run labelled messages through the detection pipeline and report
//! precision and recall.
//!
//! Usage:
//!   cargo run --bin mailcal-eval -- --keyword
//!   cargo run --bin mailcal-eval -- --model flan-t5-small --json
//!   cargo run --bin mailcal-eval -- --cases cases.jsonl

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailcal_core::{ClassifierMode, FixedClock, GenerationBackend, PipelineConfig};
use mailcal_inference::{select_classifier, ClassifierConfig, ClassifierSelection, OllamaBackend};
use mailcal_pipeline::eval::{load_cases, run_suite, smoke_reference_time, smoke_suite};
use mailcal_pipeline::EventPipeline;

#[derive(Debug, Default)]
struct Args {
    model: Option<String>,
    keyword: bool,
    json: bool,
    cases: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--model" | "-m" => {
                i += 1;
                if i < args.len() {
                    result.model = Some(args[i].clone());
                }
            }
            "--cases" | "-c" => {
                i += 1;
                if i < args.len() {
                    result.cases = Some(PathBuf::from(&args[i]));
                }
            }
            "--keyword" | "-k" => {
                result.keyword = true;
            }
            "--json" => {
                result.json = true;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!(
        r#"
mailcal detection evaluation

Usage: cargo run --bin mailcal-eval -- [OPTIONS]

Options:
  -m, --model <MODEL>   Classifier model (default: MAILCAL_MODEL or flan-t5-small)
  -k, --keyword         Use the keyword classifier, no model
  -c, --cases <FILE>    JSONL file of cases (default: built-in smoke suite)
      --json            Print the full report as JSON
  -h, --help            Print help

Case format (one per line):
  {{"id":"a","subject":"...","body":"...","expect_event":true,"expected_start":"2025-12-15T14:30"}}

Environment Variables:
  OLLAMA_BASE          Ollama server URL (default: http://127.0.0.1:11434)
  MAILCAL_TIMEZONE     IANA timezone (default: Asia/Kolkata)
  MAILCAL_CLASSIFIER   auto, model or keyword (overridden by --keyword)
  LOG_FORMAT           "json" or "text" (default: "text")
  RUST_LOG             Log filter (default: "mailcal_pipeline=info,mailcal_inference=info")
"#
    );
}

fn init_tracing() {
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "mailcal_pipeline=info,mailcal_inference=info,mailcal_core=warn".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let args = parse_args();

    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    let mut classifier_config = ClassifierConfig::from_env()
        .context("invalid classifier configuration")?
        .with_keywords(config.keywords.clone());
    if args.keyword {
        classifier_config = classifier_config.with_selection(ClassifierSelection::Keyword);
    }

    let backend = match &args.model {
        Some(model) => OllamaBackend::with_config(
            env::var("OLLAMA_BASE")
                .unwrap_or_else(|_| mailcal_inference::ollama::DEFAULT_OLLAMA_URL.to_string()),
            model.clone(),
        ),
        None => OllamaBackend::from_env(),
    }
    .with_timeout_secs(classifier_config.timeout.as_secs());
    let model_name = backend.model_name().to_string();

    let classifier = select_classifier(&classifier_config, backend).await;
    let mode = classifier.mode();

    let (suite_name, cases) = match &args.cases {
        Some(path) => (
            path.display().to_string(),
            load_cases(path).with_context(|| format!("failed to load {}", path.display()))?,
        ),
        None => ("smoke".to_string(), smoke_suite()),
    };

    // Built-in cases are labelled against a fixed date; file cases run now.
    let reference = if args.cases.is_some() {
        chrono::Utc::now()
    } else {
        smoke_reference_time()
    };
    let pipeline = EventPipeline::new(&config, classifier)
        .with_clock(Arc::new(FixedClock::new(reference)));

    info!(
        suite = %suite_name,
        cases = cases.len(),
        classifier_mode = %mode,
        timezone = config.timezone.name(),
        "Starting evaluation"
    );

    let classifier_label = match mode {
        ClassifierMode::Model => model_name,
        ClassifierMode::Keyword => "keyword".to_string(),
    };
    let report = run_suite(&suite_name, &classifier_label, &pipeline, &cases, reference).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("═══════════════════════════════════════════════════════════════");
    println!("mailcal detection evaluation");
    println!("═══════════════════════════════════════════════════════════════");
    println!("Suite:      {}", report.suite);
    println!("Classifier: {}", report.classifier);
    println!("Timezone:   {}", config.timezone.name());
    println!();
    println!(
        "TP {}  FP {}  FN {}  TN {}",
        report.true_positives, report.false_positives, report.false_negatives, report.true_negatives
    );
    println!("Precision:  {:.1}%", report.precision * 100.0);
    println!("Recall:     {:.1}%", report.recall * 100.0);
    println!(
        "Start time: {}/{} matched",
        report.start_matches, report.start_checked
    );
    println!("Latency:    p50 {}ms", report.latency_p50_ms);

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for f in failures {
            println!(
                "  {:<24} expected={} detected={} outcome={} score={} start={}",
                f.case_id,
                f.expected,
                f.detected,
                f.outcome,
                f.score.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                f.start.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}
