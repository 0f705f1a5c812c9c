//! touch-sentinel CLI: train and evaluate the siamese session encoder, enroll references,
//! verify probe sessions.
//!
//! Commands:
//! - train: Fit the encoder on an NDJSON event feed and write the model artifact
//! - evaluate: Score sampled pairs from a held-out feed (AUC, accuracy)
//! - enroll: Store a reference session for an identity
//! - verify: Score a probe session against the enrolled reference (one NDJSON risk line)
//!
//! Results go to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use touch_sentinel::config::SentinelConfig;
use touch_sentinel::error::{Error, ErrorKind, Result};
use touch_sentinel::eval::Evaluator;
use touch_sentinel::logging::{LogEvent, StructuredLogger};
use touch_sentinel::model::{load_network, Architecture, ArtifactMeta, EmbeddingNetwork, LoadedModel};
use touch_sentinel::pairs::PairSampler;
use touch_sentinel::risk::RiskEngine;
use touch_sentinel::session::{frame_pool, load_feed_dir, parse_probe, split_sessions, Event, SessionFramer};
use touch_sentinel::storage::{DirectoryStore, ReferenceStore};
use touch_sentinel::train::Trainer;
use touch_sentinel::verify::Verifier;

/// Continuous touch-behaviour authentication with a siamese LSTM
#[derive(Parser)]
#[command(name = "touch-sentinel")]
#[command(version)]
#[command(about = "Train, evaluate and serve a siamese LSTM session verifier", long_about = None)]
struct Cli {
    /// Config file (JSON). Falls back to $TOUCH_SENTINEL_CONFIG, then touch-sentinel.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the encoder and write the best weights
    Train {
        /// NDJSON feed file or directory of *.ndjson / *.jsonl files
        #[arg(short, long)]
        data: PathBuf,

        /// Output artifact (defaults to model_path from config)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Override the configured epoch budget
        #[arg(long)]
        epochs: Option<usize>,
    },

    /// Evaluate a trained model on pairs sampled from a held-out feed
    Evaluate {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Enroll a reference session for an identity
    Enroll {
        #[arg(short, long)]
        identity: String,

        /// JSON array of events (use - for stdin)
        #[arg(short, long)]
        session: PathBuf,
    },

    /// Verify a probe session against an enrolled identity
    Verify {
        #[arg(short, long)]
        identity: String,

        /// JSON array of events (use - for stdin)
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e.kind();
            let message = e.to_string();
            let mut event = LogEvent::new("error", "touch_sentinel", "command failed");
            event.kind = Some(kind.as_str());
            event.error = Some(message.as_str());
            let _ = StructuredLogger::emit_json(&event, &mut std::io::stderr());
            exit_code(kind)
        }
    }
}

fn exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::BadInput | ErrorKind::TrainingData => ExitCode::from(2),
        ErrorKind::Enrollment => ExitCode::from(3),
        ErrorKind::Misconfigured => ExitCode::from(4),
    }
}

fn config_path(cli: Option<PathBuf>) -> PathBuf {
    cli.or_else(|| std::env::var("TOUCH_SENTINEL_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("touch-sentinel.json"))
}

fn run(cli: Cli) -> Result<()> {
    let config = SentinelConfig::load(&config_path(cli.config))?;
    StructuredLogger::init(config.log.json, &config.log.level);

    match cli.command {
        Commands::Train { data, model, epochs } => {
            let out = model.unwrap_or_else(|| config.model_path.clone());
            cmd_train(&config, &data, &out, epochs)
        }
        Commands::Evaluate { data, model } => {
            let path = model.unwrap_or_else(|| config.model_path.clone());
            cmd_evaluate(&config, &data, &path)
        }
        Commands::Enroll { identity, session } => cmd_enroll(&config, &identity, &session),
        Commands::Verify {
            identity,
            session,
            model,
        } => {
            let path = model.unwrap_or_else(|| config.model_path.clone());
            cmd_verify(&config, &identity, &session, &path)
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    StructuredLogger::emit_json(value, &mut std::io::stdout().lock())?;
    Ok(())
}

fn artifact_meta(config: &SentinelConfig) -> ArtifactMeta {
    ArtifactMeta {
        objective: config.training.objective,
        sequence_length: config.framing.sequence_length,
        feature_columns: config.framing.feature_columns.clone(),
    }
}

fn architecture(config: &SentinelConfig) -> Architecture {
    Architecture::from_config(config.framing.feature_count(), &config.model)
}

/// Load the artifact and check it was trained with the framing this config produces.
fn load_model(config: &SentinelConfig, path: &Path) -> Result<LoadedModel> {
    let loaded = load_network(path, &architecture(config))?;
    if loaded.meta.sequence_length != config.framing.sequence_length
        || loaded.meta.feature_columns != config.framing.feature_columns
    {
        return Err(Error::ShapeMismatch {
            expected: format!(
                "{} rows of {:?}",
                config.framing.sequence_length, config.framing.feature_columns
            ),
            found: format!(
                "{} rows of {:?}",
                loaded.meta.sequence_length, loaded.meta.feature_columns
            ),
        });
    }
    info!(
        path = %path.display(),
        objective = loaded.meta.objective.name(),
        saved_at = %loaded.saved_at,
        "model loaded"
    );
    Ok(loaded)
}

fn read_probe(config: &SentinelConfig, path: &Path) -> Result<Vec<Event>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    let value: Value = serde_json::from_str(&text)?;
    parse_probe(&value, &config.framing)
}

fn cmd_train(config: &SentinelConfig, data: &Path, out: &Path, epochs: Option<usize>) -> Result<()> {
    let framer = SessionFramer::new(&config.framing);
    let sessions = load_feed_dir(data, &config.framing)?;
    let pool = frame_pool(&framer, &sessions)?;
    let (train_pool, val_pool) =
        split_sessions(pool, config.training.val_fraction, config.sampling.seed);
    info!(
        train_sessions = train_pool.len(),
        val_sessions = val_pool.len(),
        "sessions split"
    );

    let policy = config.sampling.self_pairs;
    let (train_pairs, train_report) = PairSampler::new(&train_pool, policy)
        .sample_seeded(config.sampling.train_draws, config.sampling.seed);
    let (val_pairs, _) = PairSampler::new(&val_pool, policy)
        .sample_seeded(config.sampling.val_draws, config.sampling.seed.wrapping_add(1));
    if train_pairs.is_empty() {
        return Err(Error::InsufficientPairData {
            requested: train_report.requested,
            yielded: 0,
        });
    }

    let mut training = config.training.clone();
    if let Some(epochs) = epochs {
        training.epochs = epochs;
    }
    let network = EmbeddingNetwork::seeded(architecture(config), training.seed);
    let mut trainer = Trainer::new(network, training).with_checkpoint(out, artifact_meta(config));
    let report = trainer.fit(&train_pairs, &val_pairs)?;
    info!(
        best_epoch = report.best_epoch,
        best_loss = report.best_loss,
        path = %out.display(),
        "training complete"
    );
    print_json(&report)
}

fn cmd_evaluate(config: &SentinelConfig, data: &Path, model: &Path) -> Result<()> {
    let loaded = load_model(config, model)?;
    let framer = SessionFramer::new(&config.framing);
    let sessions = load_feed_dir(data, &config.framing)?;
    let pool = frame_pool(&framer, &sessions)?;

    let (pairs, sample) = PairSampler::new(&pool, config.sampling.self_pairs)
        .sample_seeded(config.evaluation.draws, config.evaluation.seed);
    if pairs.is_empty() {
        return Err(Error::InsufficientPairData {
            requested: sample.requested,
            yielded: 0,
        });
    }
    let scored = Evaluator::score(&loaded.network, &pairs)?;
    let report = Evaluator::new(config.evaluation.decision_threshold).evaluate(&scored);
    info!(pairs = report.pairs, auc = ?report.auc, accuracy = report.accuracy, "evaluation complete");
    print_json(&report)
}

fn cmd_enroll(config: &SentinelConfig, identity: &str, session: &Path) -> Result<()> {
    let events = read_probe(config, session)?;
    let framed = SessionFramer::new(&config.framing).frame_events(&events)?;
    let store = DirectoryStore::open(&config.reference_dir)?;
    store.save(identity, &framed)?;
    print_json(&serde_json::json!({
        "identity": identity,
        "events": events.len(),
        "framed_rows": framed.len(),
        "path": store.path_for(identity),
    }))
}

fn cmd_verify(config: &SentinelConfig, identity: &str, session: &Path, model: &Path) -> Result<()> {
    let loaded = load_model(config, model)?;
    let verifier = Verifier::new(Arc::new(loaded.network), SessionFramer::new(&config.framing))?;
    let store = DirectoryStore::open(&config.reference_dir)?;
    let events = read_probe(config, session)?;

    let verification = verifier.verify_enrolled(&store, identity, &events)?;
    let assessment = RiskEngine::new(config.risk.clone()).assess(identity, &verification);
    info!(
        identity,
        similarity = assessment.similarity,
        risk_level = assessment.level.as_str(),
        accepted = assessment.accepted,
        "verification"
    );
    print_json(&assessment)
}
