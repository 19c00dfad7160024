use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{error, info};

use sylva_forest::{Committee, ConfusionMatrix, Forest, ForestConfig, OobMode, OobReport};
use sylva_io::{DatasetReader, ScoreWriter};

#[derive(Parser)]
#[command(name = "sylva")]
#[command(about = "Bagging, boosting and random-forest committees for binary classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for batch scoring (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Grow a committee of trees on a labelled CSV dataset and save the model
    Learn {
        /// Committee: 1 = bagging, 2 = boosting, 3 = random forest
        #[arg(short = 'c', default_value_t = 2)]
        committee: i64,

        /// Maximum tree depth
        #[arg(short = 'd', default_value_t = 1000)]
        max_depth: usize,

        /// Random-forest feature factor (candidates per split = factor * sqrt(features))
        #[arg(short = 'p', default_value_t = 1.0)]
        factor: f64,

        /// Number of trees
        #[arg(short = 't', default_value_t = 100)]
        n_trees: usize,

        /// Weight of a negative example relative to a positive one
        #[arg(short = 'w', default_value_t = 1.0)]
        negative_weight: f64,

        /// Report out-of-bag error and AUC after every tree
        #[arg(long)]
        oob: bool,

        /// Stream each tree's raw out-of-bag outcomes to this file (implies --oob)
        #[arg(short = 'v', value_name = "OOBFILE")]
        oob_votes: Option<PathBuf>,

        /// RNG seed (defaults to the wall clock)
        #[arg(long)]
        seed: Option<u64>,

        /// Path to the training CSV (label column first)
        data: PathBuf,

        /// Path of the model file to write
        model: PathBuf,
    },

    /// Score a labelled CSV dataset with a saved model
    Predict {
        /// Output CSV path (stdout when absent)
        #[arg(short = 'o')]
        output: Option<PathBuf>,

        /// Path to the model file
        model: PathBuf,

        /// Path to the CSV dataset (label column first)
        data: PathBuf,
    },

    /// Concatenate the trees of several compatible models
    Combine {
        /// Output model path (stdout when absent)
        #[arg(short = 'o')]
        output: Option<PathBuf>,

        /// Model files; the first one supplies the header
        #[arg(required = true)]
        models: Vec<PathBuf>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct LearnOutput {
    committee: Committee,
    seed: u64,
    n_trees: usize,
    n_examples: usize,
    n_features: usize,
    features_per_split: usize,
    model: PathBuf,
    model_written: bool,
    final_oob: Option<OobReport>,
}

#[derive(Serialize)]
struct CombineOutput {
    committee: Committee,
    n_models: usize,
    n_trees: usize,
    n_features: usize,
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[allow(clippy::too_many_arguments)]
fn learn(
    committee: i64,
    max_depth: usize,
    factor: f64,
    n_trees: usize,
    negative_weight: f64,
    oob: bool,
    oob_votes: Option<&Path>,
    seed: Option<u64>,
    data: &Path,
    model: &Path,
) -> Result<()> {
    let committee = Committee::from_id(committee)?;
    let oob_mode = if oob || oob_votes.is_some() {
        OobMode::Enabled
    } else {
        OobMode::Disabled
    };
    let config = ForestConfig::new(committee)
        .with_max_depth(max_depth)
        .with_feature_factor(factor)
        .with_n_trees(n_trees)
        .with_negative_weight(negative_weight)
        .with_oob_mode(oob_mode);
    config.validate().context("invalid hyperparameters")?;

    let seed = seed.unwrap_or_else(wall_clock_seed);
    println!("seed: {seed}");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut dataset = DatasetReader::new(data)
        .read()
        .context("failed to read training CSV")?;

    let mut sink = oob_votes
        .map(|path| {
            File::create(path)
                .map(BufWriter::new)
                .with_context(|| format!("cannot create OOB vote file {}", path.display()))
        })
        .transpose()?;

    if config.reports_oob() {
        println!("{}", OobReport::header());
    }
    let result = config
        .fit_observed(&mut dataset, &mut rng, sink.as_mut(), |report| {
            println!("{report}");
        })
        .context("training failed")?;

    if let (Some(sink), Some(path)) = (sink.as_mut(), oob_votes) {
        sink.flush()
            .with_context(|| format!("cannot write OOB vote file {}", path.display()))?;
    }

    // Model write failures are non-fatal.
    let model_written = match result.forest().write(model) {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "model not saved");
            false
        }
    };

    let metadata = result.metadata();
    let output = LearnOutput {
        committee,
        seed,
        n_trees: metadata.n_trees,
        n_examples: metadata.n_examples,
        n_features: metadata.n_features,
        features_per_split: metadata.features_per_split,
        model: model.to_path_buf(),
        model_written,
        final_oob: result.final_oob_report().copied(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn predict(output: Option<&Path>, model: &Path, data: &Path) -> Result<()> {
    let forest = Forest::read(model).context("failed to load model")?;
    info!(
        committee = %forest.committee(),
        n_trees = forest.n_trees(),
        n_features = forest.n_features(),
        "model loaded"
    );

    let dataset = DatasetReader::new(data)
        .read()
        .context("failed to read CSV dataset")?;

    let scores = forest
        .classify_batch(dataset.features())
        .context("scoring failed")?;

    let threshold = forest.decision_threshold();
    let predicted: Vec<usize> = scores.iter().map(|&s| usize::from(s > threshold)).collect();
    let cm = ConfusionMatrix::from_labels(dataset.labels(), &predicted);
    info!(
        threshold,
        accuracy = cm.accuracy(),
        sensitivity = cm.sensitivity(),
        specificity = cm.specificity(),
        "dataset scored"
    );

    ScoreWriter::new(output).write(dataset.labels(), &scores)?;
    Ok(())
}

fn combine(output: Option<&Path>, models: &[PathBuf]) -> Result<()> {
    let forests = models
        .iter()
        .map(|path| {
            Forest::read(path).with_context(|| format!("failed to load model {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let combined = Forest::combine(forests).context("cannot combine models")?;

    match output {
        Some(path) => {
            combined.write(path).context("failed to save combined model")?;
            let summary = CombineOutput {
                committee: combined.committee(),
                n_models: models.len(),
                n_trees: combined.n_trees(),
                n_features: combined.n_features(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        None => {
            let mut out = BufWriter::new(io::stdout().lock());
            combined
                .write_to(&mut out)
                .and_then(|()| out.flush())
                .context("failed to write combined model to stdout")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Learn {
            committee,
            max_depth,
            factor,
            n_trees,
            negative_weight,
            oob,
            oob_votes,
            seed,
            data,
            model,
        } => learn(
            committee,
            max_depth,
            factor,
            n_trees,
            negative_weight,
            oob,
            oob_votes.as_deref(),
            seed,
            &data,
            &model,
        ),
        Command::Predict {
            output,
            model,
            data,
        } => predict(output.as_deref(), &model, &data),
        Command::Combine { output, models } => combine(output.as_deref(), &models),
    }
}
