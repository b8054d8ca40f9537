/* ------------------------------------------------------------------ */
/* bigramgpt: word-bigram transition model                            */
/* ------------------------------------------------------------------ */
//
//   bigramgpt train    --corpus texts.txt --out model.bin [--config configs/tiny.json]
//   bigramgpt generate --model model.bin --prompt "some text"
//   bigramgpt serve    --model model.bin --addr 127.0.0.1:8080

mod checkpoint;
mod config;
mod corpus;
mod error;
mod generate;
mod keywords;
mod model;
mod ops;
mod reorder;
mod rng;
mod serve;
mod tokenizer;
mod train;
mod transitions;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};

use crate::checkpoint::{load_checkpoint, save_checkpoint};
use crate::config::{Precision, RunConfig, DEFAULT_ADDR};
use crate::error::{BigramError, Result};
use crate::generate::{pick_seed, Generator};
use crate::keywords::Extractor;
use crate::rng::Rng;

#[derive(Parser, Debug)]
#[command(name = "bigramgpt", version, about = "Word-bigram transition model: train, generate, serve")]
struct Cli {
    /// Debug-level logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a vocabulary from a corpus and train the transition weights.
    Train {
        /// Text file, one text per line.
        #[arg(long)]
        corpus: PathBuf,
        /// Checkpoint to write.
        #[arg(long)]
        out: PathBuf,
        /// JSON run config (see configs/).
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<usize>,
        /// Mini-batch size; full-batch when omitted.
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Keep first-seen token order.
        #[arg(long)]
        no_reorder: bool,
        /// Drop the frequency table after training (no co-occurrence reward).
        #[arg(long)]
        drop_frequencies: bool,
        /// Store weights as f16.
        #[arg(long)]
        f16: bool,
    },
    /// Generate one text from a trained checkpoint.
    Generate {
        #[arg(long)]
        model: PathBuf,
        /// Text to pull a seed keyword from; random seed token otherwise.
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        max_tokens: Option<usize>,
    },
    /// Serve generations over HTTP.
    Serve {
        #[arg(long)]
        model: PathBuf,
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Require `Authorization: Bearer <KEY>`.
        #[arg(long)]
        api_key: Option<String>,
    },
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(p) => {
            let cfg = RunConfig::load(p)?;
            info!("Loaded config {}", p.display());
            Ok(cfg)
        }
        None => Ok(RunConfig::default()),
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train { corpus, out, config, epochs, batch_size, seed, no_reorder, drop_frequencies, f16 } => {
            let mut cfg = load_config(config.as_deref())?;
            let t = &mut cfg.train;
            if let Some(n) = epochs     { t.epochs = n; }
            if batch_size.is_some()     { t.batch_size = batch_size; }
            if let Some(s) = seed       { t.seed = s; }
            if no_reorder               { t.reorder = false; }
            if drop_frequencies         { t.retain_frequencies = false; }
            if f16                      { t.precision = Precision::F16; }
            cfg.validate()?;

            let texts = corpus::load_lines(&corpus)?;
            info!("Loaded {} texts from {}", texts.len(), corpus.display());

            let mut rng = Rng::new(cfg.train.seed);
            let (tokenizer, model) = train::build_and_train(&texts, &cfg.train, &mut rng)?;
            save_checkpoint(&out, &tokenizer, &model, cfg.train.precision)?;
        }

        Command::Generate { model, prompt, config, seed, max_tokens } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(n) = max_tokens { cfg.generate.max_new_tokens = n; }
            cfg.validate()?;

            let (tokenizer, model) = load_checkpoint(&model)?;
            let mut rng = match seed {
                Some(s) => Rng::new(s),
                None    => Rng::from_clock(),
            };

            let keyword = prompt.as_deref().and_then(|p| Extractor::new(&tokenizer).best_known(p));
            let (start, keyword_used) = pick_seed(&tokenizer, keyword.as_deref(), &mut rng)
                .ok_or_else(|| BigramError::corrupt("checkpoint has an empty vocabulary"))?;
            info!(
                "Seed token {:?} ({})",
                tokenizer.get_token(start).unwrap_or_default(),
                if keyword_used { "keyword" } else { "random" }
            );

            let out = Generator::new(&model, &tokenizer, &cfg.generate).generate(start, &mut rng);
            info!(
                "Generated {} tokens, stopped at {}",
                out.tokens.len(),
                if out.hit_end { "end token" } else { "token budget" }
            );
            println!("{}", out.text);
        }

        Command::Serve { model, addr, config, api_key } => {
            let cfg = load_config(config.as_deref())?;
            let (tokenizer, model) = load_checkpoint(&model)?;
            serve::run_server(&addr, &model, &tokenizer, &cfg.generate, api_key.as_deref())?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
