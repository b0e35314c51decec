//! CLI command definitions and handlers

mod args;
mod count;
mod rank;
mod stats;
mod unique;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::load_file_config;
pub use args::{InputArgs, SketchArgs};

/// ngramscope - n-gram statistics for corpora larger than memory
#[derive(Parser, Debug)]
#[command(name = "ngramscope")]
#[command(
    version,
    about = "Bounded-memory n-gram frequency statistics over sharded JSON-lines corpora",
    long_about = "ngramscope streams gzip/zstd JSON-lines shards across a pool of workers and \
answers frequency questions with a fixed memory budget: corpus statistics, exact term \
counts, regex match counts, the most and least frequent n-grams, and distinct n-gram \
estimates.\n\n\
Results are written to stdout as JSON lines; logs and progress go to stderr.",
    after_help = "\
Examples:
  ngramscope stats data/                           Corpus size and token statistics
  ngramscope count data/ -s cat -s \"the cat\"       Exact token-sequence counts
  ngramscope search data/ -p '\\d{3}-\\d{4}'        Regex match counts
  ngramscope topk data/ -n 3 -k 20 --size 8GiB     Most frequent trigrams
  ngramscope botk data/ -n 2 -k 50 --threshold 2   Rarest bigrams
  ngramscope unique data/ -n 5                     Estimated distinct 5-grams"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file with [defaults] (default: ./ngramscope.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Corpus statistics: documents, tokens, bytes and extreme documents
    Stats {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Count exact occurrences of search terms
    #[command(after_help = "\
Examples:
  ngramscope count data/ -s cat                  Token-sequence matches of 'cat'
  ngramscope count data/ -s cat --substring      Raw substring matches (also inside 'category')")]
    Count {
        #[command(flatten)]
        input: InputArgs,

        /// Search term (repeatable)
        #[arg(long, short = 's', required = true)]
        search: Vec<String>,

        /// Match raw substrings instead of token sequences
        #[arg(long)]
        substring: bool,
    },

    /// Count regex matches
    Search {
        #[command(flatten)]
        input: InputArgs,

        /// Regular expression (repeatable)
        #[arg(long, short = 'p', required = true)]
        pattern: Vec<String>,
    },

    /// Find the k most frequent n-grams
    #[command(after_help = "\
Examples:
  ngramscope topk data/ -n 1 -k 10                    Top 10 unigrams
  ngramscope topk data/ -n 3 --size 16GiB --u64       Large run with 64-bit counters
  ngramscope topk data/ -o results/                   Auto-named output file in results/")]
    Topk {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        sketch: SketchArgs,

        /// Number of n-grams to return
        #[arg(short = 'k', default_value = "20")]
        k: usize,

        /// Ignore n-grams whose estimated count is below this (default: 1)
        #[arg(long)]
        threshold: Option<u64>,

        /// Rank and report by exact counts instead of sketch estimates
        #[arg(long)]
        exact_counts: bool,
    },

    /// Find the k least frequent n-grams
    Botk {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        sketch: SketchArgs,

        /// Number of n-grams to return
        #[arg(short = 'k', default_value = "20")]
        k: usize,

        /// Ignore n-grams whose count exceeds this (default: unbounded)
        #[arg(long)]
        threshold: Option<u64>,

        /// Keep each admissible rare n-gram with this probability, in (0, 1]
        #[arg(long)]
        p_keep: Option<f64>,
    },

    /// Estimate the number of distinct n-grams
    Unique {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        sketch: SketchArgs,
    },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let file_config = load_file_config(cli.config.as_deref())?;
    let defaults = &file_config.defaults;

    match cli.command {
        Commands::Stats { input } => stats::run(&input, defaults),

        Commands::Count {
            input,
            search,
            substring,
        } => count::run_count(&input, defaults, &search, substring),

        Commands::Search { input, pattern } => count::run_search(&input, defaults, &pattern),

        Commands::Topk {
            input,
            sketch,
            k,
            threshold,
            exact_counts,
        } => rank::run(
            rank::Direction::Top,
            &input,
            &sketch,
            defaults,
            rank::RankOptions {
                k,
                threshold,
                exact_counts,
                p_keep: None,
            },
        ),

        Commands::Botk {
            input,
            sketch,
            k,
            threshold,
            p_keep,
        } => rank::run(
            rank::Direction::Bottom,
            &input,
            &sketch,
            defaults,
            rank::RankOptions {
                k,
                threshold,
                exact_counts: false,
                p_keep,
            },
        ),

        Commands::Unique { input, sketch } => unique::run(&input, &sketch, defaults),
    }
}
