//! CLI for compstat: compression-based and classical independence tests.

mod commands;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "compstat")]
#[command(about = "compstat: does a compressor know something your entropy model doesn't?")]
#[command(version = compstat_core::VERSION)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep compressors and classical tests over a grid of generated sequences.
    /// Flags override the corresponding fields of --config.
    Sweep {
        /// JSON sweep configuration; missing fields take their defaults
        #[arg(long)]
        config: Option<String>,

        /// Comma-separated sequence lengths in bits
        #[arg(long)]
        sizes: Option<String>,

        /// Comma-separated Markov bias probabilities in (0, 1]
        #[arg(long)]
        probabilities: Option<String>,

        /// Comma-separated Markov memories
        #[arg(long)]
        memories: Option<String>,

        /// Comma-separated compressors (see `compstat codecs`), or "none"
        #[arg(long)]
        compressors: Option<String>,

        /// Comma-separated classical tests, "all", or "none"
        #[arg(long)]
        tests: Option<String>,

        /// Explicit LCG run as M,A,C,X0,N (repeatable)
        #[arg(long = "lcg")]
        lcg: Vec<String>,

        /// Significance level of the compression test
        #[arg(long)]
        alpha: Option<f64>,

        /// Context order of the entropy estimate for bit sequences
        #[arg(long)]
        order: Option<usize>,

        /// Context order of the entropy estimate for LCG bytes
        #[arg(long)]
        byte_order: Option<usize>,

        /// Which window parity carries the bias
        #[arg(long, value_parser = ["even", "odd"])]
        parity: Option<String>,

        /// How the first `memory` bits are produced
        #[arg(long, value_parser = ["random", "zeros"])]
        preamble: Option<String>,

        /// Unit of the statistic and threshold
        #[arg(long, value_parser = ["bits", "nats"])]
        log_base: Option<String>,

        /// Run seed (random and reported when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads (1 = sequential)
        #[arg(long)]
        jobs: Option<usize>,

        /// Per-cell timeout in seconds; overrunning cells are rejected
        #[arg(long)]
        timeout_sec: Option<f64>,

        /// Write the full report as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Emit one generated sequence
    Generate {
        #[command(subcommand)]
        source: commands::generate::GenerateSource,

        /// Output file (default: stdout)
        #[arg(long, global = true)]
        output: Option<String>,

        /// Output encoding: raw packed bytes, hex, or one ASCII digit per bit
        #[arg(long, global = true, default_value = "bits", value_parser = ["raw", "hex", "bits"])]
        format: String,
    },

    /// Conditional entropy profile (orders 0..=K) of a file's bits or of a
    /// generated Markov sequence
    Entropy {
        /// File whose bits are analyzed; omit to generate a Markov sequence
        #[arg(long)]
        input: Option<String>,

        /// Highest context order
        #[arg(long, default_value = "8")]
        order: usize,

        /// Analyze bytes as symbols instead of bits
        #[arg(long)]
        bytes: bool,

        /// Markov length when no input is given
        #[arg(long, default_value = "16384")]
        size: usize,

        /// Markov bias when no input is given
        #[arg(long, default_value = "0.8")]
        probability: f64,

        /// Markov memory when no input is given
        #[arg(long, default_value = "5")]
        memory: usize,

        /// Markov seed when no input is given
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// List supported compressors and whether each can run here
    Codecs,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Sweep {
            config,
            sizes,
            probabilities,
            memories,
            compressors,
            tests,
            lcg,
            alpha,
            order,
            byte_order,
            parity,
            preamble,
            log_base,
            seed,
            jobs,
            timeout_sec,
            output,
        } => commands::sweep::run(commands::sweep::SweepCommandConfig {
            config_path: config.as_deref(),
            sizes: sizes.as_deref(),
            probabilities: probabilities.as_deref(),
            memories: memories.as_deref(),
            compressors: compressors.as_deref(),
            tests: tests.as_deref(),
            lcg: &lcg,
            alpha,
            order,
            byte_order,
            parity: parity.as_deref(),
            preamble: preamble.as_deref(),
            log_base: log_base.as_deref(),
            seed,
            jobs,
            timeout_sec,
            output_path: output.as_deref(),
        }),
        Commands::Generate {
            source,
            output,
            format,
        } => commands::generate::run(&source, output.as_deref(), &format),
        Commands::Entropy {
            input,
            order,
            bytes,
            size,
            probability,
            memory,
            seed,
        } => commands::entropy::run(commands::entropy::EntropyCommandConfig {
            input: input.as_deref(),
            max_order: order,
            bytes,
            size,
            probability,
            memory,
            seed,
        }),
        Commands::Codecs => commands::codecs::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
