use std::path::Path;

use compstat_core::{
    ExperimentReport, LcgParams, Result, SweepConfig, Verdict, load_config_from_path, run_sweep,
};
use compstat_tests::ClassicalTest;

use super::{parse_list, parse_names, write_output};

/// Command-line overrides for one sweep.
pub struct SweepCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub sizes: Option<&'a str>,
    pub probabilities: Option<&'a str>,
    pub memories: Option<&'a str>,
    pub compressors: Option<&'a str>,
    pub tests: Option<&'a str>,
    pub lcg: &'a [String],
    pub alpha: Option<f64>,
    pub order: Option<usize>,
    pub byte_order: Option<usize>,
    pub parity: Option<&'a str>,
    pub preamble: Option<&'a str>,
    pub log_base: Option<&'a str>,
    pub seed: Option<u64>,
    pub jobs: Option<usize>,
    pub timeout_sec: Option<f64>,
    pub output_path: Option<&'a str>,
}

/// Start from the config file (or defaults) and apply every flag given.
pub fn build_config(cmd: &SweepCommandConfig<'_>) -> Result<SweepConfig> {
    let mut config = match cmd.config_path {
        Some(path) => load_config_from_path(Path::new(path))?,
        None => SweepConfig::default(),
    };

    if let Some(raw) = cmd.sizes {
        config.sizes = parse_list(raw, "sizes")?;
    }
    if let Some(raw) = cmd.probabilities {
        config.probabilities = parse_list(raw, "probabilities")?;
    }
    if let Some(raw) = cmd.memories {
        config.memories = parse_list(raw, "memories")?;
    }
    if let Some(raw) = cmd.compressors {
        config.compressors = parse_names(raw);
    }
    if let Some(raw) = cmd.tests {
        config.tests = if raw.trim().eq_ignore_ascii_case("all") {
            ClassicalTest::ALL.iter().map(|t| t.name().to_string()).collect()
        } else {
            parse_names(raw)
        };
    }
    if !cmd.lcg.is_empty() {
        config.lcg = cmd
            .lcg
            .iter()
            .map(|raw| raw.parse::<LcgParams>())
            .collect::<Result<_>>()?;
    }
    if let Some(alpha) = cmd.alpha {
        config.alpha = alpha;
    }
    if let Some(order) = cmd.order {
        config.order = order;
    }
    if let Some(order) = cmd.byte_order {
        config.byte_order = order;
    }
    if let Some(raw) = cmd.parity {
        config.parity = raw.parse()?;
    }
    if let Some(raw) = cmd.preamble {
        config.preamble = raw.parse()?;
    }
    if let Some(raw) = cmd.log_base {
        config.log_base = raw.parse()?;
    }
    if cmd.seed.is_some() {
        config.seed = cmd.seed;
    }
    if let Some(jobs) = cmd.jobs {
        config.jobs = jobs;
    }
    if cmd.timeout_sec.is_some() {
        config.timeout_secs = cmd.timeout_sec;
    }

    config.validate()?;
    Ok(config)
}

pub fn run(cmd: SweepCommandConfig<'_>) -> Result<()> {
    let config = build_config(&cmd)?;
    let probes = config.probes()?;
    let markov_cells =
        probes.len() * config.probabilities.len() * config.memories.len() * config.sizes.len();
    let lcg_cells = probes.len() * config.lcg.len();

    println!(
        "Sweeping {} cell(s): {} probe(s), alpha={}, order={}, parity={}, preamble={}, log base={}\n",
        markov_cells + lcg_cells,
        probes.len(),
        config.alpha,
        config.order,
        config.parity,
        config.preamble,
        config.log_base,
    );

    let report = run_sweep(&config)?;
    print_table(&report);

    if let Some(path) = cmd.output_path {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| compstat_core::Error::Config(format!("cannot serialize report: {e}")))?;
        write_output(Some(path), json.as_bytes())?;
        println!("\nReport saved to: {path}");
    }
    Ok(())
}

fn print_table(report: &ExperimentReport) {
    println!(
        "{:<20} {:<34} {:>6} {:>4} {:>8} {:>8} {:>12} {:>10}",
        "Probe", "Source", "p", "mem", "size", "verdict", "statistic", "thr / p"
    );
    println!("{}", "-".repeat(110));
    for row in &report.rows {
        let probability = row
            .probability
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".into());
        let memory = row
            .memory
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".into());
        let reference = match (row.threshold, row.p_value) {
            (Some(t), _) => format!("{t:.3}"),
            (None, Some(p)) => format!("{p:.4}"),
            (None, None) => "-".into(),
        };
        let probe = match &row.codec {
            Some(codec) if codec != &row.probe => format!("{} ({codec})", row.probe),
            _ => row.probe.clone(),
        };
        let statistic = row
            .statistic
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".into());
        let marker = match row.verdict {
            Verdict::Accept => "Accept",
            Verdict::Reject => "Reject",
        };
        println!(
            "{:<20} {:<34} {:>6} {:>4} {:>8} {:>8} {:>12} {:>10}",
            probe, row.source, probability, memory, row.size, marker, statistic, reference
        );
        if row.diagnostic.starts_with("timeout") {
            println!("{:>20} {}", "", row.diagnostic);
        }
    }
    println!("{}", "-".repeat(110));
    println!(
        "seed {}: {} accepted, {} rejected",
        report.seed,
        report.accepted(),
        report.rejected()
    );
}
