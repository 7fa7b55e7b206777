//! Experiment driver: expands a [`SweepConfig`] into cells and runs them.
//!
//! Cells are enumerated as probe × probability × memory × size for the Markov
//! generator, then LCG run × probe. Each cell owns a fresh sequence drawn
//! from its own seed, derived from the run seed and the cell index, so a
//! sweep is reproducible whether it runs sequentially or on a worker pool.

use std::collections::HashMap;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use compstat_tests::{BatteryParams, ClassicalTest};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codec::{Codec, CodecKind};
use crate::config::SweepConfig;
use crate::error::{Error, Result};
use crate::generator::{LcgParams, MarkovParams};
use crate::hypothesis::{CompressionOutcome, CompressionTest, Verdict};
use crate::sequence::BinarySequence;

/// One statistical procedure applied to a cell's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    Compressor(CodecKind),
    Classical(ClassicalTest),
}

impl Probe {
    pub fn name(self) -> &'static str {
        match self {
            Self::Compressor(kind) => kind.name(),
            Self::Classical(test) => test.name(),
        }
    }
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellSource {
    Markov(MarkovParams),
    Lcg(LcgParams),
}

impl CellSource {
    pub fn label(&self) -> String {
        match self {
            Self::Markov(_) => "markov".to_string(),
            Self::Lcg(lcg) => lcg.label(),
        }
    }
}

/// A single (probe, sequence) pair of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub index: usize,
    pub probe: Probe,
    pub source: CellSource,
    pub seed: u64,
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub index: usize,
    pub probe: String,
    pub source: String,
    pub probability: Option<f64>,
    pub memory: Option<usize>,
    pub size: usize,
    pub verdict: Verdict,
    /// `None` when the cell timed out before producing one.
    pub statistic: Option<f64>,
    /// `log(1/alpha)` for compression probes.
    pub threshold: Option<f64>,
    /// p-value for classical probes.
    pub p_value: Option<f64>,
    /// Adapter that produced the compressed output.
    pub codec: Option<String>,
    pub entropy: Option<f64>,
    pub compressed_bits: Option<u64>,
    pub diagnostic: String,
}

impl ResultRow {
    fn for_cell(
        cell: &Cell,
        verdict: Verdict,
        statistic: Option<f64>,
        diagnostic: String,
    ) -> Self {
        let (probability, memory, size) = match &cell.source {
            CellSource::Markov(m) => (Some(m.probability), Some(m.memory), m.size),
            CellSource::Lcg(lcg) => (None, None, lcg.count),
        };
        Self {
            index: cell.index,
            probe: cell.probe.name().to_string(),
            source: cell.source.label(),
            probability,
            memory,
            size,
            verdict,
            statistic,
            threshold: None,
            p_value: None,
            codec: None,
            entropy: None,
            compressed_bits: None,
            diagnostic,
        }
    }

    fn from_outcome(cell: &Cell, outcome: CompressionOutcome, diagnostic: String) -> Self {
        let mut row = Self::for_cell(cell, outcome.verdict, Some(outcome.statistic), diagnostic);
        row.threshold = Some(outcome.threshold);
        row.codec = Some(outcome.codec);
        row.entropy = Some(outcome.entropy);
        row.compressed_bits = Some(outcome.compressed_bits);
        row
    }

    fn timed_out(cell: &Cell, after: Duration) -> Self {
        Self::for_cell(
            cell,
            Verdict::Reject,
            None,
            format!("timeout after {:.3}s", after.as_secs_f64()),
        )
    }
}

/// Ordered rows of one sweep, plus what is needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub seed: u64,
    pub rows: Vec<ResultRow>,
}

impl ExperimentReport {
    pub fn accepted(&self) -> usize {
        self.rows.iter().filter(|r| r.verdict.is_accept()).count()
    }

    pub fn rejected(&self) -> usize {
        self.rows.len() - self.accepted()
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of the RNG stream owned by cell `index`.
pub fn cell_seed(run_seed: u64, index: usize) -> u64 {
    splitmix64(run_seed ^ splitmix64(index as u64))
}

/// Expand a configuration into its ordered list of cells.
pub fn enumerate_cells(config: &SweepConfig, run_seed: u64) -> Result<Vec<Cell>> {
    let probes = config.probes()?;
    let mut sources = Vec::new();
    for &probe in &probes {
        for &probability in &config.probabilities {
            for &memory in &config.memories {
                for &size in &config.sizes {
                    let params = MarkovParams::new(size, probability, memory)?
                        .with_parity(config.parity)
                        .with_preamble(config.preamble);
                    sources.push((probe, CellSource::Markov(params)));
                }
            }
        }
    }
    for lcg in &config.lcg {
        for &probe in &probes {
            sources.push((probe, CellSource::Lcg(*lcg)));
        }
    }
    Ok(sources
        .into_iter()
        .enumerate()
        .map(|(index, (probe, source))| Cell {
            index,
            probe,
            source,
            seed: cell_seed(run_seed, index),
        })
        .collect())
}

/// Shared, read-only state needed to run any cell of a sweep.
pub struct CellRunner {
    bit_test: CompressionTest,
    byte_test: CompressionTest,
    battery: BatteryParams,
    codecs: HashMap<CodecKind, Box<dyn Codec>>,
}

impl CellRunner {
    pub fn new(config: &SweepConfig) -> Result<Self> {
        let mut codecs = HashMap::new();
        for probe in config.probes()? {
            if let Probe::Compressor(kind) = probe {
                codecs
                    .entry(kind)
                    .or_insert_with(|| kind.adapter(config.external_timeout()));
            }
        }
        Ok(Self {
            bit_test: config.compression_test()?,
            byte_test: config.byte_compression_test()?,
            battery: config.battery_params(),
            codecs,
        })
    }

    fn codec(&self, kind: CodecKind) -> Result<&dyn Codec> {
        self.codecs
            .get(&kind)
            .map(|c| c.as_ref())
            .ok_or_else(|| Error::codec(kind.name(), "adapter was not prepared for this sweep"))
    }

    /// Generate the cell's sequence and apply its probe.
    pub fn run(&self, cell: &Cell) -> Result<ResultRow> {
        let row = match (&cell.source, cell.probe) {
            (CellSource::Markov(params), Probe::Compressor(kind)) => {
                let seq = params.generate_seeded(cell.seed);
                let outcome = self.bit_test.evaluate_bits(&seq, self.codec(kind)?)?;
                let diagnostic = format!("ones={}", seq.ones());
                ResultRow::from_outcome(cell, outcome, diagnostic)
            }
            (CellSource::Markov(params), Probe::Classical(test)) => {
                let seq = params.generate_seeded(cell.seed);
                self.classical(cell, test, &seq)
            }
            (CellSource::Lcg(lcg), Probe::Compressor(kind)) => {
                let bytes = lcg.bytes();
                let outcome = self.byte_test.evaluate_bytes(&bytes, self.codec(kind)?)?;
                let diagnostic = format!("bytes={}", bytes.len());
                ResultRow::from_outcome(cell, outcome, diagnostic)
            }
            (CellSource::Lcg(lcg), Probe::Classical(test)) => {
                let seq = BinarySequence::from_bytes(&lcg.bytes());
                self.classical(cell, test, &seq)
            }
        };
        log::debug!(
            "cell {} [{} / {}] -> {} ({})",
            cell.index,
            row.probe,
            row.source,
            row.verdict,
            row.diagnostic
        );
        Ok(row)
    }

    fn classical(&self, cell: &Cell, test: ClassicalTest, seq: &BinarySequence) -> ResultRow {
        let result = test.run(seq.bits(), &self.battery);
        let verdict = if result.passed {
            Verdict::Accept
        } else {
            Verdict::Reject
        };
        let mut row = ResultRow::for_cell(
            cell,
            verdict,
            Some(result.statistic).filter(|s| s.is_finite()),
            result.details,
        );
        row.p_value = result.p_value;
        row
    }

    /// Run a cell on a worker thread, giving up after `limit`.
    ///
    /// A cell that overruns is reported as `Reject` with a timeout
    /// diagnostic; its worker is left to finish in the background.
    pub fn run_with_timeout(self: &Arc<Self>, cell: &Cell, limit: Duration) -> Result<ResultRow> {
        let (tx, rx) = mpsc::channel();
        let runner = Arc::clone(self);
        let worker_cell = cell.clone();
        std::thread::spawn(move || {
            let _ = tx.send(runner.run(&worker_cell));
        });
        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!(
                    "cell {} [{} / {}] timed out after {:.3}s",
                    cell.index,
                    cell.probe,
                    cell.source.label(),
                    limit.as_secs_f64()
                );
                Ok(ResultRow::timed_out(cell, limit))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::codec(
                cell.probe.name(),
                format!("worker for cell {} stopped without a result", cell.index),
            )),
        }
    }
}

/// Run every cell of the sweep and collect rows in enumeration order.
///
/// A `CodecFailure` in any cell aborts the run.
pub fn run_sweep(config: &SweepConfig) -> Result<ExperimentReport> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(rand::random);
    let cells = enumerate_cells(config, seed)?;
    let runner = Arc::new(CellRunner::new(config)?);
    let timeout = config.cell_timeout();

    log::info!(
        "sweep: {} cells, seed {seed}, {} job(s), alpha {}",
        cells.len(),
        config.jobs,
        config.alpha
    );
    let started = Instant::now();

    let run_one = |cell: &Cell| match timeout {
        Some(limit) => runner.run_with_timeout(cell, limit),
        None => runner.run(cell),
    };

    let rows = if config.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .thread_name(|i| format!("compstat-worker-{i}"))
            .build()
            .map_err(|e| Error::invalid("jobs", format!("cannot start worker pool: {e}")))?;
        pool.install(|| cells.par_iter().map(run_one).collect::<Result<Vec<_>>>())?
    } else {
        cells.iter().map(run_one).collect::<Result<Vec<_>>>()?
    };

    let report = ExperimentReport { seed, rows };
    log::info!(
        "sweep finished in {:.2}s: {} accepted, {} rejected",
        started.elapsed().as_secs_f64(),
        report.accepted(),
        report.rejected()
    );
    Ok(report)
}
