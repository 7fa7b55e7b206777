use clap::Subcommand;
use compstat_core::{Error, LcgParams, MarkovParams, ParityConvention, Preamble, Result};

use super::write_output;

#[derive(Subcommand)]
pub enum GenerateSource {
    /// Markov chain whose next bit depends on the parity of the last `memory` bits
    Markov {
        /// Sequence length in bits
        #[arg(long, default_value = "16384")]
        size: usize,

        /// Probability of a 1 in the biased branch
        #[arg(long, default_value = "0.8")]
        probability: f64,

        /// Number of preceding bits whose parity selects the branch
        #[arg(long, default_value = "5")]
        memory: usize,

        #[arg(long, default_value = "even", value_parser = ["even", "odd"])]
        parity: String,

        #[arg(long, default_value = "random", value_parser = ["random", "zeros"])]
        preamble: String,

        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Linear congruential generator, reduced to bytes (X div 256) mod 256
    Lcg {
        /// Parameters as M,A,C,X0,N
        #[arg(long, default_value = "2147483648,65539,0,1,400000")]
        params: String,

        /// Emit the raw words, one per line, instead of bytes
        #[arg(long)]
        words: bool,
    },
}

/// Packed bytes plus bit length of a generated sequence.
struct Generated {
    bytes: Vec<u8>,
    bit_len: usize,
}

fn generate(source: &GenerateSource) -> Result<Generated> {
    match source {
        GenerateSource::Markov {
            size,
            probability,
            memory,
            parity,
            preamble,
            seed,
        } => {
            let seq = MarkovParams::new(*size, *probability, *memory)?
                .with_parity(parity.parse::<ParityConvention>()?)
                .with_preamble(preamble.parse::<Preamble>()?)
                .generate_seeded(*seed);
            log::info!("generated {} bits, {} ones", seq.len(), seq.ones());
            Ok(Generated {
                bytes: seq.pack(),
                bit_len: seq.len(),
            })
        }
        GenerateSource::Lcg { params, .. } => {
            let lcg: LcgParams = params.parse()?;
            let bytes = lcg.bytes();
            log::info!(
                "{}: kept {} of {} words",
                lcg.label(),
                bytes.len(),
                lcg.count
            );
            Ok(Generated {
                bit_len: bytes.len() * 8,
                bytes,
            })
        }
    }
}

/// Render packed bytes in the requested output format.
pub fn encode(bytes: &[u8], bit_len: usize, format: &str) -> Result<Vec<u8>> {
    match format {
        "raw" => Ok(bytes.to_vec()),
        "hex" => {
            let mut out: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            out.push('\n');
            Ok(out.into_bytes())
        }
        "bits" => {
            let bits = compstat_core::unpack_bits(bytes, bit_len)?;
            let mut out: Vec<u8> = bits.iter().map(|&b| b'0' + b).collect();
            out.push(b'\n');
            Ok(out)
        }
        other => Err(Error::InvalidParameter {
            name: "format",
            reason: format!("expected raw, hex or bits, got `{other}`"),
        }),
    }
}

pub fn run(source: &GenerateSource, output_path: Option<&str>, format: &str) -> Result<()> {
    if let GenerateSource::Lcg {
        params,
        words: true,
    } = source
    {
        let lcg: LcgParams = params.parse()?;
        let text: String = lcg.iter().map(|w| format!("{w}\n")).collect();
        return write_output(output_path, text.as_bytes());
    }

    let generated = generate(source)?;
    let out = encode(&generated.bytes, generated.bit_len, format)?;
    write_output(output_path, &out)
}
