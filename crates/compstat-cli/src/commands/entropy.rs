use compstat_core::{BinarySequence, Error, MarkovParams, Result, entropy_profile};

pub struct EntropyCommandConfig<'a> {
    pub input: Option<&'a str>,
    pub max_order: usize,
    /// Treat each byte as a symbol instead of expanding to bits.
    pub bytes: bool,
    pub size: usize,
    pub probability: f64,
    pub memory: usize,
    pub seed: u64,
}

/// Symbols to analyze plus a label for the header line.
fn load_symbols(cmd: &EntropyCommandConfig<'_>) -> Result<(Vec<u8>, String)> {
    match cmd.input {
        Some(path) => {
            let data = std::fs::read(path).map_err(|e| Error::io(format!("cannot read {path}"), e))?;
            if cmd.bytes {
                Ok((data, format!("{path} (bytes)")))
            } else {
                Ok((BinarySequence::from_bytes(&data).into_bits(), format!("{path} (bits)")))
            }
        }
        None => {
            let seq = MarkovParams::new(cmd.size, cmd.probability, cmd.memory)?
                .generate_seeded(cmd.seed);
            let label = format!(
                "markov(p={}, memory={}, seed={})",
                cmd.probability, cmd.memory, cmd.seed
            );
            if cmd.bytes {
                Ok((seq.pack(), label))
            } else {
                Ok((seq.into_bits(), label))
            }
        }
    }
}

pub fn run(cmd: EntropyCommandConfig<'_>) -> Result<()> {
    let (symbols, label) = load_symbols(&cmd)?;
    let profile = entropy_profile(&symbols, cmd.max_order)?;

    println!("Entropy profile of {label}: {} symbols\n", symbols.len());
    println!("{:>6} {:>14}", "order", "bits/symbol");
    println!("{}", "-".repeat(21));
    for (order, h) in &profile {
        println!("{order:>6} {h:>14.6}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(input: Option<&str>, bytes: bool) -> EntropyCommandConfig<'_> {
        EntropyCommandConfig {
            input,
            max_order: 3,
            bytes,
            size: 4096,
            probability: 0.5,
            memory: 2,
            seed: 1,
        }
    }

    #[test]
    fn test_file_input_expands_to_bits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, [0xF0u8, 0x0F]).unwrap();
        let path = path.to_string_lossy().to_string();

        let (bits, _) = load_symbols(&cmd(Some(&path), false)).unwrap();
        assert_eq!(bits, vec![1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        let (bytes, label) = load_symbols(&cmd(Some(&path), true)).unwrap();
        assert_eq!(bytes, vec![0xF0, 0x0F]);
        assert!(label.ends_with("(bytes)"));
    }

    #[test]
    fn test_generated_input_has_requested_size() {
        let (bits, label) = load_symbols(&cmd(None, false)).unwrap();
        assert_eq!(bits.len(), 4096);
        assert!(label.starts_with("markov("));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_symbols(&cmd(Some("/nonexistent/compstat/input.bin"), false)).is_err());
    }
}
