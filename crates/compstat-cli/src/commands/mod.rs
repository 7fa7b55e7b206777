pub mod codecs;
pub mod entropy;
pub mod generate;
pub mod sweep;

use std::io::Write;
use std::str::FromStr;

use compstat_core::{Error, Result};

/// Parse a comma-separated list, naming the flag in errors.
pub fn parse_list<T>(raw: &str, flag: &'static str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>().map_err(|e| Error::InvalidParameter {
                name: flag,
                reason: format!("`{s}`: {e}"),
            })
        })
        .collect()
}

/// Parse a comma-separated list of names; "none" selects nothing.
pub fn parse_names(raw: &str) -> Vec<String> {
    if raw.trim().eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Write bytes to a file, or to stdout when no path is given.
pub fn write_output(path: Option<&str>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, data).map_err(|e| Error::io(format!("cannot write {path}"), e))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(data)
                .and_then(|()| stdout.flush())
                .map_err(|e| Error::io("cannot write to stdout", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_list tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_list_numbers() {
        let sizes: Vec<usize> = parse_list("1024, 2048,4096", "sizes").unwrap();
        assert_eq!(sizes, vec![1024, 2048, 4096]);
        let probs: Vec<f64> = parse_list("0.5,0.8", "probabilities").unwrap();
        assert_eq!(probs, vec![0.5, 0.8]);
    }

    #[test]
    fn test_parse_list_skips_empty_items() {
        let sizes: Vec<usize> = parse_list("1024,,", "sizes").unwrap();
        assert_eq!(sizes, vec![1024]);
    }

    #[test]
    fn test_parse_list_names_the_flag() {
        let err = parse_list::<usize>("12,abc", "sizes").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sizes"));
        assert!(msg.contains("abc"));
    }

    // -----------------------------------------------------------------------
    // parse_names tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_names_trims() {
        assert_eq!(parse_names(" gzip , bzip2"), vec!["gzip", "bzip2"]);
    }

    #[test]
    fn test_parse_names_none() {
        assert!(parse_names("none").is_empty());
        assert!(parse_names("NONE").is_empty());
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_output(path.to_str(), b"\x01\x02").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\x01\x02");
    }
}
