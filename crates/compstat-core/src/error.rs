//! Error taxonomy shared by every stage of an experiment.
//!
//! Statistical verdicts are never errors: a `Reject` is a normal output.
//! Errors here mean the experiment itself could not run as configured.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A generator, estimator or test parameter is outside its domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A compressor identifier that no adapter knows about.
    #[error("unsupported compressor `{requested}` (supported: {supported})")]
    UnsupportedCompressor { requested: String, supported: String },

    /// A classical test identifier that the battery does not provide.
    #[error("unsupported test `{requested}` (supported: {supported})")]
    UnsupportedTest { requested: String, supported: String },

    /// The underlying compressor failed or produced unusable output.
    #[error("codec `{codec}` failed: {reason}")]
    CodecFailure { codec: String, reason: String },

    /// An external step exceeded its time budget.
    #[error("{what} timed out after {:.1}s", after.as_secs_f64())]
    Timeout {
        what: String,
        after: std::time::Duration,
    },

    /// A temporary artifact could not be removed.
    #[error("failed to remove temporary artifact {}: {source}", path.display())]
    ResourceCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The experiment configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading an input file or writing a report failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn codec(codec: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::CodecFailure {
            codec: codec.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = Error::UnsupportedCompressor {
            requested: "lz4".into(),
            supported: "gzip, zlib".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lz4"));
        assert!(msg.contains("gzip, zlib"));

        let err = Error::invalid("probability", "must lie in (0, 1], got 1.5");
        assert_eq!(
            err.to_string(),
            "invalid parameter `probability`: must lie in (0, 1], got 1.5"
        );
    }
}
