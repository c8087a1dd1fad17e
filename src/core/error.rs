use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NestEggError>;

#[derive(Debug, Error)]
pub enum NestEggError {
    /// Parameters or inputs that make a run meaningless. Raised before any trial.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A historical data file that exists but cannot be parsed.
    #[error("data error in {}: {message}", path.display())]
    Data { path: PathBuf, message: String },

    #[error("data error: failed to read {}: {source}", path.display())]
    DataIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NestEggError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn data(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Data {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn data_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DataIo {
            path: path.into(),
            source,
        }
    }

    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. } | Self::DataIo { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifiers_split_configuration_from_data_errors() {
        let config = NestEggError::configuration("--num-cases must be > 0");
        assert!(config.is_configuration());
        assert!(!config.is_data());
        assert_eq!(
            config.to_string(),
            "configuration error: --num-cases must be > 0"
        );

        let parse = NestEggError::data("data/x.txt", "line 3: `abc` is not a number");
        assert!(parse.is_data());
        assert!(parse.to_string().contains("data/x.txt"));

        let io = NestEggError::data_io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert!(io.is_data());
        assert!(io.to_string().contains("missing.txt"));
    }
}
