use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
}

///
/// Installs the global subscriber. `RUST_LOG` wins over `level` when it is set.
///
pub fn init_logging(level: Option<&str>, format: LogFormat) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = level.map(parse_level).unwrap_or(Level::INFO);
        EnvFilter::new(level.as_str())
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => {
            let _ = tracing::subscriber::set_global_default(
                registry.with(tracing_subscriber::fmt::layer().compact()),
            );
        }
        LogFormat::Pretty => {
            let _ = tracing::subscriber::set_global_default(
                registry.with(tracing_subscriber::fmt::layer()),
            );
        }
    }
}

/// Unknown names fall back to `info`.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("loud"), Level::INFO);
    }
}
