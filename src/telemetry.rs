//! Tracing initialisation

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (or `debug` when `debug` is
/// true) applies. `json` switches the fmt layer to one JSON object per line.
pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = parse_level(level, debug)?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("tracing subscriber already installed")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("tracing subscriber already installed")?;
    }
    Ok(())
}

fn parse_level(level: &str, debug: bool) -> Result<tracing::Level> {
    if debug {
        return Ok(tracing::Level::DEBUG);
    }
    level.parse().context("Invalid log level")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_overrides_level() {
        assert_eq!(parse_level("warn", true).unwrap(), tracing::Level::DEBUG);
        assert_eq!(parse_level("warn", false).unwrap(), tracing::Level::WARN);
    }

    #[test]
    fn invalid_level_is_rejected() {
        let err = init_logging("chatty", false, false).unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }
}
