//! Tracing subscriber setup for the binary
//!
//! `GIT_VERSIONER_LOG` takes precedence over `RUST_LOG`; with neither set
//! only warnings are shown, or everything down to `debug` with `--verbose`.
//! Logs always go to stderr so stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "GIT_VERSIONER_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// The filter directive in effect for this process
pub fn filter_directive(verbose: bool) -> String {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| if verbose { "debug" } else { "warn" }.to_string())
}

fn env_filter(verbose: bool) -> EnvFilter {
    let directive = filter_directive(verbose);
    EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("invalid log directive '{}' ({}); using warn", directive, err);
        EnvFilter::new("warn")
    })
}

/// Install the global subscriber; a second call is a no-op
pub fn init(verbose: bool, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        std::env::remove_var(LOG_ENV);
        std::env::remove_var("RUST_LOG");
    }

    #[test]
    #[serial]
    fn test_default_directive() {
        clear();
        assert_eq!(filter_directive(false), "warn");
        assert_eq!(filter_directive(true), "debug");
    }

    #[test]
    #[serial]
    fn test_own_variable_wins_over_rust_log() {
        clear();
        std::env::set_var("RUST_LOG", "info");
        assert_eq!(filter_directive(false), "info");

        std::env::set_var(LOG_ENV, "git_versioner=trace");
        assert_eq!(filter_directive(true), "git_versioner=trace");
        clear();
    }
}
