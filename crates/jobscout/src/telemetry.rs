//! Process-wide log and trace output.

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Default filter for a `-v` count. `RUST_LOG` takes precedence.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "jobscout=info",
        1 => "jobscout=debug",
        _ => "jobscout=trace",
    }
}

/// Installs the global subscriber, writing to stderr, and routes `log`
/// records into it. Returns false if a subscriber was already installed.
pub fn init_tracing(verbosity: u8, format: LogFormat) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_target(false).finish())
        }
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    if installed.is_err() {
        return false;
    }

    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!("log records not bridged: {}", e);
    }
    true
}
