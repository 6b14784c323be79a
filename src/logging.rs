use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global `tracing` subscriber.
///
/// `style` is `json` for structured output, otherwise `always`, `never` or
/// `auto` controls ANSI colors. Returns false when a subscriber was already
/// installed.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = env_filter(&config.level);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.style.as_str() {
        "json" => builder.json().try_init(),
        style => builder.with_ansi(use_ansi(style)).try_init(),
    };
    installed.is_ok()
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn use_ansi(style: &str) -> bool {
    match style {
        "always" => true,
        "never" => false,
        _ => std::io::stdout().is_terminal(),
    }
}
