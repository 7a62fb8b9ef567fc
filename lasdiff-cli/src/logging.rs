use std::io::{self, IsTerminal};

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Console logging to stderr. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_filter(filter);

    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}

fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,lasdiff=debug,lasdiff_java=debug",
        2 => "info,lasdiff=trace,lasdiff_java=trace",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_level() {
        assert_eq!(default_filter(0), "warn");
        assert!(default_filter(1).contains("lasdiff=debug"));
        assert!(default_filter(2).contains("lasdiff=trace"));
        assert_eq!(default_filter(7), "trace");
    }
}
