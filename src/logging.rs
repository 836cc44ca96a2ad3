//! tracing setup for the `ontoc` binary. The library itself only emits events.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "ontoc=warn";
const VERBOSE_LOG_FILTER: &str = "ontoc=debug";

/// Installs a stderr subscriber. `RUST_LOG` wins over `verbose`.
///
/// Returns `false` when a global subscriber was already installed (tests,
/// embedding applications); the existing one is left alone.
pub fn init(verbose: bool) -> bool {
    let fallback = if verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init()
        .is_ok()
}
