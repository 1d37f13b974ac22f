//! Structured logging setup
//!
//! Logs go to stderr so operator prompts on stdout stay readable.
//! Level is configurable via RUST_LOG (default: info).

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Git commit the binary was built from
pub const GIT_HASH: &str = env!("GIT_HASH");

pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
