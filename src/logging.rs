use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 6] =
    ["partpush", "partpush_chunk", "partpush_config", "partpush_ledger", "partpush_transfer", "partpush_vcs"];

/// Level for this workspace's crates. Anything else only reports warnings.
fn level(verbosity: u8, quiet: bool) -> &'static str {
    match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

fn directives(verbosity: u8, quiet: bool) -> String {
    let level = level(verbosity, quiet);
    let mut directives = vec![if quiet { "error".to_string() } else { "warn".to_string() }];
    directives.extend(CRATES.iter().map(|name| format!("{name}={level}")));
    directives.join(",")
}

/// Install the global subscriber, writing to stderr. `RUST_LOG` overrides the
/// level picked from the command line.
pub fn init(verbosity: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(verbosity, quiet)));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 2)
                .with_file(verbosity >= 2)
                .with_line_number(verbosity >= 2),
        )
        .try_init()
        .or_raise(|| ErrorKind::Logging)
}
