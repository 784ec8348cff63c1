//! `strata version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("strata");

    kv("Version", VERSION);
    kv("Binary", "strata");

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);
    kv("History store", "sqlite");

    output::newline();

    output::dim("Components");
    kv("strata-migrate", env!("CARGO_PKG_VERSION"));
    kv("strata-sqlite", env!("CARGO_PKG_VERSION"));

    Ok(())
}
