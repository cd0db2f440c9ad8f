// Build-time identity reported on GET /version

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml); "solar-telemetry".
pub const NAME: &str = env!("CARGO_PKG_NAME");
