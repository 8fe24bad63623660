//! Exit codes of the `baseline` binary. Part of the public contract.

pub const SUCCESS: i32 = 0;
pub const DIAGNOSTICS_FAILED: i32 = 1; // Plan has error diagnostics (or warnings under --deny-warnings)
pub const CONFIG_ERROR: i32 = 2; // Config, catalog, profile or extension error; no plan
