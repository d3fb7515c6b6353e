//! Crate-wide constants.

use std::time::Duration;

/// Length of the truncated configuration id.
pub const CONFIG_ID_LEN: usize = 12;

/// Dimension name used for the build type axis (`--build-types`).
pub const BUILD_TYPE_DIMENSION: &str = "build_type";

/// Dimension name used for the target architecture axis (`--archs`).
pub const ARCH_DIMENSION: &str = "arch";

/// Build types used when nothing else is configured.
pub const DEFAULT_BUILD_TYPES: &[&str] = &["Release", "Debug"];

/// Architectures used when nothing else is configured.
pub const DEFAULT_ARCHS: &[&str] = &["x86_64"];

/// Default time in-flight builds get to finish after cancellation.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Default root for per-configuration working directories.
pub const DEFAULT_WORK_DIR: &str = "target/buildmatrix";

/// Name of the log file written into each configuration's working directory.
pub const BUILD_LOG_FILE: &str = "build.log";

/// Prefix for environment variables read by the config layer and exported
/// to build commands.
pub const ENV_PREFIX: &str = "BMX_";

/// Number of trailing output lines kept in a failed outcome's diagnostics.
pub const DIAGNOSTIC_TAIL_LINES: usize = 20;
