//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - every requested component started
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - node config missing, unparsable or invalid
pub const CONFIG_ERROR: i32 = 2;

/// Template error - a manifest failed to render
pub const TEMPLATE_ERROR: i32 = 3;

/// Install error - at least one component failed to start
pub const INSTALL_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Cluster error - kubeconfig unreadable or API client could not be built
pub const CLUSTER_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Interrupted - installs were cancelled by SIGINT
pub const CANCELLED: i32 = 130;
