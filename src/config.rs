//! Compile-time settings for the viewer
//!
//! The viewer has no config file and persists nothing, so everything
//! tunable lives here.

use std::time::Duration;

/// Window title, also used as the message box title
pub const WINDOW_TITLE: &str = "hdrviewer";

/// Window size while no image is loaded
pub const PLACEHOLDER_WIDTH: u32 = 200;
pub const PLACEHOLDER_HEIGHT: u32 = 200;

/// Display gamma used by the tone-mapping curve
pub const DISPLAY_GAMMA: f32 = 2.2;

/// How often the watched file's metadata is checked when no native
/// watcher is available
pub const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Quiet time after a change notification before the file is looked at
pub const WATCH_SETTLE: Duration = Duration::from_millis(50);

/// Open dialog filter (advisory, the decoder decides what actually loads)
pub const DIALOG_FILTER_NAME: &str = "HDR Image";
pub const HDR_EXTENSIONS: &[&str] = &["hdr", "exr"];

/// Default tracing directive when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "hdrviewer=info";
