/// Viewer state
///
/// - The display surface: loaded image, drag state, watch target (surface.rs)
/// - Watching the displayed file for changes (watch.rs)

pub mod surface;
pub mod watch;
