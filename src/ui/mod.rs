/// User interface pieces
///
/// - Display surface rendering (surface.rs)
/// - File menu overlay (menu.rs)

pub mod menu;
pub mod surface;
