use std::path::{Path, PathBuf};

use iced::widget::image::Handle;
use iced::Size;
use tracing::{debug, info, warn};

use super::watch::{Fingerprint, WatchEvent, WatchKind, WatchTarget};
use crate::config::{PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH};
use crate::hdr::{self, LoadError, LoadedImage};

/// Size the surface falls back to when nothing is displayed
pub const PLACEHOLDER_SIZE: Size<u32> = Size {
    width: PLACEHOLDER_WIDTH,
    height: PLACEHOLDER_HEIGHT,
};

/// Notifications the hosting window reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// The displayed dimensions changed (including reset to the placeholder)
    SizeChanged(Size<u32>),
}

/// Drag-and-drop input, one event per hovered or dropped file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Entered,
    Left,
    Dropped(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DragState {
    #[default]
    Idle,
    /// Files are over the surface, background is highlighted
    Hovering,
    /// Drop gesture in progress; `loaded` once its first file was taken
    Dropping { loaded: bool },
}

/// What is currently on screen
#[derive(Debug, Clone)]
struct Displayed {
    image: LoadedImage,
    handle: Handle,
}

/// The image-bearing area of the window
///
/// Loads and tone-maps images, accepts dropped files and reacts to changes
/// of the one file it watches. Operations return an [`Effect`] instead of
/// resizing anything themselves.
#[derive(Debug, Default)]
pub struct Surface {
    displayed: Option<Displayed>,
    watch: Option<WatchTarget>,
    last_generation: u64,
    drag: DragState,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, replace the displayed image and start watching it
    ///
    /// On failure nothing changes: the previous image and watch stay.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Effect, LoadError> {
        let path = path.as_ref();
        // Taken before decoding so a write landing mid-decode still differs
        let fingerprint = Fingerprint::read(path);
        let image = hdr::load(path)?;
        Ok(self.show(image, fingerprint))
    }

    /// Display a decoded image and watch its file from `fingerprint` on
    fn show(&mut self, image: LoadedImage, fingerprint: Option<Fingerprint>) -> Effect {
        let size = image.size();
        let path = image.path().to_path_buf();

        info!("🖼️  Loaded {} ({}x{})", path.display(), size.width, size.height);

        let handle = Handle::from_rgba(size.width, size.height, image.to_rgba());
        self.displayed = Some(Displayed { image, handle });

        self.last_generation += 1;
        self.watch = Some(WatchTarget::with_fingerprint(path, self.last_generation, fingerprint));

        Effect::SizeChanged(size)
    }

    /// Drop the image and the watch, back to the placeholder
    fn clear(&mut self) -> Effect {
        self.displayed = None;
        self.watch = None;
        Effect::SizeChanged(PLACEHOLDER_SIZE)
    }

    /// Handle hover / drop events from the window
    pub fn handle_drag(&mut self, event: DragEvent) -> Option<Effect> {
        match event {
            DragEvent::Entered => {
                self.drag = DragState::Hovering;
                None
            }
            DragEvent::Left => {
                self.drag = DragState::Idle;
                None
            }
            DragEvent::Dropped(path) => {
                if self.drag == (DragState::Dropping { loaded: true }) {
                    debug!("Ignoring extra dropped entry {}", path.display());
                    return None;
                }

                if !path.is_file() {
                    debug!("Skipping dropped entry that is not a file: {}", path.display());
                    self.drag = DragState::Dropping { loaded: false };
                    return None;
                }

                self.drag = DragState::Dropping { loaded: true };
                match self.load(&path) {
                    Ok(effect) => Some(effect),
                    Err(err) => {
                        warn!("⚠️  Dropped file not loaded: {}", err);
                        None
                    }
                }
            }
        }
    }

    /// React to a notification from the file watcher
    pub fn handle_watch(&mut self, event: WatchEvent) -> Option<Effect> {
        let target = match &self.watch {
            Some(target) if target.generation == event.generation => target,
            _ => {
                debug!("Discarding stale watch event {:?}", event);
                return None;
            }
        };
        let path = target.path.clone();

        match event.kind {
            WatchKind::Changed if path.is_file() => match self.load(&path) {
                Ok(effect) => Some(effect),
                Err(err) => {
                    // Usually a write still in progress; the next change retries
                    warn!("⚠️  Reload failed, keeping previous image: {}", err);
                    None
                }
            },
            WatchKind::Changed | WatchKind::Removed => {
                info!("🗑️  {} is gone, clearing", path.display());
                Some(self.clear())
            }
        }
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.displayed.as_ref().map(|displayed| &displayed.image)
    }

    /// GPU texture handle for the displayed image
    pub fn handle(&self) -> Option<&Handle> {
        self.displayed.as_ref().map(|displayed| &displayed.handle)
    }

    pub fn watch_target(&self) -> Option<&WatchTarget> {
        self.watch.as_ref()
    }

    /// Whether a drag is hovering over the surface
    pub fn is_highlighted(&self) -> bool {
        self.drag == DragState::Hovering
    }

    /// Displayed size, or the placeholder when empty
    pub fn size(&self) -> Size<u32> {
        self.image().map_or(PLACEHOLDER_SIZE, LoadedImage::size)
    }
}
