//! Single-file change watcher
//!
//! The OS notifies about changes in the watched file's directory (notify's
//! recommended backend); each wakeup is checked against the file's
//! fingerprint so bursts and unrelated events collapse into one report. If
//! no native watcher can be created the path is polled instead.
//!
//! Each successful load creates a new `WatchTarget` with a fresh generation,
//! and the subscription is identified by `(path, generation)`: replacing the
//! target makes iced drop the old stream (which unregisters the OS watch),
//! and any event already in flight carries a stale generation that the
//! surface discards.

use std::ffi::{OsStr, OsString};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use iced::futures::channel::mpsc;
use iced::futures::stream::{self, BoxStream, Stream, StreamExt};
use iced::Subscription;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::config::{WATCH_POLL_INTERVAL, WATCH_SETTLE};

/// What a regular file looked like on disk at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl Fingerprint {
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        metadata.is_file().then(|| Fingerprint {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }

    /// Fingerprint of `path`, or `None` if it is not a regular file
    pub fn read(path: &Path) -> Option<Self> {
        std::fs::metadata(path)
            .ok()
            .and_then(|metadata| Self::from_metadata(&metadata))
    }

    /// Same as [`Fingerprint::read`], without blocking the executor
    pub async fn read_async(path: &Path) -> Option<Self> {
        tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|metadata| Self::from_metadata(&metadata))
    }
}

/// The one path currently being watched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub generation: u64,
    /// Fingerprint at the time the image was loaded
    pub fingerprint: Option<Fingerprint>,
}

impl WatchTarget {
    pub fn new(path: PathBuf, generation: u64) -> Self {
        let fingerprint = Fingerprint::read(&path);
        Self::with_fingerprint(path, generation, fingerprint)
    }

    /// Target whose baseline was observed earlier, e.g. before decoding
    pub fn with_fingerprint(path: PathBuf, generation: u64, fingerprint: Option<Fingerprint>) -> Self {
        Self {
            path,
            generation,
            fingerprint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    /// Contents or metadata changed, the file still exists
    Changed,
    /// The path no longer names a regular file
    Removed,
}

/// Notification delivered to the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchEvent {
    pub generation: u64,
    pub kind: WatchKind,
}

/// Change detector for one watch target
#[derive(Debug, Clone)]
pub struct Poller {
    target: WatchTarget,
    last: Option<Fingerprint>,
}

impl Poller {
    pub fn new(target: WatchTarget) -> Self {
        let last = target.fingerprint;
        Self { target, last }
    }

    pub fn path(&self) -> &Path {
        &self.target.path
    }

    pub fn generation(&self) -> u64 {
        self.target.generation
    }

    /// Compare a fresh observation against the last one
    ///
    /// Reports each distinct change once. After `Removed` the poller is done.
    pub fn observe(&mut self, observed: Option<Fingerprint>) -> Option<WatchKind> {
        match observed {
            None => Some(WatchKind::Removed),
            Some(current) if self.last != Some(current) => {
                self.last = Some(current);
                Some(WatchKind::Changed)
            }
            Some(_) => None,
        }
    }

    fn event(&self, kind: WatchKind) -> WatchEvent {
        debug!(path = %self.path().display(), ?kind, "watched file event");
        WatchEvent {
            generation: self.generation(),
            kind,
        }
    }
}

/// Poll `target` every `interval` and yield its changes
///
/// The stream ends after reporting removal.
pub fn poll(target: WatchTarget, interval: Duration) -> impl Stream<Item = WatchEvent> {
    stream::unfold(Some(Poller::new(target)), move |poller| async move {
        let Some(mut poller) = poller else {
            return None;
        };

        loop {
            tokio::time::sleep(interval).await;

            let observed = Fingerprint::read_async(poller.path()).await;
            trace!(path = %poller.path().display(), ?observed, "polled watch target");

            if let Some(kind) = poller.observe(observed) {
                let event = poller.event(kind);
                let next = match kind {
                    WatchKind::Changed => Some(poller),
                    WatchKind::Removed => None,
                };
                return Some((event, next));
            }
        }
    })
}

/// Directory to register with the OS: editors often replace files by
/// renaming, which a watch on the file itself would not survive
fn watch_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn is_about(event: &notify::Event, file_name: Option<&OsStr>) -> bool {
    // Overflow / rescan notifications carry no paths
    event.paths.is_empty() || event.paths.iter().any(|path| path.file_name() == file_name)
}

/// State of a running native watch
struct NativeWatch {
    poller: Poller,
    wakeups: mpsc::UnboundedReceiver<()>,
    /// Dropping it unregisters the OS watch
    _watcher: RecommendedWatcher,
}

/// Register an OS watch for `target` and yield its changes
///
/// The watch is registered before this returns, so changes made right after
/// are seen, and the first check runs immediately to catch anything that
/// happened since the target's fingerprint was taken. After a wakeup the
/// stream waits `settle` for the write burst to finish, then compares
/// fingerprints. It ends after reporting removal.
pub fn native(target: WatchTarget, settle: Duration) -> notify::Result<impl Stream<Item = WatchEvent>> {
    let (sender, wakeups) = mpsc::unbounded();
    // Check once right away: the file may have changed since it was loaded
    let _ = sender.unbounded_send(());
    let file_name: Option<OsString> = target.path.file_name().map(ToOwned::to_owned);

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        let wake = match result {
            Ok(event) => is_about(&event, file_name.as_deref()),
            Err(err) => {
                warn!("⚠️  File watcher error: {}", err);
                true
            }
        };
        if wake {
            // The receiver is gone once the subscription was replaced
            let _ = sender.unbounded_send(());
        }
    })?;
    watcher.watch(watch_dir(&target.path), RecursiveMode::NonRecursive)?;

    let state = NativeWatch {
        poller: Poller::new(target),
        wakeups,
        _watcher: watcher,
    };

    Ok(stream::unfold(Some(state), move |state| async move {
        let Some(mut state) = state else {
            return None;
        };

        while state.wakeups.next().await.is_some() {
            tokio::time::sleep(settle).await;
            while let Ok(Some(())) = state.wakeups.try_next() {}

            let observed = Fingerprint::read_async(state.poller.path()).await;
            trace!(path = %state.poller.path().display(), ?observed, "woken by file watcher");

            if let Some(kind) = state.poller.observe(observed) {
                let event = state.poller.event(kind);
                let next = match kind {
                    WatchKind::Changed => Some(state),
                    WatchKind::Removed => None,
                };
                return Some((event, next));
            }
        }

        None
    }))
}

/// Native watch when available, polling otherwise
///
/// Nothing is registered until the stream is first polled.
pub fn watch(target: WatchTarget) -> impl Stream<Item = WatchEvent> {
    stream::once(async move {
        let events: BoxStream<'static, WatchEvent> = match native(target.clone(), WATCH_SETTLE) {
            Ok(events) => events.boxed(),
            Err(err) => {
                warn!(
                    "⚠️  No native watch for {} ({}), polling instead",
                    target.path.display(),
                    err
                );
                poll(target, WATCH_POLL_INTERVAL).boxed()
            }
        };
        events
    })
    .flatten()
}

/// Subscription watching `target`
///
/// Its identity is the path plus generation, so a new load always restarts
/// the watch and the previous stream is cancelled.
pub fn subscription(target: &WatchTarget) -> Subscription<WatchEvent> {
    Subscription::run_with_id(
        (target.path.clone(), target.generation),
        watch(target.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(len: u64) -> Fingerprint {
        Fingerprint {
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(len)),
            len,
        }
    }

    fn target(initial: Option<Fingerprint>) -> WatchTarget {
        WatchTarget {
            path: PathBuf::from("/tmp/watched.exr"),
            generation: 3,
            fingerprint: initial,
        }
    }

    #[test]
    fn test_unchanged_file_is_quiet() {
        let mut poller = Poller::new(target(Some(fingerprint(10))));
        assert_eq!(poller.observe(Some(fingerprint(10))), None);
        assert_eq!(poller.observe(Some(fingerprint(10))), None);
    }

    #[test]
    fn test_change_is_reported_once() {
        let mut poller = Poller::new(target(Some(fingerprint(10))));
        assert_eq!(poller.observe(Some(fingerprint(20))), Some(WatchKind::Changed));
        assert_eq!(poller.observe(Some(fingerprint(20))), None);
        assert_eq!(poller.observe(Some(fingerprint(30))), Some(WatchKind::Changed));
    }

    #[test]
    fn test_removal_is_reported() {
        let mut poller = Poller::new(target(Some(fingerprint(10))));
        assert_eq!(poller.observe(None), Some(WatchKind::Removed));
        assert_eq!(poller.generation(), 3);
    }

    #[test]
    fn test_unknown_initial_fingerprint_counts_as_change() {
        let mut poller = Poller::new(target(None));
        assert_eq!(poller.observe(Some(fingerprint(1))), Some(WatchKind::Changed));
    }

    #[test]
    fn test_fingerprint_of_regular_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, [0u8; 12]).unwrap();

        let found = Fingerprint::read(&path).unwrap();
        assert_eq!(found.len, 12);
        assert_eq!(Fingerprint::read(dir.path()), None);
        assert_eq!(Fingerprint::read(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_target_captures_fingerprint_at_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, [1u8; 4]).unwrap();

        let target = WatchTarget::new(path.clone(), 7);

        assert_eq!(target.generation, 7);
        assert_eq!(target.fingerprint.map(|f| f.len), Some(4));
    }

    #[tokio::test]
    async fn test_read_async_matches_blocking_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, [0u8; 3]).unwrap();

        assert_eq!(Fingerprint::read_async(&path).await, Fingerprint::read(&path));
        assert_eq!(Fingerprint::read_async(&dir.path().join("missing")).await, None);
    }

    #[tokio::test]
    async fn test_stream_reports_removal_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, [0u8; 3]).unwrap();
        let target = WatchTarget::new(path.clone(), 5);
        std::fs::remove_file(&path).unwrap();

        let events: Vec<_> = poll(target, Duration::from_millis(1)).collect().await;

        assert_eq!(
            events,
            vec![WatchEvent {
                generation: 5,
                kind: WatchKind::Removed
            }]
        );
    }

    #[tokio::test]
    async fn test_stream_reports_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, [0u8; 3]).unwrap();
        let target = WatchTarget::new(path.clone(), 9);
        std::fs::write(&path, [0u8; 8]).unwrap();

        let mut events = Box::pin(poll(target, Duration::from_millis(1)));
        let first = events.next().await;

        assert_eq!(
            first,
            Some(WatchEvent {
                generation: 9,
                kind: WatchKind::Changed
            })
        );
    }

    #[test]
    fn test_with_fingerprint_keeps_given_baseline() {
        let baseline = Some(fingerprint(42));
        let target = WatchTarget::with_fingerprint(PathBuf::from("/tmp/a.exr"), 2, baseline);
        assert_eq!(target.fingerprint, baseline);
    }

    #[test]
    fn test_watch_dir_of_bare_file_name() {
        assert_eq!(watch_dir(Path::new("image.exr")), Path::new("."));
        assert_eq!(watch_dir(Path::new("/renders/image.exr")), Path::new("/renders"));
    }

    #[tokio::test]
    async fn test_native_watch_reports_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.exr");
        std::fs::write(&path, [0u8; 3]).unwrap();
        let target = WatchTarget::new(path.clone(), 11);
        let mut events = Box::pin(native(target, Duration::from_millis(20)).unwrap());

        std::fs::write(&path, [0u8; 8]).unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), events.next())
            .await
            .unwrap();

        assert_eq!(
            first,
            Some(WatchEvent {
                generation: 11,
                kind: WatchKind::Changed
            })
        );
    }

    #[tokio::test]
    async fn test_native_watch_reports_removal_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.exr");
        std::fs::write(&path, [0u8; 3]).unwrap();
        let target = WatchTarget::new(path.clone(), 4);
        let mut events = Box::pin(native(target, Duration::from_millis(20)).unwrap());

        std::fs::remove_file(&path).unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), events.next())
            .await
            .unwrap();
        let rest = tokio::time::timeout(Duration::from_secs(5), events.next())
            .await
            .unwrap();

        assert_eq!(
            first,
            Some(WatchEvent {
                generation: 4,
                kind: WatchKind::Removed
            })
        );
        assert_eq!(rest, None);
    }

    #[tokio::test]
    async fn test_native_watch_ignores_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.exr");
        std::fs::write(&path, [0u8; 3]).unwrap();
        let target = WatchTarget::new(path.clone(), 1);
        let mut events = Box::pin(native(target, Duration::from_millis(20)).unwrap());

        std::fs::write(dir.path().join("other.exr"), [0u8; 8]).unwrap();
        let quiet = tokio::time::timeout(Duration::from_millis(300), events.next()).await;

        assert!(quiet.is_err(), "sibling write was reported: {:?}", quiet);
    }

    #[tokio::test]
    async fn test_watch_starts_lazily_and_reports_removal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.exr");
        std::fs::write(&path, [0u8; 3]).unwrap();
        let target = WatchTarget::new(path.clone(), 6);
        // Removed before the stream is first polled
        std::fs::remove_file(&path).unwrap();
        let mut events = Box::pin(watch(target));

        let first = tokio::time::timeout(Duration::from_secs(5), events.next())
            .await
            .unwrap();

        assert_eq!(
            first,
            Some(WatchEvent {
                generation: 6,
                kind: WatchKind::Removed
            })
        );
    }
}
