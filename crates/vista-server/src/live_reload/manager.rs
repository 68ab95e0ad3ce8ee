//! Live reload manager.
//!
//! Coordinates file watching and WebSocket broadcasting for live reload.
//! Only the output root is watched; the primary root holds static assets,
//! not build output.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::mpsc;

use super::coalescer::ChangeCoalescer;

/// Event sent to connected WebSocket clients when the output root changes.
///
/// Carries no payload beyond its type; "something changed" is the whole
/// message.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct ChangeEvent {
    /// Event type (always "change").
    #[serde(rename = "type")]
    event_type: String,
}

impl ChangeEvent {
    /// Create the change event.
    pub(crate) fn new() -> Self {
        Self {
            event_type: "change".to_string(),
        }
    }
}

/// Default coalescing window in milliseconds.
const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Default maximum subdirectory depth observed under the watched root.
const DEFAULT_WATCH_DEPTH: u32 = 2;

/// Interval at which the coalescer is polled for a ready signal.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Delay between attempts to re-establish a lost watch.
const REWATCH_INTERVAL: Duration = Duration::from_millis(200);

/// Manages file watching and broadcasting of change signals.
pub(crate) struct LiveReloadManager {
    output_root: PathBuf,
    depth: u32,
    broadcaster: broadcast::Sender<ChangeEvent>,
    watcher: Option<Arc<Mutex<RecommendedWatcher>>>,
    debounce_ms: u64,
}

impl LiveReloadManager {
    /// Create a new live reload manager.
    ///
    /// # Arguments
    ///
    /// * `output_root` - Directory to watch for changes
    /// * `broadcaster` - Broadcast channel sender for change signals
    #[must_use]
    pub(crate) fn new(output_root: PathBuf, broadcaster: broadcast::Sender<ChangeEvent>) -> Self {
        Self {
            output_root,
            depth: DEFAULT_WATCH_DEPTH,
            broadcaster,
            watcher: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    /// Set the maximum subdirectory depth to observe.
    #[must_use]
    pub(crate) fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Set the coalescing window in milliseconds.
    #[must_use]
    pub(crate) fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Start the file watcher.
    ///
    /// Spawns background tasks that watch for file changes under the output
    /// root and broadcast one coalesced change signal per burst to connected
    /// WebSocket clients. The watch handle is released when the manager is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be established on the output
    /// root. Once running, a lost watch (output root removed or watcher
    /// error) is logged and re-established as soon as the root reappears;
    /// it never terminates the process.
    pub(crate) fn start(&mut self) -> Result<(), notify::Error> {
        let (tx, mut rx) = mpsc::channel::<Result<Event, notify::Error>>(100);

        // Create watcher with callback that forwards events and errors to
        // the channel (the callback is sync, hence blocking_send)
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let _ = tx.blocking_send(res);
        })?;

        watcher.watch(&self.output_root, RecursiveMode::Recursive)?;
        let watcher = Arc::new(Mutex::new(watcher));
        self.watcher = Some(Arc::clone(&watcher));

        // Create coalescer
        let coalescer = Arc::new(ChangeCoalescer::new(Duration::from_millis(
            self.debounce_ms,
        )));
        let coalescer_for_record = Arc::clone(&coalescer);

        // Spawn task to record events into the coalescer and keep the watch
        // alive across removal of the output root
        let output_root = self.output_root.clone();
        let depth = self.depth;

        tokio::spawn(async move {
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) => {
                        if Self::root_was_removed(&event, &output_root) {
                            Self::rewatch(&watcher, &output_root).await;
                            // The recreated root is itself a change
                            coalescer_for_record.record();
                            continue;
                        }
                        Self::record_event(&event, &output_root, depth, &coalescer_for_record);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Filesystem watcher error, re-establishing watch");
                        Self::rewatch(&watcher, &output_root).await;
                    }
                }
            }
        });

        // Spawn task to broadcast coalesced signals
        let broadcaster = self.broadcaster.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);

            loop {
                interval.tick().await;

                if coalescer.take_ready() {
                    Self::broadcast_changed(&broadcaster);
                }
            }
        });

        Ok(())
    }

    /// Check whether an event reports removal of the watched root itself.
    ///
    /// Removing the watched directory kills the OS watch; it has to be
    /// re-established once the root reappears.
    fn root_was_removed(event: &Event, output_root: &Path) -> bool {
        matches!(event.kind, EventKind::Remove(_))
            && event.paths.iter().any(|path| path == output_root)
    }

    /// Re-establish the watch on the output root, retrying until it exists
    /// again.
    async fn rewatch(watcher: &Arc<Mutex<RecommendedWatcher>>, output_root: &Path) {
        loop {
            {
                let mut guard = watcher.lock().unwrap();
                // The dead watch may or may not still be registered
                let _ = guard.unwatch(output_root);
                match guard.watch(output_root, RecursiveMode::Recursive) {
                    Ok(()) => {
                        tracing::info!(path = %output_root.display(), "Re-established watch on output root");
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Output root not watchable yet, retrying");
                    }
                }
            }
            tokio::time::sleep(REWATCH_INTERVAL).await;
        }
    }

    /// Record a raw filesystem event into the coalescer.
    fn record_event(event: &Event, output_root: &Path, depth: u32, coalescer: &ChangeCoalescer) {
        // Create, modify, rename and delete all count as a change; access
        // and metadata-only kinds do not.
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
            _ => return,
        }

        for path in &event.paths {
            if !Self::within_depth(path, output_root, depth) {
                continue;
            }

            coalescer.record();
            tracing::debug!(path = %path.display(), kind = ?event.kind, "Recorded filesystem event");
        }
    }

    /// Check whether a path lies within `depth` subdirectory levels of the
    /// watched root.
    ///
    /// The root itself does not qualify, only entries under it. Depth 0
    /// admits entries directly inside the root; each increment admits one
    /// more subdirectory level.
    fn within_depth(path: &Path, output_root: &Path, depth: u32) -> bool {
        let Ok(relative) = path.strip_prefix(output_root) else {
            return false;
        };

        let components = relative.components().count();
        components >= 1 && components <= depth as usize + 1
    }

    /// Send the change signal to every connected session.
    ///
    /// Fire-and-forget: a session whose socket is gone drops out of the
    /// broadcast channel on its own, and a send with zero receivers is
    /// benign.
    fn broadcast_changed(broadcaster: &broadcast::Sender<ChangeEvent>) {
        let sessions = broadcaster.receiver_count();
        let _ = broadcaster.send(ChangeEvent::new());

        tracing::info!(sessions, "Output changed, broadcast change signal");
    }

    /// Get a receiver for change signals.
    #[must_use]
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.broadcaster.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_change_event_serialization() {
        let event = ChangeEvent::new();

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "change");
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_within_depth_direct_child() {
        let root = PathBuf::from("/output");

        assert!(LiveReloadManager::within_depth(
            &PathBuf::from("/output/frame.ppm"),
            &root,
            0
        ));
    }

    #[test]
    fn test_within_depth_two_levels() {
        let root = PathBuf::from("/output");
        let path = PathBuf::from("/output/frames/0001/frame.ppm");

        assert!(LiveReloadManager::within_depth(&path, &root, 2));
        assert!(!LiveReloadManager::within_depth(&path, &root, 1));
    }

    #[test]
    fn test_within_depth_excludes_root_itself() {
        let root = PathBuf::from("/output");

        assert!(!LiveReloadManager::within_depth(&root, &root, 2));
    }

    #[test]
    fn test_within_depth_outside_root() {
        let root = PathBuf::from("/output");

        assert!(!LiveReloadManager::within_depth(
            &PathBuf::from("/web/index.html"),
            &root,
            2
        ));
    }

    #[test]
    fn test_record_event_filters_by_depth() {
        let root = PathBuf::from("/output");
        let coalescer = ChangeCoalescer::new(Duration::from_millis(0));

        let too_deep = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/output/a/b/c/d.txt"));
        LiveReloadManager::record_event(&too_deep, &root, 2, &coalescer);

        assert!(!coalescer.take_ready());
    }

    #[test]
    fn test_record_event_ignores_root_directory_event() {
        let root = PathBuf::from("/output");
        let coalescer = ChangeCoalescer::new(Duration::from_millis(0));

        let root_touch = Event::new(EventKind::Modify(ModifyKind::Metadata(
            notify::event::MetadataKind::Any,
        )))
        .add_path(root.clone());
        LiveReloadManager::record_event(&root_touch, &root, 2, &coalescer);

        assert!(!coalescer.take_ready());
    }

    #[test]
    fn test_record_event_ignores_access_kind() {
        let root = PathBuf::from("/output");
        let coalescer = ChangeCoalescer::new(Duration::from_millis(0));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/output/frame.ppm"));
        LiveReloadManager::record_event(&access, &root, 2, &coalescer);

        assert!(!coalescer.take_ready());
    }

    #[test]
    fn test_record_event_accepts_rename() {
        let root = PathBuf::from("/output");
        let coalescer = ChangeCoalescer::new(Duration::from_millis(0));

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(
            notify::event::RenameMode::Any,
        )))
        .add_path(PathBuf::from("/output/frame.ppm"));
        LiveReloadManager::record_event(&rename, &root, 2, &coalescer);

        assert!(coalescer.take_ready());
    }

    #[test]
    fn test_root_was_removed_matches_root_path() {
        let root = PathBuf::from("/output");

        let removed =
            Event::new(EventKind::Remove(RemoveKind::Folder)).add_path(root.clone());
        assert!(LiveReloadManager::root_was_removed(&removed, &root));

        let child_removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/output/frame.ppm"));
        assert!(!LiveReloadManager::root_was_removed(&child_removed, &root));
    }

    #[test]
    fn test_broadcast_reaches_all_connected_sessions() {
        let (tx, mut rx1) = broadcast::channel::<ChangeEvent>(16);
        let mut rx2 = tx.subscribe();
        let rx3 = tx.subscribe();

        // One session disconnects before the change
        drop(rx3);

        LiveReloadManager::broadcast_changed(&tx);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        // Exactly one signal each
        assert!(matches!(rx1.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(rx2.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_broadcast_with_no_sessions_is_benign() {
        let (tx, rx) = broadcast::channel::<ChangeEvent>(16);
        drop(rx);

        // Must not panic or error out
        LiveReloadManager::broadcast_changed(&tx);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_signal() {
        let (tx, _rx) = broadcast::channel::<ChangeEvent>(16);

        LiveReloadManager::broadcast_changed(&tx);
        let mut late = tx.subscribe();

        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_burst_of_writes_broadcasts_single_signal() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = broadcast::channel::<ChangeEvent>(16);
        let mut manager =
            LiveReloadManager::new(dir.path().to_path_buf(), tx).with_debounce_ms(100);
        manager.start().unwrap();

        // Rapid successive writes within one coalescing window
        for i in 0..10 {
            std::fs::write(dir.path().join("frame.ppm"), format!("frame {i}")).unwrap();
        }

        // One signal arrives once the window elapses
        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no change signal within timeout");
        assert!(received.is_ok());

        // And no second signal follows for the same burst
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_watch_survives_root_recreation() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("output");
        std::fs::create_dir(&root).unwrap();

        let (tx, mut rx) = broadcast::channel::<ChangeEvent>(16);
        let mut manager = LiveReloadManager::new(root.clone(), tx).with_debounce_ms(50);
        manager.start().unwrap();

        // The common rebuild flow: remove the output root, recreate it,
        // write fresh output into it
        std::fs::remove_dir_all(&root).unwrap();
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("frame.ppm"), "rebuilt").unwrap();

        let received = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("no change signal after root recreation");
        assert!(received.is_ok());

        // The re-established watch keeps reporting subsequent writes
        tokio::time::sleep(Duration::from_millis(200)).await;
        while rx.try_recv().is_ok() {}

        std::fs::write(root.join("frame2.ppm"), "again").unwrap();

        let received = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("no change signal for write after recreation");
        assert!(received.is_ok());
    }
}
