//! Watch loop: snapshot the source roots, diff, rebuild.
//!
//! Monitors the content and layouts roots and runs the smallest rebuild that
//! covers each change set while the preview server is alive.
//!
//! # Relationship with `compiler/watch.rs`
//!
//! - **This module** (`src/watch.rs`): snapshots, diffing, the loop itself
//! - **`compiler/watch.rs`**: classification into a [`RebuildPlan`] and its execution
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Watch Loop                           │
//! │                                                              │
//! │  ┌────────────────┐   ┌────────┐   ┌────────┐   ┌─────────┐  │
//! │  │ SnapshotSource │──▶│ diff() │──▶│ plan() │──▶│execute()│  │
//! │  │  poll | notify │   └────────┘   └────────┘   └─────────┘  │
//! │  └────────────────┘                                          │
//! │          ▲                                                   │
//! │          └──── snapshot replaced after the change set ───────┤
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`RebuildPlan`]: crate::compiler::watch::RebuildPlan

use crate::{
    build::build_with,
    compiler::{
        BuildContext, Compiler,
        watch::{Change, ChangeKind, plan},
    },
    config::{SiteConfig, WatchBackend, path_is_within},
    log, serve,
};
use anyhow::{Context, Result, bail};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, SystemTime},
};
use walkdir::WalkDir;

/// Path → modification time over the watched roots.
pub type Snapshot = BTreeMap<PathBuf, SystemTime>;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Path relative to `root` for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// =============================================================================
// Snapshots
// =============================================================================

/// Record every watched file under `roots`.
///
/// Anything below `excluded` (the compiled layouts) and editor artifacts are
/// skipped. Missing roots contribute nothing.
pub fn collect_snapshot(roots: &[PathBuf], excluded: &Path) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for root in roots {
        let entries = WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| {
                !path_is_within(e.path(), excluded) && (e.depth() == 0 || !is_temp_file(e.path()))
            })
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file());

        for entry in entries {
            if let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
                snapshot.insert(entry.into_path(), modified);
            }
        }
    }
    snapshot
}

/// Changes between two snapshots.
///
/// Created and modified paths come first in path order, removals last.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<Change> {
    let mut changes: Vec<Change> = current
        .iter()
        .filter_map(|(path, modified)| match previous.get(path) {
            None => Some(Change::new(ChangeKind::Created, path)),
            Some(before) if before != modified => Some(Change::new(ChangeKind::Modified, path)),
            Some(_) => None,
        })
        .collect();

    changes.extend(
        previous
            .keys()
            .filter(|path| !current.contains_key(*path))
            .map(|path| Change::new(ChangeKind::Removed, path)),
    );
    changes
}

// =============================================================================
// Snapshot Sources
// =============================================================================

/// Produces the next snapshot of the watched roots, blocking for at most
/// about one tick.
pub trait SnapshotSource {
    fn next_snapshot(&mut self) -> Result<Snapshot>;
}

/// Rescans every `interval`.
pub struct PollingSource {
    roots: Vec<PathBuf>,
    excluded: PathBuf,
    interval: Duration,
}

impl PollingSource {
    pub fn new(roots: Vec<PathBuf>, excluded: PathBuf, interval: Duration) -> Self {
        Self {
            roots,
            excluded,
            interval,
        }
    }
}

impl SnapshotSource for PollingSource {
    fn next_snapshot(&mut self) -> Result<Snapshot> {
        thread::sleep(self.interval);
        Ok(collect_snapshot(&self.roots, &self.excluded))
    }
}

/// Rescans only after the OS reports an event.
///
/// Between events the cached snapshot is returned, so an idle tree costs no
/// directory walks.
pub struct EventSource {
    roots: Vec<PathBuf>,
    excluded: PathBuf,
    interval: Duration,
    rx: Receiver<notify::Result<Event>>,
    cached: Snapshot,
    _watcher: RecommendedWatcher,
}

impl EventSource {
    pub fn new(roots: Vec<PathBuf>, excluded: PathBuf, interval: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx).context("Failed to create watcher")?;

        for root in roots.iter().filter(|r| r.exists()) {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {}", root.display()))?;
        }

        let cached = collect_snapshot(&roots, &excluded);
        Ok(Self {
            roots,
            excluded,
            interval,
            rx,
            cached,
            _watcher: watcher,
        })
    }

    /// Whether any event in the batch concerns a watched file.
    fn is_relevant(&self, event: &Event) -> bool {
        event
            .paths
            .iter()
            .any(|p| !path_is_within(p, &self.excluded) && !is_temp_file(p))
    }
}

impl SnapshotSource for EventSource {
    fn next_snapshot(&mut self) -> Result<Snapshot> {
        let mut relevant = match self.rx.recv_timeout(self.interval) {
            Ok(Ok(event)) => self.is_relevant(&event),
            Ok(Err(err)) => {
                log!("watch"; "watcher error: {err}");
                false
            }
            Err(RecvTimeoutError::Timeout) => return Ok(self.cached.clone()),
            Err(RecvTimeoutError::Disconnected) => bail!("file watcher disconnected"),
        };

        // Drain the burst an editor save produces.
        while let Ok(event) = self.rx.try_recv() {
            relevant |= event.is_ok_and(|e| self.is_relevant(&e));
        }

        if relevant {
            self.cached = collect_snapshot(&self.roots, &self.excluded);
        }
        Ok(self.cached.clone())
    }
}

// =============================================================================
// Watch Loop
// =============================================================================

/// Serve the site and rebuild on change until the server stops.
pub fn watch_site(config: &SiteConfig) -> Result<()> {
    let ctx = BuildContext::from_config(config, false);
    let paths = &ctx.paths;

    if !paths.public.exists() {
        build_with(&ctx).context("Initial build failed")?;
    }
    fs::create_dir_all(&paths.cache)
        .with_context(|| format!("Failed to create cache directory {}", paths.cache.display()))?;

    let server = serve::spawn_server(config)?;

    let roots = vec![paths.content.clone(), paths.layouts.clone()];
    let excluded = paths.built();
    let interval = Duration::from_millis(config.serve.interval);
    let previous = collect_snapshot(&roots, &excluded);

    let mut source: Box<dyn SnapshotSource> = match config.serve.backend {
        WatchBackend::Poll => Box::new(PollingSource::new(roots, excluded, interval)),
        WatchBackend::Notify => Box::new(EventSource::new(roots, excluded, interval)?),
    };

    log!(
        "watch";
        "watching {} ({:?})",
        rel_path(&paths.content, config.get_root()),
        config.serve.backend
    );
    run_loop(&ctx, source.as_mut(), previous, || !server.is_finished())?;
    log!("watch"; "server stopped");
    Ok(())
}

/// Diff, plan and execute until `alive` turns false.
///
/// The snapshot is only replaced after its change set has been handled.
fn run_loop(
    ctx: &BuildContext,
    source: &mut dyn SnapshotSource,
    mut previous: Snapshot,
    mut alive: impl FnMut() -> bool,
) -> Result<()> {
    while alive() {
        let current = source.next_snapshot()?;
        let changes = diff(&previous, &current);
        if !changes.is_empty() {
            handle_changes(ctx, &changes);
        }
        previous = current;
    }
    Ok(())
}

/// Run the rebuild one change set requires. Returns the page count.
fn handle_changes(ctx: &BuildContext, changes: &[Change]) -> usize {
    let root = ctx.paths.content.parent().unwrap_or(&ctx.paths.content);
    for change in changes {
        let kind = match change.kind {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        };
        log!("watch"; "{kind}: {}", rel_path(&change.path, root));
    }

    let plan = plan(changes, &ctx.paths, |path| path.exists());
    let pages = Compiler::new(ctx).execute(&plan);
    if plan.full {
        log!("watch"; "full rebuild ({pages} pages)");
    } else {
        log!("watch"; "rebuilt {pages} pages");
    }
    pages
}

// =============================================================================
// Tests
// =============================================================================
