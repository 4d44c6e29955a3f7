use crate::errors::Result;
use crate::types::{SourceEvent, WatchOptions};
use crossbeam_channel::{unbounded, Receiver};
use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use gitsource_core::{PathEventKind, PathKind};
use ignore::WalkBuilder;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

/// Recursive filesystem notifier over a working tree.
///
/// On start it scans the existing tree, reporting every current entry as
/// `Added`, then emits a single `WatchReady` and streams live notify events.
/// Consumers therefore see the full tree before the ready signal, which is
/// what lets the machine's initial flush materialize every existing path.
pub struct RepoWatcher {
    _inner: RecommendedWatcher,
}

impl RepoWatcher {
    pub fn start(
        root: PathBuf,
        opts: WatchOptions,
        events: mpsc::UnboundedSender<SourceEvent>,
        ready: oneshot::Sender<Result<()>>,
    ) -> Result<Self> {
        let filter = EventFilter::new(root.clone(), &opts)?;
        let debounce = Duration::from_millis(opts.debounce_ms);

        let (raw_tx, raw_rx) = unbounded::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.send(res);
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        std::thread::spawn(move || {
            scan_existing(&root, &filter, &events);
            let _ = events.send(SourceEvent::WatchReady { done: ready });
            forward_events(raw_rx, filter, events, debounce);
        });

        Ok(Self { _inner: watcher })
    }
}

#[derive(Clone)]
struct EventFilter {
    root: PathBuf,
    ignore: GlobSet,
    patterns: GlobMatcher,
}

impl EventFilter {
    fn new(root: PathBuf, opts: &WatchOptions) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for glob in &opts.ignore {
            builder.add(Glob::new(glob)?);
            // A glob for a directory's contents also ignores the directory
            // itself, so walks prune instead of descending.
            if let Some(prefix) = glob.strip_suffix("/**") {
                builder.add(Glob::new(prefix)?);
            }
        }
        Ok(Self {
            root,
            ignore: builder.build()?,
            patterns: Glob::new(&opts.patterns)?.compile_matcher(),
        })
    }

    fn ignored(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.ignore.is_match(path) || self.ignore.is_match(relative)
    }

    /// The `patterns` glob selects files; directories always pass so that
    /// matching files beneath them are reachable. The watched root itself is
    /// never reported.
    fn admits(&self, path: &Path, kind: PathKind) -> bool {
        if path == self.root || self.ignored(path) {
            return false;
        }
        if kind == PathKind::File {
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            return self.patterns.is_match(relative);
        }
        true
    }
}

fn scan_existing(root: &Path, filter: &EventFilter, events: &mpsc::UnboundedSender<SourceEvent>) {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .filter_entry({
            let filter = filter.clone();
            move |entry| entry.depth() == 0 || !filter.ignored(entry.path())
        })
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry during initial scan");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let path_kind = if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            PathKind::Directory
        } else {
            PathKind::File
        };
        let path = entry.into_path();
        if !filter.admits(&path, path_kind) {
            continue;
        }
        if events
            .send(SourceEvent::Path {
                kind: PathEventKind::Added,
                path_kind,
                path,
            })
            .is_err()
        {
            return;
        }
    }
}

fn forward_events(
    raw_rx: Receiver<notify::Result<Event>>,
    filter: EventFilter,
    events: mpsc::UnboundedSender<SourceEvent>,
    debounce: Duration,
) {
    // Rapid upserts on one path are coalesced within the debounce window.
    // Removals are never coalesced: dropping one would strand a node.
    let mut last_upsert: HashMap<PathBuf, Instant> = HashMap::new();

    while let Ok(res) = raw_rx.recv() {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                error!(error = %err, "watcher error");
                continue;
            }
        };
        let kind = match event.kind {
            EventKind::Create(_) => PathEventKind::Added,
            EventKind::Modify(_) => PathEventKind::Changed,
            EventKind::Remove(_) => PathEventKind::Removed,
            _ => continue,
        };
        for path in event.paths {
            // A removed path can no longer be stat'ed; report it as a file.
            let path_kind = if path.is_dir() {
                PathKind::Directory
            } else {
                PathKind::File
            };
            if !filter.admits(&path, path_kind) {
                continue;
            }
            match kind {
                PathEventKind::Added | PathEventKind::Changed => {
                    let now = Instant::now();
                    if let Some(prev) = last_upsert.get(&path) {
                        if now.duration_since(*prev) < debounce {
                            continue;
                        }
                    }
                    last_upsert.insert(path.clone(), now);
                }
                PathEventKind::Removed => {
                    last_upsert.remove(&path);
                }
            }
            if events
                .send(SourceEvent::Path {
                    kind,
                    path_kind,
                    path,
                })
                .is_err()
            {
                return;
            }
        }
    }
    debug!("raw watch channel closed");
}
