//! Local filesystem backend
//!
//! Scans with walkdir, reads capture times on a rayon pool running on a
//! background thread and renames groups on another background thread. Every
//! group is renamed as a unit: when one file cannot be moved, the files
//! already moved go back to their old names. Groups whose target name is
//! taken get a `_1`, `_2`, ... suffix.

use crate::backend::classify::{self, MediaKinds};
use crate::backend::naming::{self, NamingOptions};
use crate::backend::{Backend, BackendEvent, EventSink, RenamePlan};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::group::{FileGroup, RenameCounts, ScanOutcome};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Settings of the local backend
#[derive(Debug, Clone)]
pub struct LocalOptions {
    pub kinds: MediaKinds,
    pub naming: NamingOptions,
    /// Number of enrichment threads (0 = rayon default)
    pub threads: usize,
    /// Report renames without touching the disk
    pub dry_run: bool,
}

impl LocalOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            kinds: MediaKinds {
                image_extensions: config.image_extensions.clone(),
                video_extensions: config.video_extensions.clone(),
            },
            naming: NamingOptions {
                name_format: config.name_format.clone(),
                mtime_fallback: config.mtime_fallback,
            },
            threads: config.threads,
            dry_run: config.dry_run,
        }
    }
}

pub struct LocalBackend {
    options: LocalOptions,
    enrichment: Option<JoinHandle<()>>,
    commit: Option<JoinHandle<()>>,
}

impl LocalBackend {
    pub fn new(options: LocalOptions) -> Self {
        Self {
            options,
            enrichment: None,
            commit: None,
        }
    }

    pub fn options(&self) -> &LocalOptions {
        &self.options
    }
}

/// Fails when the previous worker of the same kind is still running
fn ensure_idle(worker: &mut Option<JoinHandle<()>>, what: &str) -> Result<()> {
    match worker.take() {
        Some(handle) if !handle.is_finished() => {
            *worker = Some(handle);
            Err(Error::Busy(format!("{} is still running", what)))
        }
        Some(handle) => {
            if handle.join().is_err() {
                warn!(what, "Previous worker panicked");
            }
            Ok(())
        }
        None => Ok(()),
    }
}

impl Backend for LocalBackend {
    fn scan(&mut self, source: &Path) -> Result<ScanOutcome> {
        if !source.exists() {
            return Err(Error::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        classify::collect(source, &self.options.kinds)
    }

    fn start_enrichment(&mut self, groups: Vec<FileGroup>, sink: EventSink) -> Result<()> {
        ensure_idle(&mut self.enrichment, "Metadata reading")?;

        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.options.threads > 0 {
            builder = builder.num_threads(self.options.threads);
        }
        let pool = builder
            .build()
            .map_err(|e| Error::Busy(format!("cannot start worker pool: {}", e)))?;

        let naming = self.options.naming.clone();
        let total = groups.len();
        info!(groups = total, threads = pool.current_num_threads(), "Enrichment accepted");

        let handle = thread::Builder::new()
            .name("enrichment".to_string())
            .spawn(move || {
                let named = Arc::new(AtomicUsize::new(0));
                pool.install(|| {
                    groups.par_iter().for_each(|group| {
                        if !sink.is_open() {
                            return;
                        }
                        if let Some(next) = naming::derive(group, &naming) {
                            if sink.emit(BackendEvent::NameDerived(next)) {
                                named.fetch_add(1, Ordering::Relaxed);
                            }
                        } else {
                            debug!(key = %group.key(), "No capture time, group stays unnamed");
                        }
                    });
                });

                if sink.is_open() {
                    info!(named = named.load(Ordering::Relaxed), total, "Enrichment finished");
                    sink.emit(BackendEvent::EnrichmentFinished);
                } else {
                    info!("Enrichment cancelled");
                }
            })?;

        self.enrichment = Some(handle);
        Ok(())
    }

    fn commit(&mut self, plan: Vec<RenamePlan>, sink: EventSink) -> Result<()> {
        ensure_idle(&mut self.commit, "Renaming")?;

        let dry_run = self.options.dry_run;
        info!(groups = plan.len(), dry_run, "Commit accepted");

        let handle = thread::Builder::new()
            .name("commit".to_string())
            .spawn(move || {
                let mut counts = RenameCounts::default();
                let mut claimed = HashSet::new();
                for entry in plan {
                    if !sink.is_open() {
                        info!("Commit cancelled");
                        return;
                    }
                    let renamed = resolve_stem(&entry.group, &entry.next_stem, &mut claimed)
                        .and_then(|stem| rename_group(&entry.group, &stem, dry_run));
                    match renamed {
                        Ok(files) => {
                            counts.file_count += files;
                            counts.group_count += 1;
                            sink.emit(BackendEvent::GroupCommitted(entry.key));
                        }
                        Err(e) => {
                            error!(key = %entry.key, error = %e, "Group rename failed");
                            counts.failed_group_count += 1;
                            sink.emit(BackendEvent::GroupFailed {
                                key: entry.key,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                info!(
                    files = counts.file_count,
                    groups = counts.group_count,
                    failed = counts.failed_group_count,
                    "Commit finished"
                );
                sink.emit(BackendEvent::CommitFinished(counts));
            })?;

        self.commit = Some(handle);
        Ok(())
    }
}

/// First free stem among `next_stem`, `next_stem_1`, `next_stem_2`, ...
///
/// A stem is free when no file of the group would land on an existing path
/// or on a path claimed by an earlier group of the batch. The chosen targets
/// are added to `claimed`.
fn resolve_stem(
    group: &FileGroup,
    next_stem: &str,
    claimed: &mut HashSet<PathBuf>,
) -> Result<String> {
    let own: HashSet<PathBuf> = group
        .files()
        .into_iter()
        .map(|file| file.absolute_path.clone())
        .collect();

    let mut last = PathBuf::new();
    for i in 0..10000 {
        let stem = match i {
            0 => next_stem.to_string(),
            n => format!("{}_{}", next_stem, n),
        };
        let targets: Vec<PathBuf> = group
            .files()
            .into_iter()
            .map(|file| file.renamed_path(&stem))
            .collect();
        let taken = targets
            .iter()
            .find(|to| !own.contains(*to) && (to.exists() || claimed.contains(*to)))
            .cloned();

        match taken {
            Some(to) => last = to,
            None => {
                if i > 0 {
                    info!(key = %group.key(), %stem, "Target name taken, using suffix");
                }
                claimed.extend(targets);
                return Ok(stem);
            }
        }
    }
    Err(Error::TargetExists { path: last })
}

/// Rename every file of `group` to `next_stem`, keeping extensions.
///
/// Returns the number of files of the group. Either all files end up renamed
/// or none does.
pub fn rename_group(group: &FileGroup, next_stem: &str, dry_run: bool) -> Result<usize> {
    let moves: Vec<(PathBuf, PathBuf)> = group
        .files()
        .into_iter()
        .map(|file| (file.absolute_path.clone(), file.renamed_path(next_stem)))
        .filter(|(from, to)| from != to)
        .collect();

    for (_, to) in &moves {
        if to.exists() {
            return Err(Error::TargetExists { path: to.clone() });
        }
    }

    if dry_run {
        for (from, to) in &moves {
            info!(from = %from.display(), to = %to.display(), "[dry run] Would rename");
        }
        return Ok(group.file_count());
    }

    let mut done: Vec<&(PathBuf, PathBuf)> = Vec::with_capacity(moves.len());
    for step in &moves {
        let (from, to) = step;
        if let Err(e) = fs::rename(from, to) {
            rollback(&done);
            return Err(Error::Rename {
                from: from.clone(),
                to: to.clone(),
                message: e.to_string(),
            });
        }
        debug!(from = %from.display(), to = %to.display(), "Renamed");
        done.push(step);
    }
    Ok(group.file_count())
}

fn rollback(done: &[&(PathBuf, PathBuf)]) {
    for (from, to) in done.iter().rev() {
        if let Err(e) = fs::rename(to, from) {
            error!(from = %to.display(), to = %from.display(), error = %e, "Rollback failed");
        } else {
            warn!(path = %from.display(), "Rolled back rename");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Subscription;
    use crate::group::{GroupKey, SrcFile};
    use crate::workflow::{Stream, WorkflowEvent};
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(dry_run: bool) -> LocalOptions {
        LocalOptions::from_config(&Config {
            dry_run,
            threads: 2,
            ..Config::default()
        })
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    fn image_with_sidecar(dir: &Path, stem: &str) -> FileGroup {
        let jpg = touch(dir, &format!("{stem}.jpg"));
        let xmp = touch(dir, &format!("{stem}.xmp"));
        FileGroup::Image {
            key: GroupKey::new(stem),
            primary: SrcFile::new(&jpg, dir),
            sidecars: vec![SrcFile::new(&xmp, dir)],
        }
    }

    fn drain(
        rx: &mpsc::Receiver<WorkflowEvent>,
        until: impl Fn(&WorkflowEvent) -> bool,
    ) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
            let last = until(&event);
            events.push(event);
            if last {
                break;
            }
        }
        events
    }

    #[test]
    fn test_rename_group_moves_every_file() {
        let dir = TempDir::new().unwrap();
        let group = image_with_sidecar(dir.path(), "IMG_1");

        assert_eq!(rename_group(&group, "2024-01-15_14.30.00", false).unwrap(), 2);
        assert!(dir.path().join("2024-01-15_14.30.00.jpg").exists());
        assert!(dir.path().join("2024-01-15_14.30.00.xmp").exists());
        assert!(!dir.path().join("IMG_1.jpg").exists());
    }

    #[test]
    fn test_rename_group_refuses_existing_target() {
        let dir = TempDir::new().unwrap();
        let group = image_with_sidecar(dir.path(), "IMG_1");
        touch(dir.path(), "taken.xmp");

        assert!(matches!(
            rename_group(&group, "taken", false),
            Err(Error::TargetExists { .. })
        ));
        assert!(dir.path().join("IMG_1.jpg").exists());
        assert!(dir.path().join("IMG_1.xmp").exists());
    }

    #[test]
    fn test_rename_group_rolls_back_on_failure() {
        let dir = TempDir::new().unwrap();
        let jpg = touch(dir.path(), "IMG_1.jpg");
        let gone = dir.path().join("IMG_1.xmp");
        let group = FileGroup::Image {
            key: GroupKey::new("IMG_1"),
            primary: SrcFile::new(&jpg, dir.path()),
            sidecars: vec![SrcFile::new(&gone, dir.path())],
        };

        assert!(matches!(rename_group(&group, "new", false), Err(Error::Rename { .. })));
        assert!(jpg.exists());
        assert!(!dir.path().join("new.jpg").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let group = image_with_sidecar(dir.path(), "IMG_1");

        assert_eq!(rename_group(&group, "new", true).unwrap(), 2);
        assert!(dir.path().join("IMG_1.jpg").exists());
        assert!(!dir.path().join("new.jpg").exists());
    }

    #[test]
    fn test_scan_missing_source() {
        let mut backend = LocalBackend::new(options(false));
        assert!(matches!(
            backend.scan(Path::new("/definitely/not/here")),
            Err(Error::SourceNotFound { .. })
        ));
    }

    #[test]
    fn test_enrichment_streams_names_then_finishes() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "IMG_20240115_143000.jpg");
        touch(dir.path(), "holiday.jpg");

        let mut backend = LocalBackend::new(options(false));
        let outcome = backend.scan(dir.path()).unwrap();
        assert_eq!(outcome.file_groups.len(), 2);

        let (tx, rx) = mpsc::channel();
        let subscription = Subscription::open(Stream::Enrichment);
        backend.start_enrichment(outcome.file_groups, subscription.sink(tx)).unwrap();

        let events = drain(&rx, |e| *e == WorkflowEvent::EnrichmentFinished);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            WorkflowEvent::NameDerived(next) if next.next_stem == "2024-01-15_14.30.00"
        ));
        assert_eq!(events[1], WorkflowEvent::EnrichmentFinished);
    }

    #[test]
    fn test_commit_acknowledges_each_group() {
        let dir = TempDir::new().unwrap();
        let a = image_with_sidecar(dir.path(), "a");
        let b = image_with_sidecar(dir.path(), "b");
        touch(dir.path(), "clash.jpg");
        let jpg = touch(dir.path(), "c.jpg");
        let c = FileGroup::Image {
            key: GroupKey::new("c"),
            primary: SrcFile::new(&jpg, dir.path()),
            sidecars: vec![SrcFile::new(&dir.path().join("c.xmp"), dir.path())],
        };

        let plan = vec![
            RenamePlan {
                key: GroupKey::new("a"),
                group: a,
                next_stem: "first".to_string(),
            },
            RenamePlan {
                key: GroupKey::new("b"),
                group: b,
                next_stem: "clash".to_string(),
            },
            RenamePlan {
                key: GroupKey::new("c"),
                group: c,
                next_stem: "third".to_string(),
            },
        ];

        let mut backend = LocalBackend::new(options(false));
        let (tx, rx) = mpsc::channel();
        let subscription = Subscription::open(Stream::Commit);
        backend.commit(plan, subscription.sink(tx)).unwrap();

        let events = drain(&rx, |e| matches!(e, WorkflowEvent::CommitFinished(_)));
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], WorkflowEvent::GroupCommitted(GroupKey::new("a")));
        assert_eq!(events[1], WorkflowEvent::GroupCommitted(GroupKey::new("b")));
        assert!(matches!(&events[2], WorkflowEvent::GroupFailed(key, _) if key.as_str() == "c"));
        assert_eq!(
            events[3],
            WorkflowEvent::CommitFinished(RenameCounts {
                file_count: 4,
                group_count: 2,
                failed_group_count: 1,
            })
        );
        assert!(dir.path().join("first.xmp").exists());
        assert!(dir.path().join("clash.jpg").exists());
        assert!(dir.path().join("clash_1.jpg").exists());
        assert!(dir.path().join("clash_1.xmp").exists());
        assert!(jpg.exists());
    }

    fn commit_same_second_pair(dry_run: bool) -> (TempDir, Vec<WorkflowEvent>) {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "IMG_20240115_143000.jpg");
        touch(dir.path(), "PXL_20240115_143000.jpg");

        let mut backend = LocalBackend::new(options(dry_run));
        let groups = backend.scan(dir.path()).unwrap().file_groups;

        let (tx, rx) = mpsc::channel();
        let enrichment = Subscription::open(Stream::Enrichment);
        backend.start_enrichment(groups.clone(), enrichment.sink(tx)).unwrap();
        let mut names: Vec<_> = drain(&rx, |e| *e == WorkflowEvent::EnrichmentFinished)
            .into_iter()
            .filter_map(|e| match e {
                WorkflowEvent::NameDerived(next) => Some(next),
                _ => None,
            })
            .collect();
        names.sort_by(|x, y| x.key.as_str().cmp(y.key.as_str()));
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.next_stem == "2024-01-15_14.30.00"));

        let plan = names
            .into_iter()
            .map(|next| RenamePlan {
                group: groups.iter().find(|g| *g.key() == next.key).unwrap().clone(),
                key: next.key,
                next_stem: next.next_stem,
            })
            .collect();

        let (tx, rx) = mpsc::channel();
        let commit = Subscription::open(Stream::Commit);
        backend.commit(plan, commit.sink(tx)).unwrap();
        let events = drain(&rx, |e| matches!(e, WorkflowEvent::CommitFinished(_)));
        (dir, events)
    }

    #[test]
    fn test_same_second_groups_get_distinct_names() {
        let (dir, events) = commit_same_second_pair(false);

        assert_eq!(
            events,
            vec![
                WorkflowEvent::GroupCommitted(GroupKey::new("IMG_20240115_143000")),
                WorkflowEvent::GroupCommitted(GroupKey::new("PXL_20240115_143000")),
                WorkflowEvent::CommitFinished(RenameCounts {
                    file_count: 2,
                    group_count: 2,
                    failed_group_count: 0,
                }),
            ]
        );
        assert!(dir.path().join("2024-01-15_14.30.00.jpg").exists());
        assert!(dir.path().join("2024-01-15_14.30.00_1.jpg").exists());
        assert!(!dir.path().join("IMG_20240115_143000.jpg").exists());
        assert!(!dir.path().join("PXL_20240115_143000.jpg").exists());
    }

    #[test]
    fn test_dry_run_claims_names_within_batch() {
        let dir = TempDir::new().unwrap();
        let first = image_with_sidecar(dir.path(), "IMG_1");
        let second = image_with_sidecar(dir.path(), "IMG_2");
        let mut claimed = HashSet::new();

        assert_eq!(resolve_stem(&first, "same", &mut claimed).unwrap(), "same");
        assert_eq!(resolve_stem(&second, "same", &mut claimed).unwrap(), "same_1");
        assert!(claimed.contains(&dir.path().join("same_1.xmp")));

        let (dir, events) = commit_same_second_pair(true);
        assert_eq!(events.len(), 3);
        assert!(dir.path().join("IMG_20240115_143000.jpg").exists());
    }

    #[test]
    fn test_resolve_stem_keeps_own_name() {
        let dir = TempDir::new().unwrap();
        let group = image_with_sidecar(dir.path(), "2024-01-15_14.30.00");
        let mut claimed = HashSet::new();

        assert_eq!(
            resolve_stem(&group, "2024-01-15_14.30.00", &mut claimed).unwrap(),
            "2024-01-15_14.30.00"
        );
    }
}
