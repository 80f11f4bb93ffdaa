//! File collection and grouping
//!
//! Files sharing a directory and a stem form one group. The number of image
//! and video files in the group decides its class; everything else is a
//! sidecar that follows the primary when renamed.

use crate::error::{Error, Result};
use crate::group::{FileGroup, GroupKey, ScanOutcome, SrcFile};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extension lists used to tell primaries from sidecars
#[derive(Debug, Clone, Default)]
pub struct MediaKinds {
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
}

impl MediaKinds {
    pub fn is_image(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.image_extensions.iter().any(|e| e == &ext_lower)
    }

    pub fn is_video(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.video_extensions.iter().any(|e| e == &ext_lower)
    }
}

/// Collect every file under `source` and group them
pub fn collect(source: &Path, kinds: &MediaKinds) -> Result<ScanOutcome> {
    let files = list_files(source)?;
    let file_count = files.len();
    let file_groups = group_files(files, source, kinds);

    info!(
        source = %source.display(),
        files = file_count,
        groups = file_groups.len(),
        "Source scanned"
    );
    Ok(ScanOutcome {
        file_groups,
        file_count,
    })
}

/// Regular, non-hidden files under `source`, sorted by path
fn list_files(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !source.is_dir() {
        return Err(Error::SourceNotFound {
            path: source.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Group key: source-relative path of the file, without its extension
fn group_key(file: &SrcFile) -> GroupKey {
    let key = file.relative_path.with_file_name(&file.stem);
    GroupKey::new(key.to_string_lossy().replace('\\', "/"))
}

/// Bucket files by key and classify each bucket, in key order
pub fn group_files(files: Vec<PathBuf>, source: &Path, kinds: &MediaKinds) -> Vec<FileGroup> {
    let root = if source.is_file() {
        source.parent().unwrap_or(source)
    } else {
        source
    };

    let mut buckets: BTreeMap<GroupKey, Vec<SrcFile>> = BTreeMap::new();
    for path in files {
        let file = SrcFile::new(&path, root);
        buckets.entry(group_key(&file)).or_default().push(file);
    }

    buckets
        .into_iter()
        .map(|(key, files)| classify(key, files, kinds))
        .collect()
}

fn classify(key: GroupKey, files: Vec<SrcFile>, kinds: &MediaKinds) -> FileGroup {
    let mut images = Vec::new();
    let mut videos = Vec::new();
    let mut sidecars = Vec::new();
    for file in files {
        if kinds.is_image(&file.ext) {
            images.push(file);
        } else if kinds.is_video(&file.ext) {
            videos.push(file);
        } else {
            sidecars.push(file);
        }
    }

    let group = match (images.len(), videos.len()) {
        (0, 0) => FileGroup::Unsupported { key, sidecars },
        (1, 0) => FileGroup::Image {
            key,
            primary: images.remove(0),
            sidecars,
        },
        (0, 1) => FileGroup::Video {
            key,
            primary: videos.remove(0),
            sidecars,
        },
        (1, 1) => FileGroup::LiveImage {
            key,
            image: images.remove(0),
            video: videos.remove(0),
            sidecars,
        },
        _ => FileGroup::Uncertain {
            key,
            candidates: images.into_iter().chain(videos).collect(),
            sidecars,
        },
    };
    debug!(
        key = %group.key(),
        class = ?group.class(),
        files = group.file_count(),
        "Group classified"
    );
    group
}
