//! File groups produced by the collector
//!
//! A file group is one logical unit on disk: a photo or a video together with
//! its sidecar files, a live photo (image + short video), or a leftover set of
//! files that cannot be renamed safely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable identifier of a file group, unique across one batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single file found under the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcFile {
    /// Extension without the leading dot, as found on disk
    pub ext: String,
    /// Absolute path of the file
    pub absolute_path: PathBuf,
    /// Path relative to the source the user picked
    pub relative_path: PathBuf,
    /// File name without extension
    pub stem: String,
}

impl SrcFile {
    /// Build a source file entry for `path` found under `source`
    pub fn new(path: &Path, source: &Path) -> Self {
        let relative_path = path
            .strip_prefix(source)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.file_name().map(PathBuf::from).unwrap_or_default());

        Self {
            ext: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            absolute_path: path.to_path_buf(),
            relative_path,
            stem: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// File name as shown to the user
    pub fn file_name(&self) -> String {
        if self.ext.is_empty() {
            self.stem.clone()
        } else {
            format!("{}.{}", self.stem, self.ext)
        }
    }

    /// Path this file moves to when its group takes `next_stem`
    pub fn renamed_path(&self, next_stem: &str) -> PathBuf {
        let file_name = if self.ext.is_empty() {
            next_stem.to_string()
        } else {
            format!("{}.{}", next_stem, self.ext)
        };
        self.absolute_path.with_file_name(file_name)
    }
}

/// Classification of files sharing one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileGroup {
    Image {
        key: GroupKey,
        primary: SrcFile,
        sidecars: Vec<SrcFile>,
    },
    Video {
        key: GroupKey,
        primary: SrcFile,
        sidecars: Vec<SrcFile>,
    },
    LiveImage {
        key: GroupKey,
        image: SrcFile,
        video: SrcFile,
        sidecars: Vec<SrcFile>,
    },
    /// More than one candidate primary; never renamed
    Uncertain {
        key: GroupKey,
        candidates: Vec<SrcFile>,
        sidecars: Vec<SrcFile>,
    },
    /// No recognised primary file
    Unsupported {
        key: GroupKey,
        sidecars: Vec<SrcFile>,
    },
}

/// Which registry collection a group belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupClass {
    Renameable,
    Uncertain,
    Unsupported,
}

impl FileGroup {
    pub fn key(&self) -> &GroupKey {
        match self {
            FileGroup::Image { key, .. }
            | FileGroup::Video { key, .. }
            | FileGroup::LiveImage { key, .. }
            | FileGroup::Uncertain { key, .. }
            | FileGroup::Unsupported { key, .. } => key,
        }
    }

    pub fn class(&self) -> GroupClass {
        match self {
            FileGroup::Image { .. } | FileGroup::Video { .. } | FileGroup::LiveImage { .. } => {
                GroupClass::Renameable
            }
            FileGroup::Uncertain { .. } => GroupClass::Uncertain,
            FileGroup::Unsupported { .. } => GroupClass::Unsupported,
        }
    }

    pub fn is_renameable(&self) -> bool {
        self.class() == GroupClass::Renameable
    }

    /// The file whose metadata names the group
    pub fn primary(&self) -> Option<&SrcFile> {
        match self {
            FileGroup::Image { primary, .. } | FileGroup::Video { primary, .. } => Some(primary),
            FileGroup::LiveImage { image, .. } => Some(image),
            FileGroup::Uncertain { .. } | FileGroup::Unsupported { .. } => None,
        }
    }

    /// Every file of the group, primary files first
    pub fn files(&self) -> Vec<&SrcFile> {
        match self {
            FileGroup::Image { primary, sidecars, .. }
            | FileGroup::Video { primary, sidecars, .. } => {
                std::iter::once(primary).chain(sidecars).collect()
            }
            FileGroup::LiveImage { image, video, sidecars, .. } => {
                [image, video].into_iter().chain(sidecars).collect()
            }
            FileGroup::Uncertain { candidates, sidecars, .. } => {
                candidates.iter().chain(sidecars).collect()
            }
            FileGroup::Unsupported { sidecars, .. } => sidecars.iter().collect(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.files().len()
    }
}

/// Derived target name delivered by the enrichment stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextName {
    pub key: GroupKey,
    pub next_stem: String,
    pub next_path: PathBuf,
}

/// Result of scanning a source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub file_groups: Vec<FileGroup>,
    /// Number of files found, across all groups
    pub file_count: usize,
}

/// Final counters of a commit batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCounts {
    pub file_count: usize,
    pub group_count: usize,
    /// Groups left under their old name
    pub failed_group_count: usize,
}

/// Groups split by class, each list in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub renameable: Vec<FileGroup>,
    pub uncertain: Vec<FileGroup>,
    pub unsupported: Vec<FileGroup>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.renameable.len() + self.uncertain.len() + self.unsupported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a flat batch into the three registry collections
pub fn partition(groups: impl IntoIterator<Item = FileGroup>) -> Partition {
    let mut out = Partition::default();
    for group in groups {
        match group.class() {
            GroupClass::Renameable => out.renameable.push(group),
            GroupClass::Uncertain => out.uncertain.push(group),
            GroupClass::Unsupported => out.unsupported.push(group),
        }
    }
    out
}
