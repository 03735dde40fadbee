//! On-disk artifact layout.
//!
//! Every artifact of a row lives at a deterministic path under one output
//! root: `images/<id>.png`, `audio/<id>.wav`, `videos/<id>.mp4`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::row::RowId;

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Kind of generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    Audio,
    Video,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Image, ArtifactKind::Audio, ArtifactKind::Video];

    /// Directory under the output root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "images",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Video => "videos",
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Audio => "wav",
            ArtifactKind::Video => "mp4",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Video => "video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolves artifact paths for row ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all artifacts of one kind.
    pub fn dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Path of one artifact.
    pub fn path(&self, kind: ArtifactKind, id: &RowId) -> PathBuf {
        self.dir(kind)
            .join(format!("{}.{}", id.as_str(), kind.extension()))
    }

    pub fn image(&self, id: &RowId) -> PathBuf {
        self.path(ArtifactKind::Image, id)
    }

    pub fn audio(&self, id: &RowId) -> PathBuf {
        self.path(ArtifactKind::Audio, id)
    }

    pub fn video(&self, id: &RowId) -> PathBuf {
        self.path(ArtifactKind::Video, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_fixed_layout() {
        let layout = ArtifactLayout::new("/data/out");
        let id = RowId::parse("001").unwrap();

        assert_eq!(layout.image(&id), PathBuf::from("/data/out/images/001.png"));
        assert_eq!(layout.audio(&id), PathBuf::from("/data/out/audio/001.wav"));
        assert_eq!(layout.video(&id), PathBuf::from("/data/out/videos/001.mp4"));
    }

    #[test]
    fn test_default_root() {
        let layout = ArtifactLayout::default();
        assert_eq!(layout.root(), Path::new("output"));
    }

    #[test]
    fn test_kind_dirs_are_distinct() {
        let dirs: std::collections::HashSet<_> =
            ArtifactKind::ALL.iter().map(|k| k.dir_name()).collect();
        assert_eq!(dirs.len(), 3);
    }
}
