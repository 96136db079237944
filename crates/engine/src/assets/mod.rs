use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

mod annotations;
mod catalog;
mod images;
mod learning;

pub use annotations::{
    AnnotationErrorCode, AnnotationParseError, DifferenceRegion, SourceLocation,
};
pub use catalog::{Scene, SceneCatalog, DEFAULT_REGION_BUFFER_PX};
pub use images::SceneImage;
pub use learning::parse_learning_sections;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    BeforeImage,
    AfterImage,
    Annotation,
    LearningTexts,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::BeforeImage => "before image",
            AssetKind::AfterImage => "after image",
            AssetKind::Annotation => "annotation",
            AssetKind::LearningTexts => "learning texts",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("missing {kind} asset for scene '{scene}': {path}")]
    NotFound {
        scene: String,
        kind: AssetKind,
        path: PathBuf,
    },
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "before/after image sizes differ for scene '{scene}': \
{before_width}x{before_height} vs {after_width}x{after_height}"
    )]
    ImageSizeMismatch {
        scene: String,
        before_width: u32,
        before_height: u32,
        after_width: u32,
        after_height: u32,
    },
    #[error(transparent)]
    Annotation(#[from] AnnotationParseError),
}
