use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod assets;
pub mod geom;
pub mod hittest;
pub mod slider;
pub mod store;

pub use assets::{
    parse_learning_sections, AnnotationErrorCode, AnnotationParseError, AssetError, AssetKind,
    DifferenceRegion, Scene, SceneCatalog, SceneImage, SourceLocation, DEFAULT_REGION_BUFFER_PX,
};
pub use geom::{Polygon, PolygonError, Vec2};
pub use hittest::{display_to_reference, reference_to_display, resolve_click, HitResult};
pub use slider::{
    quantize_level, scan_slider_ranges, SceneRanges, SliderError, SliderRange, SliderVariant,
    VariantCatalog,
};
pub use store::{
    now_timestamp, ClickCell, FeedbackRecord, ResultsStore, RoundRecord, SliderChoiceRecord,
    StoreError, Worksheet, COLLECTION_DESIGNER, COLLECTION_DETECTIVE,
};

pub const ROOT_ENV_VAR: &str = "LANDSCOPE_ROOT";

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
    pub detective_dir: PathBuf,
    pub slider_dir: PathBuf,
    pub results_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create results directory at {path}: {source}")]
    CreateResultsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{env_var} is set but does not point to a valid data root: {path}\n\
A valid root must contain an assets/ directory."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "Could not detect data root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/landscope\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_data_paths() -> Result<DataPaths, StartupError> {
    let root = resolve_root()?;
    Ok(data_paths_at(&root)?)
}

/// Builds the path set for an explicit root without consulting the
/// environment. Used by tests and by callers that already know the root.
pub fn data_paths_at(root: &Path) -> Result<DataPaths, StartupError> {
    let detective_dir = root.join("assets").join("detective");
    let slider_dir = root.join("assets").join("slider");
    let results_dir = root.join("results");

    fs::create_dir_all(&results_dir).map_err(|source| StartupError::CreateResultsDir {
        path: results_dir.clone(),
        source,
    })?;

    Ok(DataPaths {
        root: root.to_path_buf(),
        detective_dir,
        slider_dir,
        results_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_data_root(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_data_root(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_data_root(path: &Path) -> bool {
    path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
