use std::path::{Path, PathBuf};

use image::RgbaImage;

use super::{AssetError, AssetKind};

/// Decoded raster plus the path it came from. The engine never renders
/// pixels; the decoded buffer is held so UI layers can display it without
/// re-reading the file.
#[derive(Debug, Clone)]
pub struct SceneImage {
    pub path: PathBuf,
    pub pixels: RgbaImage,
}

impl SceneImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

pub(crate) fn load_scene_image(
    scene: &str,
    kind: AssetKind,
    path: &Path,
) -> Result<SceneImage, AssetError> {
    if !path.is_file() {
        return Err(AssetError::NotFound {
            scene: scene.to_string(),
            kind,
            path: path.to_path_buf(),
        });
    }

    let decoded = image::open(path).map_err(|source| AssetError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(SceneImage {
        path: path.to_path_buf(),
        pixels: decoded.to_rgba8(),
    })
}
