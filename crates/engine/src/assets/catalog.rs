use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::annotations::{parse_annotation_document, DifferenceRegion};
use super::images::{load_scene_image, SceneImage};
use super::learning::parse_learning_sections;
use super::{AssetError, AssetKind};

pub const DEFAULT_REGION_BUFFER_PX: f32 = 5.0;

/// Immutable per-scene asset bundle. Constructed once by the catalog and
/// shared read-only across sessions; callers must not mutate the regions.
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub before: SceneImage,
    pub after: SceneImage,
    pub regions: Vec<DifferenceRegion>,
    pub learning_texts: BTreeMap<String, String>,
}

impl Scene {
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|region| region.label.as_str())
    }

    pub fn learning_text(&self, label: &str) -> Option<&str> {
        self.learning_texts.get(label).map(String::as_str)
    }

    /// Width of the reference pixel space (the after image; both images
    /// share dimensions).
    pub fn reference_width(&self) -> u32 {
        self.after.width()
    }

    pub fn reference_height(&self) -> u32 {
        self.after.height()
    }
}

/// Loads scenes from the detective asset directory and memoizes them by
/// name. Loading hits the filesystem once per scene per process; every
/// later `load` returns the cached `Arc<Scene>`.
pub struct SceneCatalog {
    detective_dir: PathBuf,
    buffer_px: f32,
    cache: Mutex<HashMap<String, Arc<Scene>>>,
}

impl SceneCatalog {
    pub fn new(detective_dir: impl Into<PathBuf>) -> Self {
        Self::with_buffer(detective_dir, DEFAULT_REGION_BUFFER_PX)
    }

    pub fn with_buffer(detective_dir: impl Into<PathBuf>, buffer_px: f32) -> Self {
        Self {
            detective_dir: detective_dir.into(),
            buffer_px,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn load(&self, scene_name: &str) -> Result<Arc<Scene>, AssetError> {
        {
            let cache = self.cache.lock().expect("scene cache lock poisoned");
            if let Some(scene) = cache.get(scene_name) {
                return Ok(Arc::clone(scene));
            }
        }

        let scene = Arc::new(self.load_from_disk(scene_name)?);
        let mut cache = self.cache.lock().expect("scene cache lock poisoned");
        let entry = cache
            .entry(scene_name.to_string())
            .or_insert_with(|| Arc::clone(&scene));
        Ok(Arc::clone(entry))
    }

    pub fn clear(&self) {
        self.cache.lock().expect("scene cache lock poisoned").clear();
    }

    /// Scene names discovered from annotation files, sorted for stable
    /// output.
    pub fn list_scenes(&self) -> Result<Vec<String>, AssetError> {
        let entries = fs::read_dir(&self.detective_dir).map_err(|source| AssetError::ReadDir {
            path: self.detective_dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| AssetError::ReadDir {
                path: self.detective_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
            {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn load_from_disk(&self, scene_name: &str) -> Result<Scene, AssetError> {
        let annotation_path = self.detective_dir.join(format!("{scene_name}.xml"));
        if !annotation_path.is_file() {
            return Err(AssetError::NotFound {
                scene: scene_name.to_string(),
                kind: AssetKind::Annotation,
                path: annotation_path,
            });
        }
        let annotation_raw =
            fs::read_to_string(&annotation_path).map_err(|source| AssetError::ReadFile {
                path: annotation_path.clone(),
                source,
            })?;
        let regions = parse_annotation_document(
            scene_name,
            &annotation_path,
            &annotation_raw,
            self.buffer_px,
        )?;

        let learning_path = self.detective_dir.join(format!("{scene_name}_learning.md"));
        if !learning_path.is_file() {
            return Err(AssetError::NotFound {
                scene: scene_name.to_string(),
                kind: AssetKind::LearningTexts,
                path: learning_path,
            });
        }
        let learning_raw =
            fs::read_to_string(&learning_path).map_err(|source| AssetError::ReadFile {
                path: learning_path.clone(),
                source,
            })?;
        let learning_texts = parse_learning_sections(&learning_raw);

        let before = load_scene_image(
            scene_name,
            AssetKind::BeforeImage,
            &self.detective_dir.join(format!("{scene_name}_before.png")),
        )?;
        let after = load_scene_image(
            scene_name,
            AssetKind::AfterImage,
            &self.detective_dir.join(format!("{scene_name}_after.png")),
        )?;
        if before.pixels.dimensions() != after.pixels.dimensions() {
            return Err(AssetError::ImageSizeMismatch {
                scene: scene_name.to_string(),
                before_width: before.width(),
                before_height: before.height(),
                after_width: after.width(),
                after_height: after.height(),
            });
        }

        for region in &regions {
            if !learning_texts.contains_key(&region.label) {
                warn!(
                    scene = scene_name,
                    label = region.label.as_str(),
                    "region_without_learning_text"
                );
            }
        }

        info!(
            scene = scene_name,
            regions = regions.len(),
            learning_texts = learning_texts.len(),
            width = after.width(),
            height = after.height(),
            "scene_loaded"
        );

        Ok(Scene {
            name: scene_name.to_string(),
            before,
            after,
            regions,
            learning_texts,
        })
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;
    use tempfile::TempDir;

    use super::*;

    const DORF_XML: &str = r#"<annotations>
        <image id="0" name="Dorf_after.png" width="100" height="80">
            <polygon label="roof" points="10,10;30,10;30,30;10,30"/>
            <polygon label="tree" points="50,40;70,40;60,60"/>
        </image>
    </annotations>"#;

    const DORF_LEARNING: &str = "# roof\nThe roof lost its snow.\n\n# tree\nThe tree dried out.\n";

    fn write_scene_fixture(dir: &std::path::Path, scene: &str, width: u32, height: u32) {
        fs::create_dir_all(dir).expect("mkdir");
        RgbaImage::new(width, height)
            .save(dir.join(format!("{scene}_before.png")))
            .expect("before png");
        RgbaImage::new(width, height)
            .save(dir.join(format!("{scene}_after.png")))
            .expect("after png");
        fs::write(
            dir.join(format!("{scene}.xml")),
            DORF_XML.replace("Dorf", scene),
        )
        .expect("xml");
        fs::write(dir.join(format!("{scene}_learning.md")), DORF_LEARNING).expect("learning");
    }

    #[test]
    fn loads_a_complete_scene() {
        let temp = TempDir::new().expect("tempdir");
        write_scene_fixture(temp.path(), "Dorf", 100, 80);

        let catalog = SceneCatalog::new(temp.path());
        let scene = catalog.load("Dorf").expect("scene");
        assert_eq!(scene.name, "Dorf");
        assert_eq!(scene.region_count(), 2);
        assert_eq!(scene.labels().collect::<Vec<_>>(), vec!["roof", "tree"]);
        assert_eq!(scene.learning_text("roof"), Some("The roof lost its snow."));
        assert_eq!(scene.reference_width(), 100);
        assert_eq!(scene.reference_height(), 80);
    }

    #[test]
    fn load_is_cached_per_scene_name() {
        let temp = TempDir::new().expect("tempdir");
        write_scene_fixture(temp.path(), "Dorf", 100, 80);

        let catalog = SceneCatalog::new(temp.path());
        let first = catalog.load("Dorf").expect("scene");
        // Deleting the assets proves the second load never re-reads disk.
        fs::remove_file(temp.path().join("Dorf.xml")).expect("rm xml");
        let second = catalog.load("Dorf").expect("scene");
        assert!(Arc::ptr_eq(&first, &second));

        catalog.clear();
        assert!(catalog.load("Dorf").is_err());
    }

    #[test]
    fn missing_annotation_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        write_scene_fixture(temp.path(), "Dorf", 100, 80);
        fs::remove_file(temp.path().join("Dorf.xml")).expect("rm xml");

        let catalog = SceneCatalog::new(temp.path());
        let err = catalog.load("Dorf").expect_err("err");
        assert!(matches!(
            err,
            AssetError::NotFound {
                kind: AssetKind::Annotation,
                ..
            }
        ));
    }

    #[test]
    fn missing_learning_texts_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        write_scene_fixture(temp.path(), "Dorf", 100, 80);
        fs::remove_file(temp.path().join("Dorf_learning.md")).expect("rm md");

        let catalog = SceneCatalog::new(temp.path());
        let err = catalog.load("Dorf").expect_err("err");
        assert!(matches!(
            err,
            AssetError::NotFound {
                kind: AssetKind::LearningTexts,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_image_sizes_error() {
        let temp = TempDir::new().expect("tempdir");
        write_scene_fixture(temp.path(), "Dorf", 100, 80);
        RgbaImage::new(90, 80)
            .save(temp.path().join("Dorf_after.png"))
            .expect("after png");

        let catalog = SceneCatalog::new(temp.path());
        let err = catalog.load("Dorf").expect_err("err");
        assert!(matches!(err, AssetError::ImageSizeMismatch { .. }));
    }

    #[test]
    fn missing_learning_entry_is_tolerated() {
        let temp = TempDir::new().expect("tempdir");
        write_scene_fixture(temp.path(), "Dorf", 100, 80);
        fs::write(temp.path().join("Dorf_learning.md"), "# roof\nOnly the roof.\n")
            .expect("learning");

        let catalog = SceneCatalog::new(temp.path());
        let scene = catalog.load("Dorf").expect("scene");
        assert_eq!(scene.region_count(), 2);
        assert_eq!(scene.learning_text("tree"), None);
    }

    #[test]
    fn list_scenes_finds_annotation_stems_sorted() {
        let temp = TempDir::new().expect("tempdir");
        write_scene_fixture(temp.path(), "Tal", 40, 30);
        write_scene_fixture(temp.path(), "Dorf", 40, 30);

        let catalog = SceneCatalog::new(temp.path());
        assert_eq!(catalog.list_scenes().expect("scenes"), vec!["Dorf", "Tal"]);
    }
}
