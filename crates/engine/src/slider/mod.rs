use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::assets::parse_learning_sections;

const NARRATIVE_FILE: &str = "narrative.md";

#[derive(Debug, Error)]
pub enum SliderError {
    #[error("no variant image for scene '{scene}' with sliders ({s1}, {s4}) in {dir}")]
    VariantNotFound {
        scene: String,
        s1: u32,
        s4: u32,
        dir: PathBuf,
    },
    #[error("missing narrative texts: {path}")]
    NarrativeNotFound { path: PathBuf },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Observed value range of one slider for one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderRange {
    pub min: u32,
    pub max: u32,
}

impl SliderRange {
    /// A slider whose only observed value is 0 is not adjustable in this
    /// scene at all.
    pub fn is_locked(self) -> bool {
        self.min == 0 && self.max == 0
    }

    pub fn is_fixed(self) -> bool {
        self.min == self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneRanges {
    pub s1: SliderRange,
    pub s4: SliderRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderVariant {
    pub path: PathBuf,
    pub cost: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct ParsedVariantName {
    scene: String,
    s1: u32,
    s4: u32,
    cost: f32,
    extension_rank: u8,
}

/// Looks up slider-game variant images by `(scene, s1, s4)` and derives the
/// cost score from the file name. File names follow
/// `<Scene>_<s1>_<s4>_<cost>.jpg|png`. Shares no state with the detective
/// core.
pub struct VariantCatalog {
    slider_dir: PathBuf,
}

impl VariantCatalog {
    pub fn new(slider_dir: impl Into<PathBuf>) -> Self {
        Self {
            slider_dir: slider_dir.into(),
        }
    }

    pub fn ranges(&self) -> Result<BTreeMap<String, SceneRanges>, SliderError> {
        scan_slider_ranges(&self.slider_dir)
    }

    /// The variant image for one slider tuple. When both a jpg and a png
    /// exist, the jpg wins (then file-name order), so lookups are
    /// deterministic.
    pub fn variant(&self, scene: &str, s1: u32, s4: u32) -> Result<SliderVariant, SliderError> {
        let mut best: Option<(ParsedVariantName, PathBuf)> = None;
        for (parsed, path) in parsed_variants(&self.slider_dir)? {
            if parsed.scene != scene || parsed.s1 != s1 || parsed.s4 != s4 {
                continue;
            }
            let replace = match &best {
                None => true,
                Some((current, current_path)) => {
                    (parsed.extension_rank, &path) < (current.extension_rank, current_path)
                }
            };
            if replace {
                best = Some((parsed, path));
            }
        }

        match best {
            Some((parsed, path)) => Ok(SliderVariant {
                path,
                cost: parsed.cost,
            }),
            None => Err(SliderError::VariantNotFound {
                scene: scene.to_string(),
                s1,
                s4,
                dir: self.slider_dir.clone(),
            }),
        }
    }

    /// Narrative texts keyed `rev{1..3}_wat{1..2}`, same section format as
    /// the detective learning texts.
    pub fn narrative_texts(&self) -> Result<BTreeMap<String, String>, SliderError> {
        let path = self.slider_dir.join(NARRATIVE_FILE);
        if !path.is_file() {
            return Err(SliderError::NarrativeNotFound { path });
        }
        let raw = fs::read_to_string(&path).map_err(|source| SliderError::ReadFile {
            path: path.clone(),
            source,
        })?;
        Ok(parse_learning_sections(&raw))
    }
}

/// Scans every variant file name and reports per-scene `(min, max)` for
/// both sliders.
pub fn scan_slider_ranges(
    slider_dir: &Path,
) -> Result<BTreeMap<String, SceneRanges>, SliderError> {
    let mut values_by_scene = BTreeMap::<String, (Vec<u32>, Vec<u32>)>::new();
    for (parsed, _) in parsed_variants(slider_dir)? {
        let entry = values_by_scene.entry(parsed.scene).or_default();
        entry.0.push(parsed.s1);
        entry.1.push(parsed.s4);
    }

    let ranges = values_by_scene
        .into_iter()
        .map(|(scene, (s1_values, s4_values))| {
            (
                scene,
                SceneRanges {
                    s1: range_of(&s1_values),
                    s4: range_of(&s4_values),
                },
            )
        })
        .collect();
    Ok(ranges)
}

fn range_of(values: &[u32]) -> SliderRange {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);
    SliderRange { min, max }
}

fn parsed_variants(
    slider_dir: &Path,
) -> Result<Vec<(ParsedVariantName, PathBuf)>, SliderError> {
    let entries = fs::read_dir(slider_dir).map_err(|source| SliderError::ReadDir {
        path: slider_dir.to_path_buf(),
        source,
    })?;

    let mut variants = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SliderError::ReadDir {
            path: slider_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if let Some(parsed) = parse_variant_file_name(name) {
            variants.push((parsed, path));
        }
    }
    Ok(variants)
}

/// `<Scene>_<s1>_<s4>_<cost>.jpg|png`; the scene itself may contain
/// underscores, so numeric fields are taken from the right.
fn parse_variant_file_name(name: &str) -> Option<ParsedVariantName> {
    let (stem, extension_rank) = if let Some(stem) = name.strip_suffix(".jpg") {
        (stem, 0u8)
    } else if let Some(stem) = name.strip_suffix(".png") {
        (stem, 1u8)
    } else {
        return None;
    };

    let mut parts = stem.rsplitn(4, '_');
    let cost_raw = parts.next()?;
    let s4_raw = parts.next()?;
    let s1_raw = parts.next()?;
    let scene = parts.next()?;
    if scene.is_empty() || !cost_raw.contains('.') {
        return None;
    }

    let cost = cost_raw.parse::<f32>().ok().filter(|cost| cost.is_finite())?;
    let s1 = s1_raw.parse::<u32>().ok()?;
    let s4 = s4_raw.parse::<u32>().ok()?;

    Some(ParsedVariantName {
        scene: scene.to_string(),
        s1,
        s4,
        cost,
        extension_rank,
    })
}

/// Maps a 0–1 value onto discrete levels `1..=steps` (for emoji meters and
/// narrative keys).
pub fn quantize_level(value: f32, steps: u32) -> u32 {
    let rounded = (value * steps as f32).round() as i64;
    rounded.clamp(1, i64::from(steps)) as u32
}
