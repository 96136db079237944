use crate::assets::Scene;
use crate::geom::Vec2;

/// Outcome of resolving one click against a scene. `point` is the click
/// converted into the scene's reference pixel space; `label` names the
/// first region covering it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub point: Vec2,
    pub label: Option<String>,
}

impl HitResult {
    pub fn is_hit(&self) -> bool {
        self.label.is_some()
    }
}

/// Displayed images are proportional resizes of the reference image, so one
/// width-derived factor rescales both axes.
pub fn display_to_reference(position: Vec2, display_width: f32, reference_width: f32) -> Vec2 {
    let scale = reference_width / display_width;
    Vec2::new(position.x * scale, position.y * scale)
}

pub fn reference_to_display(position: Vec2, display_width: f32, reference_width: f32) -> Vec2 {
    let scale = display_width / reference_width;
    Vec2::new(position.x * scale, position.y * scale)
}

/// Converts a displayed-pixel click into reference space and tests it
/// against the scene's regions in stored order. Regions normally do not
/// overlap; when they do, the first region in stored order wins.
pub fn resolve_click(display_position: Vec2, display_size: (u32, u32), scene: &Scene) -> HitResult {
    let point = display_to_reference(
        display_position,
        display_size.0 as f32,
        scene.reference_width() as f32,
    );

    let label = scene
        .regions
        .iter()
        .find(|region| region.hit(point))
        .map(|region| region.label.clone());

    HitResult { point, label }
}
