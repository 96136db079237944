use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::geom::{Polygon, PolygonError, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationErrorCode {
    XmlMalformed,
    InvalidRoot,
    MissingAttribute,
    InvalidPoints,
    DegeneratePolygon,
    DuplicateLabel,
    NoRegionsForImage,
}

#[derive(Debug, Clone)]
pub struct AnnotationParseError {
    pub code: AnnotationErrorCode,
    pub message: String,
    pub scene: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for AnnotationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (scene={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.scene,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (scene={}, file={})",
                self.code,
                self.message,
                self.scene,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for AnnotationParseError {}

/// One labeled difference polygon, stored in the pixel space of the scene's
/// after image. `buffer_px` widens the boundary for hit-testing so clicks
/// near an edge still register.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceRegion {
    pub label: String,
    pub boundary: Polygon,
    pub buffer_px: f32,
}

impl DifferenceRegion {
    pub fn hit(&self, point: Vec2) -> bool {
        self.boundary.covers(point, self.buffer_px)
    }
}

/// Parses a CVAT annotation document. Only polygons attached to the image
/// entry named `{scene}_after.png` contribute regions; region order follows
/// document order.
pub(crate) fn parse_annotation_document(
    scene: &str,
    file_path: &Path,
    raw: &str,
    buffer_px: f32,
) -> Result<Vec<DifferenceRegion>, AnnotationParseError> {
    let doc = Document::parse(raw).map_err(|error| AnnotationParseError {
        code: AnnotationErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        scene: scene.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "annotations" {
        return Err(error_at_node(
            AnnotationErrorCode::InvalidRoot,
            "root element must be <annotations>".to_string(),
            scene,
            file_path,
            &doc,
            root,
        ));
    }

    let after_image_name = format!("{scene}_after.png");
    let mut regions = Vec::<DifferenceRegion>::new();
    let mut seen_labels = HashSet::<String>::new();

    for image in root
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "image")
    {
        if image.attribute("name") != Some(after_image_name.as_str()) {
            continue;
        }
        for polygon in image
            .children()
            .filter(|node| node.is_element() && node.tag_name().name() == "polygon")
        {
            let label = required_attribute(scene, file_path, &doc, polygon, "label")?;
            if !seen_labels.insert(label.clone()) {
                return Err(error_at_node(
                    AnnotationErrorCode::DuplicateLabel,
                    format!("duplicate region label '{label}'; labels must be unique per scene"),
                    scene,
                    file_path,
                    &doc,
                    polygon,
                ));
            }
            let points = required_attribute(scene, file_path, &doc, polygon, "points")?;
            let vertices = parse_points(scene, file_path, &doc, polygon, &points)?;
            let boundary = Polygon::new(vertices).map_err(|error| {
                let code = match error {
                    PolygonError::TooFewVertices(_) => AnnotationErrorCode::DegeneratePolygon,
                    PolygonError::NonFiniteVertex { .. } => AnnotationErrorCode::InvalidPoints,
                };
                error_at_node(code, error.to_string(), scene, file_path, &doc, polygon)
            })?;
            regions.push(DifferenceRegion {
                label,
                boundary,
                buffer_px,
            });
        }
    }

    if regions.is_empty() {
        return Err(AnnotationParseError {
            code: AnnotationErrorCode::NoRegionsForImage,
            message: format!("no polygons found for image '{after_image_name}'"),
            scene: scene.to_string(),
            file_path: file_path.to_path_buf(),
            location: None,
        });
    }

    Ok(regions)
}

fn parse_points(
    scene: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    raw: &str,
) -> Result<Vec<Vec2>, AnnotationParseError> {
    let mut vertices = Vec::new();
    for pair in raw.split(';') {
        let mut coords = pair.split(',');
        let (Some(x_raw), Some(y_raw), None) = (coords.next(), coords.next(), coords.next())
        else {
            return Err(error_at_node(
                AnnotationErrorCode::InvalidPoints,
                format!("point '{pair}' is not an 'x,y' pair"),
                scene,
                file_path,
                doc,
                node,
            ));
        };
        let (Ok(x), Ok(y)) = (x_raw.trim().parse::<f32>(), y_raw.trim().parse::<f32>()) else {
            return Err(error_at_node(
                AnnotationErrorCode::InvalidPoints,
                format!("point '{pair}' has non-numeric coordinates"),
                scene,
                file_path,
                doc,
                node,
            ));
        };
        vertices.push(Vec2::new(x, y));
    }
    Ok(vertices)
}

fn required_attribute(
    scene: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<String, AnnotationParseError> {
    let value = node.attribute(name).map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(error_at_node(
            AnnotationErrorCode::MissingAttribute,
            format!("<polygon> attribute '{name}' is missing or empty"),
            scene,
            file_path,
            doc,
            node,
        ));
    }
    Ok(value.to_string())
}

fn error_at_node(
    code: AnnotationErrorCode,
    message: String,
    scene: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> AnnotationParseError {
    let pos = doc.text_pos_at(node.range().start);
    AnnotationParseError {
        code,
        message,
        scene: scene.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}
