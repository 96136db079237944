use chrono::Local;

use crate::geom::Vec2;

use super::Worksheet;

pub(crate) const ROUND_FIXED_COLUMNS: [&str; 3] = ["timestamp", "player", "age"];
pub(crate) const ROUND_POINTS_COLUMN: &str = "points";

pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickCell {
    pub point: Vec2,
    pub hit: bool,
}

/// One finished (or abandoned) detective round, serialized as a single
/// worksheet row: fixed columns, one column per found label holding the
/// seconds since round start, and a trailing points column with the full
/// click log.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    pub timestamp: String,
    pub scene: String,
    pub player: String,
    pub age: u32,
    pub found_seconds: Vec<(String, f32)>,
    pub click_log: Vec<ClickCell>,
}

impl RoundRecord {
    /// Header layout after appending this record: fixed columns, then the
    /// sorted union of label columns already stored and labels found this
    /// round, then the points column.
    pub fn merged_headers(&self, existing: &Worksheet) -> Vec<String> {
        let mut labels: Vec<String> = existing
            .headers
            .iter()
            .filter(|header| {
                let header = header.as_str();
                header != ROUND_POINTS_COLUMN
                    && !ROUND_FIXED_COLUMNS.contains(&header)
            })
            .cloned()
            .collect();
        for (label, _) in &self.found_seconds {
            if !labels.iter().any(|known| known == label) {
                labels.push(label.clone());
            }
        }
        labels.sort();

        let mut headers: Vec<String> = ROUND_FIXED_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .collect();
        headers.extend(labels);
        headers.push(ROUND_POINTS_COLUMN.to_string());
        headers
    }

    pub fn row_for_headers(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|header| match header.as_str() {
                "timestamp" => self.timestamp.clone(),
                "player" => self.player.clone(),
                "age" => self.age.to_string(),
                column if column == ROUND_POINTS_COLUMN => format_click_log(&self.click_log),
                label => self
                    .found_seconds
                    .iter()
                    .find(|(found, _)| found == label)
                    .map(|(_, seconds)| format!("{seconds:.2}"))
                    .unwrap_or_default(),
            })
            .collect()
    }
}

fn format_click_log(clicks: &[ClickCell]) -> String {
    clicks
        .iter()
        .map(|click| {
            format!(
                "({}, {}, {})",
                click.point.x as i32, click.point.y as i32, click.hit
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// One confirmed slider-game choice.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderChoiceRecord {
    pub timestamp: String,
    pub scene: String,
    pub slider1: u32,
    pub slider4: u32,
    pub cost: f32,
}

impl SliderChoiceRecord {
    pub fn headers() -> Vec<String> {
        ["timestamp", "scene", "slider1", "slider4", "cost"]
            .iter()
            .map(|column| column.to_string())
            .collect()
    }

    pub fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.scene.clone(),
            self.slider1.to_string(),
            self.slider4.to_string(),
            format!("{:.2}", self.cost),
        ]
    }
}

/// One end-of-round feedback submission. Ratings are optional because the
/// form allows skipping either question.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub timestamp: String,
    pub rating: Option<u8>,
    pub learned: Option<u8>,
    pub comment: String,
}

impl FeedbackRecord {
    pub fn headers() -> Vec<String> {
        ["timestamp", "rating", "learned", "comment"]
            .iter()
            .map(|column| column.to_string())
            .collect()
    }

    pub fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.rating.map(|value| value.to_string()).unwrap_or_default(),
            self.learned.map(|value| value.to_string()).unwrap_or_default(),
            self.comment.clone(),
        ]
    }
}
