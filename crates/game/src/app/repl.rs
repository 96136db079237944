use std::sync::Arc;
use std::time::Instant;

use engine::{ResultsStore, Scene, SceneCatalog, Vec2};
use tracing::warn;

use super::session::{ClickResponse, ImageSide, PlayerInfo, RoundPhase, SessionRegistry};

pub(crate) const DEFAULT_DISPLAY_WIDTH: u32 = 800;
const MIN_DISPLAY_WIDTH: u32 = 100;
const MAX_DISPLAY_WIDTH: u32 = 1600;
const LOCAL_SESSION_ID: &str = "local";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Scene { name: String },
    Width { pixels: u32 },
    Start { player: String, age: u32 },
    Click { side: ImageSide, x: f32, y: f32 },
    Status,
    Reset,
    Help,
    Quit,
}

pub(crate) fn parse_command(line: &str) -> Result<Command, String> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    match tokens.as_slice() {
        ["scene", name] => Ok(Command::Scene {
            name: name.to_string(),
        }),
        ["scene", ..] => Err("usage: scene <name>".to_string()),
        ["width", raw] => {
            let pixels = raw
                .parse::<u32>()
                .map_err(|_| format!("invalid width '{raw}' (expected pixels)"))?;
            if !(MIN_DISPLAY_WIDTH..=MAX_DISPLAY_WIDTH).contains(&pixels) {
                return Err(format!(
                    "width must be between {MIN_DISPLAY_WIDTH} and {MAX_DISPLAY_WIDTH} px"
                ));
            }
            Ok(Command::Width { pixels })
        }
        ["width", ..] => Err("usage: width <pixels>".to_string()),
        ["start", player, raw_age] => {
            let age = raw_age
                .parse::<u32>()
                .map_err(|_| format!("invalid age '{raw_age}'"))?;
            Ok(Command::Start {
                player: player.to_string(),
                age,
            })
        }
        ["start", ..] => Err("usage: start <player> <age>".to_string()),
        ["click", raw_side, raw_x, raw_y] => {
            let side = parse_side(raw_side)?;
            let x = raw_x
                .parse::<f32>()
                .map_err(|_| format!("invalid x coordinate '{raw_x}'"))?;
            let y = raw_y
                .parse::<f32>()
                .map_err(|_| format!("invalid y coordinate '{raw_y}'"))?;
            Ok(Command::Click { side, x, y })
        }
        ["click", ..] => Err("usage: click before|after <x> <y>".to_string()),
        ["status"] => Ok(Command::Status),
        ["reset"] => Ok(Command::Reset),
        ["help"] => Ok(Command::Help),
        ["quit"] | ["exit"] => Ok(Command::Quit),
        [] => Err(usage_text()),
        [other, ..] => Err(format!("unknown command '{other}'; type 'help'")),
    }
}

fn parse_side(raw: &str) -> Result<ImageSide, String> {
    match raw {
        "before" => Ok(ImageSide::Before),
        "after" => Ok(ImageSide::After),
        other => Err(format!("invalid image side '{other}' (before|after)")),
    }
}

pub(crate) fn usage_text() -> String {
    [
        "commands:",
        "  scene <name>              select a scene (resets the round)",
        "  width <pixels>            set the displayed image width",
        "  start <player> <age>      start a round",
        "  click before|after <x> <y>  click at displayed-pixel coordinates",
        "  status                    show round progress",
        "  reset                     abandon the round",
        "  quit                      leave",
    ]
    .join("\n")
}

/// Drives one local session from discrete commands. Each command is one
/// tracker transition; the runner owns the event loop so the session logic
/// stays pure input-to-output.
pub(crate) struct RoundRunner {
    catalog: SceneCatalog,
    store: ResultsStore,
    sessions: SessionRegistry,
    active_scene: Option<Arc<Scene>>,
    display_width: u32,
}

impl RoundRunner {
    pub(crate) fn new(catalog: SceneCatalog, store: ResultsStore) -> Self {
        Self {
            catalog,
            store,
            sessions: SessionRegistry::default(),
            active_scene: None,
            display_width: DEFAULT_DISPLAY_WIDTH,
        }
    }

    pub(crate) fn execute(&mut self, command: Command, now: Instant) -> Vec<String> {
        match command {
            Command::Scene { name } => self.select_scene(&name),
            Command::Width { pixels } => {
                self.display_width = pixels;
                vec![format!("display width set to {pixels} px")]
            }
            Command::Start { player, age } => self.start_round(player, age, now),
            Command::Click { side, x, y } => self.handle_click(side, Vec2::new(x, y), now),
            Command::Status => self.status(now),
            Command::Reset => {
                self.sessions.session_mut(LOCAL_SESSION_ID).reset();
                vec!["round reset".to_string()]
            }
            Command::Help => vec![usage_text()],
            Command::Quit => vec!["bye".to_string()],
        }
    }

    fn select_scene(&mut self, name: &str) -> Vec<String> {
        match self.catalog.load(name) {
            Ok(scene) => {
                // A scene change abandons the running round entirely.
                self.sessions.remove(LOCAL_SESSION_ID);
                let lines = vec![format!(
                    "scene '{}' loaded: {} differences, {}x{} px",
                    scene.name,
                    scene.region_count(),
                    scene.reference_width(),
                    scene.reference_height()
                )];
                self.active_scene = Some(scene);
                lines
            }
            Err(error) => vec![format!("error: {error}")],
        }
    }

    fn start_round(&mut self, player: String, age: u32, now: Instant) -> Vec<String> {
        let Some(scene) = self.active_scene.as_ref() else {
            return vec!["error: no scene selected; use: scene <name>".to_string()];
        };
        let progress = self.sessions.session_mut(LOCAL_SESSION_ID);
        progress.start(PlayerInfo { name: player, age }, now);
        vec![format!(
            "round started for {}; find {} differences",
            progress
                .player()
                .map(|info| info.name.as_str())
                .unwrap_or("?"),
            scene.region_count()
        )]
    }

    fn handle_click(&mut self, side: ImageSide, position: Vec2, now: Instant) -> Vec<String> {
        let Some(scene) = self.active_scene.as_ref() else {
            return vec!["error: no scene selected; use: scene <name>".to_string()];
        };
        let display_size = display_size_for(self.display_width, scene);
        let progress = self.sessions.session_mut(LOCAL_SESSION_ID);
        let response = progress.handle_click(scene, side, position, display_size, now);

        match response {
            ClickResponse::NotStarted => {
                vec!["start a round first: start <player> <age>".to_string()]
            }
            ClickResponse::RoundOver => {
                vec!["round is finished; reset to play again".to_string()]
            }
            ClickResponse::DuplicateIgnored => vec!["(duplicate click ignored)".to_string()],
            ClickResponse::Miss { side } => vec![format!(
                "no difference at that spot in the {} image",
                side.as_token()
            )],
            ClickResponse::Hit {
                label,
                learning_text,
                newly_found,
                finished,
            } => {
                let mut lines = Vec::new();
                if newly_found {
                    lines.push(format!(
                        "difference found: {label} ({}/{})",
                        progress.found().len(),
                        scene.region_count()
                    ));
                } else {
                    lines.push(format!("already found: {label}"));
                }
                match learning_text {
                    Some(text) => lines.push(text),
                    None => lines.push(format!("no learning text for '{label}'")),
                }
                if finished {
                    let elapsed = progress.elapsed_seconds(now).unwrap_or_default();
                    lines.push(format!(
                        "all {} differences found in {elapsed:.1} s!",
                        scene.region_count()
                    ));
                    match progress.try_record(scene, &self.store) {
                        Ok(true) => lines.push("results saved".to_string()),
                        Ok(false) => {}
                        Err(error) => {
                            warn!(error = %error, "round_record_failed");
                            lines.push(format!(
                                "warning: could not save results ({error}); your round is kept in memory"
                            ));
                        }
                    }
                }
                lines
            }
        }
    }

    fn status(&mut self, now: Instant) -> Vec<String> {
        let progress = self.sessions.session_mut(LOCAL_SESSION_ID);
        let scene_line = match &self.active_scene {
            Some(scene) => format!(
                "scene: {} ({} differences)",
                scene.name,
                scene.region_count()
            ),
            None => "scene: none".to_string(),
        };
        let mut lines = vec![scene_line];
        match progress.phase() {
            RoundPhase::NotStarted => lines.push("round: not started".to_string()),
            RoundPhase::Playing => {
                let elapsed = progress.elapsed_seconds(now).unwrap_or_default();
                lines.push(format!(
                    "round: playing, {} found, {elapsed:.1} s elapsed",
                    progress.found().len()
                ));
            }
            RoundPhase::Finished => {
                lines.push(format!(
                    "round: finished with {} clicks",
                    progress.click_log().len()
                ));
            }
        }
        for entry in progress.found() {
            lines.push(format!(
                "  {} at {:.2} s",
                entry.label, entry.seconds_since_start
            ));
        }
        lines
    }
}

fn display_size_for(display_width: u32, scene: &Scene) -> (u32, u32) {
    let display_height = (display_width as f32 * scene.reference_height() as f32
        / scene.reference_width() as f32)
        .round() as u32;
    (display_width, display_height)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::RgbaImage;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn parses_well_formed_commands() {
        assert_eq!(
            parse_command("scene Dorf").expect("scene"),
            Command::Scene {
                name: "Dorf".to_string()
            }
        );
        assert_eq!(
            parse_command("start kim 11").expect("start"),
            Command::Start {
                player: "kim".to_string(),
                age: 11
            }
        );
        assert_eq!(
            parse_command("click before 12.5 40").expect("click"),
            Command::Click {
                side: ImageSide::Before,
                x: 12.5,
                y: 40.0
            }
        );
        assert_eq!(parse_command("width 400").expect("width"), Command::Width { pixels: 400 });
        assert_eq!(parse_command("quit").expect("quit"), Command::Quit);
        assert_eq!(parse_command("exit").expect("exit"), Command::Quit);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("scene").is_err());
        assert!(parse_command("start kim").is_err());
        assert!(parse_command("start kim eleven").is_err());
        assert!(parse_command("click left 1 2").is_err());
        assert!(parse_command("click before one 2").is_err());
        assert!(parse_command("width 50").is_err());
        assert!(parse_command("width many").is_err());
        assert!(parse_command("teleport 1 2").is_err());
        assert!(parse_command("").is_err());
    }

    const TEST_XML: &str = r#"<annotations>
        <image id="0" name="Dorf_after.png" width="200" height="100">
            <polygon label="roof" points="20,20;80,20;80,80;20,80"/>
            <polygon label="tree" points="120,20;180,20;180,80;120,80"/>
        </image>
    </annotations>"#;

    fn write_scene_fixture(dir: &std::path::Path) {
        fs::create_dir_all(dir).expect("mkdir");
        RgbaImage::new(200, 100)
            .save(dir.join("Dorf_before.png"))
            .expect("before png");
        RgbaImage::new(200, 100)
            .save(dir.join("Dorf_after.png"))
            .expect("after png");
        fs::write(dir.join("Dorf.xml"), TEST_XML).expect("xml");
        fs::write(
            dir.join("Dorf_learning.md"),
            "# roof\nRoof text.\n\n# tree\nTree text.\n",
        )
        .expect("learning");
    }

    fn runner_with_fixture(temp: &TempDir) -> RoundRunner {
        let assets = temp.path().join("assets");
        write_scene_fixture(&assets);
        RoundRunner::new(
            SceneCatalog::new(assets),
            ResultsStore::new(temp.path().join("results")),
        )
    }

    #[test]
    fn full_round_over_commands_saves_results() {
        let temp = TempDir::new().expect("tempdir");
        let mut runner = runner_with_fixture(&temp);
        let now = Instant::now();

        let lines = runner.execute(
            Command::Scene {
                name: "Dorf".to_string(),
            },
            now,
        );
        assert_eq!(lines[0], "scene 'Dorf' loaded: 2 differences, 200x100 px");

        runner.execute(Command::Width { pixels: 200 }, now);
        let lines = runner.execute(
            Command::Start {
                player: "kim".to_string(),
                age: 11,
            },
            now,
        );
        assert_eq!(lines[0], "round started for kim; find 2 differences");

        let lines = runner.execute(
            Command::Click {
                side: ImageSide::Before,
                x: 5.0,
                y: 5.0,
            },
            now,
        );
        assert_eq!(lines[0], "no difference at that spot in the before image");

        let lines = runner.execute(
            Command::Click {
                side: ImageSide::Before,
                x: 50.0,
                y: 50.0,
            },
            now,
        );
        assert_eq!(lines[0], "difference found: roof (1/2)");
        assert_eq!(lines[1], "Roof text.");

        let lines = runner.execute(
            Command::Click {
                side: ImageSide::After,
                x: 150.0,
                y: 50.0,
            },
            now,
        );
        assert_eq!(lines[0], "difference found: tree (2/2)");
        assert!(lines[2].starts_with("all 2 differences found"));
        assert_eq!(lines[3], "results saved");

        let sheet = runner
            .store
            .read_worksheet(engine::COLLECTION_DETECTIVE, "Dorf")
            .expect("sheet");
        assert_eq!(sheet.rows.len(), 1);

        let lines = runner.execute(
            Command::Click {
                side: ImageSide::After,
                x: 150.0,
                y: 50.0,
            },
            now,
        );
        assert_eq!(lines[0], "round is finished; reset to play again");
    }

    #[test]
    fn missing_scene_is_reported_not_fatal() {
        let temp = TempDir::new().expect("tempdir");
        let mut runner = runner_with_fixture(&temp);
        let lines = runner.execute(
            Command::Scene {
                name: "Nowhere".to_string(),
            },
            Instant::now(),
        );
        assert!(lines[0].starts_with("error: "));
        assert!(runner.active_scene.is_none());
    }

    #[test]
    fn click_without_scene_or_round_guides_the_player() {
        let temp = TempDir::new().expect("tempdir");
        let mut runner = runner_with_fixture(&temp);
        let now = Instant::now();

        let lines = runner.execute(
            Command::Click {
                side: ImageSide::Before,
                x: 1.0,
                y: 1.0,
            },
            now,
        );
        assert_eq!(lines[0], "error: no scene selected; use: scene <name>");

        runner.execute(
            Command::Scene {
                name: "Dorf".to_string(),
            },
            now,
        );
        let lines = runner.execute(
            Command::Click {
                side: ImageSide::Before,
                x: 1.0,
                y: 1.0,
            },
            now,
        );
        assert_eq!(lines[0], "start a round first: start <player> <age>");
    }

    #[test]
    fn selecting_a_scene_resets_the_round() {
        let temp = TempDir::new().expect("tempdir");
        let mut runner = runner_with_fixture(&temp);
        let now = Instant::now();

        runner.execute(
            Command::Scene {
                name: "Dorf".to_string(),
            },
            now,
        );
        runner.execute(
            Command::Start {
                player: "kim".to_string(),
                age: 11,
            },
            now,
        );
        runner.execute(
            Command::Width { pixels: 200 },
            now,
        );
        runner.execute(
            Command::Click {
                side: ImageSide::Before,
                x: 50.0,
                y: 50.0,
            },
            now,
        );

        runner.execute(
            Command::Scene {
                name: "Dorf".to_string(),
            },
            now,
        );
        let status = runner.execute(Command::Status, now);
        assert!(status.contains(&"round: not started".to_string()));
    }

    #[test]
    fn scaled_width_converts_clicks() {
        let temp = TempDir::new().expect("tempdir");
        let mut runner = runner_with_fixture(&temp);
        let now = Instant::now();

        runner.execute(
            Command::Scene {
                name: "Dorf".to_string(),
            },
            now,
        );
        runner.execute(Command::Width { pixels: 100 }, now);
        runner.execute(
            Command::Start {
                player: "kim".to_string(),
                age: 11,
            },
            now,
        );
        // Display is half the reference width: (25, 25) lands on (50, 50).
        let lines = runner.execute(
            Command::Click {
                side: ImageSide::Before,
                x: 25.0,
                y: 25.0,
            },
            now,
        );
        assert_eq!(lines[0], "difference found: roof (1/2)");
    }
}
