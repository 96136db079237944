use engine::{
    resolve_data_paths, scan_slider_ranges, DataPaths, ResultsStore, SceneCatalog, SliderRange,
    Worksheet,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Scenes,
    Worksheet { collection: String, name: String },
    SliderRanges,
}

pub fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    let tokens = args.iter().map(String::as_str).collect::<Vec<_>>();
    match tokens.as_slice() {
        ["scenes"] => Ok(CliCommand::Scenes),
        ["worksheet", collection, name] => Ok(CliCommand::Worksheet {
            collection: collection.to_string(),
            name: name.to_string(),
        }),
        ["worksheet", ..] => Err("usage: landscope_cli worksheet <collection> <name>".to_string()),
        ["slider-ranges"] => Ok(CliCommand::SliderRanges),
        [] => Err(usage_text()),
        [other, ..] => Err(format!("unknown command '{other}'\n{}", usage_text())),
    }
}

pub fn usage_text() -> String {
    [
        "usage: landscope_cli <command>",
        "",
        "commands:",
        "  scenes                          list detective scenes and validate their assets",
        "  worksheet <collection> <name>   print a stored results worksheet",
        "  slider-ranges                   print slider ranges scanned from variant images",
    ]
    .join("\n")
}

pub fn run(command: CliCommand) -> Result<String, String> {
    let paths = resolve_data_paths().map_err(|error| error.to_string())?;
    run_with_paths(&paths, command)
}

pub fn run_with_paths(paths: &DataPaths, command: CliCommand) -> Result<String, String> {
    match command {
        CliCommand::Scenes => report_scenes(paths),
        CliCommand::Worksheet { collection, name } => {
            let store = ResultsStore::new(paths.results_dir.clone());
            let sheet = store
                .read_worksheet(&collection, &name)
                .map_err(|error| error.to_string())?;
            Ok(render_worksheet(&sheet))
        }
        CliCommand::SliderRanges => report_slider_ranges(paths),
    }
}

/// Loads every discovered scene and reports what a round would see. Asset
/// problems are listed per scene instead of aborting the whole report.
fn report_scenes(paths: &DataPaths) -> Result<String, String> {
    let catalog = SceneCatalog::new(paths.detective_dir.clone());
    let names = catalog.list_scenes().map_err(|error| error.to_string())?;
    if names.is_empty() {
        return Ok(format!(
            "no scenes found in {}",
            paths.detective_dir.display()
        ));
    }

    let mut lines = Vec::new();
    for name in names {
        match catalog.load(&name) {
            Ok(scene) => {
                let mut line = format!(
                    "{}: {} differences, {}x{} px, {} learning texts",
                    scene.name,
                    scene.region_count(),
                    scene.reference_width(),
                    scene.reference_height(),
                    scene.learning_texts.len()
                );
                let missing = scene
                    .labels()
                    .filter(|label| scene.learning_text(label).is_none())
                    .collect::<Vec<_>>();
                if !missing.is_empty() {
                    line.push_str(&format!(" (missing learning text: {})", missing.join(", ")));
                }
                lines.push(line);
            }
            Err(error) => lines.push(format!("{name}: error: {error}")),
        }
    }
    Ok(lines.join("\n"))
}

fn report_slider_ranges(paths: &DataPaths) -> Result<String, String> {
    let ranges = scan_slider_ranges(&paths.slider_dir).map_err(|error| error.to_string())?;
    if ranges.is_empty() {
        return Ok(format!(
            "no variant images found in {}",
            paths.slider_dir.display()
        ));
    }

    let lines = ranges
        .into_iter()
        .map(|(scene, scene_ranges)| {
            format!(
                "{scene}: S1 {}, S4 {}",
                format_range(scene_ranges.s1),
                format_range(scene_ranges.s4)
            )
        })
        .collect::<Vec<_>>();
    Ok(lines.join("\n"))
}

fn format_range(range: SliderRange) -> String {
    if range.is_locked() {
        "locked".to_string()
    } else if range.is_fixed() {
        format!("fixed at {}", range.min)
    } else {
        format!("{}..{}", range.min, range.max)
    }
}

/// Plain-text table with columns padded to their widest cell.
pub fn render_worksheet(sheet: &Worksheet) -> String {
    if sheet.headers.is_empty() {
        return "(empty worksheet)".to_string();
    }

    let mut widths = sheet
        .headers
        .iter()
        .map(String::len)
        .collect::<Vec<usize>>();
    for row in &sheet.rows {
        for (index, cell) in row.iter().enumerate() {
            if index < widths.len() && cell.len() > widths[index] {
                widths[index] = cell.len();
            }
        }
    }

    let render_row = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(&sheet.headers)];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &sheet.rows {
        lines.push(render_row(row));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use engine::data_paths_at;
    use image::RgbaImage;
    use tempfile::TempDir;

    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_args(&strings(&["scenes"])).expect("scenes"), CliCommand::Scenes);
        assert_eq!(
            parse_args(&strings(&["worksheet", "detective", "Dorf"])).expect("worksheet"),
            CliCommand::Worksheet {
                collection: "detective".to_string(),
                name: "Dorf".to_string()
            }
        );
        assert_eq!(
            parse_args(&strings(&["slider-ranges"])).expect("ranges"),
            CliCommand::SliderRanges
        );
        assert!(parse_args(&strings(&["worksheet", "detective"])).is_err());
        assert!(parse_args(&strings(&["frobnicate"])).is_err());
        assert!(parse_args(&[]).is_err());
    }

    #[test]
    fn renders_padded_tables() {
        let sheet = Worksheet {
            headers: strings(&["timestamp", "player", "age"]),
            rows: vec![
                strings(&["2026-08-07 10:00:00", "kim", "11"]),
                strings(&["2026-08-07 10:05:00", "alexandra", "9"]),
            ],
        };
        let rendered = render_worksheet(&sheet);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("timestamp"));
        assert!(lines[1].starts_with("---"));
        assert!(lines[3].contains("alexandra"));
        // All data rows align under the header columns.
        let player_column = lines[0].find("player").expect("player header");
        assert_eq!(lines[2].find("kim"), Some(player_column));
        assert_eq!(lines[3].find("alexandra"), Some(player_column));
    }

    #[test]
    fn empty_worksheet_renders_placeholder() {
        assert_eq!(render_worksheet(&Worksheet::default()), "(empty worksheet)");
    }

    fn write_scene_fixture(dir: &std::path::Path, scene: &str) {
        fs::create_dir_all(dir).expect("mkdir");
        RgbaImage::new(100, 80)
            .save(dir.join(format!("{scene}_before.png")))
            .expect("before png");
        RgbaImage::new(100, 80)
            .save(dir.join(format!("{scene}_after.png")))
            .expect("after png");
        fs::write(
            dir.join(format!("{scene}.xml")),
            format!(
                r#"<annotations>
                    <image id="0" name="{scene}_after.png" width="100" height="80">
                        <polygon label="roof" points="10,10;30,10;30,30;10,30"/>
                        <polygon label="tree" points="50,40;70,40;60,60"/>
                    </image>
                </annotations>"#
            ),
        )
        .expect("xml");
        fs::write(
            dir.join(format!("{scene}_learning.md")),
            "# roof\nRoof text.\n",
        )
        .expect("learning");
    }

    #[test]
    fn scenes_report_flags_missing_learning_texts() {
        let temp = TempDir::new().expect("tempdir");
        let assets = temp.path().join("assets");
        write_scene_fixture(&assets.join("detective"), "Dorf");
        let paths = data_paths_at(temp.path()).expect("paths");

        let report = run_with_paths(&paths, CliCommand::Scenes).expect("report");
        assert!(report.contains("Dorf: 2 differences, 100x80 px, 1 learning texts"));
        assert!(report.contains("missing learning text: tree"));
    }

    #[test]
    fn broken_scene_is_reported_inline() {
        let temp = TempDir::new().expect("tempdir");
        let assets = temp.path().join("assets").join("detective");
        write_scene_fixture(&assets, "Dorf");
        fs::remove_file(assets.join("Dorf_before.png")).expect("rm png");
        let paths = data_paths_at(temp.path()).expect("paths");

        let report = run_with_paths(&paths, CliCommand::Scenes).expect("report");
        assert!(report.contains("Dorf: error: "));
        assert!(report.contains("before image"));
    }

    #[test]
    fn slider_ranges_report() {
        let temp = TempDir::new().expect("tempdir");
        let slider = temp.path().join("assets").join("slider");
        fs::create_dir_all(&slider).expect("mkdir");
        for name in ["Tal_1_4_0.25.jpg", "Tal_3_0_0.50.jpg", "See_0_2_0.10.png"] {
            fs::write(slider.join(name), b"").expect("touch");
        }
        let paths = data_paths_at(temp.path()).expect("paths");

        let report = run_with_paths(&paths, CliCommand::SliderRanges).expect("report");
        assert!(report.contains("Tal: S1 1..3, S4 0..4"));
        assert!(report.contains("See: S1 locked, S4 fixed at 2"));
    }

    #[test]
    fn worksheet_command_surfaces_store_errors() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("assets")).expect("assets");
        let paths = data_paths_at(temp.path()).expect("paths");

        let err = run_with_paths(
            &paths,
            CliCommand::Worksheet {
                collection: "detective".to_string(),
                name: "Dorf".to_string(),
            },
        )
        .expect_err("err");
        assert!(err.contains("worksheet not found"));
    }
}
