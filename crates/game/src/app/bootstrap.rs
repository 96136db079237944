use engine::{
    resolve_data_paths, DataPaths, ResultsStore, SceneCatalog, StartupError,
    DEFAULT_REGION_BUFFER_PX,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::repl::RoundRunner;

const REGION_BUFFER_ENV_VAR: &str = "LANDSCOPE_REGION_BUFFER_PX";

pub(crate) fn build_app() -> Result<RoundRunner, StartupError> {
    init_tracing();
    info!("=== Landscope Startup ===");

    let paths = resolve_data_paths()?;
    info!(root = %paths.root.display(), "data_root_resolved");
    Ok(build_runner(&paths))
}

pub(crate) fn build_runner(paths: &DataPaths) -> RoundRunner {
    let buffer_px = parse_region_buffer_from_env();
    let catalog = SceneCatalog::with_buffer(paths.detective_dir.clone(), buffer_px);
    let store = ResultsStore::new(paths.results_dir.clone());
    RoundRunner::new(catalog, store)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_region_buffer_from_env() -> f32 {
    std::env::var(REGION_BUFFER_ENV_VAR)
        .ok()
        .and_then(|raw| raw.trim().parse::<f32>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(DEFAULT_REGION_BUFFER_PX)
}
