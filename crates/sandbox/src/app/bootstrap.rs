use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use interaction::{ConfigTable, LoopConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::scenario::{load_scenario, SandboxError};
use super::session::Session;

const TABLE_PATH_ENV_VAR: &str = "INTERACT_TABLE_PATH";
const SCENARIO_PATH_ENV_VAR: &str = "INTERACT_SCENARIO_PATH";
const DEFAULT_TABLE_FILE: &str = "interactables.xml";
const DEFAULT_SCENARIO_FILE: &str = "scenario.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) frames: u32,
    pub(crate) frame_dt: Duration,
    pub(crate) session: Session,
}

pub(crate) fn build_app() -> Result<AppWiring, SandboxError> {
    init_tracing();
    info!("=== Interaction Sandbox Startup ===");

    let table_path = resolve_asset_path(TABLE_PATH_ENV_VAR, DEFAULT_TABLE_FILE);
    let scenario_path = resolve_asset_path(SCENARIO_PATH_ENV_VAR, DEFAULT_SCENARIO_FILE);

    let table = ConfigTable::load(&table_path)?;
    info!(
        path = %table_path.display(),
        rows = table.len(),
        "config_table_loaded"
    );
    let scenario = load_scenario(&scenario_path)?;
    info!(
        path = %scenario_path.display(),
        frames = scenario.frames,
        interactables = scenario.interactables.len(),
        "scenario_loaded"
    );

    let session = Session::build(&scenario, &table)?;
    let config = LoopConfig {
        target_tps: scenario.target_tps,
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        frames: scenario.frames,
        frame_dt: Duration::from_millis(scenario.frame_ms),
        session,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_asset_path(env_var: &str, default_file: &str) -> PathBuf {
    env::var_os(env_var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| bundled_asset_path(default_file))
}

fn bundled_asset_path(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scenario::load_scenario;

    #[test]
    fn bundled_assets_load_and_build_a_session() {
        let table = ConfigTable::load(&bundled_asset_path(DEFAULT_TABLE_FILE)).expect("table");
        assert!(table.find_row("door").is_some());
        assert!(table.find_row("lever").is_some());

        let scenario = load_scenario(&bundled_asset_path(DEFAULT_SCENARIO_FILE)).expect("scenario");
        Session::build(&scenario, &table).expect("session");
    }

    #[test]
    fn unset_env_var_falls_back_to_bundled_asset() {
        let path = resolve_asset_path("INTERACT_SANDBOX_TEST_UNSET_VAR", DEFAULT_TABLE_FILE);
        assert_eq!(path, bundled_asset_path(DEFAULT_TABLE_FILE));
        assert!(path.ends_with("assets/interactables.xml"));
    }
}
