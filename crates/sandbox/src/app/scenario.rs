use std::fs;
use std::path::{Path, PathBuf};

use interaction::{
    DetectionMode, InteractorSettings, KeyPathError, TableError, Vec3, Viewport,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SandboxError {
    #[error("failed to read scenario {path}: {source}")]
    ReadScenario {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path}: {message}")]
    ParseScenario { path: PathBuf, message: String },
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    KeyPath(#[from] KeyPathError),
    #[error("interactable '{name}' is declared twice")]
    DuplicateInteractable { name: String },
    #[error("script references unknown interactable '{name}'")]
    UnknownInteractable { name: String },
    #[error("script references unregistered key '{path}'")]
    UnknownKey { path: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default = "default_frames")]
    pub(crate) frames: u32,
    #[serde(default = "default_frame_ms")]
    pub(crate) frame_ms: u64,
    #[serde(default = "default_target_tps")]
    pub(crate) target_tps: u32,
    #[serde(default)]
    pub(crate) viewport: ViewportSpec,
    #[serde(default)]
    pub(crate) interactor: InteractorSettings,
    pub(crate) player: PlayerSpec,
    #[serde(default)]
    pub(crate) keys: Vec<KeySpec>,
    #[serde(default)]
    pub(crate) interactables: Vec<InteractableSpec>,
    #[serde(default)]
    pub(crate) obstacles: Vec<ObstacleSpec>,
    #[serde(default)]
    pub(crate) script: Vec<ScriptStep>,
}

fn default_frames() -> u32 {
    240
}

fn default_frame_ms() -> u64 {
    16
}

fn default_target_tps() -> u32 {
    60
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ViewportSpec {
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            width: viewport.width,
            height: viewport.height,
        }
    }
}

impl From<ViewportSpec> for Viewport {
    fn from(spec: ViewportSpec) -> Self {
        Viewport {
            width: spec.width,
            height: spec.height,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlayerSpec {
    pub(crate) location: Vec3,
    #[serde(default = "default_facing")]
    pub(crate) facing: Vec3,
}

fn default_facing() -> Vec3 {
    Vec3::FORWARD
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct KeySpec {
    pub(crate) path: String,
    #[serde(default)]
    pub(crate) consume_after_interaction: bool,
    pub(crate) input_action: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct InteractableSpec {
    pub(crate) name: String,
    pub(crate) row: String,
    pub(crate) location: Vec3,
    #[serde(default = "default_radius")]
    pub(crate) radius: f32,
    #[serde(default = "default_true")]
    pub(crate) start_active: bool,
}

fn default_radius() -> f32 {
    20.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObstacleSpec {
    pub(crate) location: Vec3,
    pub(crate) radius: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScriptStep {
    pub(crate) tick: u64,
    #[serde(flatten)]
    pub(crate) action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ScriptAction {
    Press {
        #[serde(default)]
        key: Option<String>,
    },
    Release {
        #[serde(default)]
        key: Option<String>,
    },
    MovePlayer {
        location: Vec3,
    },
    FacePlayer {
        facing: Vec3,
    },
    SetActive {
        target: String,
        active: bool,
    },
    SetDetectionMode {
        mode: DetectionMode,
    },
    Despawn {
        target: String,
    },
}

pub(crate) fn load_scenario(path: &Path) -> Result<Scenario, SandboxError> {
    let raw = fs::read_to_string(path).map_err(|source| SandboxError::ReadScenario {
        path: path.to_path_buf(),
        source,
    })?;
    parse_scenario_json(path, &raw)
}

pub(crate) fn parse_scenario_json(path: &Path, raw: &str) -> Result<Scenario, SandboxError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer) {
        Ok(scenario) => Ok(scenario),
        Err(error) => {
            let json_path = error.path().to_string();
            let source = error.into_inner();
            let message = if json_path.is_empty() || json_path == "." {
                source.to_string()
            } else {
                format!("at {json_path}: {source}")
            };
            Err(SandboxError::ParseScenario {
                path: path.to_path_buf(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"{
        "player": { "location": { "x": 0.0, "y": 0.0, "z": 0.0 } },
        "interactables": [
            { "name": "door", "row": "door", "location": { "x": 200.0, "y": 0.0, "z": 64.0 } }
        ],
        "script": [
            { "tick": 3, "action": "press" },
            { "tick": 9, "action": "release", "key": "keys/grab" },
            { "tick": 12, "action": "set_detection_mode", "mode": "CharacterProximity" }
        ]
    }"#;

    #[test]
    fn minimal_scenario_fills_defaults() {
        let scenario = parse_scenario_json(Path::new("inline.json"), MINIMAL).expect("scenario");
        assert_eq!(scenario.frames, 240);
        assert_eq!(scenario.target_tps, 60);
        assert_eq!(scenario.player.facing, Vec3::FORWARD);
        assert_eq!(scenario.interactables[0].radius, 20.0);
        assert!(scenario.interactables[0].start_active);
        assert_eq!(scenario.interactor.detection_radius, 700.0);
        assert_eq!(scenario.script[0].action, ScriptAction::Press { key: None });
        assert_eq!(
            scenario.script[1].action,
            ScriptAction::Release {
                key: Some("keys/grab".to_string())
            }
        );
        assert_eq!(
            scenario.script[2].action,
            ScriptAction::SetDetectionMode {
                mode: DetectionMode::CharacterProximity
            }
        );
    }

    #[test]
    fn parse_errors_name_the_failing_json_path() {
        let raw = r#"{ "player": { "location": { "x": "left", "y": 0.0, "z": 0.0 } } }"#;
        let error = parse_scenario_json(Path::new("bad.json"), raw).expect_err("bad x");
        let message = error.to_string();
        assert!(message.contains("player.location.x"), "{message}");
    }

    #[test]
    fn scenario_loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(MINIMAL.as_bytes()).expect("write");

        let scenario = load_scenario(file.path()).expect("load");
        assert_eq!(scenario.interactables.len(), 1);

        let missing = load_scenario(Path::new("/definitely/not/here.json")).expect_err("missing");
        assert!(matches!(missing, SandboxError::ReadScenario { .. }));
    }
}
