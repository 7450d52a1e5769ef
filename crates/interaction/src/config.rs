use serde::{Deserialize, Serialize};

use crate::key::KeyRef;

pub const PLACEHOLDER_TEXT: &str = "Placeholder Text";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceChannel {
    #[default]
    Visibility,
    Camera,
    Custom(u8),
}

impl TraceChannel {
    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "visibility" => Some(Self::Visibility),
            "camera" => Some(Self::Camera),
            other => other
                .strip_prefix("custom")
                .and_then(|index| index.parse::<u8>().ok())
                .map(Self::Custom),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionType {
    Press,
    #[default]
    Hold,
}

impl InteractionType {
    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "press" => Some(Self::Press),
            "hold" => Some(Self::Hold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractableConfig {
    pub display_text: String,
    pub tooltip_text: String,
    pub max_hover_distance_from_agent: f32,
    pub max_hover_distance_from_view_center: f32,
    pub max_overlap_distance: f32,
    pub detect_when_obstructed: bool,
    pub allow_interaction_when_obstructed: bool,
    pub obstruction_channel: TraceChannel,
    pub interaction_key: KeyRef,
    pub interaction_type: InteractionType,
    pub interaction_duration: f32,
    pub delay_between_interactions: f32,
}

impl Default for InteractableConfig {
    fn default() -> Self {
        Self {
            display_text: PLACEHOLDER_TEXT.to_string(),
            tooltip_text: PLACEHOLDER_TEXT.to_string(),
            max_hover_distance_from_agent: 350.0,
            max_hover_distance_from_view_center: 50.0,
            max_overlap_distance: 700.0,
            detect_when_obstructed: false,
            allow_interaction_when_obstructed: false,
            obstruction_channel: TraceChannel::Visibility,
            interaction_key: KeyRef::default_key(),
            interaction_type: InteractionType::Hold,
            interaction_duration: 1.0,
            delay_between_interactions: 0.5,
        }
    }
}

impl InteractableConfig {
    pub fn ignores_obstruction(&self) -> bool {
        self.detect_when_obstructed && self.allow_interaction_when_obstructed
    }

    pub fn progress_for(&self, time: f32) -> f32 {
        if self.interaction_duration <= 0.0 {
            return 1.0;
        }
        (time / self.interaction_duration).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_authoring_defaults() {
        let config = InteractableConfig::default();
        assert_eq!(config.display_text, PLACEHOLDER_TEXT);
        assert_eq!(config.max_hover_distance_from_agent, 350.0);
        assert_eq!(config.max_hover_distance_from_view_center, 50.0);
        assert_eq!(config.max_overlap_distance, 700.0);
        assert_eq!(config.interaction_type, InteractionType::Hold);
        assert_eq!(config.interaction_key, KeyRef::default_key());
        assert!(!config.ignores_obstruction());
    }

    #[test]
    fn progress_is_clamped() {
        let config = InteractableConfig {
            interaction_duration: 2.0,
            ..InteractableConfig::default()
        };
        assert_eq!(config.progress_for(-1.0), 0.0);
        assert_eq!(config.progress_for(1.0), 0.5);
        assert_eq!(config.progress_for(5.0), 1.0);
    }

    #[test]
    fn channel_tokens_parse() {
        assert_eq!(TraceChannel::parse_token("visibility"), Some(TraceChannel::Visibility));
        assert_eq!(TraceChannel::parse_token("camera"), Some(TraceChannel::Camera));
        assert_eq!(TraceChannel::parse_token("custom3"), Some(TraceChannel::Custom(3)));
        assert_eq!(TraceChannel::parse_token("custom"), None);
        assert_eq!(TraceChannel::parse_token("Visibility"), None);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: InteractableConfig =
            serde_json::from_str(r#"{"display_text":"Open","interaction_type":"Press"}"#)
                .expect("config");
        assert_eq!(config.display_text, "Open");
        assert_eq!(config.interaction_type, InteractionType::Press);
        assert_eq!(config.interaction_duration, 1.0);
    }
}
