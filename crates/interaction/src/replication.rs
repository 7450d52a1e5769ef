use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::InteractableConfig;
use crate::world::{ActorId, InteractableId, InteractorId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetRole {
    #[default]
    Authority,
    Observer,
}

impl NetRole {
    pub fn is_authority(self) -> bool {
        matches!(self, Self::Authority)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicatedField {
    Active,
    Config,
    ObstructionIgnoreList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedInteractable {
    pub active: bool,
    pub config: InteractableConfig,
    pub obstruction_ignore_list: Vec<ActorId>,
}

impl ReplicatedInteractable {
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_wire(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    Interact {
        interactor: InteractorId,
        target: InteractableId,
    },
}

/// Reliable, ordered observer to authority call channel. Calls are never
/// dropped and are drained in the order they were enqueued.
#[derive(Debug, Default)]
pub struct RemoteCallQueue {
    calls: VecDeque<RemoteCall>,
}

impl RemoteCallQueue {
    pub fn enqueue(&mut self, call: RemoteCall) {
        self.calls.push_back(call);
    }

    pub fn drain(&mut self) -> Vec<RemoteCall> {
        self.calls.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_calls_drain_in_fifo_order() {
        let mut queue = RemoteCallQueue::default();
        for target in 0..3 {
            queue.enqueue(RemoteCall::Interact {
                interactor: InteractorId(1),
                target: InteractableId(target),
            });
        }

        let drained = queue.drain();
        let targets = drained
            .iter()
            .map(|RemoteCall::Interact { target, .. }| target.0)
            .collect::<Vec<_>>();
        assert_eq!(targets, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn wire_payload_round_trips_replicated_fields() {
        let state = ReplicatedInteractable {
            active: false,
            config: InteractableConfig {
                display_text: "Lever".to_string(),
                ..InteractableConfig::default()
            },
            obstruction_ignore_list: vec![ActorId(4)],
        };
        let wire = state.to_wire().expect("encode");
        assert_eq!(ReplicatedInteractable::from_wire(&wire).expect("decode"), state);
    }

    #[test]
    fn only_authority_role_is_authority() {
        assert!(NetRole::Authority.is_authority());
        assert!(!NetRole::Observer.is_authority());
    }
}
