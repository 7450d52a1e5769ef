use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{InteractableConfig, TraceChannel};
use crate::interactable::Interactable;
use crate::math::{Vec3, ViewPoint};
use crate::replication::NetRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InteractableId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InteractorId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractorRef {
    pub id: InteractorId,
    pub owner: ActorId,
    pub agent: Option<ActorId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RayHit {
    pub blocked: bool,
    pub actor: Option<ActorId>,
}

/// Spatial queries and actor lookups the interaction core needs from the host
/// world. Queries are synchronous and deterministic for a given world state.
pub trait SpatialWorld {
    fn actor_location(&self, actor: ActorId) -> Option<Vec3>;
    fn is_pawn(&self, actor: ActorId) -> bool;
    fn is_locally_controlled(&self, actor: ActorId) -> bool;
    fn eyes_view_point(&self, actor: ActorId) -> Option<ViewPoint>;
    /// Eye transform of the player controller possessing the actor; `None`
    /// when the actor has no valid player controller.
    fn controller_view_point(&self, actor: ActorId) -> Option<ViewPoint>;
    fn sphere_query(
        &self,
        origin: Vec3,
        radius: f32,
        channel: TraceChannel,
        excluded: &[ActorId],
    ) -> Vec<ActorId>;
    fn ray_query(&self, from: Vec3, to: Vec3, channel: TraceChannel, excluded: &[ActorId])
        -> RayHit;
}

#[derive(Debug, Default)]
pub struct InteractableRegistry {
    next_id: u64,
    interactables: BTreeMap<InteractableId, Interactable>,
}

impl InteractableRegistry {
    pub fn register(
        &mut self,
        owner: ActorId,
        role: NetRole,
        config: InteractableConfig,
    ) -> InteractableId {
        let id = InteractableId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.interactables
            .insert(id, Interactable::new(id, owner, role, config));
        id
    }

    pub fn get(&self, id: InteractableId) -> Option<&Interactable> {
        self.interactables.get(&id)
    }

    pub fn get_mut(&mut self, id: InteractableId) -> Option<&mut Interactable> {
        self.interactables.get_mut(&id)
    }

    pub fn contains(&self, id: InteractableId) -> bool {
        self.interactables.contains_key(&id)
    }

    pub fn remove(&mut self, id: InteractableId) -> Option<Interactable> {
        self.interactables.remove(&id)
    }

    pub fn remove_owned_by(&mut self, actor: ActorId) -> usize {
        let before = self.interactables.len();
        self.interactables
            .retain(|_, interactable| interactable.owner() != actor);
        before - self.interactables.len()
    }

    pub fn owned_by(&self, actor: ActorId) -> Vec<InteractableId> {
        self.interactables
            .values()
            .filter(|interactable| interactable.owner() == actor)
            .map(Interactable::id)
            .collect()
    }

    pub fn location_of(&self, id: InteractableId, world: &dyn SpatialWorld) -> Option<Vec3> {
        self.get(id)?.location(world)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interactable> {
        self.interactables.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Interactable> {
        self.interactables.values_mut()
    }

    pub fn len(&self) -> usize {
        self.interactables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_allocates_increasing_ids() {
        let mut registry = InteractableRegistry::default();
        let first = registry.register(ActorId(1), NetRole::Authority, InteractableConfig::default());
        let second = registry.register(ActorId(2), NetRole::Authority, InteractableConfig::default());
        assert_eq!(first, InteractableId(0));
        assert_eq!(second, InteractableId(1));
        assert_eq!(registry.get(second).map(Interactable::owner), Some(ActorId(2)));
    }

    #[test]
    fn removing_owner_drops_all_its_interactables() {
        let mut registry = InteractableRegistry::default();
        let a = registry.register(ActorId(1), NetRole::Authority, InteractableConfig::default());
        let b = registry.register(ActorId(1), NetRole::Authority, InteractableConfig::default());
        let c = registry.register(ActorId(2), NetRole::Authority, InteractableConfig::default());

        assert_eq!(registry.owned_by(ActorId(1)), vec![a, b]);
        assert_eq!(registry.remove_owned_by(ActorId(1)), 2);
        assert!(!registry.contains(a));
        assert!(!registry.contains(b));
        assert!(registry.contains(c));
    }
}
