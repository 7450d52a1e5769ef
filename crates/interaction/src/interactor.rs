use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{InteractionType, TraceChannel};
use crate::events::{Interacted, InteractorEvents};
use crate::interactable::Interactable;
use crate::key::{KeyHandle, KeyRegistry};
use crate::math::{project_world_to_screen, CameraView, Vec3, Viewport};
use crate::replication::{NetRole, RemoteCall, RemoteCallQueue};
use crate::scheduler::DeferredQueue;
use crate::world::{
    ActorId, InteractableId, InteractableRegistry, InteractorId, InteractorRef, SpatialWorld,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMode {
    #[default]
    CameraProximity,
    CharacterProximity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractorSettings {
    pub detection_mode: DetectionMode,
    pub detection_channel: TraceChannel,
    pub detection_frequency: f32,
    pub detection_radius: f32,
    pub start_active: bool,
    pub show_debug_traces: bool,
}

impl Default for InteractorSettings {
    fn default() -> Self {
        Self {
            detection_mode: DetectionMode::CameraProximity,
            detection_channel: TraceChannel::Visibility,
            detection_frequency: 0.1,
            detection_radius: 700.0,
            start_active: true,
            show_debug_traces: false,
        }
    }
}

pub struct InteractionContext<'a> {
    pub world: &'a dyn SpatialWorld,
    pub interactables: &'a mut InteractableRegistry,
    pub keys: &'a KeyRegistry,
    pub viewport: Viewport,
    pub camera: CameraView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeferredAction {
    SetDetectionActive(bool),
    ReleaseKey(KeyHandle),
}

#[derive(Debug)]
pub struct Interactor {
    id: InteractorId,
    owner: ActorId,
    role: NetRole,
    settings: InteractorSettings,
    detection_active: bool,
    detection_mode: DetectionMode,
    overlapping: Vec<InteractableId>,
    hovering: Option<InteractableId>,
    active_keys: Vec<KeyHandle>,
    time_since_last_detection_update: f32,
    deferred: DeferredQueue<DeferredAction>,
    remote_calls: RemoteCallQueue,
    pub events: InteractorEvents,
}

impl Interactor {
    pub fn new(id: InteractorId, owner: ActorId, role: NetRole, settings: InteractorSettings) -> Self {
        Self {
            id,
            owner,
            role,
            detection_mode: settings.detection_mode,
            settings,
            detection_active: false,
            overlapping: Vec::new(),
            hovering: None,
            active_keys: Vec::new(),
            time_since_last_detection_update: 0.0,
            deferred: DeferredQueue::default(),
            remote_calls: RemoteCallQueue::default(),
            events: InteractorEvents::default(),
        }
    }

    pub fn id(&self) -> InteractorId {
        self.id
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn settings(&self) -> &InteractorSettings {
        &self.settings
    }

    pub fn detection_mode(&self) -> DetectionMode {
        self.detection_mode
    }

    pub fn is_detection_active(&self) -> bool {
        self.detection_active
    }

    pub fn overlapping(&self) -> &[InteractableId] {
        &self.overlapping
    }

    pub fn hovering(&self) -> Option<InteractableId> {
        self.hovering
    }

    pub fn active_keys(&self) -> &[KeyHandle] {
        &self.active_keys
    }

    pub fn pending_remote_calls(&self) -> usize {
        self.remote_calls.len()
    }

    pub fn drain_remote_calls(&mut self) -> Vec<RemoteCall> {
        self.remote_calls.drain()
    }

    pub fn interactor_ref(&self, world: &dyn SpatialWorld) -> InteractorRef {
        InteractorRef {
            id: self.id,
            owner: self.owner,
            agent: world.is_pawn(self.owner).then_some(self.owner),
        }
    }

    pub fn begin_play(&mut self) {
        self.deferred
            .push(DeferredAction::SetDetectionActive(self.settings.start_active));
    }

    pub fn set_detection_mode(&mut self, mode: DetectionMode) {
        if self.detection_mode == mode {
            return;
        }
        self.detection_mode = mode;
        self.events.detection_mode_changed.emit(&mode);
    }

    pub fn set_detection_active(&mut self, active: bool, ctx: &mut InteractionContext<'_>) {
        let world = ctx.world;
        if !world.is_pawn(self.owner) || !world.is_locally_controlled(self.owner) {
            warn!(
                interactor = self.id.0,
                owner = self.owner.0,
                "detection_toggle_on_uncontrolled_owner"
            );
            self.detection_active = false;
            return;
        }
        if world.controller_view_point(self.owner).is_none() {
            warn!(
                interactor = self.id.0,
                owner = self.owner.0,
                "detection_toggle_without_player_controller"
            );
            self.detection_active = false;
            return;
        }

        self.detection_active = active;
        debug!(interactor = self.id.0, active, "detection_toggled");
        if active {
            return;
        }

        let me = self.interactor_ref(world);
        for id in std::mem::take(&mut self.overlapping) {
            let Some(target) = ctx.interactables.get_mut(id) else {
                continue;
            };
            target.update_overlap(false, &me);
            if self.hovering == Some(id) {
                target.update_hover(false, &me);
                target.set_current_interaction_time(0.0);
            }
        }
        self.hovering = None;
    }

    pub fn tick(&mut self, dt: f32, ctx: &mut InteractionContext<'_>) {
        for action in self.deferred.drain() {
            match action {
                DeferredAction::SetDetectionActive(active) => self.set_detection_active(active, ctx),
                DeferredAction::ReleaseKey(key) => self.interaction_input(Some(key), false, ctx),
            }
        }

        if !self.detection_active {
            return;
        }

        self.time_since_last_detection_update += dt;
        if self.time_since_last_detection_update >= self.settings.detection_frequency {
            self.time_since_last_detection_update = 0.0;
            self.update_overlapping(ctx);
            self.update_hovering(ctx);
        }

        self.update_interaction(dt, ctx);
    }

    fn detection_trace(&self, ctx: &InteractionContext<'_>) -> Vec<InteractableId> {
        let Some(origin) = ctx.world.actor_location(self.owner) else {
            return Vec::new();
        };
        let hits = ctx.world.sphere_query(
            origin,
            self.settings.detection_radius,
            self.settings.detection_channel,
            &[self.owner],
        );
        if self.settings.show_debug_traces {
            debug!(
                interactor = self.id.0,
                radius = self.settings.detection_radius,
                hits = hits.len(),
                "detection_trace"
            );
        }
        hits.into_iter()
            .flat_map(|actor| ctx.interactables.owned_by(actor))
            .collect()
    }

    fn update_overlapping(&mut self, ctx: &mut InteractionContext<'_>) {
        for id in self.detection_trace(ctx) {
            if self.overlapping.contains(&id) {
                continue;
            }
            if ctx.interactables.get(id).is_some_and(Interactable::is_active) {
                self.overlapping.push(id);
            }
        }

        let Some(origin) = ctx.world.actor_location(self.owner) else {
            return;
        };
        let me = self.interactor_ref(ctx.world);
        for id in std::mem::take(&mut self.overlapping) {
            if self.sweep_member(id, origin, &me, ctx) {
                self.overlapping.push(id);
            }
        }
    }

    fn sweep_member(
        &mut self,
        id: InteractableId,
        origin: Vec3,
        me: &InteractorRef,
        ctx: &mut InteractionContext<'_>,
    ) -> bool {
        let world = ctx.world;
        let was_hovered = self.hovering == Some(id);
        let Some(target) = ctx.interactables.get_mut(id) else {
            self.forget_hover(id);
            return false;
        };
        let Some(location) = target.location(world) else {
            self.forget_hover(id);
            return false;
        };

        let was_overlapped = target.is_overlapped();
        let obstructed = target.execute_obstruction_trace(Some(me), world);

        if !target.is_active() {
            if was_overlapped {
                target.update_overlap(false, me);
            }
            if was_hovered {
                target.update_hover(false, me);
                target.set_current_interaction_time(0.0);
                self.hovering = None;
            }
            return false;
        }

        let in_range = origin.distance(location) <= target.config().max_overlap_distance;
        if in_range && !was_overlapped && !obstructed {
            target.update_overlap(true, me);
            return true;
        }
        if (!in_range || obstructed) && was_overlapped {
            target.update_overlap(false, me);
            if was_hovered {
                target.update_hover(false, me);
                target.set_current_interaction_time(0.0);
                self.hovering = None;
            }
            return false;
        }
        true
    }

    fn forget_hover(&mut self, id: InteractableId) {
        if self.hovering == Some(id) {
            self.hovering = None;
        }
    }

    /// Picks the best overlapping candidate for the current detection mode.
    pub fn select_hovering_interactable(&self, ctx: &InteractionContext<'_>) -> Option<InteractableId> {
        if self.overlapping.is_empty() {
            return None;
        }
        let world = ctx.world;
        let origin = world.actor_location(self.owner)?;
        let view_direction = world
            .eyes_view_point(self.owner)
            .map(|view| view.forward)
            .unwrap_or(Vec3::FORWARD);
        let screen_center = ctx.viewport.center();

        // Camera mode scores in pixels; both modes must beat the detection radius.
        let mut best_score = self.settings.detection_radius;
        let mut selected = None;
        for &id in &self.overlapping {
            let Some(target) = ctx.interactables.get(id) else {
                continue;
            };
            let config = target.config();
            if !config.allow_interaction_when_obstructed && target.is_obstructed() {
                continue;
            }
            if !target.is_overlapped() {
                continue;
            }
            let Some(location) = target.location(world) else {
                continue;
            };

            let distance_from_agent = origin.distance(location);
            let in_agent_range = distance_from_agent <= config.max_hover_distance_from_agent;
            let mut score = distance_from_agent;
            let mut in_view_range = true;

            if self.detection_mode == DetectionMode::CameraProximity {
                let in_front = view_direction.dot(location.sub(origin).safe_normal()) > 0.0;
                if !in_front {
                    continue;
                }
                let Some(screen) = project_world_to_screen(&ctx.camera, ctx.viewport, location)
                else {
                    continue;
                };
                score = screen_center.distance(screen);
                in_view_range = score <= config.max_hover_distance_from_view_center;
            }

            if in_agent_range && in_view_range && score < best_score {
                best_score = score;
                selected = Some(id);
            }
        }
        selected
    }

    fn update_hovering(&mut self, ctx: &mut InteractionContext<'_>) {
        let selected = self.select_hovering_interactable(ctx);
        let me = self.interactor_ref(ctx.world);
        if selected == self.hovering {
            // An active toggle between detection cycles clears the flag but keeps the selection.
            if let Some(current) = selected.and_then(|id| ctx.interactables.get_mut(id)) {
                if !current.is_hovered() {
                    current.update_hover(true, &me);
                }
            }
            return;
        }

        if let Some(previous) = self.hovering.and_then(|id| ctx.interactables.get_mut(id)) {
            previous.update_hover(false, &me);
            previous.set_current_interaction_time(0.0);
        }

        self.hovering = selected;
        if let Some(next) = selected.and_then(|id| ctx.interactables.get_mut(id)) {
            next.update_hover(true, &me);
            next.set_current_interaction_time(0.0);
        }
    }

    pub fn interaction_input(
        &mut self,
        key: Option<KeyHandle>,
        pressed: bool,
        ctx: &mut InteractionContext<'_>,
    ) {
        let Some(key) = key.or_else(|| ctx.keys.default_key()) else {
            return;
        };

        if !pressed {
            self.active_keys.retain(|active| *active != key);
            let Some(target) = self.hovering.and_then(|id| ctx.interactables.get_mut(id)) else {
                return;
            };
            if !key_matches(target, &key, ctx.keys) {
                return;
            }
            target.set_current_interaction_time(0.0);
            return;
        }

        if !self.active_keys.contains(&key) {
            self.active_keys.push(key.clone());
        }
        let Some(target_id) = self.hovering else {
            return;
        };
        let Some(target) = ctx.interactables.get_mut(target_id) else {
            return;
        };
        if !key_matches(target, &key, ctx.keys)
            || target.config().interaction_type == InteractionType::Hold
        {
            return;
        }

        let duration = target.config().interaction_duration;
        if target.set_current_interaction_time(duration) < 1.0 {
            debug!(
                interactor = self.id.0,
                interactable = target_id.0,
                "press_rejected_by_cooldown"
            );
            return;
        }

        self.interact(target_id, ctx);
        if key.consume_after_interaction() {
            self.interaction_input(Some(key), false, ctx);
        }
    }

    fn update_interaction(&mut self, dt: f32, ctx: &mut InteractionContext<'_>) {
        if self.active_keys.is_empty() {
            return;
        }
        let Some(target_id) = self.hovering else {
            return;
        };

        for key in self.active_keys.clone() {
            let Some(target) = ctx.interactables.get_mut(target_id) else {
                return;
            };
            if !key_matches(target, &key, ctx.keys) {
                continue;
            }
            let progress = target.set_current_interaction_time(target.interaction_time() + dt);
            if progress >= 1.0 {
                self.interact(target_id, ctx);
                if key.consume_after_interaction() {
                    self.deferred.push(DeferredAction::ReleaseKey(key));
                }
            }
        }
    }

    pub fn interact(&mut self, target: InteractableId, ctx: &mut InteractionContext<'_>) {
        if self.role.is_authority() {
            self.interact_on_authority(target, ctx);
        } else {
            self.remote_calls.enqueue(RemoteCall::Interact {
                interactor: self.id,
                target,
            });
        }
    }

    pub fn serve_remote_call(&mut self, call: RemoteCall, ctx: &mut InteractionContext<'_>) {
        match call {
            RemoteCall::Interact { interactor, target } => {
                if interactor != self.id {
                    warn!(
                        interactor = self.id.0,
                        caller = interactor.0,
                        "remote_call_for_other_interactor"
                    );
                    return;
                }
                if !self.role.is_authority() {
                    warn!(interactor = self.id.0, "remote_call_served_off_authority");
                    return;
                }
                self.interact_on_authority(target, ctx);
            }
        }
    }

    fn interact_on_authority(&mut self, target_id: InteractableId, ctx: &mut InteractionContext<'_>) {
        let world = ctx.world;
        let me = self.interactor_ref(world);
        let Some(target) = ctx.interactables.get_mut(target_id) else {
            debug!(interactor = self.id.0, interactable = target_id.0, "interact_target_missing");
            return;
        };
        let (Some(location), Some(agent_location)) =
            (target.location(world), world.actor_location(self.owner))
        else {
            debug!(interactor = self.id.0, interactable = target_id.0, "interact_target_missing");
            return;
        };

        let blocked = target.execute_obstruction_trace(Some(&me), world)
            && !target.config().allow_interaction_when_obstructed;
        if blocked {
            return;
        }
        if agent_location.distance(location) > target.config().max_hover_distance_from_agent {
            return;
        }
        if !target.is_active() {
            return;
        }

        target.set_current_interaction_time(0.0);
        target.interact(&me);
        self.events.interacted.emit(&Interacted {
            interactor: self.id,
            interactable: target_id,
        });
    }
}

fn key_matches(target: &Interactable, key: &KeyHandle, keys: &KeyRegistry) -> bool {
    keys.resolve(&target.config().interaction_key).as_ref() == Some(key)
}
