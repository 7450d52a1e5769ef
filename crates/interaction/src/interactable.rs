use tracing::{debug, trace, warn};

use crate::config::InteractableConfig;
use crate::error::InteractionError;
use crate::events::{
    DataRefreshed, HoverChanged, InteractableEvents, Interacted, OverlapChanged, ProgressChanged,
    StateSynced,
};
use crate::math::Vec3;
use crate::obstruction;
use crate::replication::{NetRole, ReplicatedField, ReplicatedInteractable};
use crate::table::ConfigTable;
use crate::world::{ActorId, InteractableId, InteractorRef, SpatialWorld};

pub const INITIAL_TIME_SINCE_INTERACTION: f32 = 2.0;

#[derive(Debug)]
pub struct Interactable {
    id: InteractableId,
    owner: ActorId,
    role: NetRole,
    offset: Vec3,
    config: InteractableConfig,
    start_active: bool,
    ignore_self_on_obstruction_trace: bool,
    obstruction_ignore_list: Vec<ActorId>,
    active: bool,
    overlapped: bool,
    hovered: bool,
    obstructed: bool,
    interaction_time: f32,
    time_since_last_interaction: f32,
    pub events: InteractableEvents,
}

impl Interactable {
    pub fn new(id: InteractableId, owner: ActorId, role: NetRole, config: InteractableConfig) -> Self {
        Self {
            id,
            owner,
            role,
            offset: Vec3::ZERO,
            config,
            start_active: true,
            ignore_self_on_obstruction_trace: true,
            obstruction_ignore_list: Vec::new(),
            active: true,
            overlapped: false,
            hovered: false,
            obstructed: false,
            interaction_time: 0.0,
            time_since_last_interaction: INITIAL_TIME_SINCE_INTERACTION,
            events: InteractableEvents::default(),
        }
    }

    pub fn id(&self) -> InteractableId {
        self.id
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn config(&self) -> &InteractableConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_overlapped(&self) -> bool {
        self.overlapped
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_obstructed(&self) -> bool {
        self.obstructed
    }

    pub fn interaction_time(&self) -> f32 {
        self.interaction_time
    }

    pub fn time_since_last_interaction(&self) -> f32 {
        self.time_since_last_interaction
    }

    pub fn obstruction_ignore_list(&self) -> &[ActorId] {
        &self.obstruction_ignore_list
    }

    pub fn set_start_active(&mut self, start_active: bool) {
        self.start_active = start_active;
    }

    pub fn set_ignore_self_on_obstruction_trace(&mut self, ignore: bool) {
        self.ignore_self_on_obstruction_trace = ignore;
    }

    pub fn set_offset(&mut self, offset: Vec3) {
        self.offset = offset;
    }

    pub fn location(&self, world: &dyn SpatialWorld) -> Option<Vec3> {
        world
            .actor_location(self.owner)
            .map(|location| location.add(self.offset))
    }

    pub fn begin_play(&mut self) {
        self.set_active(self.start_active);
    }

    pub fn tick(&mut self, dt: f32) {
        self.time_since_last_interaction += dt;
    }

    pub fn ensure_authority(&self) -> Result<(), InteractionError> {
        if self.role.is_authority() {
            Ok(())
        } else {
            Err(InteractionError::NotAuthority)
        }
    }

    pub fn ensure_cooldown_elapsed(&self) -> Result<(), InteractionError> {
        if self.time_since_last_interaction <= self.config.delay_between_interactions {
            Err(InteractionError::CooldownActive)
        } else {
            Ok(())
        }
    }

    pub fn set_active(&mut self, active: bool) {
        if self.ensure_authority().is_err() {
            return;
        }
        self.active = active;
        self.on_active_changed();
        self.sync(ReplicatedField::Active);
    }

    pub fn set_interaction_duration(&mut self, duration: f32) {
        self.update_config(|config| {
            if config.interaction_duration == duration {
                return false;
            }
            config.interaction_duration = duration;
            true
        });
    }

    pub fn set_display_text(&mut self, text: &str) {
        self.update_config(|config| {
            if config.display_text == text {
                return false;
            }
            config.display_text = text.to_string();
            true
        });
    }

    pub fn set_tooltip_text(&mut self, text: &str) {
        self.update_config(|config| {
            if config.tooltip_text == text {
                return false;
            }
            config.tooltip_text = text.to_string();
            true
        });
    }

    pub fn set_config(&mut self, next: InteractableConfig) {
        self.update_config(|config| {
            if *config == next {
                return false;
            }
            *config = next;
            true
        });
    }

    pub fn set_config_from_table(
        &mut self,
        table: Option<&ConfigTable>,
        row: &str,
    ) -> Result<(), InteractionError> {
        self.ensure_authority()?;

        let Some(config) = table.and_then(|table| table.find_row(row)) else {
            let error = InteractionError::ConfigLookupFailure {
                row: row.to_string(),
            };
            let notice = format!(
                "Interactable {} could not load its data: {error}",
                self.id.0
            );
            warn!(
                interactable = self.id.0,
                row,
                table_loaded = table.is_some(),
                "config_row_lookup_failed"
            );
            self.events.notice.emit(&notice);
            return Err(error);
        };

        self.set_config(config.clone());
        Ok(())
    }

    pub fn set_obstruction_ignore_list(&mut self, actors: Vec<ActorId>) {
        if self.ensure_authority().is_err() || self.obstruction_ignore_list == actors {
            return;
        }
        self.obstruction_ignore_list = actors;
        self.sync(ReplicatedField::ObstructionIgnoreList);
    }

    pub fn replicated_state(&self) -> ReplicatedInteractable {
        ReplicatedInteractable {
            active: self.active,
            config: self.config.clone(),
            obstruction_ignore_list: self.obstruction_ignore_list.clone(),
        }
    }

    pub fn apply_replicated(&mut self, state: &ReplicatedInteractable) {
        if self.role.is_authority() {
            debug!(interactable = self.id.0, "replicated_state_ignored_on_authority");
            return;
        }
        if self.config != state.config {
            self.config = state.config.clone();
            self.refresh_data();
        }
        if self.active != state.active {
            self.active = state.active;
            self.on_active_changed();
        }
        if self.obstruction_ignore_list != state.obstruction_ignore_list {
            self.obstruction_ignore_list = state.obstruction_ignore_list.clone();
        }
    }

    pub fn refresh_data(&mut self) {
        let event = DataRefreshed {
            interactable: self.id,
            config: self.config.clone(),
            active: self.active,
        };
        self.events.data_refresh.emit(&event);
    }

    pub fn update_overlap(&mut self, is_overlapping: bool, interactor: &InteractorRef) {
        if interactor.agent.is_none() {
            return;
        }
        self.overlapped = is_overlapping;
        if is_overlapping {
            self.refresh_data();
        }
        self.events.overlap_changed.emit(&OverlapChanged {
            is_overlapping,
            interactor: interactor.id,
            interactable: self.id,
        });
    }

    pub fn update_hover(&mut self, is_hovering: bool, interactor: &InteractorRef) {
        if interactor.agent.is_none() {
            return;
        }
        self.hovered = is_hovering;
        if is_hovering {
            self.refresh_data();
        }
        self.events.hover_changed.emit(&HoverChanged {
            is_hovering,
            interactor: interactor.id,
            interactable: self.id,
        });
    }

    /// Sets the in-progress interaction time and returns the progress in
    /// `[0, 1]`. Returns exactly 0 without touching state while the cooldown
    /// is running; a return of 1 means the interaction completed.
    pub fn set_current_interaction_time(&mut self, time: f32) -> f32 {
        if let Err(error) = self.ensure_cooldown_elapsed() {
            trace!(interactable = self.id.0, %error, "interaction_time_rejected");
            return 0.0;
        }

        self.interaction_time = time;
        let percent = self.config.progress_for(time);
        if percent >= 1.0 {
            self.time_since_last_interaction = 0.0;
            self.interaction_time = 0.0;
            self.emit_progress(0.0);
            return percent;
        }

        self.emit_progress(percent);
        percent
    }

    pub fn interact(&mut self, interactor: &InteractorRef) {
        self.events.interacted.emit(&Interacted {
            interactor: interactor.id,
            interactable: self.id,
        });
    }

    /// Recomputes and returns the obstruction flag. An unresolvable interactor
    /// or controller counts as obstructed.
    pub fn execute_obstruction_trace(
        &mut self,
        interactor: Option<&InteractorRef>,
        world: &dyn SpatialWorld,
    ) -> bool {
        if self.config.ignores_obstruction() {
            self.obstructed = false;
            return false;
        }

        let Some(interactor) = interactor else {
            warn!(interactable = self.id.0, "obstruction_trace_invalid_interactor");
            return true;
        };
        let Some(target) = self.location(world) else {
            warn!(interactable = self.id.0, "obstruction_trace_invalid_owner");
            return true;
        };

        let mut ignored = self.obstruction_ignore_list.clone();
        if self.ignore_self_on_obstruction_trace {
            ignored.push(self.owner);
        }

        match obstruction::trace_from_controller(
            world,
            interactor,
            target,
            self.config.obstruction_channel,
            &ignored,
        ) {
            Ok(blocked) => {
                self.obstructed = blocked;
                blocked
            }
            Err(error) => {
                warn!(
                    interactable = self.id.0,
                    interactor = interactor.id.0,
                    %error,
                    "obstruction_trace_invalid_controller"
                );
                true
            }
        }
    }

    fn update_config(&mut self, apply: impl FnOnce(&mut InteractableConfig) -> bool) {
        if self.ensure_authority().is_err() {
            return;
        }
        if apply(&mut self.config) {
            self.refresh_data();
            self.sync(ReplicatedField::Config);
        }
    }

    fn on_active_changed(&mut self) {
        if !self.active {
            self.overlapped = false;
            self.hovered = false;
        }
        self.events.visibility.emit(&self.active);
    }

    fn emit_progress(&mut self, percent: f32) {
        self.events.progress_changed.emit(&ProgressChanged {
            percent,
            interactable: self.id,
        });
    }

    fn sync(&mut self, field: ReplicatedField) {
        if self.events.state_sync.listener_count() == 0 {
            return;
        }
        let event = StateSynced {
            interactable: self.id,
            field,
            state: self.replicated_state(),
        };
        self.events.state_sync.emit(&event);
    }
}
