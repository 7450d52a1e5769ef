use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use interaction::{
    ActorDesc, ActorId, CameraView, ConfigTable, InteractableConfig, InteractableId,
    InteractableRegistry, InteractionContext, Interactor, InteractorId, KeyHandle, KeyRegistry,
    NetRole, PawnDesc, SimWorld, SpatialWorld, Viewport,
};
use tracing::{debug, info, warn};

use super::scenario::{SandboxError, Scenario, ScriptAction, ScriptStep};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionStats {
    pub(crate) interactions: u32,
    pub(crate) hover_changes: u32,
    pub(crate) notices: u32,
    pub(crate) defaulted_rows: u32,
}

/// A scripted run of one player interactor against a simulated world.
pub(crate) struct Session {
    world: SimWorld,
    interactables: InteractableRegistry,
    keys: KeyRegistry,
    viewport: Viewport,
    player: ActorId,
    interactor: Interactor,
    names: BTreeMap<String, InteractableId>,
    script: Vec<ScriptStep>,
    next_step: usize,
    stats: Rc<RefCell<SessionStats>>,
}

impl Session {
    pub(crate) fn build(scenario: &Scenario, table: &ConfigTable) -> Result<Self, SandboxError> {
        let stats = Rc::new(RefCell::new(SessionStats::default()));

        let mut keys = KeyRegistry::with_default();
        for key in &scenario.keys {
            keys.register(&key.path, key.consume_after_interaction, &key.input_action)?;
        }

        let mut world = SimWorld::default();
        let player = world.spawn(ActorDesc::pawn(
            scenario.player.location,
            PawnDesc {
                facing: scenario.player.facing.safe_normal(),
                ..PawnDesc::default()
            },
        ));
        for obstacle in &scenario.obstacles {
            world.spawn(ActorDesc::prop(obstacle.location, obstacle.radius));
        }

        let mut interactables = InteractableRegistry::default();
        let mut names = BTreeMap::new();
        for spec in &scenario.interactables {
            if names.contains_key(&spec.name) {
                return Err(SandboxError::DuplicateInteractable {
                    name: spec.name.clone(),
                });
            }
            let actor = world.spawn(ActorDesc::prop(spec.location, spec.radius));
            let id = interactables.register(actor, NetRole::Authority, InteractableConfig::default());
            let Some(interactable) = interactables.get_mut(id) else {
                continue;
            };
            wire_interactable_logs(interactable, &spec.name, &stats);
            interactable.set_start_active(spec.start_active);
            if let Err(err) = interactable.set_config_from_table(Some(table), &spec.row) {
                // The interactable keeps its default config.
                warn!(
                    interactable = %spec.name,
                    row = %spec.row,
                    error = %err,
                    "interactable_row_defaulted"
                );
                stats.borrow_mut().defaulted_rows += 1;
            }
            interactable.begin_play();
            names.insert(spec.name.clone(), id);
        }
        world.apply_pending();

        let mut interactor = Interactor::new(
            InteractorId(0),
            player,
            NetRole::Authority,
            scenario.interactor.clone(),
        );
        wire_interactor_logs(&mut interactor, &stats);
        interactor.begin_play();

        let mut script = scenario.script.clone();
        script.sort_by_key(|step| step.tick);
        validate_script(&script, &names, &keys)?;

        info!(
            interactables = names.len(),
            keys = keys.len(),
            script_steps = script.len(),
            "session_built"
        );

        Ok(Self {
            world,
            interactables,
            keys,
            viewport: scenario.viewport.into(),
            player,
            interactor,
            names,
            script,
            next_step: 0,
            stats,
        })
    }

    pub(crate) fn stats(&self) -> SessionStats {
        *self.stats.borrow()
    }

    #[cfg(test)]
    pub(crate) fn interactor(&self) -> &Interactor {
        &self.interactor
    }

    pub(crate) fn interactable_id(&self, name: &str) -> Option<InteractableId> {
        self.names.get(name).copied()
    }

    pub(crate) fn tick(&mut self, tick_index: u64, dt: f32) -> Result<(), SandboxError> {
        while let Some(step) = self.script.get(self.next_step) {
            if step.tick > tick_index {
                break;
            }
            let action = step.action.clone();
            self.next_step += 1;
            self.apply(action)?;
        }

        for removed in self.world.apply_pending() {
            let dropped = self.interactables.remove_owned_by(removed);
            if dropped > 0 {
                debug!(actor = removed.0, dropped, "interactables_destroyed");
            }
        }

        for interactable in self.interactables.iter_mut() {
            interactable.tick(dt);
        }
        self.with_context(|interactor, ctx| interactor.tick(dt, ctx));
        Ok(())
    }

    fn apply(&mut self, action: ScriptAction) -> Result<(), SandboxError> {
        debug!(?action, "script_step");
        match action {
            ScriptAction::Press { key } => {
                let key = self.resolve_key(key.as_deref())?;
                self.with_context(|interactor, ctx| interactor.interaction_input(key, true, ctx));
            }
            ScriptAction::Release { key } => {
                let key = self.resolve_key(key.as_deref())?;
                self.with_context(|interactor, ctx| interactor.interaction_input(key, false, ctx));
            }
            ScriptAction::MovePlayer { location } => {
                self.world.set_location(self.player, location);
            }
            ScriptAction::FacePlayer { facing } => {
                self.world.set_facing(self.player, facing);
            }
            ScriptAction::SetActive { target, active } => {
                let id = self.resolve_target(&target)?;
                match self.interactables.get_mut(id) {
                    Some(interactable) => interactable.set_active(active),
                    None => warn!(target = %target, "script_target_already_destroyed"),
                }
            }
            ScriptAction::SetDetectionMode { mode } => self.interactor.set_detection_mode(mode),
            ScriptAction::Despawn { target } => {
                let id = self.resolve_target(&target)?;
                match self.interactables.get(id) {
                    Some(interactable) => {
                        self.world.despawn(interactable.owner());
                    }
                    None => warn!(target = %target, "script_target_already_destroyed"),
                }
            }
        }
        Ok(())
    }

    fn resolve_key(&self, path: Option<&str>) -> Result<Option<KeyHandle>, SandboxError> {
        path.map(|path| {
            self.keys.by_path(path).ok_or_else(|| SandboxError::UnknownKey {
                path: path.to_string(),
            })
        })
        .transpose()
    }

    fn resolve_target(&self, name: &str) -> Result<InteractableId, SandboxError> {
        self.interactable_id(name)
            .ok_or_else(|| SandboxError::UnknownInteractable {
                name: name.to_string(),
            })
    }

    fn with_context<R>(
        &mut self,
        f: impl FnOnce(&mut Interactor, &mut InteractionContext<'_>) -> R,
    ) -> R {
        let camera = self
            .world
            .controller_view_point(self.player)
            .map(CameraView::from_view_point)
            .unwrap_or_default();
        let mut ctx = InteractionContext {
            world: &self.world,
            interactables: &mut self.interactables,
            keys: &self.keys,
            viewport: self.viewport,
            camera,
        };
        f(&mut self.interactor, &mut ctx)
    }
}

fn validate_script(
    script: &[ScriptStep],
    names: &BTreeMap<String, InteractableId>,
    keys: &KeyRegistry,
) -> Result<(), SandboxError> {
    for step in script {
        match &step.action {
            ScriptAction::Press { key: Some(path) } | ScriptAction::Release { key: Some(path) } => {
                if keys.by_path(path).is_none() {
                    return Err(SandboxError::UnknownKey { path: path.clone() });
                }
            }
            ScriptAction::SetActive { target, .. } | ScriptAction::Despawn { target } => {
                if !names.contains_key(target) {
                    return Err(SandboxError::UnknownInteractable {
                        name: target.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn wire_interactable_logs(
    interactable: &mut interaction::Interactable,
    name: &str,
    stats: &Rc<RefCell<SessionStats>>,
) {
    let events = &mut interactable.events;

    let label = name.to_string();
    events.overlap_changed.subscribe(move |event| {
        info!(
            interactable = %label,
            overlapping = event.is_overlapping,
            "overlap_changed"
        );
    });

    let label = name.to_string();
    let counter = Rc::clone(stats);
    events.hover_changed.subscribe(move |event| {
        counter.borrow_mut().hover_changes += 1;
        info!(interactable = %label, hovering = event.is_hovering, "hover_changed");
    });

    let label = name.to_string();
    events.progress_changed.subscribe(move |event| {
        debug!(interactable = %label, percent = event.percent, "progress_changed");
    });

    let label = name.to_string();
    events.interacted.subscribe(move |event| {
        info!(
            interactable = %label,
            interactor = event.interactor.0,
            "interacted"
        );
    });

    let label = name.to_string();
    events.data_refresh.subscribe(move |event| {
        debug!(
            interactable = %label,
            display_text = %event.config.display_text,
            active = event.active,
            "data_refreshed"
        );
    });

    let label = name.to_string();
    events.visibility.subscribe(move |visible| {
        debug!(interactable = %label, visible = *visible, "visibility_changed");
    });

    let label = name.to_string();
    let counter = Rc::clone(stats);
    events.notice.subscribe(move |notice| {
        counter.borrow_mut().notices += 1;
        warn!(interactable = %label, notice = %notice, "interactable_notice");
    });
}

fn wire_interactor_logs(interactor: &mut Interactor, stats: &Rc<RefCell<SessionStats>>) {
    let counter = Rc::clone(stats);
    interactor.events.interacted.subscribe(move |event| {
        counter.borrow_mut().interactions += 1;
        info!(interactable = event.interactable.0, "interaction_completed");
    });
    interactor
        .events
        .detection_mode_changed
        .subscribe(|mode| info!(?mode, "detection_mode_changed"));
}
