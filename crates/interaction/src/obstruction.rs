use crate::config::TraceChannel;
use crate::error::InteractionError;
use crate::math::Vec3;
use crate::world::{ActorId, InteractorRef, SpatialWorld};

pub fn trace_from_controller(
    world: &dyn SpatialWorld,
    interactor: &InteractorRef,
    target: Vec3,
    channel: TraceChannel,
    ignored: &[ActorId],
) -> Result<bool, InteractionError> {
    let eyes = world
        .controller_view_point(interactor.owner)
        .ok_or(InteractionError::InvalidReference {
            what: "player controller",
        })?;

    let mut excluded = Vec::with_capacity(ignored.len() + 1);
    excluded.push(interactor.owner);
    excluded.extend(ignored.iter().copied().filter(|actor| *actor != interactor.owner));

    Ok(world.ray_query(eyes.location, target, channel, &excluded).blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ActorDesc, PawnDesc, SimWorld};
    use crate::world::InteractorId;

    fn interactor_for(owner: ActorId) -> InteractorRef {
        InteractorRef {
            id: InteractorId(0),
            owner,
            agent: Some(owner),
        }
    }

    #[test]
    fn wall_between_eyes_and_target_blocks() {
        let mut world = SimWorld::default();
        let player = world.spawn(ActorDesc::pawn(Vec3::ZERO, PawnDesc::default()));
        world.spawn(ActorDesc::prop(Vec3::new(100.0, 0.0, 64.0), 20.0));
        world.apply_pending();

        let blocked = trace_from_controller(
            &world,
            &interactor_for(player),
            Vec3::new(200.0, 0.0, 64.0),
            TraceChannel::Visibility,
            &[],
        )
        .expect("trace");
        assert!(blocked);
    }

    #[test]
    fn ignored_actors_do_not_block() {
        let mut world = SimWorld::default();
        let player = world.spawn(ActorDesc::pawn(Vec3::ZERO, PawnDesc::default()));
        let wall = world.spawn(ActorDesc::prop(Vec3::new(100.0, 0.0, 64.0), 20.0));
        world.apply_pending();

        let blocked = trace_from_controller(
            &world,
            &interactor_for(player),
            Vec3::new(200.0, 0.0, 64.0),
            TraceChannel::Visibility,
            &[wall],
        )
        .expect("trace");
        assert!(!blocked);
    }

    #[test]
    fn missing_controller_is_an_invalid_reference() {
        let mut world = SimWorld::default();
        let npc = world.spawn(ActorDesc::pawn(
            Vec3::ZERO,
            PawnDesc {
                has_player_controller: false,
                ..PawnDesc::default()
            },
        ));
        world.apply_pending();

        let error = trace_from_controller(
            &world,
            &interactor_for(npc),
            Vec3::new(200.0, 0.0, 0.0),
            TraceChannel::Visibility,
            &[],
        )
        .expect_err("no controller");
        assert!(matches!(error, InteractionError::InvalidReference { .. }));
    }
}
