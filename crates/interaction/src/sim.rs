use crate::config::TraceChannel;
use crate::math::{Vec3, ViewPoint};
use crate::world::{ActorId, RayHit, SpatialWorld};

pub const DEFAULT_EYE_HEIGHT: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PawnDesc {
    pub locally_controlled: bool,
    pub has_player_controller: bool,
    pub eye_height: f32,
    pub facing: Vec3,
}

impl Default for PawnDesc {
    fn default() -> Self {
        Self {
            locally_controlled: true,
            has_player_controller: true,
            eye_height: DEFAULT_EYE_HEIGHT,
            facing: Vec3::FORWARD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActorDesc {
    pub location: Vec3,
    pub radius: f32,
    pub channels: Vec<TraceChannel>,
    pub pawn: Option<PawnDesc>,
}

impl ActorDesc {
    pub fn prop(location: Vec3, radius: f32) -> Self {
        Self {
            location,
            radius,
            channels: vec![TraceChannel::Visibility],
            pawn: None,
        }
    }

    pub fn pawn(location: Vec3, pawn: PawnDesc) -> Self {
        Self {
            location,
            radius: 34.0,
            channels: vec![TraceChannel::Visibility],
            pawn: Some(pawn),
        }
    }

    pub fn responds_to(&self, channel: TraceChannel) -> bool {
        self.channels.contains(&channel)
    }
}

#[derive(Debug, Clone)]
pub struct SimActor {
    pub id: ActorId,
    pub desc: ActorDesc,
}

#[derive(Debug, Default)]
struct ActorIdAllocator {
    next: u64,
}

impl ActorIdAllocator {
    fn allocate(&mut self) -> ActorId {
        let id = ActorId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// In-memory world of sphere actors. Spawns and despawns are staged and only
/// become visible to queries after `apply_pending`.
#[derive(Debug, Default)]
pub struct SimWorld {
    allocator: ActorIdAllocator,
    actors: Vec<SimActor>,
    pending_spawns: Vec<SimActor>,
    pending_despawns: Vec<ActorId>,
}

impl SimWorld {
    pub fn spawn(&mut self, desc: ActorDesc) -> ActorId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(SimActor { id, desc });
        id
    }

    pub fn despawn(&mut self, id: ActorId) -> bool {
        let exists_now = self.actors.iter().any(|actor| actor.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|actor| actor.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) -> Vec<ActorId> {
        self.actors.append(&mut self.pending_spawns);

        if self.pending_despawns.is_empty() {
            return Vec::new();
        }
        self.pending_despawns.sort();
        self.pending_despawns.dedup();
        let pending = std::mem::take(&mut self.pending_despawns);
        self.actors
            .retain(|actor| pending.binary_search(&actor.id).is_err());
        pending
    }

    pub fn find_actor(&self, id: ActorId) -> Option<&SimActor> {
        self.actors.iter().find(|actor| actor.id == id)
    }

    pub fn find_actor_mut(&mut self, id: ActorId) -> Option<&mut SimActor> {
        self.actors.iter_mut().find(|actor| actor.id == id)
    }

    pub fn set_location(&mut self, id: ActorId, location: Vec3) -> bool {
        match self.find_actor_mut(id) {
            Some(actor) => {
                actor.desc.location = location;
                true
            }
            None => false,
        }
    }

    pub fn set_facing(&mut self, id: ActorId, facing: Vec3) -> bool {
        match self.find_actor_mut(id).and_then(|actor| actor.desc.pawn.as_mut()) {
            Some(pawn) => {
                pawn.facing = facing.safe_normal();
                true
            }
            None => false,
        }
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn actors(&self) -> &[SimActor] {
        &self.actors
    }

    fn pawn(&self, id: ActorId) -> Option<(&SimActor, &PawnDesc)> {
        let actor = self.find_actor(id)?;
        let pawn = actor.desc.pawn.as_ref()?;
        Some((actor, pawn))
    }
}

impl SpatialWorld for SimWorld {
    fn actor_location(&self, actor: ActorId) -> Option<Vec3> {
        self.find_actor(actor).map(|actor| actor.desc.location)
    }

    fn is_pawn(&self, actor: ActorId) -> bool {
        self.pawn(actor).is_some()
    }

    fn is_locally_controlled(&self, actor: ActorId) -> bool {
        self.pawn(actor)
            .map(|(_, pawn)| pawn.locally_controlled)
            .unwrap_or(false)
    }

    fn eyes_view_point(&self, actor: ActorId) -> Option<ViewPoint> {
        let (actor, pawn) = self.pawn(actor)?;
        Some(ViewPoint {
            location: actor.desc.location.add(Vec3::UP.scale(pawn.eye_height)),
            forward: pawn.facing.safe_normal(),
        })
    }

    fn controller_view_point(&self, actor: ActorId) -> Option<ViewPoint> {
        let (_, pawn) = self.pawn(actor)?;
        if !pawn.has_player_controller {
            return None;
        }
        self.eyes_view_point(actor)
    }

    fn sphere_query(
        &self,
        origin: Vec3,
        radius: f32,
        channel: TraceChannel,
        excluded: &[ActorId],
    ) -> Vec<ActorId> {
        self.actors
            .iter()
            .filter(|actor| !excluded.contains(&actor.id) && actor.desc.responds_to(channel))
            .filter(|actor| actor.desc.location.distance(origin) <= radius + actor.desc.radius)
            .map(|actor| actor.id)
            .collect()
    }

    fn ray_query(
        &self,
        from: Vec3,
        to: Vec3,
        channel: TraceChannel,
        excluded: &[ActorId],
    ) -> RayHit {
        let mut nearest: Option<(f32, ActorId)> = None;
        for actor in &self.actors {
            if excluded.contains(&actor.id) || !actor.desc.responds_to(channel) {
                continue;
            }
            let Some(t) = segment_sphere_entry(from, to, actor.desc.location, actor.desc.radius)
            else {
                continue;
            };
            if nearest.map_or(true, |(best, _)| t < best) {
                nearest = Some((t, actor.id));
            }
        }
        RayHit {
            blocked: nearest.is_some(),
            actor: nearest.map(|(_, id)| id),
        }
    }
}

fn segment_sphere_entry(from: Vec3, to: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let direction = to.sub(from);
    let offset = from.sub(center);
    let a = direction.length_squared();
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    if a <= f32::EPSILON {
        return None;
    }
    let b = 2.0 * offset.dot(direction);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}
