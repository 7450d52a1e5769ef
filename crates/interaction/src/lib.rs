pub mod config;
pub mod error;
pub mod events;
pub mod interactable;
pub mod interactor;
pub mod key;
pub mod math;
mod obstruction;
pub mod replication;
pub mod scheduler;
pub mod sim;
pub mod table;
pub mod world;

pub use config::{InteractableConfig, InteractionType, TraceChannel, PLACEHOLDER_TEXT};
pub use error::InteractionError;
pub use events::{
    Broadcast, DataRefreshed, HoverChanged, InteractableEvents, Interacted, InteractorEvents,
    OverlapChanged, ProgressChanged, StateSynced, SubscriptionId,
};
pub use interactable::{Interactable, INITIAL_TIME_SINCE_INTERACTION};
pub use interactor::{DetectionMode, InteractionContext, Interactor, InteractorSettings};
pub use key::{
    validate_key_path, InteractionKey, KeyHandle, KeyPathError, KeyRef, KeyRegistry,
    DEFAULT_KEY_PATH,
};
pub use math::{project_world_to_screen, CameraView, Vec2, Vec3, ViewPoint, Viewport};
pub use replication::{
    NetRole, RemoteCall, RemoteCallQueue, ReplicatedField, ReplicatedInteractable,
};
pub use scheduler::{
    clamp_frame_delta, plan_sim_steps, DeferredQueue, FixedStepLoop, LoopConfig, StepPlan,
};
pub use sim::{ActorDesc, PawnDesc, SimActor, SimWorld};
pub use table::{ConfigTable, SourceLocation, TableError, TableErrorCode};
pub use world::{
    ActorId, InteractableId, InteractableRegistry, InteractorId, InteractorRef, RayHit,
    SpatialWorld,
};
