pub mod world;
pub mod config;
pub mod settings;
pub mod storage;
pub mod events;
pub mod island;
pub mod scheduler;
pub mod time_step;

pub use self::world::PhysicsWorld;
pub use self::config::SolverConfig;
pub use self::storage::{BodyStorage, ContactStorage, JointStorage, SlotHandle, SlotStorage, Storage};
pub use self::events::{
    BodyEvent, BodyEventType, CollisionEvent, CollisionEventType, ContactImpulse, ContactListener, EventQueue,
    JointEvent, JointEventType,
};
pub use self::island::{Island, IslandReport};
pub use self::scheduler::ConstraintColoring;
pub use self::time_step::{SolverData, SolverMass, SolverPosition, SolverVelocity, TimeStep};

/// A unique identifier for a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u32);

/// A unique identifier for a joint in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointHandle(pub(crate) u32);

/// A unique identifier for a contact in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactHandle(pub(crate) u32);
