//! Steered Dice Core Library
//!
//! Dice throws that land on a chosen total. A hidden `Rapier3D` world searches
//! for a throw whose dice sum to the target, pruning attempts as soon as the
//! target is out of reach. The accepted launches are then replayed in a second,
//! visible world so the animation lands on the faces that were found.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod face;
pub mod launch;
pub mod outcome;
pub mod physics;
pub mod session;
pub mod throw;
pub mod world;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{
    ArenaConfig, ConfigError, EngineConfig, LaunchConfig, MAX_DICE, MIN_DICE, PhysicsConfig,
    ResolverConfig, ThrowRequest, total_range,
};
pub use face::{
    EulerAngles, FaceReading, canonical_rotation, decode_face, decode_rotation, local_up_axis,
};
pub use launch::{Launch, LaunchPlan, PlannedLaunch, StartPos};
pub use outcome::{OutcomeError, OutcomeState, UNRESOLVED, Verdict};
pub use physics::PhysicsWorld;
pub use session::DiceSession;
pub use throw::{DiePose, ResolutionStats, ThrowEngine, ThrowStatus};
pub use world::{DiceWorld, DieSpec};
