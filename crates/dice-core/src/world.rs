//! The physics capability the throw engine drives.
//!
//! The engine owns two instances of the same `DiceWorld`: a fast one searched
//! invisibly and a visible one replayed for display. They never share bodies.

use std::fmt;

use rapier3d::prelude::*;

use crate::config::PhysicsConfig;
use crate::launch::Launch;

/// Shape, mass and sleep parameters of one die body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DieSpec {
    pub half_extent: f32,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
    pub sleep_time: f32,
    pub linear_sleep_threshold: f32,
    pub angular_sleep_threshold: f32,
}

impl From<&PhysicsConfig> for DieSpec {
    fn from(config: &PhysicsConfig) -> Self {
        Self {
            half_extent: config.die_half_extent,
            mass: config.die_mass,
            restitution: config.restitution,
            friction: config.friction,
            sleep_time: config.sleep_time,
            linear_sleep_threshold: config.linear_sleep_threshold,
            angular_sleep_threshold: config.angular_sleep_threshold,
        }
    }
}

/// A rigid-body world that can throw dice and report when they stop.
pub trait DiceWorld {
    /// Handle of a die body inside this world.
    type Body: Copy + PartialEq + fmt::Debug;

    /// Removes every die and restores the world to its freshly built state.
    fn reset(&mut self);

    fn create_die(&mut self, spec: &DieSpec) -> Self::Body;

    fn remove_die(&mut self, body: Self::Body);

    fn set_pose(&mut self, body: Self::Body, position: Vector<Real>, rotation: Rotation<Real>);

    fn zero_velocities(&mut self, body: Self::Body);

    /// Applies `impulse` at `offset` from the body's centre of mass.
    fn apply_impulse(&mut self, body: Self::Body, impulse: Vector<Real>, offset: Vector<Real>);

    /// Wakes the body and lets it fall asleep again once it stops.
    fn allow_sleep(&mut self, body: Self::Body);

    /// Advances the simulation by one fixed timestep.
    fn step(&mut self);

    /// Whether the body has stopped moving for the configured sleep time.
    fn is_settled(&self, body: Self::Body) -> bool;

    fn pose(&self, body: Self::Body) -> Option<Isometry<Real>>;

    /// Number of steps taken since the last reset.
    fn frame(&self) -> u64;

    /// Puts a die at its spawn pose and throws it.
    fn launch(&mut self, body: Self::Body, launch: &Launch) {
        self.set_pose(body, launch.position, launch.rotation);
        self.zero_velocities(body);
        self.apply_impulse(body, launch.impulse, launch.impulse_offset);
        self.allow_sleep(body);
    }

    fn rotation(&self, body: Self::Body) -> Option<Rotation<Real>> {
        self.pose(body).map(|pose| pose.rotation)
    }
}
