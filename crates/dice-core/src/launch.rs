//! Randomized launch parameters and the per-attempt launch plan.

use std::f32::consts::TAU;

use rand::Rng;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::LaunchConfig;

/// Three independent uniform samples in `[0, 1)` that fully determine a launch.
///
/// The first two pick the initial orientation, the third the impulse strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPos(pub [f32; 3]);

impl StartPos {
    /// Draws a fresh triple.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self([rng.random(), rng.random(), rng.random()])
    }
}

/// Initial conditions handed to a physics world for one die.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    pub position: Vector<Real>,
    pub rotation: Rotation<Real>,
    pub impulse: Vector<Real>,
    /// World-space offset from the centre of mass where `impulse` is applied.
    pub impulse_offset: Vector<Real>,
}

impl Launch {
    /// Derives the launch of die `index` from its start triple.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(config: &LaunchConfig, index: usize, start: StartPos) -> Self {
        let [s0, s1, s2] = start.0;
        let [x, y, z] = config.spawn_origin;
        let force = config.base_force + config.force_spread * s2;

        // Euler XYZ (TAU * s0, 0, TAU * s1).
        let rotation = Rotation::from_axis_angle(&Vector::x_axis(), TAU * s0)
            * Rotation::from_axis_angle(&Vector::z_axis(), TAU * s1);

        Self {
            position: vector![x, y + config.spawn_spacing * index as f32, z],
            rotation,
            impulse: vector![-force, force, 0.0],
            impulse_offset: Vector::from(config.impulse_offset),
        }
    }

    /// Magnitude of the horizontal and vertical impulse components.
    pub fn force(&self) -> f32 {
        self.impulse.y
    }
}

/// One launch issued during an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedLaunch {
    /// Fast-world steps taken in the attempt before this launch.
    pub at_step: u32,
    pub die: usize,
    pub start: StartPos,
}

/// Ordered record of every launch in the current attempt.
///
/// Replaying the plan step for step in a freshly built world reproduces the
/// attempt, including single-die relaunches after an ambiguous settle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchPlan {
    launches: Vec<PlannedLaunch>,
}

impl LaunchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.launches.clear();
    }

    pub fn push(&mut self, at_step: u32, die: usize, start: StartPos) {
        debug_assert!(
            self.launches.last().is_none_or(|last| last.at_step <= at_step),
            "launch plan must stay ordered by step"
        );
        self.launches.push(PlannedLaunch {
            at_step,
            die,
            start,
        });
    }

    /// Launches scheduled exactly at `step`, in issue order.
    pub fn launches_at(&self, step: u32) -> impl Iterator<Item = &PlannedLaunch> {
        self.launches.iter().filter(move |launch| launch.at_step == step)
    }

    /// Whether any launch is scheduled after `step`.
    pub fn has_launches_after(&self, step: u32) -> bool {
        self.launches.last().is_some_and(|last| last.at_step > step)
    }

    /// Latest start triple issued to `die`.
    pub fn last_start(&self, die: usize) -> Option<StartPos> {
        self.launches
            .iter()
            .rev()
            .find(|launch| launch.die == die)
            .map(|launch| launch.start)
    }

    pub fn launches(&self) -> &[PlannedLaunch] {
        &self.launches
    }

    pub fn len(&self) -> usize {
        self.launches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.launches.is_empty()
    }
}
