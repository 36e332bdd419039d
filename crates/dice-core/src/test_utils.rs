//! Test utilities for driving the throw engine without Rapier.
//!
//! Provides `ScriptedWorld`, a `DiceWorld` whose dice settle after a scripted
//! number of steps in a scripted orientation. Every launch pops the next
//! script entry of its die, so a test can lay out exactly which faces each
//! attempt produces.

use std::collections::VecDeque;

use rapier3d::prelude::*;

use crate::face::canonical_rotation;
use crate::launch::Launch;
use crate::world::{DiceWorld, DieSpec};

/// How a launched die comes to rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Settle {
    /// Steps after the launch until the die sleeps; `None` never settles.
    pub steps: Option<u32>,
    pub rotation: Rotation<Real>,
}

impl Settle {
    pub fn face(steps: u32, face: u8) -> Self {
        Self {
            steps: Some(steps),
            rotation: canonical_rotation(face).unwrap(),
        }
    }

    /// Rests on an edge, which decodes as ambiguous.
    pub fn edge(steps: u32) -> Self {
        Self {
            steps: Some(steps),
            rotation: Rotation::from_axis_angle(&Vector::x_axis(), std::f32::consts::FRAC_PI_4),
        }
    }

    pub fn never() -> Self {
        Self {
            steps: None,
            rotation: Rotation::identity(),
        }
    }
}

/// A launch as observed by the scripted world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RecordedLaunch {
    /// World frame at which the launch was issued.
    pub frame: u64,
    pub die: usize,
    pub launch: Launch,
}

#[derive(Debug)]
struct ScriptedBody {
    remaining: Option<u32>,
    target: Rotation<Real>,
    position: Vector<Real>,
    rotation: Rotation<Real>,
}

/// Deterministic stand-in for a physics world.
#[derive(Debug)]
pub(crate) struct ScriptedWorld {
    scripts: Vec<VecDeque<Settle>>,
    fallback: Settle,
    bodies: Vec<Option<ScriptedBody>>,
    launches: Vec<RecordedLaunch>,
    frame: u64,
    resets: usize,
    removed: usize,
}

impl ScriptedWorld {
    /// Unscripted launches settle on face 1 after one step.
    pub fn new() -> Self {
        Self::with_fallback(Settle::face(1, 1))
    }

    /// Unscripted launches never settle.
    pub fn stalled() -> Self {
        Self::with_fallback(Settle::never())
    }

    fn with_fallback(fallback: Settle) -> Self {
        Self {
            scripts: Vec::new(),
            fallback,
            bodies: Vec::new(),
            launches: Vec::new(),
            frame: 0,
            resets: 0,
            removed: 0,
        }
    }

    /// Queues settles for die `die`, consumed one per launch across attempts.
    pub fn script(&mut self, die: usize, settles: &[Settle]) -> &mut Self {
        if self.scripts.len() <= die {
            self.scripts.resize_with(die + 1, VecDeque::new);
        }
        self.scripts[die].extend(settles.iter().copied());
        self
    }

    /// Shorthand for a sequence of `(steps, face)` settles.
    pub fn script_faces(&mut self, die: usize, faces: &[(u32, u8)]) -> &mut Self {
        let settles: Vec<Settle> = faces
            .iter()
            .map(|&(steps, face)| Settle::face(steps, face))
            .collect();
        self.script(die, &settles)
    }

    /// Launches issued since the last reset.
    pub fn launches(&self) -> &[RecordedLaunch] {
        &self.launches
    }

    pub fn launches_of(&self, die: usize) -> usize {
        self.launches.iter().filter(|l| l.die == die).count()
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn live_bodies(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    fn next_settle(&mut self, die: usize) -> Settle {
        self.scripts
            .get_mut(die)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.fallback)
    }
}

impl DiceWorld for ScriptedWorld {
    type Body = usize;

    fn reset(&mut self) {
        self.bodies.clear();
        self.launches.clear();
        self.frame = 0;
        self.resets += 1;
    }

    fn create_die(&mut self, _spec: &DieSpec) -> usize {
        self.bodies.push(Some(ScriptedBody {
            remaining: None,
            target: Rotation::identity(),
            position: Vector::zeros(),
            rotation: Rotation::identity(),
        }));
        self.bodies.len() - 1
    }

    fn remove_die(&mut self, body: usize) {
        if self.bodies.get_mut(body).and_then(Option::take).is_some() {
            self.removed += 1;
        }
    }

    fn set_pose(&mut self, body: usize, position: Vector<Real>, rotation: Rotation<Real>) {
        if let Some(Some(b)) = self.bodies.get_mut(body) {
            b.position = position;
            b.rotation = rotation;
        }
    }

    fn zero_velocities(&mut self, _body: usize) {}

    fn apply_impulse(&mut self, _body: usize, _impulse: Vector<Real>, _offset: Vector<Real>) {}

    fn allow_sleep(&mut self, body: usize) {
        let settle = self.next_settle(body);
        if let Some(Some(b)) = self.bodies.get_mut(body) {
            b.remaining = settle.steps.map(|steps| steps.max(1));
            b.target = settle.rotation;
        }
    }

    fn launch(&mut self, body: usize, launch: &Launch) {
        self.launches.push(RecordedLaunch {
            frame: self.frame,
            die: body,
            launch: *launch,
        });
        self.set_pose(body, launch.position, launch.rotation);
        self.zero_velocities(body);
        self.apply_impulse(body, launch.impulse, launch.impulse_offset);
        self.allow_sleep(body);
    }

    fn step(&mut self) {
        self.frame += 1;
        for b in self.bodies.iter_mut().flatten() {
            match b.remaining {
                Some(1) => {
                    b.remaining = Some(0);
                    b.rotation = b.target;
                    b.position.y = 0.5;
                }
                Some(n) if n > 1 => b.remaining = Some(n - 1),
                _ => {}
            }
        }
    }

    fn is_settled(&self, body: usize) -> bool {
        matches!(self.bodies.get(body), Some(Some(b)) if b.remaining == Some(0))
    }

    fn pose(&self, body: usize) -> Option<Isometry<Real>> {
        match self.bodies.get(body) {
            Some(Some(b)) => Some(Isometry::from_parts(b.position.into(), b.rotation)),
            _ => None,
        }
    }

    fn frame(&self) -> u64 {
        self.frame
    }
}
