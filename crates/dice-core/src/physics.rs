//! Dice physics using `Rapier3D` with deterministic behavior.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use rapier3d::prelude::*;

use crate::config::{ArenaConfig, PhysicsConfig};
use crate::world::{DiceWorld, DieSpec};

/// Physics world containing all `Rapier3D` components for deterministic simulation.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector<Real>,
    pub frame: u64,
    physics: PhysicsConfig,
    arena: ArenaConfig,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default(), &ArenaConfig::default())
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a world with the floor and walls of `arena` already in place.
    pub fn new(physics: &PhysicsConfig, arena: &ArenaConfig) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: physics.timestep,
            ..Default::default()
        };

        let mut world = Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: vector![0.0, physics.gravity, 0.0],
            frame: 0,
            physics: physics.clone(),
            arena: arena.clone(),
        };
        world.build_arena();
        world
    }

    /// Floor at y = 0, side walls facing inwards, back wall facing -z.
    fn build_arena(&mut self) {
        let side = self.arena.side_wall_x();
        let planes = [
            (vector![0.0, 1.0, 0.0], vector![0.0, 0.0, 0.0]),
            (vector![1.0, 0.0, 0.0], vector![-side, 0.0, 0.0]),
            (vector![-1.0, 0.0, 0.0], vector![side, 0.0, 0.0]),
            (vector![0.0, 0.0, -1.0], vector![0.0, 0.0, self.arena.back_wall_z]),
        ];

        for (normal, translation) in planes {
            let collider = ColliderBuilder::halfspace(UnitVector::new_normalize(normal))
                .translation(translation)
                .restitution(self.physics.restitution)
                .friction(self.physics.friction)
                .build();
            self.add_static_collider(collider);
        }
    }

    /// Advances the physics simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.frame += 1;
    }

    /// Advances the physics simulation by multiple steps.
    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Adds a rigid body to the world and returns its handle.
    pub fn add_rigid_body(&mut self, rigid_body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(rigid_body)
    }

    /// Adds a collider attached to a rigid body.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Adds a collider without a parent (static collider).
    pub fn add_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.collider_set.insert(collider)
    }

    /// Removes a rigid body and its attached colliders.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Gets an immutable reference to a rigid body.
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Gets a mutable reference to a rigid body.
    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Computes a deterministic hash of the current physics state.
    /// Two worlds fed identical launches must hash identically at every frame.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.frame.hash(&mut hasher);

        for (handle, body) in self.rigid_body_set.iter() {
            let (index, generation) = handle.into_raw_parts();
            index.hash(&mut hasher);
            generation.hash(&mut hasher);

            for value in body.translation().iter() {
                hash_f32(*value, &mut hasher);
            }
            for value in body.rotation().coords.iter() {
                hash_f32(*value, &mut hasher);
            }
            for value in body.linvel().iter().chain(body.angvel().iter()) {
                hash_f32(*value, &mut hasher);
            }
        }

        hasher.finish()
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Number of dynamic bodies (dice) currently in the world.
    pub fn die_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn physics_config(&self) -> &PhysicsConfig {
        &self.physics
    }
}

/// Hashes a f32 value by converting to bits.
fn hash_f32(value: f32, hasher: &mut impl Hasher) {
    value.to_bits().hash(hasher);
}

impl DiceWorld for PhysicsWorld {
    type Body = RigidBodyHandle;

    fn reset(&mut self) {
        tracing::trace!(
            "[physics] Rebuilding world at frame {} with {} dice",
            self.frame,
            self.die_count()
        );
        *self = Self::new(&self.physics, &self.arena);
    }

    fn create_die(&mut self, spec: &DieSpec) -> RigidBodyHandle {
        let mut rigid_body = RigidBodyBuilder::dynamic().ccd_enabled(true).build();
        let activation = rigid_body.activation_mut();
        activation.normalized_linear_threshold = spec.linear_sleep_threshold;
        activation.angular_threshold = spec.angular_sleep_threshold;
        activation.time_until_sleep = spec.sleep_time;

        let handle = self.add_rigid_body(rigid_body);

        let h = spec.half_extent;
        let collider = ColliderBuilder::cuboid(h, h, h)
            .mass(spec.mass)
            .restitution(spec.restitution)
            .friction(spec.friction)
            .build();
        self.add_collider(collider, handle);

        handle
    }

    fn remove_die(&mut self, body: RigidBodyHandle) {
        self.remove_rigid_body(body);
    }

    fn set_pose(&mut self, body: RigidBodyHandle, position: Vector<Real>, rotation: Rotation<Real>) {
        if let Some(rb) = self.get_rigid_body_mut(body) {
            rb.set_position(Isometry::from_parts(position.into(), rotation), true);
        }
    }

    fn zero_velocities(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.get_rigid_body_mut(body) {
            rb.set_linvel(Vector::zeros(), true);
            rb.set_angvel(Vector::zeros(), true);
        }
    }

    fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vector<Real>, offset: Vector<Real>) {
        if let Some(rb) = self.get_rigid_body_mut(body) {
            let point = Point::from(rb.translation() + offset);
            rb.apply_impulse_at_point(impulse, point, true);
        }
    }

    fn allow_sleep(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.get_rigid_body_mut(body) {
            rb.wake_up(true);
        }
    }

    fn step(&mut self) {
        PhysicsWorld::step(self);
    }

    fn is_settled(&self, body: RigidBodyHandle) -> bool {
        self.get_rigid_body(body).is_some_and(RigidBody::is_sleeping)
    }

    fn pose(&self, body: RigidBodyHandle) -> Option<Isometry<Real>> {
        self.get_rigid_body(body).map(|rb| *rb.position())
    }

    fn frame(&self) -> u64 {
        self.frame
    }
}
