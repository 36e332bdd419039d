//! Engine configuration and throw requests.
//!
//! `EngineConfig` is immutable once an engine is built and is forwarded
//! unchanged to both physics worlds. `ThrowRequest` is the mutable,
//! operator-facing part: how many dice and which total to steer toward.

use serde::{Deserialize, Serialize};

/// Smallest supported number of dice.
pub const MIN_DICE: usize = 1;

/// Largest supported number of dice.
pub const MAX_DICE: usize = 5;

/// Number of faces on a die.
pub const FACES: u32 = 6;

/// Error type for invalid configuration or requests.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("die count {0} is outside {min}..={max}", min = MIN_DICE, max = MAX_DICE)]
    DieCount(usize),
    #[error("desired total {total} is outside {min}..={max}")]
    DesiredTotal { total: u32, min: u32, max: u32 },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Physical parameters shared by the fast and visible worlds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Vertical gravity (negative is down).
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default = "default_die_mass")]
    pub die_mass: f32,
    #[serde(default = "default_die_half_extent")]
    pub die_half_extent: f32,
    /// Seconds a die must stay below the sleep thresholds to count as settled.
    #[serde(default = "default_sleep_time")]
    pub sleep_time: f32,
    #[serde(default = "default_linear_sleep_threshold")]
    pub linear_sleep_threshold: f32,
    #[serde(default = "default_angular_sleep_threshold")]
    pub angular_sleep_threshold: f32,
    /// Angular tolerance (radians) used by the face decoder.
    #[serde(default = "default_face_tolerance")]
    pub face_tolerance: f32,
    /// Fixed timestep of a single physics step.
    #[serde(default = "default_timestep")]
    pub timestep: f32,
}

fn default_gravity() -> f32 {
    -50.0
}

fn default_restitution() -> f32 {
    0.3
}

fn default_friction() -> f32 {
    0.1
}

fn default_die_mass() -> f32 {
    1.0
}

fn default_die_half_extent() -> f32 {
    0.5
}

fn default_sleep_time() -> f32 {
    0.1
}

fn default_linear_sleep_threshold() -> f32 {
    0.1
}

fn default_angular_sleep_threshold() -> f32 {
    0.1
}

fn default_face_tolerance() -> f32 {
    1e-3
}

fn default_timestep() -> f32 {
    1.0 / 60.0
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            restitution: default_restitution(),
            friction: default_friction(),
            die_mass: default_die_mass(),
            die_half_extent: default_die_half_extent(),
            sleep_time: default_sleep_time(),
            linear_sleep_threshold: default_linear_sleep_threshold(),
            angular_sleep_threshold: default_angular_sleep_threshold(),
            face_tolerance: default_face_tolerance(),
            timestep: default_timestep(),
        }
    }
}

/// Static walls around the throw area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Width / height of the viewport the arena is fitted to.
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f32,
    /// Side walls sit at `x = ±wall_distance * aspect_ratio`.
    #[serde(default = "default_wall_distance")]
    pub wall_distance: f32,
    /// The back wall faces -z at this depth.
    #[serde(default = "default_back_wall_z")]
    pub back_wall_z: f32,
}

fn default_aspect_ratio() -> f32 {
    16.0 / 9.0
}

fn default_wall_distance() -> f32 {
    6.0
}

fn default_back_wall_z() -> f32 {
    3.0
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: default_aspect_ratio(),
            wall_distance: default_wall_distance(),
            back_wall_z: default_back_wall_z(),
        }
    }
}

impl ArenaConfig {
    /// Distance from the origin to each side wall.
    pub fn side_wall_x(&self) -> f32 {
        self.wall_distance * self.aspect_ratio
    }
}

/// How launch parameters are derived from a die's start triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Spawn position of die 0.
    #[serde(default = "default_spawn_origin")]
    pub spawn_origin: [f32; 3],
    /// Vertical offset between consecutive dice, so they never overlap at spawn.
    #[serde(default = "default_spawn_spacing")]
    pub spawn_spacing: f32,
    #[serde(default = "default_base_force")]
    pub base_force: f32,
    /// Added to `base_force`, scaled by the third start value.
    #[serde(default = "default_force_spread")]
    pub force_spread: f32,
    /// World-space offset from the centre of mass where the impulse is applied.
    #[serde(default = "default_impulse_offset")]
    pub impulse_offset: [f32; 3],
}

fn default_spawn_origin() -> [f32; 3] {
    [3.0, 5.0, 2.0]
}

fn default_spawn_spacing() -> f32 {
    1.0
}

fn default_base_force() -> f32 {
    6.0
}

fn default_force_spread() -> f32 {
    3.0
}

fn default_impulse_offset() -> [f32; 3] {
    [0.0, 0.0, -0.5]
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            spawn_origin: default_spawn_origin(),
            spawn_spacing: default_spawn_spacing(),
            base_force: default_base_force(),
            force_spread: default_force_spread(),
            impulse_offset: default_impulse_offset(),
        }
    }
}

/// Budgets of the resolution loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Fast-world steps performed per tick while seeking.
    #[serde(default = "default_substeps_per_tick")]
    pub substeps_per_tick: u32,
    /// Fast-world steps after which an attempt counts as stalled.
    #[serde(default = "default_max_attempt_steps")]
    pub max_attempt_steps: u32,
    /// Stalled attempts allowed per request before giving up. Rejected
    /// attempts do not count.
    #[serde(default = "default_max_stalls")]
    pub max_stalls: u32,
    /// Seed for start-triple sampling; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_substeps_per_tick() -> u32 {
    60
}

fn default_max_attempt_steps() -> u32 {
    3600
}

fn default_max_stalls() -> u32 {
    20
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            substeps_per_tick: default_substeps_per_tick(),
            max_attempt_steps: default_max_attempt_steps(),
            max_stalls: default_max_stalls(),
            seed: None,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns a copy with a fixed RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.resolver.seed = Some(seed);
        self
    }

    /// Checks every parameter that would break the resolution loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let physics = &self.physics;
        positive("physics.die_mass", physics.die_mass)?;
        positive("physics.die_half_extent", physics.die_half_extent)?;
        positive("physics.timestep", physics.timestep)?;
        positive("physics.face_tolerance", physics.face_tolerance)?;
        non_negative("physics.sleep_time", physics.sleep_time)?;
        non_negative("physics.restitution", physics.restitution)?;
        non_negative("physics.friction", physics.friction)?;
        positive("physics.linear_sleep_threshold", physics.linear_sleep_threshold)?;
        positive("physics.angular_sleep_threshold", physics.angular_sleep_threshold)?;
        if physics.gravity >= 0.0 {
            return Err(invalid("physics.gravity", "must point down (negative)"));
        }
        positive("arena.aspect_ratio", self.arena.aspect_ratio)?;
        positive("arena.wall_distance", self.arena.wall_distance)?;

        let resolver = &self.resolver;
        if resolver.substeps_per_tick == 0 {
            return Err(invalid("resolver.substeps_per_tick", "must be at least 1"));
        }
        if resolver.max_attempt_steps == 0 {
            return Err(invalid("resolver.max_attempt_steps", "must be at least 1"));
        }
        if resolver.max_stalls == 0 {
            return Err(invalid("resolver.max_stalls", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, &format!("must be positive, got {value}")))
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, &format!("must be non-negative, got {value}")))
    }
}

/// Inclusive range of totals reachable with `die_count` dice.
#[allow(clippy::cast_possible_truncation)]
pub fn total_range(die_count: usize) -> (u32, u32) {
    let n = die_count as u32;
    (n, n * FACES)
}

/// How many dice to throw and which total they must land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowRequest {
    die_count: usize,
    desired_total: u32,
}

impl Default for ThrowRequest {
    fn default() -> Self {
        Self {
            die_count: 2,
            desired_total: 7,
        }
    }
}

impl ThrowRequest {
    /// Creates a request, rejecting counts and totals outside their ranges.
    pub fn new(die_count: usize, desired_total: u32) -> Result<Self, ConfigError> {
        check_die_count(die_count)?;
        let mut request = Self {
            die_count,
            desired_total: 0,
        };
        request.set_desired_total(desired_total)?;
        Ok(request)
    }

    /// Changes the die count and clamps the desired total into the new range.
    pub fn with_die_count(self, die_count: usize) -> Result<Self, ConfigError> {
        check_die_count(die_count)?;
        let (min, max) = total_range(die_count);
        Ok(Self {
            die_count,
            desired_total: self.desired_total.clamp(min, max),
        })
    }

    /// Returns a copy with `desired_total` clamped into the reachable range.
    #[must_use]
    pub fn with_total_clamped(self, desired_total: u32) -> Self {
        let (min, max) = total_range(self.die_count);
        Self {
            desired_total: desired_total.clamp(min, max),
            ..self
        }
    }

    /// Changes the desired total, rejecting values the dice cannot reach.
    pub fn set_desired_total(&mut self, desired_total: u32) -> Result<(), ConfigError> {
        let (min, max) = total_range(self.die_count);
        if !(min..=max).contains(&desired_total) {
            return Err(ConfigError::DesiredTotal {
                total: desired_total,
                min,
                max,
            });
        }
        self.desired_total = desired_total;
        Ok(())
    }

    pub fn die_count(&self) -> usize {
        self.die_count
    }

    pub fn desired_total(&self) -> u32 {
        self.desired_total
    }
}

fn check_die_count(die_count: usize) -> Result<(), ConfigError> {
    if (MIN_DICE..=MAX_DICE).contains(&die_count) {
        Ok(())
    } else {
        Err(ConfigError::DieCount(die_count))
    }
}
