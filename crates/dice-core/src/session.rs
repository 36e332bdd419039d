//! The surface a UI drives: one engine, its two worlds and the current request.

use crate::config::{ConfigError, EngineConfig, ThrowRequest};
use crate::physics::PhysicsWorld;
use crate::throw::{DiePose, ResolutionStats, ThrowEngine, ThrowStatus};
use crate::world::DiceWorld;

/// A steered-dice session.
///
/// Owns the fast and visible worlds and the request the next throw uses.
/// Changing the die count clamps the desired total; neither change takes
/// effect until the next `throw`.
#[derive(Debug)]
pub struct DiceSession<W: DiceWorld = PhysicsWorld> {
    fast: W,
    visible: W,
    engine: ThrowEngine<W>,
    request: ThrowRequest,
}

impl DiceSession<PhysicsWorld> {
    /// Builds both Rapier worlds from a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fast = PhysicsWorld::new(&config.physics, &config.arena);
        let visible = PhysicsWorld::new(&config.physics, &config.arena);
        Self::with_worlds(config, fast, visible)
    }
}

impl<W: DiceWorld> DiceSession<W> {
    /// Builds a session over caller-supplied worlds.
    pub fn with_worlds(config: EngineConfig, fast: W, visible: W) -> Result<Self, ConfigError> {
        Ok(Self {
            fast,
            visible,
            engine: ThrowEngine::new(config)?,
            request: ThrowRequest::default(),
        })
    }

    /// Replaces the request and throws it, aborting anything in flight.
    pub fn start_attempt(&mut self, request: ThrowRequest) {
        self.request = request;
        self.throw();
    }

    /// Throws again with the current request.
    pub fn throw(&mut self) {
        tracing::info!(
            "[session] Throw: {} dice, total {}",
            self.request.die_count(),
            self.request.desired_total()
        );
        self.engine
            .start_attempt(&mut self.fast, &mut self.visible, self.request);
    }

    /// Changes the die count, clamping the desired total into the new range.
    pub fn set_die_count(&mut self, die_count: usize) -> Result<(), ConfigError> {
        let previous = self.request.desired_total();
        self.request = self.request.with_die_count(die_count)?;
        if self.request.desired_total() != previous {
            tracing::debug!(
                "[session] Desired total clamped from {} to {}",
                previous,
                self.request.desired_total()
            );
        }
        Ok(())
    }

    pub fn set_desired_total(&mut self, desired_total: u32) -> Result<(), ConfigError> {
        self.request.set_desired_total(desired_total)
    }

    /// Advances the engine by one tick. Returns visible poses while replaying.
    pub fn tick(&mut self) -> Vec<DiePose> {
        self.engine.tick(&mut self.fast, &mut self.visible)
    }

    /// Ticks until the engine stops or `max_ticks` pass, returning the final status.
    pub fn run(&mut self, max_ticks: u64) -> ThrowStatus {
        let mut ticks = 0;
        while self.engine.status().is_active() && ticks < max_ticks {
            self.tick();
            ticks += 1;
        }
        self.engine.status()
    }

    pub fn status(&self) -> ThrowStatus {
        self.engine.status()
    }

    /// The face sequence on display, once the visible dice have settled.
    pub fn result(&self) -> Option<&[u8]> {
        self.engine.result()
    }

    /// The face sequence the search accepted, while or after it is replayed.
    pub fn computed_result(&self) -> Option<&[u8]> {
        self.engine.computed_result()
    }

    /// Sum of the displayed faces.
    pub fn total(&self) -> Option<u32> {
        self.result()
            .map(|faces| faces.iter().map(|&v| u32::from(v)).sum())
    }

    pub fn stats(&self) -> ResolutionStats {
        self.engine.stats()
    }

    pub fn visible_poses(&self) -> Vec<DiePose> {
        self.engine.visible_poses(&self.visible)
    }

    pub fn request(&self) -> ThrowRequest {
        self.request
    }

    pub fn engine(&self) -> &ThrowEngine<W> {
        &self.engine
    }

    pub fn seed(&self) -> u64 {
        self.engine.seed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{FaceReading, decode_rotation};
    use crate::test_utils::ScriptedWorld;

    fn scripted() -> DiceSession<ScriptedWorld> {
        let mut config = EngineConfig::default().with_seed(7);
        config.resolver.substeps_per_tick = 1;
        DiceSession::with_worlds(config, ScriptedWorld::new(), ScriptedWorld::new()).unwrap()
    }

    /// Rapier session with a slightly looser face tolerance.
    fn physical(seed: u64) -> DiceSession {
        let mut config = EngineConfig::default().with_seed(seed);
        config.physics.face_tolerance = 1e-2;
        DiceSession::new(config).unwrap()
    }

    #[test]
    fn test_session_starts_ready() {
        let session = scripted();
        assert_eq!(session.status(), ThrowStatus::Ready);
        assert_eq!(session.request(), ThrowRequest::default());
        assert!(session.result().is_none());
        assert!(session.visible_poses().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.resolver.substeps_per_tick = 0;
        assert!(DiceSession::new(config.clone()).is_err());

        let session = DiceSession::with_worlds(config, ScriptedWorld::new(), ScriptedWorld::new());
        assert!(session.is_err());
    }

    #[test]
    fn test_die_count_change_clamps_total() {
        let mut session = scripted();
        session.set_die_count(5).unwrap();
        session.set_desired_total(30).unwrap();

        session.set_die_count(3).unwrap();
        assert_eq!(session.request().desired_total(), 18);

        session.set_desired_total(17).unwrap();
        session.set_die_count(3).unwrap();
        assert_eq!(session.request().desired_total(), 17);

        assert!(session.set_die_count(0).is_err());
        assert!(session.set_desired_total(19).is_err());
        assert_eq!(session.request(), ThrowRequest::new(3, 17).unwrap());
    }

    #[test]
    fn test_settings_apply_on_next_throw() {
        let mut session = scripted();
        session.start_attempt(ThrowRequest::new(2, 2).unwrap());
        assert_eq!(session.engine().request().die_count(), 2);

        session.set_die_count(4).unwrap();
        assert_eq!(session.engine().request().die_count(), 2);

        session.throw();
        assert_eq!(session.engine().request(), ThrowRequest::new(4, 4).unwrap());
        assert_eq!(session.status(), ThrowStatus::Seeking);
    }

    #[test]
    fn test_scripted_session_runs_to_idle() {
        let mut session = scripted();
        session.start_attempt(ThrowRequest::new(3, 3).unwrap());

        session.tick();
        assert_eq!(session.status(), ThrowStatus::AwaitingDisplay);
        assert_eq!(session.computed_result(), Some(&[1, 1, 1][..]));
        assert!(session.result().is_none());
        assert!(session.total().is_none());

        assert_eq!(session.run(100), ThrowStatus::Idle);
        assert_eq!(session.result(), Some(&[1, 1, 1][..]));
        assert_eq!(session.total(), Some(3));
        assert_eq!(session.visible_poses().len(), 3);
    }

    #[test]
    fn test_single_die_lands_on_target() {
        let mut session = physical(2024);
        session.start_attempt(ThrowRequest::new(1, 3).unwrap());

        let status = session.run(5_000);
        assert_eq!(status, ThrowStatus::Idle, "stats: {:?}", session.stats());
        assert_eq!(session.total(), Some(3));
    }

    #[test]
    fn test_two_dice_land_on_target_and_replay_matches() {
        let mut session = physical(99);
        session.start_attempt(ThrowRequest::new(2, 7).unwrap());

        let status = session.run(10_000);
        assert_eq!(status, ThrowStatus::Idle, "stats: {:?}", session.stats());
        assert_eq!(session.total(), Some(7));
        assert!(!session.stats().replay_diverged);

        // The visible dice rest on the faces that were found.
        let result = session.result().unwrap().to_vec();
        for pose in session.visible_poses() {
            let reading = decode_rotation(&pose.rotation, 1e-2);
            assert_eq!(reading, FaceReading::Face(result[pose.die]));
            assert!(pose.translation.y < 1.0);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut a = physical(5);
        let mut b = physical(5);
        a.start_attempt(ThrowRequest::new(2, 9).unwrap());
        b.start_attempt(ThrowRequest::new(2, 9).unwrap());

        a.run(10_000);
        b.run(10_000);

        assert_eq!(a.status(), ThrowStatus::Idle);
        assert_eq!(a.result(), b.result());
        assert_eq!(a.stats(), b.stats());
    }
}
