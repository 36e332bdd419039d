//! Throw orchestration: search the fast world for an acceptable throw, then
//! replay it in the visible world.
//!
//! Every attempt launches all dice in the fast world, steps it in bounded
//! batches and decodes each die as it settles. An ambiguous settle relaunches
//! that die alone; a decoded face is recorded and the attempt is judged
//! against the target. Rejected attempts are re-armed from scratch. Once an
//! attempt is accepted, the visible world is rebuilt and receives the same
//! launches at the same step offsets, so the animation lands on the faces
//! that were found.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, EngineConfig, ThrowRequest};
use crate::face::{FaceReading, decode_rotation};
use crate::launch::{Launch, LaunchPlan, StartPos};
use crate::outcome::{OutcomeState, Verdict};
use crate::world::{DiceWorld, DieSpec};

/// Where the engine is in the resolution protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrowStatus {
    /// Nothing requested yet.
    #[default]
    Ready,
    /// Searching the fast world for an acceptable throw.
    Seeking,
    /// Replaying the accepted throw in the visible world.
    AwaitingDisplay,
    /// The visible dice have settled; the result is final.
    Idle,
    /// Too many attempts stalled without every die settling.
    NoResolution,
}

impl ThrowStatus {
    /// Whether ticking can still change anything.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Seeking | Self::AwaitingDisplay)
    }
}

/// Work spent on the current request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    /// Attempts armed, including the accepted one.
    pub attempts: u32,
    /// Attempts abandoned because a die never settled.
    pub stalls: u32,
    /// Single-die relaunches after an ambiguous settle.
    pub retries: u32,
    /// Fast-world steps across all attempts.
    pub fast_steps: u64,
    /// Whether the visible dice came to rest on faces other than the result.
    pub replay_diverged: bool,
}

/// Pose of one visible die, handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiePose {
    pub die: usize,
    pub translation: Vector<Real>,
    pub rotation: Rotation<Real>,
}

/// A die observed at rest, tagged with the attempt it was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SettleEvent {
    generation: u64,
    die: usize,
}

/// The outcome-resolution engine.
///
/// The engine never owns the worlds it drives: the fast and visible worlds are
/// passed into every operation, so the same engine works against Rapier or
/// any other `DiceWorld`.
#[derive(Debug)]
pub struct ThrowEngine<W: DiceWorld> {
    config: EngineConfig,
    die_spec: DieSpec,
    request: ThrowRequest,
    status: ThrowStatus,
    outcome: OutcomeState,
    result: Option<Vec<u8>>,
    plan: LaunchPlan,
    generation: u64,
    attempt_steps: u32,
    replay_step: u32,
    fast_bodies: Vec<W::Body>,
    visible_bodies: Vec<W::Body>,
    /// Fast dice launched and not yet observed at rest.
    awaiting: Vec<bool>,
    seed: u64,
    rng: ChaCha8Rng,
    stats: ResolutionStats,
}

impl<W: DiceWorld> ThrowEngine<W> {
    /// Creates an engine seeded from the config, or from the OS when no seed is set.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.resolver.seed.unwrap_or_else(|| rand::rng().random());
        tracing::info!("[throw] Engine seeded with {}", seed);

        Ok(Self {
            die_spec: DieSpec::from(&config.physics),
            config,
            request: ThrowRequest::default(),
            status: ThrowStatus::Ready,
            outcome: OutcomeState::default(),
            result: None,
            plan: LaunchPlan::new(),
            generation: 0,
            attempt_steps: 0,
            replay_step: 0,
            fast_bodies: Vec::new(),
            visible_bodies: Vec::new(),
            awaiting: Vec::new(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: ResolutionStats::default(),
        })
    }

    /// Aborts whatever is in flight and starts resolving `request`.
    pub fn start_attempt(&mut self, fast: &mut W, visible: &mut W, request: ThrowRequest) {
        self.cancel(fast, visible);
        self.request = request;
        self.stats = ResolutionStats::default();

        tracing::info!(
            "[throw] Resolving {} dice toward {}",
            request.die_count(),
            request.desired_total()
        );
        self.arm(fast);
    }

    /// Removes every die from both worlds and returns to `Ready`.
    pub fn cancel(&mut self, fast: &mut W, visible: &mut W) {
        for body in self.fast_bodies.drain(..) {
            fast.remove_die(body);
        }
        for body in self.visible_bodies.drain(..) {
            visible.remove_die(body);
        }
        fast.reset();
        visible.reset();

        self.generation += 1;
        self.awaiting.clear();
        self.plan.clear();
        self.outcome.reset(0);
        self.result = None;
        self.status = ThrowStatus::Ready;
    }

    /// Starts a fresh attempt in the fast world.
    pub fn arm(&mut self, fast: &mut W) {
        self.status = ThrowStatus::Seeking;
        self.generation += 1;
        self.stats.attempts += 1;
        self.attempt_steps = 0;
        self.plan.clear();

        let die_count = self.request.die_count();
        self.outcome.reset(die_count);

        fast.reset();
        self.fast_bodies = (0..die_count).map(|_| fast.create_die(&self.die_spec)).collect();
        self.awaiting = vec![false; die_count];

        for die in 0..die_count {
            self.launch_fast(fast, die);
        }
    }

    /// Samples a fresh start triple for `die` and throws its fast body.
    fn launch_fast(&mut self, fast: &mut W, die: usize) {
        let start = StartPos::sample(&mut self.rng);
        self.plan.push(self.attempt_steps, die, start);

        let launch = Launch::new(&self.config.launch, die, start);
        tracing::trace!(
            "[throw] Launching die {} at step {} with force {}",
            die,
            self.attempt_steps,
            launch.force()
        );
        fast.launch(self.fast_bodies[die], &launch);
        self.awaiting[die] = true;
    }

    /// Runs one tick: a bounded fast-world advance while seeking, one visible
    /// step while replaying. Returns the visible poses while replaying.
    pub fn tick(&mut self, fast: &mut W, visible: &mut W) -> Vec<DiePose> {
        match self.status {
            ThrowStatus::Seeking => {
                self.advance(fast, visible);
                Vec::new()
            }
            ThrowStatus::AwaitingDisplay => self.replay_frame(visible),
            ThrowStatus::Ready | ThrowStatus::Idle | ThrowStatus::NoResolution => Vec::new(),
        }
    }

    /// Steps the fast world up to `substeps_per_tick` times, handling every
    /// settle as it happens.
    pub fn advance(&mut self, fast: &mut W, visible: &mut W) {
        let resolver = &self.config.resolver;
        let (substeps, max_attempt_steps, max_stalls) = (
            resolver.substeps_per_tick,
            resolver.max_attempt_steps,
            resolver.max_stalls,
        );

        for _ in 0..substeps {
            if self.status != ThrowStatus::Seeking {
                return;
            }

            fast.step();
            self.attempt_steps += 1;
            self.stats.fast_steps += 1;

            for event in self.poll_settled(fast) {
                self.on_settled(fast, visible, event);
            }

            if self.status == ThrowStatus::Seeking && self.attempt_steps >= max_attempt_steps {
                self.stats.stalls += 1;
                if self.stats.stalls >= max_stalls {
                    self.give_up(fast);
                    return;
                }
                tracing::warn!(
                    "[throw] Attempt {} stalled after {} steps, re-arming",
                    self.stats.attempts,
                    self.attempt_steps
                );
                self.arm(fast);
            }
        }
    }

    /// Stops seeking after too many stalled attempts.
    fn give_up(&mut self, fast: &mut W) {
        tracing::warn!(
            "[throw] {} of {} attempts at {} dice toward {} stalled, giving up",
            self.stats.stalls,
            self.stats.attempts,
            self.request.die_count(),
            self.request.desired_total()
        );
        fast.reset();
        self.fast_bodies.clear();
        self.awaiting.clear();
        self.generation += 1;
        self.status = ThrowStatus::NoResolution;
    }

    /// Collects the dice that came to rest since the last poll.
    fn poll_settled(&mut self, fast: &W) -> Vec<SettleEvent> {
        let generation = self.generation;
        self.fast_bodies
            .iter()
            .zip(self.awaiting.iter_mut())
            .enumerate()
            .filter_map(|(die, (&body, awaiting))| {
                if *awaiting && fast.is_settled(body) {
                    *awaiting = false;
                    Some(SettleEvent { generation, die })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Decodes a settled fast die and applies the acceptance policy.
    fn on_settled(&mut self, fast: &mut W, visible: &mut W, event: SettleEvent) {
        if event.generation != self.generation || self.status != ThrowStatus::Seeking {
            tracing::trace!(
                "[throw] Dropping settle of die {} from generation {} (now {})",
                event.die,
                event.generation,
                self.generation
            );
            return;
        }

        let Some(rotation) = fast.rotation(self.fast_bodies[event.die]) else {
            tracing::warn!("[throw] Settled die {} has no body", event.die);
            return;
        };

        let value = match decode_rotation(&rotation, self.config.physics.face_tolerance) {
            FaceReading::Face(value) => value,
            FaceReading::Ambiguous => {
                tracing::debug!(
                    "[throw] Die {} settled off-axis at step {} (start {:?}), relaunching it",
                    event.die,
                    self.attempt_steps,
                    self.plan.last_start(event.die)
                );
                self.stats.retries += 1;
                self.launch_fast(fast, event.die);
                return;
            }
        };

        if let Err(e) = self.outcome.record_face(event.die, value) {
            tracing::warn!("[throw] Failed to record face: {}", e);
            return;
        }

        match self.outcome.verdict(self.request.desired_total()) {
            Verdict::Pending => {}
            Verdict::Reject => {
                tracing::debug!(
                    "[throw] Attempt {} rejected with {:?}",
                    self.stats.attempts,
                    self.outcome.faces()
                );
                self.arm(fast);
            }
            Verdict::Accept => {
                tracing::info!(
                    "[throw] Accepted {:?} after {} attempts ({} retries, {} fast steps)",
                    self.outcome.faces(),
                    self.stats.attempts,
                    self.stats.retries,
                    self.stats.fast_steps
                );
                self.result = Some(self.outcome.faces().to_vec());
                self.begin_replay(visible);
            }
        }
    }

    /// Rebuilds the visible world and issues the accepted plan's initial launches.
    pub fn begin_replay(&mut self, visible: &mut W) {
        self.status = ThrowStatus::AwaitingDisplay;
        self.replay_step = 0;

        visible.reset();
        self.visible_bodies = (0..self.request.die_count())
            .map(|_| visible.create_die(&self.die_spec))
            .collect();

        self.issue_replay_launches(visible);
    }

    fn issue_replay_launches(&self, visible: &mut W) {
        for planned in self.plan.launches_at(self.replay_step) {
            let launch = Launch::new(&self.config.launch, planned.die, planned.start);
            visible.launch(self.visible_bodies[planned.die], &launch);
        }
    }

    /// Steps the visible world once and returns the poses to draw.
    pub fn replay_frame(&mut self, visible: &mut W) -> Vec<DiePose> {
        if self.status != ThrowStatus::AwaitingDisplay {
            return self.visible_poses(visible);
        }

        visible.step();
        self.replay_step += 1;
        self.issue_replay_launches(visible);

        let pending = self.plan.has_launches_after(self.replay_step);
        let settled = self.visible_bodies.iter().all(|&body| visible.is_settled(body));
        let last_launch = self.plan.launches().last().map_or(0, |l| l.at_step);
        let overdue =
            self.replay_step >= last_launch.saturating_add(self.config.resolver.max_attempt_steps);

        if !pending && settled {
            self.finish_replay(visible);
        } else if overdue {
            tracing::warn!(
                "[throw] Visible dice still moving after {} steps, stopping replay",
                self.replay_step
            );
            self.stats.replay_diverged = true;
            self.finish_replay(visible);
        }

        self.visible_poses(visible)
    }

    /// Compares the visible faces with the result and goes idle.
    fn finish_replay(&mut self, visible: &W) {
        let tolerance = self.config.physics.face_tolerance;
        let shown: Vec<Option<u8>> = self
            .visible_bodies
            .iter()
            .map(|&body| {
                visible
                    .rotation(body)
                    .and_then(|rotation| decode_rotation(&rotation, tolerance).value())
            })
            .collect();

        let expected = self.result.as_deref().unwrap_or_default();
        let matches = shown.len() == expected.len()
            && shown.iter().zip(expected).all(|(shown, &want)| *shown == Some(want));
        if !matches {
            tracing::warn!(
                "[throw] Visible dice show {:?}, expected {:?}",
                shown,
                expected
            );
            self.stats.replay_diverged = true;
        }

        self.status = ThrowStatus::Idle;
        tracing::info!("[throw] Result {:?} displayed", expected);
    }

    /// Current pose of every visible die.
    pub fn visible_poses(&self, visible: &W) -> Vec<DiePose> {
        self.visible_bodies
            .iter()
            .enumerate()
            .filter_map(|(die, &body)| {
                visible.pose(body).map(|pose| DiePose {
                    die,
                    translation: pose.translation.vector,
                    rotation: pose.rotation,
                })
            })
            .collect()
    }

    pub fn status(&self) -> ThrowStatus {
        self.status
    }

    /// The final face sequence, once the visible dice have settled.
    pub fn result(&self) -> Option<&[u8]> {
        if self.status == ThrowStatus::Idle {
            self.result.as_deref()
        } else {
            None
        }
    }

    /// The face sequence found by the search, available from acceptance on
    /// while the visible replay is still running.
    pub fn computed_result(&self) -> Option<&[u8]> {
        self.result.as_deref()
    }

    /// Faces recorded so far in the current attempt.
    pub fn outcome(&self) -> &OutcomeState {
        &self.outcome
    }

    /// Launches of the current (or accepted) attempt.
    pub fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }

    pub fn request(&self) -> ThrowRequest {
        self.request
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Bumped on every arm and cancel.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
