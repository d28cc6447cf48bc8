//! Agent scheduling state machine
//!
//! Arbitrates between the active navigation agent and manual input:
//!
//! ```text
//!            start(kind)                 manual input
//!   Idle ───────────────▶ Autonomous ───────────────▶ ManualOverride
//!    ▲                     │   ▲                         │    ▲   │
//!    │ stop / stall        │   └──── resume timer ───────┘    └───┘
//!    └─────────────────────┘                            manual input
//! ```
//!
//! The scheduler owns at most one tick timer and one resume timer. Every
//! transition cancels the handle it replaces before creating a new one, so
//! a stale interval can never keep firing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentContext, AgentKind, NavigationAgent};
use crate::config::{validate_speed, TimingConfig};
use crate::error::MazeError;
use crate::grid::Position;
use crate::timer::{TimerId, TimerKind, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No agent ticking
    Idle,
    /// Agent ticking on its interval
    Autonomous,
    /// Human input suspended the agent, resume timer pending
    ManualOverride,
}

/// Result of an agent tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale or inert tick, nothing happened
    Ignored,
    /// The agent wants the player here (may equal the current position)
    Moved(Position),
    /// The agent can make no progress and has stopped ticking
    Stalled,
}

pub struct AgentScheduler {
    state: SchedulerState,
    agent: Option<Box<dyn NavigationAgent>>,
    tick_timer: Option<TimerId>,
    resume_timer: Option<TimerId>,
    speed_multiplier: f64,
    timing: TimingConfig,
}

impl AgentScheduler {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            state: SchedulerState::Idle,
            agent: None,
            tick_timer: None,
            resume_timer: None,
            speed_multiplier: 1.0,
            timing,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Kind of the configured agent, kept while stalled or overridden
    pub fn kind(&self) -> AgentKind {
        self.agent.as_ref().map_or(AgentKind::None, |agent| agent.kind())
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn tick_timer(&self) -> Option<TimerId> {
        self.tick_timer
    }

    pub fn resume_timer(&self) -> Option<TimerId> {
        self.resume_timer
    }

    /// Tick interval for the configured agent at the current speed
    pub fn interval(&self) -> Option<Duration> {
        match self.kind() {
            AgentKind::None => None,
            kind => Some(self.timing.tick_interval(kind, self.speed_multiplier)),
        }
    }

    /// Route cached by the agent, empty for non-planning agents
    pub fn route(&self) -> &[Position] {
        match self.agent.as_ref() {
            Some(agent) => agent.route(),
            None => &[],
        }
    }

    /// Activate `kind`, replacing whatever ran before
    ///
    /// `AgentKind::None` is the same as `stop`.
    pub fn start(&mut self, kind: AgentKind, timers: &mut TimerQueue) {
        if kind == AgentKind::None {
            self.stop(timers);
            return;
        }

        self.cancel_timers(timers);
        if self.kind() != kind {
            self.agent = kind.build();
        }
        if let Some(agent) = self.agent.as_mut() {
            agent.reset();
        }

        self.arm_tick(kind, timers);
        self.state = SchedulerState::Autonomous;
        tracing::info!(
            "Started {} agent (interval {:?}, speed {})",
            kind,
            self.timing.tick_interval(kind, self.speed_multiplier),
            self.speed_multiplier
        );
    }

    /// Cancel all timers and drop the agent
    pub fn stop(&mut self, timers: &mut TimerQueue) {
        self.cancel_timers(timers);
        if self.agent.take().is_some() {
            tracing::info!("Stopped agent");
        }
        self.state = SchedulerState::Idle;
    }

    pub fn set_speed_multiplier(
        &mut self,
        factor: f64,
        timers: &mut TimerQueue,
    ) -> Result<(), MazeError> {
        validate_speed(factor)?;
        self.speed_multiplier = factor;

        // A running interval picks up the new speed immediately
        if self.state == SchedulerState::Autonomous {
            self.arm_tick(self.kind(), timers);
        }
        Ok(())
    }

    /// Handle a tick timer firing
    pub fn tick(
        &mut self,
        id: TimerId,
        ctx: &mut AgentContext<'_>,
        current: Position,
        timers: &mut TimerQueue,
    ) -> TickOutcome {
        if self.tick_timer != Some(id) || self.state != SchedulerState::Autonomous {
            return TickOutcome::Ignored;
        }
        let Some(agent) = self.agent.as_mut() else {
            return TickOutcome::Ignored;
        };

        match agent.decide_next_position(ctx, current) {
            Some(next) => TickOutcome::Moved(next),
            None => {
                tracing::warn!("{} agent stalled at {}, stopping ticks", agent.kind(), current);
                timers.cancel(id);
                self.tick_timer = None;
                self.state = SchedulerState::Idle;
                TickOutcome::Stalled
            }
        }
    }

    /// Manual input arrived; suspend the agent and (re)arm the resume timer
    ///
    /// Returns false when no agent is configured and there is nothing to
    /// arbitrate.
    pub fn on_manual_input(&mut self, timers: &mut TimerQueue) -> bool {
        if self.agent.is_none() {
            return false;
        }

        if let Some(id) = self.tick_timer.take() {
            timers.cancel(id);
            tracing::debug!("Manual override, agent tick suspended");
        }
        if let Some(id) = self.resume_timer.take() {
            timers.cancel(id);
        }

        self.state = SchedulerState::ManualOverride;
        self.resume_timer = Some(timers.set_timeout(TimerKind::Resume, self.timing.resume_delay()));
        true
    }

    /// Handle a resume timer firing
    pub fn resume(&mut self, id: TimerId, timers: &mut TimerQueue) -> bool {
        if self.resume_timer != Some(id) {
            return false;
        }
        self.resume_timer = None;

        tracing::debug!("Resuming {} agent after manual override", self.kind());
        self.start(self.kind(), timers);
        true
    }

    /// The maze was replaced and the player reset
    ///
    /// Cached routes are dropped. Unless manual input is pending, a smart
    /// or stalled agent restarts against the new maze. A random agent just
    /// keeps its interval.
    pub fn on_maze_regenerated(&mut self, timers: &mut TimerQueue) {
        if let Some(agent) = self.agent.as_mut() {
            agent.reset();
        }

        let restart = match self.state {
            SchedulerState::ManualOverride => false,
            SchedulerState::Autonomous => self.kind() == AgentKind::Smart,
            SchedulerState::Idle => self.agent.is_some(),
        };
        if restart {
            self.start(self.kind(), timers);
        }
    }

    fn arm_tick(&mut self, kind: AgentKind, timers: &mut TimerQueue) {
        if let Some(id) = self.tick_timer.take() {
            timers.cancel(id);
        }
        let interval = self.timing.tick_interval(kind, self.speed_multiplier);
        self.tick_timer = Some(timers.set_interval(TimerKind::AgentTick, interval));
    }

    fn cancel_timers(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.tick_timer.take() {
            timers.cancel(id);
        }
        if let Some(id) = self.resume_timer.take() {
            timers.cancel(id);
        }
    }
}
