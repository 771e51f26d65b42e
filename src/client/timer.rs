// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study timer with bonus point awards.
//!
//! [`TimerState`] is the synchronous state machine; [`TimerClient`] drives it
//! from a one-second tick task and performs the award calls.
//!
//! Awards are keyed by the absolute elapsed value: a boundary is any
//! non-zero multiple of [`REWARD_INTERVAL_SECONDS`], and each boundary of a
//! run is requested at most once because `elapsed` only moves forward until
//! a reset. Failed awards are not retried.

use crate::client::{AwardGrant, AwardTransport, ClientError};
use crate::models::UserId;
use crate::{POINTS_PER_INTERVAL, REWARD_INTERVAL_SECONDS};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// How long the "+N points" notice stays up.
pub const REWARD_NOTICE_DURATION: Duration = Duration::from_secs(3);

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Shown (once) while awards are failing.
pub const AWARD_ERROR_MESSAGE: &str = "Failed to update study time. Please try again later.";

/// Render seconds as `HH:MM:SS`.
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
}

/// A boundary that crossed the reward condition and needs an award call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardTicket {
    pub boundary: u64,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardNotice {
    pub points: u64,
    pub message: String,
    seq: u64,
}

/// What a completed award did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    /// Boundary recorded; the reward notice with this sequence number is up
    Rewarded { notice_seq: u64 },
    /// Balance reconciled, but the ticket predates a reset
    Stale,
    /// Award failed; `first` is false when an error notice was already up
    Failed { first: bool },
}

/// Synchronous study timer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    elapsed: u64,
    phase: TimerPhase,
    last_awarded_boundary: u64,
    generation: u64,
    bonus_points: Option<u64>,
    reward_notice: Option<RewardNotice>,
    error_notice: Option<String>,
    notice_seq: u64,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self {
            elapsed: 0,
            phase: TimerPhase::Idle,
            last_awarded_boundary: 0,
            generation: 0,
            bonus_points: None,
            reward_notice: None,
            error_notice: None,
            notice_seq: 0,
        }
    }

    /// Seed the displayed balance (e.g. from the session).
    pub fn with_bonus_points(mut self, points: u64) -> Self {
        self.bonus_points = Some(points);
        self
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn last_awarded_boundary(&self) -> u64 {
        self.last_awarded_boundary
    }

    pub fn bonus_points(&self) -> Option<u64> {
        self.bonus_points
    }

    pub fn reward_notice(&self) -> Option<&RewardNotice> {
        self.reward_notice.as_ref()
    }

    pub fn error_notice(&self) -> Option<&str> {
        self.error_notice.as_deref()
    }

    /// Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.phase = TimerPhase::Running;
        true
    }

    /// Returns false if already idle.
    pub fn pause(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.phase = TimerPhase::Idle;
        true
    }

    /// Stop and zero the timer. Awards still in flight will update the
    /// balance when they land but can no longer mark a boundary.
    pub fn reset(&mut self) {
        self.phase = TimerPhase::Idle;
        self.elapsed = 0;
        self.last_awarded_boundary = 0;
        self.generation += 1;
    }

    /// Advance one second and evaluate the reward condition.
    ///
    /// Ignored while idle.
    pub fn tick(&mut self) -> Option<AwardTicket> {
        if !self.is_running() {
            return None;
        }
        self.elapsed += 1;

        let at_boundary = self.elapsed > 0 && self.elapsed % REWARD_INTERVAL_SECONDS == 0;
        if at_boundary && self.elapsed != self.last_awarded_boundary {
            Some(AwardTicket {
                boundary: self.elapsed,
                generation: self.generation,
            })
        } else {
            None
        }
    }

    /// Apply the result of the award call made for `ticket`.
    pub fn complete_award(
        &mut self,
        ticket: AwardTicket,
        result: Result<AwardGrant, ClientError>,
    ) -> AwardOutcome {
        match result {
            Ok(grant) => {
                self.bonus_points = Some(grant.points);
                self.error_notice = None;

                if ticket.generation != self.generation {
                    return AwardOutcome::Stale;
                }
                // Completions can arrive out of order; never move the guard back.
                self.last_awarded_boundary = self.last_awarded_boundary.max(ticket.boundary);

                self.notice_seq += 1;
                self.reward_notice = Some(RewardNotice {
                    points: POINTS_PER_INTERVAL,
                    message: grant.message,
                    seq: self.notice_seq,
                });
                AwardOutcome::Rewarded {
                    notice_seq: self.notice_seq,
                }
            }
            Err(_) => {
                let first = self.error_notice.is_none();
                self.error_notice = Some(AWARD_ERROR_MESSAGE.to_string());
                AwardOutcome::Failed { first }
            }
        }
    }

    /// Take down the reward notice if it is still the one numbered `seq`.
    pub fn clear_reward_notice(&mut self, seq: u64) -> bool {
        match &self.reward_notice {
            Some(notice) if notice.seq == seq => {
                self.reward_notice = None;
                true
            }
            _ => false,
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error_notice = None;
    }
}

/// Aborts the tick task when dropped.
struct TickSource(JoinHandle<()>);

impl Drop for TickSource {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Shared<T> {
    state: Mutex<TimerState>,
    updates: watch::Sender<TimerState>,
    transport: Arc<T>,
    user_id: Option<String>,
}

impl<T: AwardTransport> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against the state and publish the result.
    fn update<R>(&self, f: impl FnOnce(&mut TimerState) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        self.updates.send_replace(state.clone());
        result
    }

    fn on_tick(self: &Arc<Self>) {
        if let Some(ticket) = self.update(TimerState::tick) {
            self.request_award(ticket);
        }
    }

    fn request_award(self: &Arc<Self>, ticket: AwardTicket) {
        let user_id = match self.user_id.as_deref().map(str::parse::<UserId>) {
            Some(Ok(id)) => id,
            _ => {
                tracing::warn!(boundary = ticket.boundary, "No valid user id; award skipped");
                self.finish_award(ticket, Err(ClientError::InvalidUserId));
                return;
            }
        };

        tracing::debug!(user_id = %user_id, boundary = ticket.boundary, "Requesting award");
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let result = shared.transport.award_time(&user_id).await;
            shared.finish_award(ticket, result);
        });
    }

    fn finish_award(self: &Arc<Self>, ticket: AwardTicket, result: Result<AwardGrant, ClientError>) {
        if let Err(e) = &result {
            tracing::warn!(boundary = ticket.boundary, error = %e, "Award failed");
        }

        match self.update(|state| state.complete_award(ticket, result)) {
            AwardOutcome::Rewarded { notice_seq } => {
                let shared = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(REWARD_NOTICE_DURATION).await;
                    shared.update(|state| state.clear_reward_notice(notice_seq));
                });
            }
            AwardOutcome::Stale => {
                tracing::debug!(boundary = ticket.boundary, "Award landed after reset");
            }
            AwardOutcome::Failed { .. } => {}
        }
    }
}

/// Study timer bound to one user session.
///
/// Must be used inside a Tokio runtime. Dropping the client stops the tick
/// task; award calls already in flight still complete.
pub struct TimerClient<T: AwardTransport> {
    shared: Arc<Shared<T>>,
    ticker: Mutex<Option<TickSource>>,
}

impl<T: AwardTransport> TimerClient<T> {
    /// `user_id` is the raw id from the session; it is validated per award.
    pub fn new(transport: Arc<T>, user_id: Option<String>) -> Self {
        Self::with_state(transport, user_id, TimerState::new())
    }

    pub fn with_state(transport: Arc<T>, user_id: Option<String>, state: TimerState) -> Self {
        let (updates, _) = watch::channel(state.clone());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
                transport,
                user_id,
            }),
            ticker: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        if !self.shared.update(TimerState::start) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        let handle = tokio::spawn(async move {
            loop {
                interval.tick().await;
                shared.on_tick();
            }
        });

        *self.ticker_slot() = Some(TickSource(handle));
    }

    pub fn pause(&self) {
        self.stop_ticks();
        self.shared.update(TimerState::pause);
    }

    pub fn reset(&self) {
        self.stop_ticks();
        self.shared.update(TimerState::reset);
    }

    /// Start when idle, pause when running.
    pub fn toggle(&self) {
        if self.snapshot().is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn dismiss_error(&self) {
        self.shared.update(TimerState::dismiss_error);
    }

    pub fn snapshot(&self) -> TimerState {
        self.shared.lock().clone()
    }

    /// Observe every state change.
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.shared.updates.subscribe()
    }

    fn ticker_slot(&self) -> MutexGuard<'_, Option<TickSource>> {
        self.ticker.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stop_ticks(&self) {
        self.ticker_slot().take();
    }
}
