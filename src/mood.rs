//! Pet mood with scheduled reverts to idle.
//!
//! Each assignment bumps a generation counter and hands back a
//! [`RevertToken`]. A scheduled revert only fires while its token is still
//! the current generation, so a newer assignment silently invalidates any
//! older timer instead of racing it.

use crate::model::Mood;
use std::time::{Duration, Instant};

pub(crate) const REPLY_HAPPY_FOR: Duration = Duration::from_secs(4);
pub(crate) const REMINDER_WORRIED_FOR: Duration = Duration::from_secs(5);
pub(crate) const POKE_HAPPY_FOR: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RevertToken(u64);

#[derive(Clone, Copy, Debug)]
struct PendingRevert {
    token: RevertToken,
    due: Instant,
}

#[derive(Clone, Debug)]
pub(crate) struct MoodController {
    current: Mood,
    generation: u64,
    pending: Option<PendingRevert>,
}

impl MoodController {
    pub(crate) fn new() -> Self {
        Self {
            current: Mood::Idle,
            generation: 0,
            pending: None,
        }
    }

    pub(crate) fn current(&self) -> Mood {
        self.current
    }

    /// Assigns a mood with no revert. Any pending revert is superseded.
    pub(crate) fn set(&mut self, mood: Mood) -> RevertToken {
        self.generation = self.generation.wrapping_add(1);
        self.current = mood;
        self.pending = None;
        RevertToken(self.generation)
    }

    /// Assigns a mood that falls back to idle once `hold` has passed.
    pub(crate) fn set_for(&mut self, mood: Mood, hold: Duration, now: Instant) -> RevertToken {
        let token = self.set(mood);
        self.pending = Some(PendingRevert {
            token,
            due: now + hold,
        });
        token
    }

    pub(crate) fn is_current(&self, token: RevertToken) -> bool {
        token.0 == self.generation
    }

    /// Fires a due revert. Returns true when the mood changed.
    pub(crate) fn poll(&mut self, now: Instant) -> bool {
        let Some(p) = self.pending else {
            return false;
        };
        if now < p.due {
            return false;
        }
        self.pending = None;
        if !self.is_current(p.token) {
            return false;
        }
        self.set(Mood::Idle);
        true
    }

    pub(crate) fn on_send(&mut self) {
        self.set(Mood::Thinking);
    }

    pub(crate) fn on_reply(&mut self, now: Instant) {
        self.set_for(Mood::Happy, REPLY_HAPPY_FOR, now);
    }

    pub(crate) fn on_health_check(&mut self, now: Instant) {
        self.set_for(Mood::Worried, REMINDER_WORRIED_FOR, now);
    }

    pub(crate) fn on_poke(&mut self, now: Instant) {
        self.set_for(Mood::Happy, POKE_HAPPY_FOR, now);
    }
}

impl Default for MoodController {
    fn default() -> Self {
        Self::new()
    }
}
