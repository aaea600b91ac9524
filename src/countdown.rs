use std::collections::HashMap;

use crate::Result;
use crate::dom::{Dom, NodeId};
use crate::scheduler::TimerHandle;

const ANIMATION: &str = "animation";
const ANIMATION_PLAY_STATE: &str = "animation-play-state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Running(TimerHandle),
    Expired,
}

/// Scheduler payload of a running countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CountdownTask {
    pub(crate) qr_id: String,
    pub(crate) timer_id: String,
    pub(crate) increment_id: String,
}

#[derive(Debug, Clone)]
struct CountdownEntry {
    state: CountdownState,
    original_animation: String,
}

/// Countdown state per timer element id.
#[derive(Debug, Default)]
pub(crate) struct Countdowns {
    entries: HashMap<String, CountdownEntry>,
}

impl Countdowns {
    pub(crate) fn state(&self, timer_id: &str) -> CountdownState {
        self.entries
            .get(timer_id)
            .map(|entry| entry.state)
            .unwrap_or(CountdownState::Idle)
    }

    pub(crate) fn running_handle(&self, timer_id: &str) -> Option<TimerHandle> {
        match self.state(timer_id) {
            CountdownState::Running(handle) => Some(handle),
            CountdownState::Idle | CountdownState::Expired => None,
        }
    }

    pub(crate) fn start(&mut self, timer_id: &str, handle: TimerHandle, original_animation: String) {
        self.entries.insert(
            timer_id.to_string(),
            CountdownEntry {
                state: CountdownState::Running(handle),
                original_animation,
            },
        );
    }

    /// Marks the countdown expired and hands back the animation value to
    /// restore.
    pub(crate) fn expire(&mut self, timer_id: &str) -> Option<String> {
        let entry = self.entries.get_mut(timer_id)?;
        entry.state = CountdownState::Expired;
        Some(entry.original_animation.clone())
    }

    /// Returns the countdown of `handle` to idle, yielding its timer id and
    /// the animation value to restore.
    pub(crate) fn cancel(&mut self, handle: TimerHandle) -> Option<(String, String)> {
        let (timer_id, entry) = self
            .entries
            .iter_mut()
            .find(|(_, entry)| entry.state == CountdownState::Running(handle))?;
        entry.state = CountdownState::Idle;
        Some((timer_id.clone(), entry.original_animation.clone()))
    }
}

/// Inline `animation` value before a countdown touches the element.
pub(crate) fn current_animation(dom: &Dom, timer: NodeId) -> Result<String> {
    dom.style_get(timer, ANIMATION)
}

pub(crate) fn start_animation(dom: &mut Dom, timer: NodeId) -> Result<()> {
    dom.style_set(timer, ANIMATION_PLAY_STATE, "running")
}

/// Restarts the visual timer from scratch: the animation is switched off, a
/// layout pass commits that, then the original shorthand comes back. The
/// shorthand also resets the play state, so the inline one is dropped.
pub(crate) fn reset_animation(dom: &mut Dom, timer: NodeId, original: &str) -> Result<()> {
    dom.style_set(timer, ANIMATION, "none")?;
    dom.offset_width(timer)?;
    dom.style_set(timer, ANIMATION, original)?;
    dom.style_set(timer, ANIMATION_PLAY_STATE, "")
}
