use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use log::error;
use menukit_core::{AnimationContext, Cell};

use crate::menu::Menu;
use crate::scheduler::TaskOutcome;

/// Lifecycle of one slot animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    /// Registered but never started.
    Pending,
    Running,
    /// Halted by the engine or a caller; restarts when its page is shown
    /// again.
    Stopped,
    /// Ran through its whole interval budget. Never restarted.
    Exhausted,
}

/// Produces the next cell for an animated slot.
pub type FrameFn = Rc<dyn Fn(&AnimationContext) -> Result<Cell>>;

struct AnimationInner {
    slot: i32,
    interval_limit: Option<u32>,
    period: u64,
    intervals: u32,
    generation: u64,
    phase: AnimationPhase,
    frame: FrameFn,
}

/// Periodic mutation of a single absolute slot.
///
/// Clones share state, so the handle returned at registration can stop a
/// task the scheduler is still driving. Each start bumps a generation
/// counter; a queued task from an older generation sees the mismatch and
/// stops instead of double-driving the slot.
#[derive(Clone)]
pub struct Animation {
    inner: Rc<RefCell<AnimationInner>>,
}

impl Animation {
    pub fn new(slot: i32, interval_limit: Option<u32>, period: u64, frame: FrameFn) -> Self {
        Animation {
            inner: Rc::new(RefCell::new(AnimationInner {
                slot,
                interval_limit,
                period: period.max(1),
                intervals: 0,
                generation: 0,
                phase: AnimationPhase::Pending,
                frame,
            })),
        }
    }

    /// Absolute slot this animation mutates.
    pub fn slot(&self) -> i32 {
        self.inner.borrow().slot
    }

    pub fn period(&self) -> u64 {
        self.inner.borrow().period
    }

    pub fn phase(&self) -> AnimationPhase {
        self.inner.borrow().phase
    }

    /// Intervals completed in the current run.
    pub fn intervals(&self) -> u32 {
        self.inner.borrow().intervals
    }

    pub fn is_running(&self) -> bool {
        self.phase() == AnimationPhase::Running
    }

    /// Idempotent. An exhausted animation stays exhausted.
    pub fn stop(&self) {
        let mut inner = self.inner.borrow_mut();
        if matches!(inner.phase, AnimationPhase::Pending | AnimationPhase::Running) {
            inner.phase = AnimationPhase::Stopped;
        }
    }

    /// Resets the interval counter and returns the new generation the
    /// driving task must carry.
    pub(crate) fn mark_running(&self) -> u64 {
        let mut inner = self.inner.borrow_mut();
        inner.phase = AnimationPhase::Running;
        inner.intervals = 0;
        inner.generation += 1;
        inner.generation
    }

    /// Runs one interval: invokes the frame callback and applies its cell
    /// to the menu. A frame error is logged and the slot left untouched,
    /// but the interval still counts against the budget.
    pub(crate) fn tick(&self, menu: &Menu, now: u64, generation: u64) -> TaskOutcome {
        let (slot, interval_limit, interval, frame) = {
            let inner = self.inner.borrow();
            if inner.generation != generation || inner.phase != AnimationPhase::Running {
                return TaskOutcome::Stop;
            }
            (inner.slot, inner.interval_limit, inner.intervals, inner.frame.clone())
        };
        let context = AnimationContext {
            slot,
            interval,
            interval_limit,
            cell: menu.cell_at(slot),
            tick: now,
        };
        match frame(&context) {
            Ok(cell) => menu.apply_frame(slot, cell),
            Err(err) => error!("animation frame for slot {slot} failed: {err:#}"),
        }

        let mut inner = self.inner.borrow_mut();
        inner.intervals += 1;
        if let Some(limit) = inner.interval_limit {
            if inner.intervals >= limit {
                inner.phase = AnimationPhase::Exhausted;
                return TaskOutcome::Stop;
            }
        }
        if inner.generation != generation || inner.phase != AnimationPhase::Running {
            return TaskOutcome::Stop;
        }
        TaskOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{Animation, AnimationPhase};
    use crate::menu::Menu;
    use crate::scheduler::TaskOutcome;
    use menukit_core::Cell;

    #[test]
    fn budget_exhausts_after_exact_interval_count() {
        let menu = Menu::new(1, 9, "budget");
        let animation = Animation::new(4, Some(2), 1, Rc::new(|ctx| {
            Ok(Cell::new(format!("frame-{}", ctx.interval)))
        }));

        let generation = animation.mark_running();
        assert_eq!(animation.tick(&menu, 1, generation), TaskOutcome::Continue);
        assert_eq!(animation.tick(&menu, 2, generation), TaskOutcome::Stop);
        assert_eq!(animation.phase(), AnimationPhase::Exhausted);
        assert_eq!(menu.cell_at(4), Some(Cell::new("frame-1")));
    }

    #[test]
    fn stale_generation_stops_without_mutating() {
        let menu = Menu::new(1, 9, "stale");
        let animation = Animation::new(0, None, 1, Rc::new(|_| Ok(Cell::new("spark"))));

        let old = animation.mark_running();
        let _new = animation.mark_running();
        assert_eq!(animation.tick(&menu, 1, old), TaskOutcome::Stop);
        assert_eq!(menu.cell_at(0), None);
    }

    #[test]
    fn stop_is_idempotent_and_preserves_exhaustion() {
        let animation = Animation::new(0, Some(1), 1, Rc::new(|_| Ok(Cell::new("x"))));
        animation.stop();
        animation.stop();
        assert_eq!(animation.phase(), AnimationPhase::Stopped);

        let menu = Menu::new(1, 9, "exhaust");
        let generation = animation.mark_running();
        animation.tick(&menu, 1, generation);
        assert_eq!(animation.phase(), AnimationPhase::Exhausted);
        animation.stop();
        assert_eq!(animation.phase(), AnimationPhase::Exhausted);
    }

    #[test]
    fn frame_errors_count_against_the_budget() {
        let menu = Menu::new(1, 9, "errors");
        let animation = Animation::new(2, Some(1), 1, Rc::new(|_| {
            Err(anyhow::anyhow!("flaky frame"))
        }));

        let generation = animation.mark_running();
        assert_eq!(animation.tick(&menu, 1, generation), TaskOutcome::Stop);
        assert_eq!(animation.phase(), AnimationPhase::Exhausted);
        assert_eq!(menu.cell_at(2), None);
    }
}
