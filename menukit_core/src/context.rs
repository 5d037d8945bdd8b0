use crate::{Action, Cell, ViewerId};

/// Per-interaction state threaded through handler dispatch.
///
/// The cancellation flag starts at whatever default the host chose when it
/// built the context and ends up as the dispatch result: `true` suppresses
/// the underlying host operation.
#[derive(Debug, Clone)]
pub struct ClickContext {
    viewer: ViewerId,
    slot: i32,
    page: i32,
    action: Action,
    cancelled: bool,
}

impl ClickContext {
    pub fn new(viewer: ViewerId, slot: i32, page: i32, action: Action, cancelled: bool) -> Self {
        ClickContext {
            viewer,
            slot,
            page,
            action,
            cancelled,
        }
    }

    pub fn viewer(&self) -> &ViewerId {
        &self.viewer
    }

    /// Page-relative slot the interaction targeted.
    pub fn slot(&self) -> i32 {
        self.slot
    }

    pub fn page(&self) -> i32 {
        self.page
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Passed to a menu's close handler when a viewer leaves.
#[derive(Debug, Clone)]
pub struct CloseContext {
    pub viewer: ViewerId,
    pub page: i32,
}

/// Passed to animation callbacks on every tick.
#[derive(Debug, Clone)]
pub struct AnimationContext {
    /// Absolute slot the animation mutates.
    pub slot: i32,
    /// Intervals completed so far.
    pub interval: u32,
    /// Total interval budget, unbounded if `None`.
    pub interval_limit: Option<u32>,
    /// Current content of the slot, if any.
    pub cell: Option<Cell>,
    /// Scheduler tick at which the callback runs.
    pub tick: u64,
}
