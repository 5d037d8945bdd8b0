use serde::{Deserialize, Serialize};

/// Raw input kinds as delivered by the host's event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawKind {
    Primary,
    Secondary,
    Middle,
    /// Single-slot drag splitting an even amount.
    DragEven,
    /// Single-slot drag splitting an odd amount.
    DragOdd,
}

/// Logical interaction actions that handlers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Click,
    RightClick,
    ShiftClick,
    ShiftRightClick,
    MiddleClick,
}

impl Action {
    /// Derives the logical action from the raw input kind plus the shift
    /// flag. Drags collapse onto plain clicks; the split parity picks the
    /// button.
    pub fn from_raw(kind: RawKind, shift: bool) -> Self {
        match (kind, shift) {
            (RawKind::Primary, false) | (RawKind::DragEven, _) => Action::Click,
            (RawKind::Primary, true) => Action::ShiftClick,
            (RawKind::Secondary, false) | (RawKind::DragOdd, _) => Action::RightClick,
            (RawKind::Secondary, true) => Action::ShiftRightClick,
            (RawKind::Middle, _) => Action::MiddleClick,
        }
    }
}
