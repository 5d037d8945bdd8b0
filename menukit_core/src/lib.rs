//! Shared value types for the menukit menu framework.
//!
//! Menus address their content by integer slot index. Persistent content is
//! stored against absolute indices (`page * slots_per_page + slot`) while
//! rendering and interaction use page-relative indices; this crate keeps the
//! types for both conventions in one place so the engine and its hosts stay
//! consistent.

pub mod action;
pub mod cell;
pub mod context;
pub mod error;
pub mod slot_map;
pub mod viewer;

pub use action::{Action, RawKind};
pub use cell::Cell;
pub use context::{AnimationContext, ClickContext, CloseContext};
pub use error::SurfaceError;
pub use slot_map::SlotMap;
pub use viewer::{ViewMode, ViewerId};
