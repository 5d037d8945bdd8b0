//! Session-oriented, slot-addressable menu engine.
//!
//! A [`Menu`] stores persistent cells and handlers keyed by absolute slot
//! while rendering one page at a time through a host-provided
//! [`Surface`]. The [`MenuEngine`] binds viewers to menus, maps raw input
//! to actions, dispatches handlers inside a failure boundary, and drives
//! slot animations on its [`TickScheduler`]. Everything is single
//! threaded; queued opens and animation intervals run when the host pumps
//! [`MenuEngine::tick`].

pub mod animation;
pub mod engine;
pub mod handlers;
pub mod menu;
pub mod preset;
pub mod scheduler;
pub mod surface;
pub mod viewers;

pub use animation::{Animation, AnimationPhase, FrameFn};
pub use engine::{MenuEngine, MenuSnapshot, RawInteraction};
pub use handlers::{Handler, HandlerRegistry};
pub use menu::{CloseHandler, Menu, MenuId, WeakMenu};
pub use preset::{Preset, PresetId};
pub use scheduler::{TaskHandle, TaskOutcome, TickScheduler};
pub use surface::{GridSurface, GridSurfaces, Surface, SurfaceId, SurfaceProvider};
pub use viewers::{Binding, ViewerRegistry};
