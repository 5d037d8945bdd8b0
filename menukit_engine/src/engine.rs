use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, error};
use menukit_core::{Action, ClickContext, CloseContext, RawKind, ViewMode, ViewerId};
use serde::Serialize;

use crate::animation::{Animation, AnimationPhase, FrameFn};
use crate::menu::Menu;
use crate::scheduler::{TaskOutcome, TickScheduler};
use crate::surface::{SurfaceId, SurfaceProvider};
use crate::viewers::{Binding, ViewerRegistry};

/// One host-level input event, before action mapping.
///
/// Drag strokes arrive pre-split: the host reports even-fingered drags as
/// `DragEven` and odd ones as `DragOdd`, which map to plain click and
/// right-click respectively.
#[derive(Debug, Clone)]
pub struct RawInteraction {
    pub viewer: ViewerId,
    pub surface: SurfaceId,
    pub slot: i32,
    pub kind: RawKind,
    pub shift: bool,
}

struct EngineInner {
    viewers: ViewerRegistry,
    provider: Box<dyn SurfaceProvider>,
    events: Vec<String>,
}

/// Single-threaded menu engine.
///
/// Owns the viewer registry, the surface provider, and the tick scheduler.
/// Opens are queued and run on the next tick; interactions and closes take
/// effect immediately. Clones share state.
#[derive(Clone)]
pub struct MenuEngine {
    inner: Rc<RefCell<EngineInner>>,
    scheduler: Rc<RefCell<TickScheduler>>,
}

impl MenuEngine {
    pub fn new(provider: Box<dyn SurfaceProvider>) -> Self {
        MenuEngine {
            inner: Rc::new(RefCell::new(EngineInner {
                viewers: ViewerRegistry::new(),
                provider,
                events: Vec::new(),
            })),
            scheduler: Rc::new(RefCell::new(TickScheduler::new())),
        }
    }

    /// Queues the menu to open for the viewer on the next tick.
    pub fn open(&self, viewer: &ViewerId, menu: &Menu) {
        self.enqueue_open(viewer.clone(), menu.clone(), ViewMode::Modify, None);
    }

    pub fn open_with_mode(&self, viewer: &ViewerId, menu: &Menu, mode: ViewMode) {
        self.enqueue_open(viewer.clone(), menu.clone(), mode, None);
    }

    /// Opens a child menu, remembering the viewer's current menu so a back
    /// control can return to it.
    pub fn open_sub_menu(&self, viewer: &ViewerId, menu: &Menu) {
        let previous = self
            .inner
            .borrow()
            .viewers
            .lookup(viewer)
            .map(|binding| binding.menu.clone());
        self.enqueue_open(viewer.clone(), menu.clone(), ViewMode::Modify, previous);
    }

    /// Opens immediately, bypassing the tick queue. Only safe from code
    /// already running on the engine's tick.
    pub fn open_synchronized(&self, viewer: &ViewerId, menu: &Menu, mode: ViewMode) {
        self.perform_open(viewer, menu, mode, None);
    }

    fn enqueue_open(&self, viewer: ViewerId, menu: Menu, mode: ViewMode, previous: Option<Menu>) {
        let engine = self.clone();
        self.scheduler.borrow_mut().run_on_tick(move || {
            engine.perform_open(&viewer, &menu, mode, previous);
        });
    }

    fn perform_open(&self, viewer: &ViewerId, menu: &Menu, mode: ViewMode, previous: Option<Menu>) {
        let page = menu.current_page();
        if !menu.has_surface() {
            let created = self.inner.borrow_mut().provider.create_surface(
                viewer,
                menu.slots_per_page(),
                &menu.title_for(page),
            );
            match created {
                Ok(surface) => menu.set_surface(surface),
                Err(err) => {
                    error!("open of menu {} for {viewer} aborted: {err}", menu.id().value());
                    self.log_event(format!(
                        "open-aborted menu={} viewer={viewer}",
                        menu.id().value()
                    ));
                    return;
                }
            }
        }

        let replaced = self.inner.borrow_mut().viewers.bind(
            viewer.clone(),
            Binding {
                menu: menu.clone(),
                mode,
                page,
                previous,
            },
        );
        if let Some(old) = replaced {
            if old.menu.id() != menu.id() && self.viewer_count(&old.menu) == 0 {
                old.menu.stop_all_animations();
            }
        }

        menu.render();
        if self.viewer_count(menu) == 1 {
            self.start_page_animations(menu);
        }
        self.log_event(format!(
            "open menu={} viewer={viewer} page={page} mode={mode:?}",
            menu.id().value()
        ));
    }

    /// Detaches the viewer, fires the menu's close handler, and stops the
    /// menu's animations when no viewer remains. Returns the parent menu
    /// recorded at `open_sub_menu` time, if any.
    pub fn close(&self, viewer: &ViewerId) -> Option<Menu> {
        let binding = self.inner.borrow_mut().viewers.unbind(viewer)?;
        if let Some(handler) = binding.menu.close_handler() {
            let context = CloseContext {
                viewer: viewer.clone(),
                page: binding.page,
            };
            if let Err(err) = handler(&context) {
                error!(
                    "close handler of menu {} failed for {viewer}: {err:#}",
                    binding.menu.id().value()
                );
                self.log_event(format!(
                    "close-handler-error menu={} viewer={viewer}",
                    binding.menu.id().value()
                ));
            }
        }
        if self.viewer_count(&binding.menu) == 0 {
            binding.menu.stop_all_animations();
        }
        self.log_event(format!(
            "close menu={} viewer={viewer}",
            binding.menu.id().value()
        ));
        binding.previous
    }

    /// Closes every viewer of the menu.
    pub fn close_all(&self, menu: &Menu) {
        for viewer in self.viewers_of(menu) {
            self.close(&viewer);
        }
    }

    /// Closes the viewer's menu and queues its recorded parent to reopen.
    /// Returns false when the viewer is unbound or has no parent.
    pub fn open_previous(&self, viewer: &ViewerId) -> bool {
        let mode = match self.inner.borrow().viewers.lookup(viewer) {
            Some(binding) => binding.mode,
            None => return false,
        };
        match self.close(viewer) {
            Some(previous) => {
                self.enqueue_open(viewer.clone(), previous, mode, None);
                true
            }
            None => false,
        }
    }

    /// Turns the viewer's menu to the page, re-renders, and moves the
    /// animation window. Pages are not clamped here; the pagination
    /// presets consult the content bounds before placing turners.
    pub fn open_page(&self, viewer: &ViewerId, page: i32) -> bool {
        let menu = match self.inner.borrow().viewers.lookup(viewer) {
            Some(binding) => binding.menu.clone(),
            None => return false,
        };
        for animation in menu.animations_on_page(menu.current_page()) {
            animation.stop();
        }
        menu.set_page(page);
        {
            let mut inner = self.inner.borrow_mut();
            for viewer in inner.viewers.viewers_of(menu.id()) {
                if let Some(binding) = inner.viewers.lookup_mut(&viewer) {
                    binding.page = page;
                }
            }
        }
        menu.render();
        self.start_page_animations(&menu);
        self.log_event(format!(
            "page menu={} viewer={viewer} page={page}",
            menu.id().value()
        ));
        true
    }

    pub fn open_next_page(&self, viewer: &ViewerId) -> bool {
        match self.page_of(viewer) {
            Some(page) => self.open_page(viewer, page + 1),
            None => false,
        }
    }

    pub fn open_previous_page(&self, viewer: &ViewerId) -> bool {
        match self.page_of(viewer) {
            Some(page) => self.open_page(viewer, page - 1),
            None => false,
        }
    }

    /// Maps a raw input event to an action and dispatches it. Returns the
    /// cancellation outcome: true suppresses the underlying host
    /// operation. Events from unbound viewers or stale surfaces are
    /// ignored.
    pub fn handle_raw(&self, event: &RawInteraction) -> bool {
        let binding = match self.inner.borrow().viewers.lookup(&event.viewer) {
            Some(binding) => binding.clone(),
            None => return false,
        };
        if binding.menu.surface_id() != Some(event.surface) {
            return false;
        }
        let action = Action::from_raw(event.kind, event.shift);
        let mut context =
            ClickContext::new(event.viewer.clone(), event.slot, binding.page, action, true);
        self.handle_interact(&binding.menu, &mut context)
    }

    /// Dispatches an interaction already mapped to an action. Handler
    /// errors force cancellation but never unwind; whatever the handler
    /// mutated before failing stays committed.
    pub fn handle_interact(&self, menu: &Menu, context: &mut ClickContext) -> bool {
        let mode = match self.inner.borrow().viewers.lookup(context.viewer()) {
            Some(binding) if binding.menu.id() == menu.id() => binding.mode,
            _ => return false,
        };
        if !menu.contains_slot(context.slot()) {
            return false;
        }
        if mode == ViewMode::View {
            return true;
        }
        let Some(handler) = menu.resolve_handler(context.page(), context.slot(), context.action())
        else {
            return context.is_cancelled();
        };
        if let Err(err) = handler(self, menu, context) {
            context.set_cancelled(true);
            error!(
                "handler failed for {} at slot {}: {err:#}",
                context.viewer(),
                context.slot()
            );
            self.log_event(format!(
                "handler-error menu={} viewer={} slot={}",
                menu.id().value(),
                context.viewer(),
                context.slot()
            ));
        }
        context.is_cancelled()
    }

    /// Registers a periodic slot animation. Starts immediately when the
    /// menu is being viewed and the slot is on the shown page; otherwise
    /// it starts once its page is shown to the first viewer.
    pub fn play_animation(
        &self,
        menu: &Menu,
        slot: i32,
        interval_limit: Option<u32>,
        period: u64,
        frame: FrameFn,
    ) -> Animation {
        let animation = Animation::new(slot, interval_limit, period, frame);
        menu.register_animation(animation.clone());
        if self.viewer_count(menu) > 0 && menu.slot_on_page(menu.current_page(), slot) {
            self.start_animation(menu, &animation);
        }
        animation
    }

    /// Starts every startable animation on the menu's shown page.
    pub fn start_page_animations(&self, menu: &Menu) {
        for animation in menu.animations_on_page(menu.current_page()) {
            self.start_animation(menu, &animation);
        }
    }

    fn start_animation(&self, menu: &Menu, animation: &Animation) {
        if matches!(
            animation.phase(),
            AnimationPhase::Running | AnimationPhase::Exhausted
        ) {
            return;
        }
        let generation = animation.mark_running();
        let weak = menu.downgrade();
        let animation = animation.clone();
        self.scheduler
            .borrow_mut()
            .schedule_periodic(animation.period(), move |now| match weak.upgrade() {
                Some(menu) => animation.tick(&menu, now, generation),
                None => TaskOutcome::Stop,
            });
    }

    /// Advances one tick and drains everything due: queued opens and
    /// animation intervals. Returns the new tick count.
    pub fn tick(&self) -> u64 {
        let now = self.scheduler.borrow_mut().begin_tick();
        loop {
            let task = self.scheduler.borrow_mut().pop_due();
            let Some(task) = task else { break };
            if let Some(followup) = task.run(now) {
                self.scheduler.borrow_mut().requeue(followup);
            }
        }
        now
    }

    pub fn run_ticks(&self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    pub fn now(&self) -> u64 {
        self.scheduler.borrow().now()
    }

    pub fn log_event(&self, event: impl Into<String>) {
        let event = event.into();
        debug!("{event}");
        self.inner.borrow_mut().events.push(event);
    }

    /// Ordered trail of opens, closes, page turns, and failures.
    pub fn events(&self) -> Vec<String> {
        self.inner.borrow().events.clone()
    }

    pub fn viewers_of(&self, menu: &Menu) -> Vec<ViewerId> {
        self.inner.borrow().viewers.viewers_of(menu.id())
    }

    pub fn viewer_count(&self, menu: &Menu) -> usize {
        self.inner.borrow().viewers.count_of(menu.id())
    }

    pub fn menu_of(&self, viewer: &ViewerId) -> Option<Menu> {
        self.inner
            .borrow()
            .viewers
            .lookup(viewer)
            .map(|binding| binding.menu.clone())
    }

    pub fn mode_of(&self, viewer: &ViewerId) -> Option<ViewMode> {
        self.inner
            .borrow()
            .viewers
            .lookup(viewer)
            .map(|binding| binding.mode)
    }

    pub fn page_of(&self, viewer: &ViewerId) -> Option<i32> {
        self.inner
            .borrow()
            .viewers
            .lookup(viewer)
            .map(|binding| binding.page)
    }

    /// Exportable view of a menu's current state.
    pub fn snapshot(&self, menu: &Menu) -> MenuSnapshot {
        MenuSnapshot {
            id: menu.id().value(),
            title: menu.title(),
            page: menu.current_page(),
            min_page: menu.min_page(),
            max_page: menu.max_page(),
            viewers: self
                .viewers_of(menu)
                .iter()
                .map(|viewer| viewer.to_string())
                .collect(),
            cells: menu
                .effective_cells()
                .into_iter()
                .map(|(slot, cell)| (slot, cell.id))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuSnapshot {
    pub id: u64,
    pub title: String,
    pub page: i32,
    pub min_page: i32,
    pub max_page: i32,
    pub viewers: Vec<String>,
    pub cells: BTreeMap<i32, String>,
}
