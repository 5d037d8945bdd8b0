use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use menukit_core::{Action, Cell, CloseContext, SlotMap};

use crate::animation::Animation;
use crate::handlers::{Handler, HandlerRegistry};
use crate::preset::{Preset, PresetId};
use crate::surface::{Surface, SurfaceId};

static NEXT_MENU_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique menu identity, used to index viewer bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(u64);

impl MenuId {
    fn next() -> Self {
        MenuId(NEXT_MENU_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Fired once per viewer leaving the menu, after the binding is gone.
pub type CloseHandler = Rc<dyn Fn(&CloseContext) -> Result<()>>;

struct MenuInner {
    id: MenuId,
    title: String,
    page_titles: BTreeMap<i32, String>,
    /// Sorted page-relative slot mask.
    slots: Vec<i32>,
    slots_per_page: i32,
    columns: i32,
    current_page: i32,
    cells: SlotMap,
    handlers: HandlerRegistry,
    presets: Vec<(PresetId, Rc<dyn Preset>)>,
    next_preset: u64,
    close_handler: Option<CloseHandler>,
    animations: BTreeMap<i32, Vec<Animation>>,
    overlay_cells: BTreeMap<i32, Cell>,
    overlay_handlers: BTreeMap<i32, HashMap<Action, Handler>>,
    surface: Option<Box<dyn Surface>>,
}

/// Cheaply cloneable handle to one menu.
///
/// Persistent content and handlers are keyed by absolute slot
/// (`page * slots_per_page + page_relative_slot`); rendering, dispatch, and
/// preset overlays speak page-relative slots for the page currently shown.
#[derive(Clone)]
pub struct Menu {
    inner: Rc<RefCell<MenuInner>>,
}

/// Non-owning handle captured by scheduled tasks so a dropped menu tears
/// its animations down instead of being kept alive by them.
#[derive(Clone)]
pub struct WeakMenu {
    inner: Weak<RefCell<MenuInner>>,
}

impl WeakMenu {
    pub fn upgrade(&self) -> Option<Menu> {
        self.inner.upgrade().map(|inner| Menu { inner })
    }
}

impl Menu {
    /// Full grid of `rows * columns` page-relative slots.
    pub fn new(rows: i32, columns: i32, title: impl Into<String>) -> Self {
        let row_indices: Vec<i32> = (0..rows).collect();
        Self::with_rows(&row_indices, columns, title)
    }

    /// Menu covering only the named row indices. Slots outside the mask
    /// never reach handlers.
    pub fn with_rows(rows: &[i32], columns: i32, title: impl Into<String>) -> Self {
        let mut slots: Vec<i32> = rows
            .iter()
            .flat_map(|row| row * columns..(row + 1) * columns)
            .collect();
        slots.sort_unstable();
        slots.dedup();
        let slots_per_page = slots.len() as i32;
        Menu {
            inner: Rc::new(RefCell::new(MenuInner {
                id: MenuId::next(),
                title: title.into(),
                page_titles: BTreeMap::new(),
                slots,
                slots_per_page,
                columns,
                current_page: 0,
                cells: SlotMap::new(),
                handlers: HandlerRegistry::new(),
                presets: Vec::new(),
                next_preset: 0,
                close_handler: None,
                animations: BTreeMap::new(),
                overlay_cells: BTreeMap::new(),
                overlay_handlers: BTreeMap::new(),
                surface: None,
            })),
        }
    }

    pub fn downgrade(&self) -> WeakMenu {
        WeakMenu {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn id(&self) -> MenuId {
        self.inner.borrow().id
    }

    pub fn title(&self) -> String {
        self.inner.borrow().title.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.inner.borrow_mut().title = title.into();
    }

    pub fn set_page_title(&self, page: i32, title: impl Into<String>) {
        self.inner.borrow_mut().page_titles.insert(page, title.into());
    }

    /// Page-specific title, falling back to the menu title.
    pub fn title_for(&self, page: i32) -> String {
        let inner = self.inner.borrow();
        inner
            .page_titles
            .get(&page)
            .cloned()
            .unwrap_or_else(|| inner.title.clone())
    }

    pub fn columns(&self) -> i32 {
        self.inner.borrow().columns
    }

    pub fn rows(&self) -> i32 {
        let inner = self.inner.borrow();
        inner.slots_per_page / inner.columns
    }

    pub fn slots_per_page(&self) -> i32 {
        self.inner.borrow().slots_per_page
    }

    /// Page-relative slot mask, ascending.
    pub fn slots(&self) -> Vec<i32> {
        self.inner.borrow().slots.clone()
    }

    pub fn contains_slot(&self, slot: i32) -> bool {
        self.inner.borrow().slots.binary_search(&slot).is_ok()
    }

    pub fn current_page(&self) -> i32 {
        self.inner.borrow().current_page
    }

    /// Takes effect at the next render.
    pub fn set_page(&self, page: i32) {
        self.inner.borrow_mut().current_page = page;
    }

    /// Lowest page holding persistent content, never above zero.
    pub fn min_page(&self) -> i32 {
        let inner = self.inner.borrow();
        inner
            .cells
            .min_slot()
            .map(|slot| Self::page_of_absolute(&inner, slot))
            .unwrap_or(0)
            .min(0)
    }

    /// Highest page holding persistent content, never below zero.
    pub fn max_page(&self) -> i32 {
        let inner = self.inner.borrow();
        inner
            .cells
            .max_slot()
            .map(|slot| Self::page_of_absolute(&inner, slot))
            .unwrap_or(0)
            .max(0)
    }

    /// Inverse of `absolute`: masks that start above relative slot 0 shift
    /// every page window by the first mask slot.
    fn page_of_absolute(inner: &MenuInner, slot: i32) -> i32 {
        let first = inner.slots.first().copied().unwrap_or(0);
        (slot - first).div_euclid(inner.slots_per_page)
    }

    pub fn absolute(&self, page: i32, slot: i32) -> i32 {
        page * self.inner.borrow().slots_per_page + slot
    }

    pub fn set_cell(&self, slot: i32, cell: Cell) {
        self.inner.borrow_mut().cells.set(slot, cell);
    }

    pub fn set_cell_on_page(&self, page: i32, slot: i32, cell: Cell) {
        let abs = self.absolute(page, slot);
        self.set_cell(abs, cell);
    }

    pub fn set_cell_and_handler(&self, slot: i32, cell: Cell, action: Action, handler: Handler) {
        let mut inner = self.inner.borrow_mut();
        inner.cells.set(slot, cell);
        inner.handlers.set(slot, action, handler);
    }

    pub fn cell_at(&self, slot: i32) -> Option<Cell> {
        self.inner.borrow().cells.get(slot).cloned()
    }

    pub fn cell_on_page(&self, page: i32, slot: i32) -> Option<Cell> {
        let abs = self.absolute(page, slot);
        self.cell_at(abs)
    }

    pub fn remove_cell(&self, slot: i32) -> Option<Cell> {
        self.inner.borrow_mut().cells.remove(slot)
    }

    pub fn clear_cells(&self, slots: &[i32]) {
        self.inner.borrow_mut().cells.clear_slots(slots);
    }

    pub fn clear_content(&self) {
        self.inner.borrow_mut().cells.clear();
    }

    pub fn set_handler(&self, slot: i32, action: Action, handler: Handler) {
        self.inner.borrow_mut().handlers.set(slot, action, handler);
    }

    pub fn set_default_handler(&self, action: Action, handler: Handler) {
        self.inner.borrow_mut().handlers.set_default(action, handler);
    }

    pub fn remove_handler(&self, slot: i32, action: Action) {
        self.inner.borrow_mut().handlers.remove(slot, action);
    }

    pub fn remove_slot_handlers(&self, slot: i32) {
        self.inner.borrow_mut().handlers.remove_slot(slot);
    }

    pub fn remove_default_handler(&self, action: Action) {
        self.inner.borrow_mut().handlers.remove_default(action);
    }

    pub fn set_close_handler(&self, handler: CloseHandler) {
        self.inner.borrow_mut().close_handler = Some(handler);
    }

    pub(crate) fn close_handler(&self) -> Option<CloseHandler> {
        self.inner.borrow().close_handler.clone()
    }

    pub fn add_preset(&self, preset: Rc<dyn Preset>) -> PresetId {
        let mut inner = self.inner.borrow_mut();
        inner.next_preset += 1;
        let id = PresetId(inner.next_preset);
        inner.presets.push((id, preset));
        id
    }

    pub fn remove_preset(&self, id: PresetId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.presets.len();
        inner.presets.retain(|(preset_id, _)| *preset_id != id);
        inner.presets.len() != before
    }

    pub fn clear_presets(&self) {
        self.inner.borrow_mut().presets.clear();
    }

    /// Overlay handler for the page-relative slot, else the persistent
    /// handler at the absolute slot, else the action default.
    pub fn resolve_handler(&self, page: i32, slot: i32, action: Action) -> Option<Handler> {
        let inner = self.inner.borrow();
        if let Some(overlay) = inner.overlay_handlers.get(&slot) {
            if let Some(handler) = overlay.get(&action) {
                return Some(handler.clone());
            }
        }
        let abs = page * inner.slots_per_page + slot;
        inner.handlers.resolve(abs, action)
    }

    /// Recomputes preset overlays for the current page and writes every
    /// mask slot's effective cell to the surface, if one is attached.
    pub fn render(&self) {
        self.run_presets();
        let mut inner = self.inner.borrow_mut();
        let MenuInner {
            slots,
            slots_per_page,
            current_page,
            cells,
            overlay_cells,
            surface,
            ..
        } = &mut *inner;
        let Some(surface) = surface.as_mut() else {
            return;
        };
        let offset = *current_page * *slots_per_page;
        for slot in slots.iter() {
            let cell = overlay_cells
                .get(slot)
                .or_else(|| cells.get(offset + slot));
            surface.set_cell(*slot, cell);
        }
    }

    /// Rewrites the effective cell for the named page-relative slots
    /// without recomputing overlays.
    pub fn refresh(&self, slots: &[i32]) {
        let mut inner = self.inner.borrow_mut();
        let MenuInner {
            slots: mask,
            slots_per_page,
            current_page,
            cells,
            overlay_cells,
            surface,
            ..
        } = &mut *inner;
        let Some(surface) = surface.as_mut() else {
            return;
        };
        let offset = *current_page * *slots_per_page;
        for slot in slots {
            if mask.binary_search(slot).is_err() {
                continue;
            }
            let cell = overlay_cells
                .get(slot)
                .or_else(|| cells.get(offset + slot));
            surface.set_cell(*slot, cell);
        }
    }

    /// Effective page-relative cells for the current page, overlay first.
    pub fn effective_cells(&self) -> BTreeMap<i32, Cell> {
        let inner = self.inner.borrow();
        let offset = inner.current_page * inner.slots_per_page;
        let mut effective = BTreeMap::new();
        for slot in &inner.slots {
            let cell = inner
                .overlay_cells
                .get(slot)
                .or_else(|| inner.cells.get(offset + slot));
            if let Some(cell) = cell {
                effective.insert(*slot, cell.clone());
            }
        }
        effective
    }

    fn run_presets(&self) {
        let presets: Vec<Rc<dyn Preset>> = self
            .inner
            .borrow()
            .presets
            .iter()
            .map(|(_, preset)| preset.clone())
            .collect();

        let mut cells: BTreeMap<i32, Cell> = BTreeMap::new();
        let mut handlers: BTreeMap<i32, HashMap<Action, Handler>> = BTreeMap::new();
        for preset in presets {
            let mut cell_sink = |slot: i32, cell: Cell| {
                cells.insert(slot, cell);
            };
            let mut handler_sink = |slot: i32, action: Action, handler: Handler| {
                handlers.entry(slot).or_default().insert(action, handler);
            };
            preset.place(self, &mut cell_sink, &mut handler_sink);
        }

        let mut inner = self.inner.borrow_mut();
        inner.overlay_cells = cells;
        inner.overlay_handlers = handlers;
    }

    pub(crate) fn register_animation(&self, animation: Animation) {
        self.inner
            .borrow_mut()
            .animations
            .entry(animation.slot())
            .or_default()
            .push(animation);
    }

    pub fn animations_at(&self, slot: i32) -> Vec<Animation> {
        self.inner
            .borrow()
            .animations
            .get(&slot)
            .cloned()
            .unwrap_or_default()
    }

    /// Animations whose absolute slot falls inside the page's window.
    pub fn animations_on_page(&self, page: i32) -> Vec<Animation> {
        let inner = self.inner.borrow();
        let offset = page * inner.slots_per_page;
        inner
            .animations
            .iter()
            .filter(|(slot, _)| inner.slots.binary_search(&(*slot - offset)).is_ok())
            .flat_map(|(_, animations)| animations.iter().cloned())
            .collect()
    }

    pub fn slot_on_page(&self, page: i32, slot: i32) -> bool {
        let inner = self.inner.borrow();
        let offset = page * inner.slots_per_page;
        inner.slots.binary_search(&(slot - offset)).is_ok()
    }

    pub fn stop_animations(&self, slot: i32) {
        for animation in self.animations_at(slot) {
            animation.stop();
        }
    }

    pub fn stop_all_animations(&self) {
        let animations: Vec<Animation> = self
            .inner
            .borrow()
            .animations
            .values()
            .flat_map(|animations| animations.iter().cloned())
            .collect();
        for animation in animations {
            animation.stop();
        }
    }

    /// Commits an animation frame to persistent content and refreshes the
    /// surface when the slot is on the shown page.
    pub(crate) fn apply_frame(&self, slot: i32, cell: Cell) {
        let mut inner = self.inner.borrow_mut();
        let MenuInner {
            slots,
            slots_per_page,
            current_page,
            cells,
            surface,
            ..
        } = &mut *inner;
        cells.set(slot, cell.clone());
        let rel = slot - *current_page * *slots_per_page;
        if slots.binary_search(&rel).is_ok() {
            if let Some(surface) = surface.as_mut() {
                surface.set_cell(rel, Some(&cell));
            }
        }
    }

    pub fn has_surface(&self) -> bool {
        self.inner.borrow().surface.is_some()
    }

    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.inner.borrow().surface.as_ref().map(|surface| surface.id())
    }

    pub(crate) fn set_surface(&self, surface: Box<dyn Surface>) {
        self.inner.borrow_mut().surface = Some(surface);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::Menu;
    use crate::preset;
    use menukit_core::{Action, Cell};

    #[test]
    fn row_mask_covers_whole_rows() {
        let menu = Menu::with_rows(&[1, 2], 9, "rows");
        assert_eq!(menu.slots_per_page(), 18);
        assert!(menu.contains_slot(9));
        assert!(menu.contains_slot(26));
        assert!(!menu.contains_slot(8));
        assert!(!menu.contains_slot(27));
    }

    #[test]
    fn page_bounds_follow_persistent_content() {
        let menu = Menu::new(3, 9, "bounds");
        assert_eq!(menu.min_page(), 0);
        assert_eq!(menu.max_page(), 0);

        menu.set_cell(40, Cell::new("late"));
        menu.set_cell(-5, Cell::new("early"));
        assert_eq!(menu.min_page(), -1);
        assert_eq!(menu.max_page(), 1);
    }

    #[test]
    fn page_bounds_respect_the_slot_mask() {
        let menu = Menu::with_rows(&[1], 9, "masked");
        menu.set_cell_on_page(0, 9, Cell::new("front"));
        menu.set_cell_on_page(0, 17, Cell::new("end"));
        assert_eq!(menu.min_page(), 0);
        assert_eq!(menu.max_page(), 0);

        menu.set_cell_on_page(1, 9, Cell::new("next"));
        assert_eq!(menu.max_page(), 1);
        menu.set_cell_on_page(-1, 17, Cell::new("prior"));
        assert_eq!(menu.min_page(), -1);
    }

    #[test]
    fn overlay_cell_shadows_persistent_content() {
        let menu = Menu::new(1, 9, "overlay");
        menu.set_cell(3, Cell::new("stored"));
        menu.add_preset(preset::from_fn(|_, cells, _| {
            cells(3, Cell::new("preset"));
        }));

        menu.render();
        assert_eq!(menu.effective_cells().get(&3), Some(&Cell::new("preset")));
        assert_eq!(menu.cell_at(3), Some(Cell::new("stored")));
    }

    #[test]
    fn later_presets_override_earlier_ones() {
        let menu = Menu::new(1, 9, "order");
        menu.add_preset(preset::from_fn(|_, cells, _| {
            cells(0, Cell::new("first"));
        }));
        menu.add_preset(preset::from_fn(|_, cells, _| {
            cells(0, Cell::new("second"));
        }));

        menu.render();
        assert_eq!(menu.effective_cells().get(&0), Some(&Cell::new("second")));
    }

    #[test]
    fn removed_preset_leaves_no_overlay_behind() {
        let menu = Menu::new(1, 9, "removal");
        let id = menu.add_preset(preset::from_fn(|_, cells, _| {
            cells(1, Cell::new("ghost"));
        }));

        menu.render();
        assert!(menu.effective_cells().contains_key(&1));

        assert!(menu.remove_preset(id));
        menu.render();
        assert!(!menu.effective_cells().contains_key(&1));
    }

    #[test]
    fn overlay_handler_beats_persistent_handler() {
        let menu = Menu::new(1, 9, "resolve");
        menu.set_handler(2, Action::Click, Rc::new(|_, _, _| Ok(())));
        let overlay: crate::handlers::Handler = Rc::new(|_, _, _| Ok(()));
        let placed = overlay.clone();
        menu.add_preset(preset::from_fn(move |_, _, handlers| {
            handlers(2, Action::Click, placed.clone());
        }));

        menu.render();
        let resolved = menu.resolve_handler(0, 2, Action::Click).expect("handler");
        assert!(Rc::ptr_eq(&resolved, &overlay));
    }

    #[test]
    fn effective_cells_track_the_current_page() {
        let menu = Menu::new(1, 9, "paging");
        menu.set_cell(0, Cell::new("page0"));
        menu.set_cell(9, Cell::new("page1"));

        assert_eq!(menu.effective_cells().get(&0), Some(&Cell::new("page0")));
        menu.set_page(1);
        assert_eq!(menu.effective_cells().get(&0), Some(&Cell::new("page1")));
    }
}
