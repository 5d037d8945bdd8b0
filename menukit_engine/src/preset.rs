use std::rc::Rc;

use menukit_core::{Action, Cell};

use crate::handlers::Handler;
use crate::menu::Menu;

/// Identifies one applied preset for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresetId(pub(crate) u64);

/// Decorates a page at render time.
///
/// Presets run in registration order before every render and emit overlay
/// cells and handlers through the sinks, keyed by page-relative slot.
/// Overlays shadow persistent content for the shown page but never touch
/// it; later presets win conflicting slots.
pub trait Preset {
    fn place(
        &self,
        menu: &Menu,
        cells: &mut dyn FnMut(i32, Cell),
        handlers: &mut dyn FnMut(i32, Action, Handler),
    );
}

struct FnPreset<F>(F);

impl<F> Preset for FnPreset<F>
where
    F: Fn(&Menu, &mut dyn FnMut(i32, Cell), &mut dyn FnMut(i32, Action, Handler)),
{
    fn place(
        &self,
        menu: &Menu,
        cells: &mut dyn FnMut(i32, Cell),
        handlers: &mut dyn FnMut(i32, Action, Handler),
    ) {
        (self.0)(menu, cells, handlers)
    }
}

/// Wraps a closure as a preset.
pub fn from_fn<F>(place: F) -> Rc<dyn Preset>
where
    F: Fn(&Menu, &mut dyn FnMut(i32, Cell), &mut dyn FnMut(i32, Action, Handler)) + 'static,
{
    Rc::new(FnPreset(place))
}

/// Well-known cell ids used by the built-in presets. Hosts map these to
/// whatever their rendering layer shows.
pub mod icons {
    pub const FILLER: &str = "filler";
    pub const BACK: &str = "nav.back";
    pub const PREVIOUS: &str = "nav.previous";
    pub const PREVIOUS_DISABLED: &str = "nav.previous.disabled";
    pub const NEXT: &str = "nav.next";
    pub const NEXT_DISABLED: &str = "nav.next.disabled";
    pub const UP: &str = "nav.up";
    pub const UP_DISABLED: &str = "nav.up.disabled";
    pub const DOWN: &str = "nav.down";
    pub const DOWN_DISABLED: &str = "nav.down.disabled";
}

/// Places the cell in every mask slot without persistent content on the
/// shown page.
pub fn fill(cell: Cell) -> Rc<dyn Preset> {
    from_fn(move |menu, cells, _| {
        let page = menu.current_page();
        for slot in menu.slots() {
            if menu.cell_on_page(page, slot).is_none() {
                cells(slot, cell.clone());
            }
        }
    })
}

/// Places the cell across one row, occupied slots included.
pub fn fill_row(cell: Cell, row: i32) -> Rc<dyn Preset> {
    from_fn(move |menu, cells, _| {
        let columns = menu.columns();
        for slot in row * columns..(row + 1) * columns {
            if menu.contains_slot(slot) {
                cells(slot, cell.clone());
            }
        }
    })
}

/// Places the cell down one column, occupied slots included.
pub fn fill_column(cell: Cell, column: i32) -> Rc<dyn Preset> {
    from_fn(move |menu, cells, _| {
        let columns = menu.columns();
        for slot in menu.slots() {
            if slot.rem_euclid(columns) == column {
                cells(slot, cell.clone());
            }
        }
    })
}

/// Places the cell along the outer border of the mask.
pub fn fill_frame(cell: Cell) -> Rc<dyn Preset> {
    from_fn(move |menu, cells, _| {
        let columns = menu.columns();
        let slots = menu.slots();
        let Some(first) = slots.first() else { return };
        let Some(last) = slots.last() else { return };
        let top = first.div_euclid(columns);
        let bottom = last.div_euclid(columns);
        for slot in slots {
            let row = slot.div_euclid(columns);
            let column = slot.rem_euclid(columns);
            if row == top || row == bottom || column == 0 || column == columns - 1 {
                cells(slot, cell.clone());
            }
        }
    })
}

/// Back button closing the menu and reopening the parent it was stacked
/// on, when one exists.
pub fn back(slot: i32, actions: &[Action]) -> Rc<dyn Preset> {
    let actions = actions.to_vec();
    from_fn(move |_, cells, handlers| {
        cells(slot, Cell::new(icons::BACK));
        for &action in &actions {
            let handler: Handler = Rc::new(|engine, _, ctx| {
                ctx.set_cancelled(true);
                engine.open_previous(ctx.viewer());
                Ok(())
            });
            handlers(slot, action, handler);
        }
    })
}

/// Previous/next page turners at the outer slots of a row. Turners past
/// the content bounds render a disabled icon without a handler, or nothing
/// at all when `hide_disabled` is set.
pub fn pagination_row(row: i32, hide_disabled: bool, actions: &[Action]) -> Rc<dyn Preset> {
    let actions = actions.to_vec();
    from_fn(move |menu, cells, handlers| {
        let columns = menu.columns();
        let left = row * columns;
        let right = left + columns - 1;
        place_turners(menu, cells, handlers, &actions, hide_disabled, left, right);
    })
}

/// Previous/next page turners at the top and bottom of a column, with
/// vertical icons.
pub fn pagination_column(column: i32, hide_disabled: bool, actions: &[Action]) -> Rc<dyn Preset> {
    let actions = actions.to_vec();
    from_fn(move |menu, cells, handlers| {
        let columns = menu.columns();
        let slots = menu.slots();
        let Some(first) = slots.first() else { return };
        let Some(last) = slots.last() else { return };
        let top = first.div_euclid(columns) * columns + column;
        let bottom = last.div_euclid(columns) * columns + column;
        let page = menu.current_page();
        place_turn(
            cells,
            handlers,
            &actions,
            top,
            page > menu.min_page(),
            icons::UP,
            icons::UP_DISABLED,
            hide_disabled,
            PageTurn::Previous,
        );
        place_turn(
            cells,
            handlers,
            &actions,
            bottom,
            page < menu.max_page(),
            icons::DOWN,
            icons::DOWN_DISABLED,
            hide_disabled,
            PageTurn::Next,
        );
    })
}

fn place_turners(
    menu: &Menu,
    cells: &mut dyn FnMut(i32, Cell),
    handlers: &mut dyn FnMut(i32, Action, Handler),
    actions: &[Action],
    hide_disabled: bool,
    left: i32,
    right: i32,
) {
    let page = menu.current_page();
    place_turn(
        cells,
        handlers,
        actions,
        left,
        page > menu.min_page(),
        icons::PREVIOUS,
        icons::PREVIOUS_DISABLED,
        hide_disabled,
        PageTurn::Previous,
    );
    place_turn(
        cells,
        handlers,
        actions,
        right,
        page < menu.max_page(),
        icons::NEXT,
        icons::NEXT_DISABLED,
        hide_disabled,
        PageTurn::Next,
    );
}

#[derive(Clone, Copy)]
enum PageTurn {
    Previous,
    Next,
}

#[allow(clippy::too_many_arguments)]
fn place_turn(
    cells: &mut dyn FnMut(i32, Cell),
    handlers: &mut dyn FnMut(i32, Action, Handler),
    actions: &[Action],
    slot: i32,
    enabled: bool,
    icon: &str,
    disabled_icon: &str,
    hide_disabled: bool,
    turn: PageTurn,
) {
    if !enabled {
        if !hide_disabled {
            cells(slot, Cell::new(disabled_icon));
        }
        return;
    }
    cells(slot, Cell::new(icon));
    for &action in actions {
        let handler: Handler = match turn {
            PageTurn::Previous => Rc::new(|engine, _, ctx| {
                ctx.set_cancelled(true);
                engine.open_previous_page(ctx.viewer());
                Ok(())
            }),
            PageTurn::Next => Rc::new(|engine, _, ctx| {
                ctx.set_cancelled(true);
                engine.open_next_page(ctx.viewer());
                Ok(())
            }),
        };
        handlers(slot, action, handler);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::{fill, fill_column, fill_frame, fill_row, icons, pagination_column, pagination_row};
    use crate::handlers::Handler;
    use crate::menu::Menu;
    use menukit_core::{Action, Cell};

    fn collect(
        preset: &dyn super::Preset,
        menu: &Menu,
    ) -> (BTreeMap<i32, Cell>, BTreeMap<i32, HashMap<Action, Handler>>) {
        let mut cells = BTreeMap::new();
        let mut handlers: BTreeMap<i32, HashMap<Action, Handler>> = BTreeMap::new();
        preset.place(
            menu,
            &mut |slot, cell| {
                cells.insert(slot, cell);
            },
            &mut |slot, action, handler| {
                handlers.entry(slot).or_default().insert(action, handler);
            },
        );
        (cells, handlers)
    }

    #[test]
    fn fill_skips_occupied_slots() {
        let menu = Menu::new(1, 9, "fill");
        menu.set_cell(4, Cell::new("occupied"));
        let (cells, _) = collect(&*fill(Cell::new(icons::FILLER)), &menu);

        assert_eq!(cells.len(), 8);
        assert!(!cells.contains_key(&4));
        assert_eq!(cells.get(&0), Some(&Cell::new(icons::FILLER)));
    }

    #[test]
    fn fill_row_covers_occupied_slots_too() {
        let menu = Menu::new(3, 9, "rows");
        menu.set_cell(10, Cell::new("occupied"));
        let (cells, _) = collect(&*fill_row(Cell::new(icons::FILLER), 1), &menu);

        let slots: Vec<i32> = cells.keys().copied().collect();
        assert_eq!(slots, (9..18).collect::<Vec<i32>>());
    }

    #[test]
    fn frame_traces_the_border() {
        let menu = Menu::new(3, 9, "frame");
        let (cells, _) = collect(&*fill_frame(Cell::new(icons::FILLER)), &menu);

        assert!(cells.contains_key(&0));
        assert!(cells.contains_key(&26));
        assert!(cells.contains_key(&9));
        assert!(cells.contains_key(&17));
        assert!(!cells.contains_key(&10));
    }

    #[test]
    fn pagination_disables_edges() {
        let menu = Menu::new(1, 9, "pages");
        menu.set_cell(0, Cell::new("page0"));
        menu.set_cell(9, Cell::new("page1"));

        let preset = pagination_row(0, false, &[Action::Click]);
        let (cells, handlers) = collect(&*preset, &menu);
        assert_eq!(cells.get(&0), Some(&Cell::new(icons::PREVIOUS_DISABLED)));
        assert_eq!(cells.get(&8), Some(&Cell::new(icons::NEXT)));
        assert!(!handlers.contains_key(&0));
        assert!(handlers.contains_key(&8));

        menu.set_page(1);
        let (cells, handlers) = collect(&*preset, &menu);
        assert_eq!(cells.get(&0), Some(&Cell::new(icons::PREVIOUS)));
        assert_eq!(cells.get(&8), Some(&Cell::new(icons::NEXT_DISABLED)));
        assert!(handlers.contains_key(&0));
        assert!(!handlers.contains_key(&8));
    }

    #[test]
    fn fill_column_follows_the_mask() {
        let menu = Menu::with_rows(&[1, 2], 9, "column");
        let (cells, _) = collect(&*fill_column(Cell::new(icons::FILLER), 0), &menu);

        let slots: Vec<i32> = cells.keys().copied().collect();
        assert_eq!(slots, vec![9, 18]);
    }

    #[test]
    fn pagination_column_places_turners_on_the_mask_edges() {
        let menu = Menu::with_rows(&[1, 2], 9, "tower");
        menu.set_cell_on_page(0, 10, Cell::new("page0"));
        menu.set_cell_on_page(1, 10, Cell::new("page1"));

        let preset = pagination_column(0, false, &[Action::Click]);
        let (cells, handlers) = collect(&*preset, &menu);
        assert_eq!(cells.get(&9), Some(&Cell::new(icons::UP_DISABLED)));
        assert_eq!(cells.get(&18), Some(&Cell::new(icons::DOWN)));
        assert!(!handlers.contains_key(&9));
        assert!(handlers.contains_key(&18));

        menu.set_page(1);
        let (cells, handlers) = collect(&*preset, &menu);
        assert_eq!(cells.get(&9), Some(&Cell::new(icons::UP)));
        assert_eq!(cells.get(&18), Some(&Cell::new(icons::DOWN_DISABLED)));
        assert!(handlers.contains_key(&9));
        assert!(!handlers.contains_key(&18));
    }

    #[test]
    fn hidden_disabled_turners_place_nothing() {
        let menu = Menu::new(1, 9, "hidden");
        let preset = pagination_row(0, true, &[Action::Click]);
        let (cells, handlers) = collect(&*preset, &menu);
        assert!(cells.is_empty());
        assert!(handlers.is_empty());
    }
}
