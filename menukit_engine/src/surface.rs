use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use menukit_core::{Cell, SurfaceError, ViewerId};

/// Identifies one live surface so raw events can be routed back to the
/// menu that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// One grid-shaped rendering target. The engine only ever writes cells by
/// page-relative index; everything else about the surface is the host's
/// business.
pub trait Surface {
    fn id(&self) -> SurfaceId;

    /// Writes or clears one page-relative cell.
    fn set_cell(&mut self, slot: i32, cell: Option<&Cell>);
}

/// Host hook that materializes surfaces when menus open.
pub trait SurfaceProvider {
    fn create_surface(
        &mut self,
        viewer: &ViewerId,
        size: i32,
        title: &str,
    ) -> Result<Box<dyn Surface>, SurfaceError>;
}

#[derive(Debug)]
struct GridState {
    id: SurfaceId,
    title: String,
    size: i32,
    cells: BTreeMap<i32, Cell>,
}

/// In-memory surface used by the demo host and the test suite. Clones
/// share the same cell grid, so a handle kept outside the engine observes
/// every render.
#[derive(Debug, Clone)]
pub struct GridSurface {
    state: Rc<RefCell<GridState>>,
}

impl GridSurface {
    fn new(id: SurfaceId, title: String, size: i32) -> Self {
        GridSurface {
            state: Rc::new(RefCell::new(GridState {
                id,
                title,
                size,
                cells: BTreeMap::new(),
            })),
        }
    }

    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    pub fn size(&self) -> i32 {
        self.state.borrow().size
    }

    pub fn cell(&self, slot: i32) -> Option<Cell> {
        self.state.borrow().cells.get(&slot).cloned()
    }

    /// Snapshot of every occupied cell, ordered by slot.
    pub fn rendered(&self) -> BTreeMap<i32, Cell> {
        self.state.borrow().cells.clone()
    }
}

impl Surface for GridSurface {
    fn id(&self) -> SurfaceId {
        self.state.borrow().id
    }

    fn set_cell(&mut self, slot: i32, cell: Option<&Cell>) {
        let mut state = self.state.borrow_mut();
        match cell {
            Some(cell) => {
                state.cells.insert(slot, cell.clone());
            }
            None => {
                state.cells.remove(&slot);
            }
        }
    }
}

#[derive(Default)]
struct GridRegistry {
    next_id: u64,
    offline: bool,
    surfaces: Vec<GridSurface>,
}

/// Provider handing out sequentially numbered in-memory surfaces. Keeps a
/// handle to everything it created so hosts and tests can inspect renders,
/// and can be marked offline to exercise the open-abort path.
#[derive(Default, Clone)]
pub struct GridSurfaces {
    registry: Rc<RefCell<GridRegistry>>,
}

impl GridSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.registry.borrow_mut().offline = offline;
    }

    pub fn created(&self) -> usize {
        self.registry.borrow().surfaces.len()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<GridSurface> {
        self.registry
            .borrow()
            .surfaces
            .iter()
            .find(|surface| surface.state.borrow().id == id)
            .cloned()
    }

    pub fn last(&self) -> Option<GridSurface> {
        self.registry.borrow().surfaces.last().cloned()
    }
}

impl SurfaceProvider for GridSurfaces {
    fn create_surface(
        &mut self,
        _viewer: &ViewerId,
        size: i32,
        title: &str,
    ) -> Result<Box<dyn Surface>, SurfaceError> {
        let mut registry = self.registry.borrow_mut();
        if registry.offline {
            return Err(SurfaceError::Unavailable(
                "surface provider is offline".to_string(),
            ));
        }
        registry.next_id += 1;
        let surface = GridSurface::new(SurfaceId(registry.next_id), title.to_string(), size);
        registry.surfaces.push(surface.clone());
        Ok(Box::new(surface))
    }
}
