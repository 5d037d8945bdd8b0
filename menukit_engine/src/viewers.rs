use std::collections::{HashMap, HashSet};

use menukit_core::{ViewMode, ViewerId};

use crate::menu::{Menu, MenuId};

/// One viewer's live attachment to a menu.
#[derive(Clone)]
pub struct Binding {
    pub menu: Menu,
    pub mode: ViewMode,
    pub page: i32,
    /// Parent menu recorded for back-navigation; the engine never reopens
    /// it on its own.
    pub previous: Option<Menu>,
}

/// Tracks which viewer is bound to which menu. Exactly one binding per
/// viewer; rebinding replaces silently. Lookup by viewer is O(1) and a
/// per-menu index supports enumeration.
#[derive(Default)]
pub struct ViewerRegistry {
    bindings: HashMap<ViewerId, Binding>,
    by_menu: HashMap<MenuId, HashSet<ViewerId>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a viewer, returning whatever binding it replaced.
    pub fn bind(&mut self, viewer: ViewerId, binding: Binding) -> Option<Binding> {
        let menu_id = binding.menu.id();
        let replaced = self.bindings.insert(viewer.clone(), binding);
        if let Some(previous) = replaced.as_ref() {
            self.remove_index(previous.menu.id(), &viewer);
        }
        self.by_menu.entry(menu_id).or_default().insert(viewer);
        replaced
    }

    /// No-op returning `None` when the viewer has no binding.
    pub fn unbind(&mut self, viewer: &ViewerId) -> Option<Binding> {
        let binding = self.bindings.remove(viewer)?;
        self.remove_index(binding.menu.id(), viewer);
        Some(binding)
    }

    pub fn lookup(&self, viewer: &ViewerId) -> Option<&Binding> {
        self.bindings.get(viewer)
    }

    pub fn lookup_mut(&mut self, viewer: &ViewerId) -> Option<&mut Binding> {
        self.bindings.get_mut(viewer)
    }

    pub fn viewers_of(&self, menu: MenuId) -> Vec<ViewerId> {
        let mut viewers: Vec<ViewerId> = self
            .by_menu
            .get(&menu)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        viewers.sort();
        viewers
    }

    pub fn count_of(&self, menu: MenuId) -> usize {
        self.by_menu.get(&menu).map(|set| set.len()).unwrap_or(0)
    }

    fn remove_index(&mut self, menu: MenuId, viewer: &ViewerId) {
        if let Some(set) = self.by_menu.get_mut(&menu) {
            set.remove(viewer);
            if set.is_empty() {
                self.by_menu.remove(&menu);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Binding, ViewerRegistry};
    use crate::menu::Menu;
    use menukit_core::{ViewMode, ViewerId};

    fn bind(registry: &mut ViewerRegistry, viewer: &str, menu: &Menu) -> Option<Binding> {
        registry.bind(
            ViewerId::new(viewer),
            Binding {
                menu: menu.clone(),
                mode: ViewMode::Modify,
                page: 0,
                previous: None,
            },
        )
    }

    #[test]
    fn rebinding_moves_a_viewer_between_menus() {
        let mut registry = ViewerRegistry::new();
        let first = Menu::new(3, 9, "first");
        let second = Menu::new(3, 9, "second");

        assert!(bind(&mut registry, "alice", &first).is_none());
        let replaced = bind(&mut registry, "alice", &second).expect("replaced");
        assert_eq!(replaced.menu.id(), first.id());

        assert_eq!(registry.viewers_of(first.id()), Vec::<ViewerId>::new());
        assert_eq!(registry.viewers_of(second.id()), vec![ViewerId::new("alice")]);
    }

    #[test]
    fn rebinding_leaves_other_viewers_untouched() {
        let mut registry = ViewerRegistry::new();
        let shared = Menu::new(3, 9, "shared");
        let other = Menu::new(3, 9, "other");

        bind(&mut registry, "alice", &shared);
        bind(&mut registry, "bob", &shared);
        bind(&mut registry, "alice", &other);

        assert_eq!(registry.viewers_of(shared.id()), vec![ViewerId::new("bob")]);
        assert_eq!(registry.count_of(shared.id()), 1);
        assert_eq!(registry.count_of(other.id()), 1);
    }

    #[test]
    fn unbinding_an_unknown_viewer_is_a_no_op() {
        let mut registry = ViewerRegistry::new();
        assert!(registry.unbind(&ViewerId::new("ghost")).is_none());
    }
}
