use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use anyhow::Result;
use menukit_core::{Action, ClickContext};

use crate::engine::MenuEngine;
use crate::menu::Menu;

/// Callback bound to a (slot, action) pair. Handlers run inside the
/// engine's failure boundary: returning an error cancels the interaction
/// instead of propagating.
pub type Handler = Rc<dyn Fn(&MenuEngine, &Menu, &mut ClickContext) -> Result<()>>;

/// Persistent interaction-handler table for one menu. Slot keys are
/// absolute (`page * slots_per_page + slot`); overlay handlers from presets
/// live on the menu instead and take precedence at dispatch time.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    by_slot: BTreeMap<i32, HashMap<Action, Handler>>,
    defaults: HashMap<Action, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: i32, action: Action, handler: Handler) {
        self.by_slot.entry(slot).or_default().insert(action, handler);
    }

    /// Last-resort fallback for an action, consulted when no per-slot
    /// handler matches.
    pub fn set_default(&mut self, action: Action, handler: Handler) {
        self.defaults.insert(action, handler);
    }

    pub fn remove_slot(&mut self, slot: i32) {
        self.by_slot.remove(&slot);
    }

    pub fn remove(&mut self, slot: i32, action: Action) {
        if let Some(map) = self.by_slot.get_mut(&slot) {
            map.remove(&action);
        }
    }

    pub fn remove_default(&mut self, action: Action) {
        self.defaults.remove(&action);
    }

    /// Persistent handler at the absolute slot, else the action default.
    pub fn resolve(&self, slot: i32, action: Action) -> Option<Handler> {
        self.by_slot
            .get(&slot)
            .and_then(|map| map.get(&action))
            .or_else(|| self.defaults.get(&action))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{Handler, HandlerRegistry};
    use menukit_core::Action;

    fn tagged(_tag: &'static str) -> Handler {
        Rc::new(|_, _, _| Ok(()))
    }

    #[test]
    fn per_slot_handler_beats_default() {
        let mut registry = HandlerRegistry::new();
        let slot_handler = tagged("slot");
        let default_handler = tagged("default");
        registry.set(5, Action::Click, slot_handler.clone());
        registry.set_default(Action::Click, default_handler.clone());

        let resolved = registry.resolve(5, Action::Click).expect("handler");
        assert!(Rc::ptr_eq(&resolved, &slot_handler));

        let fallback = registry.resolve(6, Action::Click).expect("default");
        assert!(Rc::ptr_eq(&fallback, &default_handler));
    }

    #[test]
    fn resolution_is_per_action() {
        let mut registry = HandlerRegistry::new();
        registry.set(2, Action::Click, tagged("click"));
        assert!(registry.resolve(2, Action::RightClick).is_none());
    }

    #[test]
    fn removal_falls_back_to_default() {
        let mut registry = HandlerRegistry::new();
        let default_handler = tagged("default");
        registry.set(1, Action::Click, tagged("slot"));
        registry.set_default(Action::Click, default_handler.clone());

        registry.remove(1, Action::Click);
        let resolved = registry.resolve(1, Action::Click).expect("default");
        assert!(Rc::ptr_eq(&resolved, &default_handler));

        registry.remove_default(Action::Click);
        assert!(registry.resolve(1, Action::Click).is_none());
    }
}
