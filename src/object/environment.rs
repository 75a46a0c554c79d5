use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::gc::ObjRef;

/// Shared handle to a scope. Held by the evaluator's call stack, by enclosed
/// scopes and by function objects that captured it.
pub type Env = Rc<RefCell<Environment>>;

/// One lexical scope. Bindings point into the heap by reference only, so a
/// scope never keeps an object alive by itself: the collector decides that by
/// tracing from the live scopes.
#[derive(Debug, Default, PartialEq)]
pub struct Environment {
    store: HashMap<String, ObjRef>,
    outer: Option<Env>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed_environment(outer: Env) -> Self {
        Self {
            store: HashMap::default(),
            outer: Some(outer),
        }
    }

    /// Looks `key` up here, then in each enclosing scope in turn.
    pub fn get(&self, key: &str) -> Option<ObjRef> {
        match self.store.get(key) {
            Some(obj) => Some(*obj),
            None => self.outer.as_ref().and_then(|outer| outer.borrow().get(key)),
        }
    }

    /// Binds `key` in this scope, replacing any previous binding of the same
    /// name here. Enclosing scopes are never touched.
    pub fn set(&mut self, key: impl Into<String>, val: ObjRef) -> ObjRef {
        self.store.insert(key.into(), val);
        val
    }

    pub fn bindings(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.store.values().copied()
    }

    pub fn outer(&self) -> Option<&Env> {
        self.outer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gc::Heap;
    use crate::object::object::Object;

    #[test]
    fn test_get_walks_outer_scopes() {
        let mut heap = Heap::new(&Config::default());
        let one = heap.insert(Object::Integer(1));
        let two = heap.insert(Object::Integer(2));

        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().set("a", one);
        global.borrow_mut().set("b", one);

        let mut inner = Environment::new_enclosed_environment(global.clone());
        inner.set("b", two);

        assert_eq!(inner.get("a"), Some(one));
        assert_eq!(inner.get("b"), Some(two));
        assert_eq!(global.borrow().get("b"), Some(one));
        assert_eq!(inner.get("c"), None);
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut heap = Heap::new(&Config::default());
        let one = heap.insert(Object::Integer(1));
        let two = heap.insert(Object::Integer(2));

        let mut env = Environment::new();
        assert_eq!(env.set("x", one), one);
        assert_eq!(env.set("x", two), two);

        assert_eq!(env.get("x"), Some(two));
        assert_eq!(env.bindings().count(), 1);
    }

    #[test]
    fn test_distinct_names_never_alias() {
        let mut heap = Heap::new(&Config::default());
        let mut env = Environment::new();
        let names: Vec<String> = (0..500).map(|i| format!("v{i}")).collect();
        let refs: Vec<ObjRef> = (0..500)
            .map(|i| heap.insert(Object::Integer(i)))
            .collect();

        for (name, obj) in names.iter().zip(&refs) {
            env.set(name.as_str(), *obj);
        }
        for (name, obj) in names.iter().zip(&refs) {
            assert_eq!(env.get(name), Some(*obj));
        }
    }
}
