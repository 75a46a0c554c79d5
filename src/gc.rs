use std::collections::HashSet;
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use tracing::debug;

use crate::config::Config;
use crate::object::environment::Env;
use crate::object::object::Object;

/// Stable handle to a heap object. A handle to a reclaimed slot is detected by
/// its generation and never resolves to the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjRef {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    marked: bool,
    object: Option<Object>,
}

/// Outcome of a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collected: usize,
    pub remaining: usize,
}

impl fmt::Display for GcStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Collected {} objects, {} remaining.",
            self.collected, self.remaining
        )
    }
}

/// Every runtime object lives here. Freed slots are recycled through a free
/// list; `collect` reclaims whatever is not reachable from the given roots.
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    threshold: usize,
    min_threshold: usize,
    growth: usize,
}

impl Heap {
    pub fn new(config: &Config) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            threshold: config.gc_threshold,
            min_threshold: config.gc_threshold,
            growth: config.gc_growth,
        }
    }

    pub fn should_collect(&self) -> bool {
        self.live >= self.threshold
    }

    pub fn insert(&mut self, object: Object) -> ObjRef {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            return ObjRef {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            marked: false,
            object: Some(object),
        });
        ObjRef {
            index,
            generation: 0,
        }
    }

    fn slot(&self, r: ObjRef) -> Option<&Slot> {
        self.slots
            .get(r.index as usize)
            .filter(|slot| slot.generation == r.generation && slot.object.is_some())
    }

    pub fn get(&self, r: ObjRef) -> Option<&Object> {
        self.slot(r).and_then(|slot| slot.object.as_ref())
    }

    pub fn contains(&self, r: ObjRef) -> bool {
        self.slot(r).is_some()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Marks everything reachable from `objects` and `envs`, then frees the
    /// rest. A scope marks its bindings and its outer chain; a function marks
    /// the scope it captured; a return signal marks its payload.
    pub fn collect<'e>(
        &mut self,
        objects: impl IntoIterator<Item = ObjRef>,
        envs: impl IntoIterator<Item = &'e Env>,
    ) -> GcStats {
        self.mark(objects, envs);
        let stats = self.sweep();
        self.threshold = self
            .min_threshold
            .max(stats.remaining.saturating_mul(self.growth));

        debug!(
            collected = stats.collected,
            remaining = stats.remaining,
            threshold = self.threshold,
            "garbage collection"
        );
        stats
    }

    fn mark<'e>(
        &mut self,
        objects: impl IntoIterator<Item = ObjRef>,
        envs: impl IntoIterator<Item = &'e Env>,
    ) {
        let mut gray: Vec<ObjRef> = objects.into_iter().collect();
        let mut scopes: Vec<Env> = envs.into_iter().cloned().collect();
        let mut visited = HashSet::new();

        loop {
            if let Some(r) = gray.pop() {
                let Some(slot) = self.slots.get_mut(r.index as usize) else {
                    continue;
                };
                if slot.generation != r.generation || slot.marked {
                    continue;
                }
                slot.marked = true;

                match &slot.object {
                    Some(Object::Return(value)) => gray.push(*value),
                    Some(Object::Fn(function)) => scopes.push(function.env.clone()),
                    _ => {}
                }
            } else if let Some(env) = scopes.pop() {
                if !visited.insert(Rc::as_ptr(&env)) {
                    continue;
                }
                let env = env.borrow();
                gray.extend(env.bindings());
                if let Some(outer) = env.outer() {
                    scopes.push(outer.clone());
                }
            } else {
                break;
            }
        }
    }

    fn sweep(&mut self) -> GcStats {
        let before = self.live;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_none() {
                continue;
            }
            if slot.marked {
                slot.marked = false;
            } else {
                slot.object = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                self.live -= 1;
            }
        }

        GcStats {
            collected: before - self.live,
            remaining: self.live,
        }
    }

    /// Frees every object regardless of reachability.
    pub fn clear(&mut self) -> GcStats {
        self.sweep()
    }
}

impl Index<ObjRef> for Heap {
    type Output = Object;

    fn index(&self, r: ObjRef) -> &Object {
        match self.get(r) {
            Some(object) => object,
            None => panic!("dangling object reference {r:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::object::environment::Environment;

    fn heap() -> Heap {
        Heap::new(&Config::default())
    }

    #[test]
    fn test_unreachable_objects_are_swept() {
        let mut heap = heap();
        let kept = heap.insert(Object::Integer(1));
        let dropped = heap.insert(Object::String(String::from("garbage")));

        let stats = heap.collect([kept], []);

        assert_eq!(
            stats,
            GcStats {
                collected: 1,
                remaining: 1
            }
        );
        assert!(heap.contains(kept));
        assert!(!heap.contains(dropped));
        assert_eq!(heap.get(dropped), None);
    }

    #[test]
    fn test_recycled_slot_rejects_stale_handle() {
        let mut heap = heap();
        let old = heap.insert(Object::Integer(1));
        heap.collect([], []);

        let new = heap.insert(Object::Integer(2));

        assert_ne!(old, new);
        assert_eq!(heap.get(old), None);
        assert_eq!(heap[new], Object::Integer(2));
    }

    #[test]
    fn test_scope_bindings_and_outer_chain_are_roots() {
        let mut heap = heap();
        let outer_value = heap.insert(Object::Integer(1));
        let inner_value = heap.insert(Object::Integer(2));
        let payload = heap.insert(Object::Integer(3));
        let signal = heap.insert(Object::Return(payload));
        let garbage = heap.insert(Object::Null);

        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().set("a", outer_value);
        let inner = Rc::new(RefCell::new(Environment::new_enclosed_environment(
            outer.clone(),
        )));
        inner.borrow_mut().set("b", inner_value);
        inner.borrow_mut().set("r", signal);

        let stats = heap.collect([], [&inner]);

        assert_eq!(stats.collected, 1);
        assert!(heap.contains(outer_value));
        assert!(heap.contains(inner_value));
        assert!(heap.contains(payload));
        assert!(!heap.contains(garbage));
    }

    #[test]
    fn test_marks_reset_between_cycles() {
        let mut heap = heap();
        let value = heap.insert(Object::Integer(7));

        heap.collect([value], []);
        let stats = heap.collect([], []);

        assert_eq!(stats.collected, 1);
        assert!(!heap.contains(value));
    }

    #[test]
    fn test_threshold_grows_with_survivors() {
        let config = Config::default().with_gc_threshold(2).with_gc_growth(2);
        let mut heap = Heap::new(&config);
        let refs: Vec<ObjRef> = (0..3).map(|i| heap.insert(Object::Integer(i))).collect();
        assert!(heap.should_collect());

        heap.collect(refs.clone(), []);
        assert!(!heap.should_collect());

        heap.insert(Object::Null);
        heap.insert(Object::Null);
        heap.insert(Object::Null);
        assert!(heap.should_collect());
    }

    #[test]
    fn test_clear_frees_everything() {
        let mut heap = heap();
        heap.insert(Object::Integer(1));
        heap.insert(Object::Boolean(true));

        let stats = heap.clear();

        assert_eq!(
            stats,
            GcStats {
                collected: 2,
                remaining: 0
            }
        );
        assert!(heap.is_empty());
    }
}
