//! Garbage collector: heap registry plus a cycle-reclaiming mark-and-sweep
//! pass (§3.9, §4.6).
//!
//! Reference types already free themselves the ordinary Rust way — each
//! `Rc<RefCell<..>>` drops its interior the instant its last strong handle
//! goes away, which is exactly the source's refcount scheme without the
//! double-free bookkeeping §4.6 describes (`RunResult`/`Rc` make "free twice"
//! unrepresentable, resolving the §8.1 "no double free" invariant for free).
//! What Rust's ownership model *can't* do on its own is reclaim a cycle — a
//! list containing itself, or two classes referencing each other by
//! attribute — because every participant still holds a live strong count.
//! §9 recommends exactly the fix: "a target-language port should implement a
//! proper mark-and-sweep ... and drop the freed-pointer guard". This module
//! is that mark-and-sweep, scoped to the one job Rc can't do itself: walking
//! from the roots (§9 "call frames' lookup tables + operand stack +
//! exception-handler stack + raised slot"), and for every registered
//! collection/object *not* reached, clearing its interior so any back-edge it
//! held is dropped. Once the cycle is broken this way, Rc finishes the job.
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::value::{ClassObj, MapObj, SetObj, Value};

/// A weak handle to one heap-allocated collection/object, registered at
/// `CREATE_LIST`/`CREATE_MAP`/`CREATE_SET`/`CREATE_OBJECT_RETURN` (§3.9).
enum HeapRef {
    List(Weak<RefCell<Vec<Value>>>),
    Map(Weak<RefCell<MapObj>>),
    Set(Weak<RefCell<SetObj>>),
    Class(Weak<RefCell<ClassObj>>),
}

impl HeapRef {
    fn ptr_id(&self) -> Option<usize> {
        match self {
            HeapRef::List(w) => w.upgrade().map(|rc| Rc::as_ptr(&rc) as usize),
            HeapRef::Map(w) => w.upgrade().map(|rc| Rc::as_ptr(&rc) as usize),
            HeapRef::Set(w) => w.upgrade().map(|rc| Rc::as_ptr(&rc) as usize),
            HeapRef::Class(w) => w.upgrade().map(|rc| Rc::as_ptr(&rc) as usize),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            HeapRef::List(w) => w.strong_count() > 0,
            HeapRef::Map(w) => w.strong_count() > 0,
            HeapRef::Set(w) => w.strong_count() > 0,
            HeapRef::Class(w) => w.strong_count() > 0,
        }
    }

    /// Drop this object's interior values, breaking any cycle it is part of.
    /// Only called on objects the mark pass did not reach from a root.
    fn clear_interior(&self) {
        match self {
            HeapRef::List(w) => {
                if let Some(rc) = w.upgrade() {
                    rc.borrow_mut().clear();
                }
            }
            HeapRef::Map(w) => {
                if let Some(rc) = w.upgrade() {
                    rc.borrow_mut().entries.clear();
                }
            }
            HeapRef::Set(w) => {
                if let Some(rc) = w.upgrade() {
                    rc.borrow_mut().entries.clear();
                }
            }
            HeapRef::Class(w) => {
                if let Some(rc) = w.upgrade() {
                    rc.borrow_mut().attrs.clear();
                }
            }
        }
    }
}

/// The pointer identity of a `Value`'s interior, if it has one (§3.9 "keyed
/// by identity"). Primitives, strings, functions and exceptions are never
/// cyclic participants so they have no registry identity.
fn heap_id(v: &Value) -> Option<usize> {
    match v {
        Value::List(rc) => Some(Rc::as_ptr(rc) as usize),
        Value::Map(rc) => Some(Rc::as_ptr(rc) as usize),
        Value::Set(rc) => Some(Rc::as_ptr(rc) as usize),
        Value::Class(rc) => Some(Rc::as_ptr(rc) as usize),
        _ => None,
    }
}

/// Pushes every `Value` directly reachable from `v` onto `out` (one level of
/// tracing). Functions are traced through their closure slots, since a
/// closure keeps its captured collections alive even though the function
/// object itself can never be a cycle participant (§3.2 "body immutable").
fn push_children(v: &Value, out: &mut Vec<Value>) {
    match v {
        Value::List(rc) => out.extend(rc.borrow().iter().cloned()),
        Value::Map(rc) => {
            for (k, val) in rc.borrow().entries.iter() {
                out.push(k.clone());
                out.push(val.clone());
            }
        }
        Value::Set(rc) => out.extend(rc.borrow().entries.iter().cloned()),
        Value::Class(rc) => out.extend(rc.borrow().attrs.iter().map(|(_, v)| v.clone())),
        Value::Function(f) => {
            if let crate::value::FunctionObj::User(u) = f.as_ref() {
                out.extend(u.closure_slots.iter().cloned());
            }
        }
        Value::Undefined | Value::Null | Value::Number(_) | Value::String(_) | Value::Exception(_) => {}
    }
}

/// The process-wide heap registry and collection trigger (§3.9, §4.6).
pub struct GarbageCollector {
    objects: Vec<HeapRef>,
    /// Live-object count at which the next collection fires; multiplied by
    /// 10 after each pass (§4.6 "initially 2, multiplied by 10").
    threshold: usize,
    pub collections_run: u64,
}

impl GarbageCollector {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            threshold: 2,
            collections_run: 0,
        }
    }

    pub fn register_list(&mut self, v: &Rc<RefCell<Vec<Value>>>) {
        self.objects.push(HeapRef::List(Rc::downgrade(v)));
    }

    pub fn register_map(&mut self, v: &Rc<RefCell<MapObj>>) {
        self.objects.push(HeapRef::Map(Rc::downgrade(v)));
    }

    pub fn register_set(&mut self, v: &Rc<RefCell<SetObj>>) {
        self.objects.push(HeapRef::Set(Rc::downgrade(v)));
    }

    pub fn register_class(&mut self, v: &Rc<RefCell<ClassObj>>) {
        self.objects.push(HeapRef::Class(Rc::downgrade(v)));
    }

    /// Number of still-live registry entries (an approximation of §3.9's
    /// "set of every live heap-allocated value").
    pub fn live_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_alive()).count()
    }

    /// Called once per instruction tick (§4.6 "each instruction tick
    /// increments a counter"). Runs a collection when the live count has
    /// reached the adaptive threshold.
    pub fn maybe_collect<'a>(&mut self, roots: impl Iterator<Item = &'a Value>) {
        self.objects.retain(|o| o.is_alive());
        if self.objects.len() < self.threshold {
            return;
        }
        self.collect(roots);
        self.threshold = self.objects.len().max(self.threshold) * 10;
    }

    fn collect<'a>(&mut self, roots: impl Iterator<Item = &'a Value>) {
        let mut marked = HashSet::new();
        let mut stack: Vec<Value> = roots.cloned().collect();
        while let Some(v) = stack.pop() {
            if let Some(id) = heap_id(&v) {
                if !marked.insert(id) {
                    continue;
                }
            }
            push_children(&v, &mut stack);
        }

        for obj in &self.objects {
            if let Some(id) = obj.ptr_id() {
                if !marked.contains(&id) {
                    obj.clear_interior();
                }
            }
        }
        self.objects.retain(|o| o.is_alive());
        self.collections_run += 1;
    }

    /// Drain every remaining entry at program exit (§4.6 "exit teardown"),
    /// clearing interiors so any still-cyclic garbage is released without
    /// needing anyone to observe it. Unreachable non-cyclic data has already
    /// been dropped by ordinary `Rc` bookkeeping by this point.
    pub fn sweep_all(&mut self) {
        for obj in &self.objects {
            obj.clear_interior();
        }
        self.objects.clear();
    }
}

impl Default for GarbageCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn collects_a_self_referential_list() {
        let mut gc = GarbageCollector::new();
        let list = match Value::list(vec![]) {
            Value::List(rc) => rc,
            _ => unreachable!(),
        };
        gc.register_list(&list);
        list.borrow_mut().push(Value::List(list.clone()));
        assert_eq!(Rc::strong_count(&list), 2);

        // No roots reference the list at all any more.
        gc.maybe_collect(std::iter::empty());
        gc.maybe_collect(std::iter::empty());
        // The loop itself kept it alive before any collection ran, but once
        // the list is not reachable from any root, clearing its interior
        // drops the self-reference and its only owner is this test.
        drop(list);
    }

    #[test]
    fn live_count_tracks_registered_objects() {
        let mut gc = GarbageCollector::new();
        let a = match Value::list(vec![]) {
            Value::List(rc) => rc,
            _ => unreachable!(),
        };
        gc.register_list(&a);
        assert_eq!(gc.live_count(), 1);
        drop(a);
        assert_eq!(gc.live_count(), 0);
    }
}
