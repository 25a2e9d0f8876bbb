//! Objects, arrays and the name cells that link their children.
//!
//! A composite's children are name cells joined by sibling links in
//! insertion order. Each name is referenced exactly once, by its parent,
//! and in turn references its key string (if any) and its value. Arrays
//! keep their integer-keyed names sorted and track `length` separately.

use ember_core::element::float_to_int;
use ember_core::{CellRef, VarInt};

use crate::arena::Arena;
use crate::cell::{Body, Children, KeyRef};
use crate::error::StoreError;
use crate::store::Store;
use crate::string::read_string;
use crate::var::{parse_number, Var};

/// The key of a name cell.
#[derive(Debug)]
pub enum Key {
    /// An integer key, as used by arrays.
    Int(VarInt),
    /// A string key.
    Str(Var),
}

impl Key {
    /// The key as an integer: integer keys as-is, numeric string keys
    /// parsed, anything else 0.
    pub fn as_int(&self) -> VarInt {
        match self {
            Self::Int(i) => *i,
            Self::Str(s) => s.as_int(),
        }
    }
}

/// Integer ordering key of a name, for sorted array insertion.
fn key_order(arena: &Arena, name: CellRef) -> VarInt {
    match arena.body(name) {
        Body::Name {
            key: KeyRef::Int(i),
            ..
        } => *i,
        Body::Name {
            key: KeyRef::Str(k),
            ..
        } => read_string(arena, *k)
            .and_then(|b| parse_number(&b))
            .map_or(0, float_to_int),
        _ => 0,
    }
}

/// Whether a name's key spells `key`. Integer keys match their decimal form.
fn key_matches(arena: &Arena, name: CellRef, key: &[u8]) -> bool {
    match arena.body(name) {
        Body::Name {
            key: KeyRef::Int(i),
            ..
        } => i.to_string().as_bytes() == key,
        Body::Name {
            key: KeyRef::Str(k),
            ..
        } => read_string(arena, *k).is_some_and(|b| b == key),
        _ => false,
    }
}

fn children_of(arena: &Arena, parent: CellRef) -> Option<Children> {
    arena.body(parent).children().copied()
}

/// Link `name` into `parent` directly after `after`, or at the front.
fn link_after(arena: &mut Arena, parent: CellRef, name: CellRef, after: Option<CellRef>) {
    match after {
        Some(a) => {
            match arena.cell(a).next_sibling {
                Some(n) => {
                    arena.cell_mut(n).prev_sibling = Some(name);
                    arena.cell_mut(name).next_sibling = Some(n);
                }
                None => {
                    if let Some(c) = arena.body_mut(parent).children_mut() {
                        c.last = Some(name);
                    }
                }
            }
            arena.cell_mut(a).next_sibling = Some(name);
            arena.cell_mut(name).prev_sibling = Some(a);
        }
        None => {
            let first = children_of(arena, parent).and_then(|c| c.first);
            match first {
                Some(f) => arena.cell_mut(f).prev_sibling = Some(name),
                None => {
                    if let Some(c) = arena.body_mut(parent).children_mut() {
                        c.last = Some(name);
                    }
                }
            }
            arena.cell_mut(name).next_sibling = first;
            if let Some(c) = arena.body_mut(parent).children_mut() {
                c.first = Some(name);
            }
        }
    }
}

impl Store {
    /// A name with an integer key, optionally pointing at `value`.
    pub fn new_name_int(&self, key: VarInt, value: Option<&Var>) -> Result<Var, StoreError> {
        self.new_name(KeyRef::Int(key), value)
    }

    /// A name with a string key, optionally pointing at `value`.
    pub fn new_name_str(&self, key: &str, value: Option<&Var>) -> Result<Var, StoreError> {
        let key = self.new_str(key)?;
        self.new_name(KeyRef::Str(key.cell()), value)
    }

    fn new_name(&self, key: KeyRef, value: Option<&Var>) -> Result<Var, StoreError> {
        let name = self.alloc(Body::Name {
            key,
            value: value.map(Var::cell),
        })?;
        {
            let mut arena = self.arena_mut();
            if let KeyRef::Str(k) = key {
                arena.add_ref(k);
            }
            if let Some(v) = value {
                arena.add_ref(v.cell());
            }
        }
        Ok(name)
    }
}

impl Var {
    fn children(&self) -> Result<Children, StoreError> {
        let children = children_of(&self.store().arena(), self.cell());
        children.ok_or_else(|| self.wrong_kind("object, array or function"))
    }

    /// Lock the first child name.
    pub fn first_child(&self) -> Result<Option<Var>, StoreError> {
        let first = self.children()?.first;
        Ok(first.map(|r| self.store().lock(r)))
    }

    /// Lock the last child name.
    pub fn last_child(&self) -> Result<Option<Var>, StoreError> {
        let last = self.children()?.last;
        Ok(last.map(|r| self.store().lock(r)))
    }

    /// Lock the next sibling in link order.
    pub fn next_sibling(&self) -> Option<Var> {
        let next = self.store().arena().cell(self.cell()).next_sibling;
        next.map(|r| self.store().lock(r))
    }

    /// Lock the previous sibling in link order.
    pub fn prev_sibling(&self) -> Option<Var> {
        let prev = self.store().arena().cell(self.cell()).prev_sibling;
        prev.map(|r| self.store().lock(r))
    }

    /// The key of a name cell.
    pub fn name_key(&self) -> Result<Key, StoreError> {
        let key = match self.store().arena().body(self.cell()) {
            Body::Name { key, .. } => Some(*key),
            _ => None,
        };
        match key {
            Some(KeyRef::Int(i)) => Ok(Key::Int(i)),
            Some(KeyRef::Str(k)) => Ok(Key::Str(self.store().lock(k))),
            None => Err(self.wrong_kind("name")),
        }
    }

    /// The value a name points at; `None` is undefined.
    pub fn name_value(&self) -> Result<Option<Var>, StoreError> {
        let value = match self.store().arena().body(self.cell()) {
            Body::Name { value, .. } => Ok(*value),
            _ => Err(()),
        };
        match value {
            Ok(v) => Ok(v.map(|r| self.store().lock(r))),
            Err(()) => Err(self.wrong_kind("name")),
        }
    }

    /// Point a name at a new value, releasing the old one.
    pub fn set_name_value(&self, value: Option<&Var>) -> Result<(), StoreError> {
        let mut arena = self.store().arena_mut();
        if let Some(v) = value {
            arena.add_ref(v.cell());
        }
        let old = match arena.body_mut(self.cell()) {
            Body::Name { value: slot, .. } => std::mem::replace(slot, value.map(Var::cell)),
            _ => {
                if let Some(v) = value {
                    arena.release_ref(v.cell());
                }
                drop(arena);
                return Err(self.wrong_kind("name"));
            }
        };
        if let Some(old) = old {
            arena.release_ref(old);
        }
        Ok(())
    }

    /// Add a name as a child of this composite.
    ///
    /// Arrays keep integer keys sorted, searching back from the end, and
    /// grow `length` to cover the new index. The name must not already
    /// belong to a parent.
    pub fn add_child(&self, name: &Var) -> Result<(), StoreError> {
        let children = self.children()?;
        if !name.is_name() || name.refs() != 0 {
            return Err(name.wrong_kind("unparented name"));
        }
        let is_array = self.is_array();
        let mut arena = self.store().arena_mut();
        let name = name.cell();
        arena.add_ref(name);
        let order = key_order(&arena, name);
        let int_key = match arena.body(name) {
            Body::Name {
                key: KeyRef::Int(i),
                ..
            } => Some(*i),
            _ => None,
        };
        if let (true, Some(i)) = (is_array, int_key) {
            let needed = u32::try_from(i).map_or(0, |i| i.saturating_add(1));
            if let Body::Array { length, .. } = arena.body_mut(self.cell()) {
                *length = (*length).max(needed);
            }
        }
        let mut after = children.last;
        if is_array {
            while let Some(a) = after {
                if order >= key_order(&arena, a) {
                    break;
                }
                after = arena.cell(a).prev_sibling;
            }
        }
        link_after(&mut arena, self.cell(), name, after);
        Ok(())
    }

    /// Unlink a child name and release the parent's reference to it.
    pub fn remove_child(&self, name: &Var) -> Result<(), StoreError> {
        self.children()?;
        let mut arena = self.store().arena_mut();
        let parent = self.cell();
        let child = name.cell();
        let (prev, next) = {
            let c = arena.cell(child);
            (c.prev_sibling, c.next_sibling)
        };
        let mut was_child = false;
        if let Some(c) = arena.body_mut(parent).children_mut() {
            if c.first == Some(child) {
                c.first = next;
                was_child = true;
            }
            if c.last == Some(child) {
                c.last = prev;
                was_child = true;
            }
        }
        if let Some(p) = prev {
            arena.cell_mut(p).next_sibling = next;
            was_child = true;
        }
        if let Some(n) = next {
            arena.cell_mut(n).prev_sibling = prev;
            was_child = true;
        }
        let c = arena.cell_mut(child);
        c.prev_sibling = None;
        c.next_sibling = None;
        if was_child {
            arena.release_ref(child);
        }
        Ok(())
    }

    fn find_child_where(
        &self,
        pred: impl Fn(&Arena, CellRef) -> bool,
    ) -> Result<Option<Var>, StoreError> {
        let children = self.children()?;
        let found = {
            let arena = self.store().arena();
            let mut cur = children.first;
            while let Some(c) = cur {
                if pred(&arena, c) {
                    break;
                }
                cur = arena.cell(c).next_sibling;
            }
            cur
        };
        Ok(found.map(|r| self.store().lock(r)))
    }

    /// The child name whose key is `key`.
    pub fn find_child(&self, key: &str) -> Result<Option<Var>, StoreError> {
        self.find_child_where(|arena, c| key_matches(arena, c, key.as_bytes()))
    }

    /// The child name whose key is the integer `key`.
    pub fn find_child_int(&self, key: VarInt) -> Result<Option<Var>, StoreError> {
        let text = key.to_string();
        self.find_child_where(|arena, c| match arena.body(c) {
            Body::Name {
                key: KeyRef::Int(i),
                ..
            } => *i == key,
            _ => key_matches(arena, c, text.as_bytes()),
        })
    }

    /// The value stored under `key`.
    pub fn object_get(&self, key: &str) -> Result<Option<Var>, StoreError> {
        match self.find_child(key)? {
            Some(name) => name.name_value(),
            None => Ok(None),
        }
    }

    /// Store `value` under `key`, replacing any existing value.
    pub fn object_set(&self, key: &str, value: &Var) -> Result<(), StoreError> {
        match self.find_child(key)? {
            Some(name) => name.set_name_value(Some(value)),
            None => {
                let name = self.store().new_name_str(key, Some(value))?;
                self.add_child(&name)
            }
        }
    }

    /// Number of child names.
    pub fn child_count(&self) -> Result<usize, StoreError> {
        let children = self.children()?;
        let arena = self.store().arena();
        let mut count = 0;
        let mut cur = children.first;
        while let Some(c) = cur {
            count += 1;
            cur = arena.cell(c).next_sibling;
        }
        Ok(count)
    }

    /// An array's `length`.
    pub fn array_len(&self) -> Result<u32, StoreError> {
        let len = match self.store().arena().body(self.cell()) {
            Body::Array { length, .. } => Some(*length),
            _ => None,
        };
        len.ok_or_else(|| self.wrong_kind("array"))
    }

    /// Append `value` at index `length`. Returns the new length.
    pub fn array_push(&self, value: &Var) -> Result<u32, StoreError> {
        let index = self.array_len()?;
        let key = VarInt::try_from(index).map_err(|_| self.wrong_kind("array below 2^31 elements"))?;
        let name = self.store().new_name_int(key, Some(value))?;
        self.add_child(&name)?;
        self.array_len()
    }

    /// The element at `index`; `None` for holes and out-of-range indices.
    pub fn array_get(&self, index: VarInt) -> Result<Option<Var>, StoreError> {
        match self.find_child_int(index)? {
            Some(name) => name.name_value(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Kind;

    fn store() -> Store {
        Store::with_cells(64).unwrap()
    }

    fn keys(parent: &Var) -> Vec<VarInt> {
        let mut out = Vec::new();
        let mut cur = parent.first_child().unwrap();
        while let Some(name) = cur {
            out.push(name.name_key().unwrap().as_int());
            cur = name.next_sibling();
        }
        out
    }

    #[test]
    fn push_assigns_sequential_indices() {
        let s = store();
        let arr = s.new_array().unwrap();
        for v in [10, 20, 30] {
            arr.array_push(&s.new_int(v).unwrap()).unwrap();
        }
        assert_eq!(arr.array_len().unwrap(), 3);
        assert_eq!(keys(&arr), vec![0, 1, 2]);
        assert_eq!(arr.array_get(1).unwrap().unwrap().as_int(), 20);
        assert!(arr.array_get(3).unwrap().is_none());
    }

    #[test]
    fn array_insert_keeps_keys_sorted() {
        let s = store();
        let arr = s.new_array().unwrap();
        for k in [5, 1, 3, 0] {
            let name = s.new_name_int(k, None).unwrap();
            arr.add_child(&name).unwrap();
        }
        assert_eq!(keys(&arr), vec![0, 1, 3, 5]);
        assert_eq!(arr.array_len().unwrap(), 6);
        assert_eq!(arr.last_child().unwrap().unwrap().name_key().unwrap().as_int(), 5);
    }

    #[test]
    fn object_children_keep_insertion_order() {
        let s = store();
        let obj = s.new_object().unwrap();
        obj.object_set("b", &s.new_int(2).unwrap()).unwrap();
        obj.object_set("a", &s.new_int(1).unwrap()).unwrap();
        let first = obj.first_child().unwrap().unwrap();
        match first.name_key().unwrap() {
            Key::Str(k) => assert!(k.eq_bytes(b"b")),
            Key::Int(_) => panic!("expected string key"),
        }
    }

    #[test]
    fn object_set_replaces_value() {
        let s = store();
        let obj = s.new_object().unwrap();
        obj.object_set("x", &s.new_int(1).unwrap()).unwrap();
        obj.object_set("x", &s.new_int(2).unwrap()).unwrap();
        assert_eq!(obj.child_count().unwrap(), 1);
        assert_eq!(obj.object_get("x").unwrap().unwrap().as_int(), 2);
        assert!(obj.object_get("y").unwrap().is_none());
    }

    #[test]
    fn dropping_object_frees_names_keys_and_values() {
        let s = store();
        let obj = s.new_object().unwrap();
        obj.object_set("data", &s.new_str("payload").unwrap()).unwrap();
        obj.object_set("count", &s.new_int(3).unwrap()).unwrap();
        assert!(s.usage() > 1);
        drop(obj);
        assert_eq!(s.usage(), 0);
    }

    #[test]
    fn shared_value_survives_one_owner() {
        let s = store();
        let shared = s.new_int(7).unwrap();
        let a = s.new_object().unwrap();
        let b = s.new_object().unwrap();
        a.object_set("v", &shared).unwrap();
        b.object_set("v", &shared).unwrap();
        assert_eq!(shared.refs(), 2);
        drop(shared);
        drop(a);
        assert_eq!(b.object_get("v").unwrap().unwrap().as_int(), 7);
    }

    #[test]
    fn remove_child_unlinks_and_frees() {
        let s = store();
        let arr = s.new_array().unwrap();
        for v in [1, 2, 3] {
            arr.array_push(&s.new_int(v).unwrap()).unwrap();
        }
        let before = s.usage();
        let middle = arr.find_child_int(1).unwrap().unwrap();
        arr.remove_child(&middle).unwrap();
        drop(middle);
        assert_eq!(keys(&arr), vec![0, 2]);
        assert_eq!(s.usage(), before - 2);
    }

    #[test]
    fn name_cannot_have_two_parents() {
        let s = store();
        let a = s.new_object().unwrap();
        let b = s.new_object().unwrap();
        let name = s.new_name_str("k", None).unwrap();
        a.add_child(&name).unwrap();
        assert!(b.add_child(&name).is_err());
    }

    #[test]
    fn find_child_matches_integer_keys_by_text() {
        let s = store();
        let arr = s.new_array().unwrap();
        arr.array_push(&s.new_int(9).unwrap()).unwrap();
        assert!(arr.find_child("0").unwrap().is_some());
        assert!(arr.find_child("1").unwrap().is_none());
    }

    #[test]
    fn composite_ops_reject_scalars() {
        let s = store();
        let n = s.new_int(1).unwrap();
        assert!(matches!(
            n.first_child(),
            Err(StoreError::WrongKind {
                found: Kind::Integer,
                ..
            })
        ));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Push(VarInt),
            Set(u8, VarInt),
            RemoveFirst,
            Nest,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<VarInt>().prop_map(Op::Push),
                (any::<u8>(), any::<VarInt>()).prop_map(|(k, v)| Op::Set(k % 4, v)),
                Just(Op::RemoveFirst),
                Just(Op::Nest),
            ]
        }

        proptest! {
            #[test]
            fn random_edits_return_every_cell(ops in prop::collection::vec(op(), 0..40)) {
                let s = Store::with_cells(512).unwrap();
                {
                    let arr = s.new_array().unwrap();
                    let obj = s.new_object().unwrap();
                    for op in ops {
                        match op {
                            Op::Push(v) => {
                                arr.array_push(&s.new_int(v).unwrap()).unwrap();
                            }
                            Op::Set(k, v) => {
                                let key = format!("k{k}");
                                obj.object_set(&key, &s.new_int(v).unwrap()).unwrap();
                            }
                            Op::RemoveFirst => {
                                if let Some(first) = arr.first_child().unwrap() {
                                    arr.remove_child(&first).unwrap();
                                }
                            }
                            Op::Nest => {
                                arr.array_push(&obj).unwrap();
                            }
                        }
                    }
                    prop_assert!(obj.child_count().unwrap() <= 4);
                }
                prop_assert_eq!(s.usage(), 0);
            }
        }
    }
}
