//! Flattening walk over numbers, strings, iterables and repeat objects.
//!
//! A value is expanded into a stream of integers:
//!
//! ```text
//! number                  → one integer
//! {data: X, count: N}     → X expanded N times
//! string                  → one integer per byte
//! array / buffer / func   → each element expanded in turn
//! ```

use ember_core::{Kind, VarInt};
use ember_store::Var;

use crate::error::WalkError;
use crate::string::StringIter;
use crate::unified::VarIter;

/// Walks a value and feeds every integer it expands to into a callback.
///
/// Callbacks run in order. On error the callbacks already made stand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walker {
    /// Deepest nesting of iterables and repeat objects the walk follows.
    pub max_depth: usize,
}

impl Walker {
    /// Default nesting limit.
    pub const DEFAULT_MAX_DEPTH: usize = 32;

    /// A walker with the given nesting limit.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Expand `data`, calling `callback` once per integer.
    pub fn iterate_callback<F>(&self, data: &Var, callback: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(VarInt),
    {
        self.walk(data, 0, callback)
    }

    /// Count the integers `data` expands to.
    pub fn iterate_callback_count(&self, data: &Var) -> Result<usize, WalkError> {
        let mut count = 0usize;
        self.iterate_callback(data, &mut |_| count += 1)?;
        Ok(count)
    }

    fn walk<F>(&self, data: &Var, depth: usize, callback: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(VarInt),
    {
        if depth > self.max_depth {
            tracing::warn!(max_depth = self.max_depth, "walk nested too deeply");
            return Err(WalkError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        let kind = data.kind();
        if kind.is_numeric() {
            callback(data.as_int());
            return Ok(());
        }
        if matches!(kind, Kind::Object | Kind::Root) {
            return self.walk_repeat(data, depth, callback);
        }
        if kind.has_char_data() {
            let mut it = StringIter::new(data, 0)?;
            while it.has_char() {
                callback(VarInt::from(it.get_char()));
                it.next();
            }
            return Ok(());
        }
        if kind.is_iterable() {
            let mut it = VarIter::new(data)?;
            while it.has_element() {
                match it.get_value()? {
                    Some(el) => self.walk(&el, depth + 1, callback)?,
                    None => {
                        tracing::warn!("expecting a number or something iterable, got undefined");
                        return Err(WalkError::Undefined);
                    }
                }
                it.next();
            }
            return Ok(());
        }
        tracing::warn!(%kind, "expecting a number or something iterable");
        Err(WalkError::NotIterable { kind })
    }

    fn walk_repeat<F>(&self, data: &Var, depth: usize, callback: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(VarInt),
    {
        let count = data.object_get("count")?;
        let inner = data.object_get("data")?;
        match (count, inner) {
            (Some(count), Some(inner)) if count.is_numeric() => {
                for _ in 0..count.as_int().max(0) {
                    self.walk(&inner, depth + 1, callback)?;
                }
                Ok(())
            }
            _ => {
                tracing::warn!(
                    "if specifying an object, it must be of the form {{data : ..., count : N}}"
                );
                Err(WalkError::UnexpectedShape { kind: data.kind() })
            }
        }
    }
}

impl Default for Walker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::ElementType;
    use ember_store::Store;

    fn collect(data: &Var) -> Result<Vec<VarInt>, WalkError> {
        let mut out = Vec::new();
        Walker::default().iterate_callback(data, &mut |v| out.push(v))?;
        Ok(out)
    }

    #[test]
    fn numbers_yield_themselves() {
        let s = Store::with_cells(8).unwrap();
        assert_eq!(collect(&s.new_int(42).unwrap()).unwrap(), vec![42]);
        assert_eq!(collect(&s.new_float(2.9).unwrap()).unwrap(), vec![2]);
        assert_eq!(collect(&s.new_bool(true).unwrap()).unwrap(), vec![1]);
    }

    #[test]
    fn strings_yield_bytes() {
        let s = Store::with_cells(8).unwrap();
        assert_eq!(collect(&s.new_str("AB").unwrap()).unwrap(), vec![65, 66]);
    }

    #[test]
    fn repeat_object_expands_data_count_times() {
        let s = Store::with_cells(16).unwrap();
        let obj = s.new_object().unwrap();
        obj.object_set("data", &s.new_int(7).unwrap()).unwrap();
        obj.object_set("count", &s.new_int(3).unwrap()).unwrap();
        assert_eq!(collect(&obj).unwrap(), vec![7, 7, 7]);
        assert_eq!(Walker::default().iterate_callback_count(&obj).unwrap(), 3);
    }

    #[test]
    fn malformed_object_is_rejected_without_callbacks() {
        let s = Store::with_cells(16).unwrap();
        let obj = s.new_object().unwrap();
        obj.object_set("data", &s.new_int(7).unwrap()).unwrap();
        obj.object_set("count", &s.new_str("x").unwrap()).unwrap();
        let mut calls = 0;
        let err = Walker::default()
            .iterate_callback(&obj, &mut |_| calls += 1)
            .unwrap_err();
        assert_eq!(err, WalkError::UnexpectedShape { kind: Kind::Object });
        assert_eq!(calls, 0);
    }

    #[test]
    fn nested_iterables_flatten_in_order() {
        let s = Store::with_cells(32).unwrap();
        let inner = s.new_array().unwrap();
        inner.array_push(&s.new_int(2).unwrap()).unwrap();
        inner.array_push(&s.new_int(3).unwrap()).unwrap();
        let buf = s.new_typed_array(ElementType::Int8, 2).unwrap();
        let mut it = crate::ArrayBufferIter::new(&buf, 0).unwrap();
        it.set_int(-4).unwrap();
        it.next();
        it.set_int(5).unwrap();
        drop(it);
        let outer = s.new_array().unwrap();
        outer.array_push(&s.new_int(1).unwrap()).unwrap();
        outer.array_push(&inner).unwrap();
        outer.array_push(&buf).unwrap();
        outer.array_push(&s.new_str("a").unwrap()).unwrap();
        assert_eq!(collect(&outer).unwrap(), vec![1, 2, 3, -4, 5, 97]);
    }

    #[test]
    fn scalars_without_numbers_are_errors() {
        let s = Store::with_cells(8).unwrap();
        let err = collect(&s.new_null().unwrap()).unwrap_err();
        assert_eq!(err, WalkError::NotIterable { kind: Kind::Null });
    }

    #[test]
    fn callbacks_before_an_error_stand() {
        let s = Store::with_cells(16).unwrap();
        let arr = s.new_array().unwrap();
        arr.array_push(&s.new_int(1).unwrap()).unwrap();
        arr.array_push(&s.new_null().unwrap()).unwrap();
        arr.array_push(&s.new_int(3).unwrap()).unwrap();
        let mut out = Vec::new();
        let res = Walker::default().iterate_callback(&arr, &mut |v| out.push(v));
        assert!(res.is_err());
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn depth_is_bounded() {
        let s = Store::with_cells(64).unwrap();
        let mut cur = s.new_int(1).unwrap();
        for _ in 0..5 {
            let arr = s.new_array().unwrap();
            arr.array_push(&cur).unwrap();
            cur = arr;
        }
        assert_eq!(Walker::new(5).iterate_callback_count(&cur).unwrap(), 1);
        assert_eq!(
            Walker::new(4).iterate_callback_count(&cur).unwrap_err(),
            WalkError::DepthExceeded { max_depth: 4 }
        );
    }
}
