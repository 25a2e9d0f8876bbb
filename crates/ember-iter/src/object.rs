//! Cursor over the child names of a composite.

use ember_store::Var;

use crate::error::IterError;

/// Walks the children of an object, array, function or root in link
/// order. The cursor holds a lock on the current name.
#[derive(Clone, Debug)]
pub struct ObjectIter {
    var: Option<Var>,
}

impl ObjectIter {
    /// Open a cursor on the first child of `composite`.
    pub fn new(composite: &Var) -> Result<Self, IterError> {
        if !composite.is_composite() {
            return Err(IterError::WrongKind {
                expected: "object",
                found: composite.kind(),
            });
        }
        Ok(Self {
            var: composite.first_child()?,
        })
    }

    /// The current name cell.
    pub fn get_key(&self) -> Option<Var> {
        self.var.clone()
    }

    /// The value under the current name.
    pub fn get_value(&self) -> Result<Option<Var>, IterError> {
        match &self.var {
            Some(name) => Ok(name.name_value()?),
            None => Ok(None),
        }
    }

    /// Replace the value under the current name.
    pub fn set_value(&self, value: Option<&Var>) -> Result<(), IterError> {
        if let Some(name) = &self.var {
            name.set_name_value(value)?;
        }
        Ok(())
    }

    /// Whether the cursor is on a child.
    pub fn has_value(&self) -> bool {
        self.var.is_some()
    }

    /// Move to the next sibling.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        self.var = self.var.as_ref().and_then(Var::next_sibling);
    }

    /// Unlink the current child from `parent` and move to the one after.
    pub fn remove_and_next(&mut self, parent: &Var) -> Result<(), IterError> {
        let Some(current) = self.var.take() else {
            return Ok(());
        };
        self.var = current.next_sibling();
        parent.remove_child(&current)?;
        Ok(())
    }
}
