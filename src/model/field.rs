//! Per-field "already set" semantics shared by every settable field
//! (spec.md §3, testable property 3).

use crate::error::{Error, Result};

/// The result of a successful `Field::set`: a true initialization/change,
/// or a redundant re-assignment of the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Initialized,
    AlreadySet,
}

impl Assignment {
    pub fn is_already_set(self) -> bool {
        matches!(self, Assignment::AlreadySet)
    }
}

/// A field that is either uninitialized or holds a value, with
/// `Set(v)` on an already-`v` field reporting `AlreadySet` rather than
/// silently succeeding as a plain initialization.
#[derive(Debug, Clone, Default)]
pub struct Field<T> {
    value: Option<T>,
}

impl<T: PartialEq + Clone> Field<T> {
    pub fn new() -> Self {
        Field { value: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Result<&T> {
        self.value.as_ref().ok_or_else(Error::not_initialized)
    }

    /// Assigns `v`, validating it first with `validate`. Returns
    /// `Assignment::AlreadySet` (not an error) when `v` already holds.
    pub fn try_set<F>(&mut self, value: T, validate: F) -> Result<Assignment>
    where
        F: FnOnce(&T) -> Result<()>,
    {
        if self.value.as_ref() == Some(&value) {
            return Ok(Assignment::AlreadySet);
        }
        validate(&value)?;
        self.value = Some(value);
        Ok(Assignment::Initialized)
    }

    /// Assigns `v` unconditionally (no range check).
    pub fn set(&mut self, value: T) -> Result<Assignment> {
        self.try_set(value, |_| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_get_fails() {
        let f: Field<i32> = Field::new();
        assert!(f.get().unwrap_err().is_not_initialized());
    }

    #[test]
    fn set_then_set_same_value_is_already_set_law() {
        let mut f: Field<i32> = Field::new();
        assert_eq!(f.set(5).unwrap(), Assignment::Initialized);
        assert_eq!(*f.get().unwrap(), 5);
        assert_eq!(f.set(5).unwrap(), Assignment::AlreadySet);
        assert_eq!(*f.get().unwrap(), 5);
    }

    #[test]
    fn set_out_of_range_fails_and_leaves_field_unchanged() {
        let mut f: Field<i32> = Field::new();
        let err = f
            .try_set(100, |v| {
                if *v > 10 {
                    Err(Error::out_of_range())
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(err.is_out_of_range());
        assert!(f.get().unwrap_err().is_not_initialized());
    }
}
