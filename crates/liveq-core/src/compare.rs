//! Pluggable structural comparison of query descriptors
//!
//! The synchronization layer treats a query as an opaque descriptor; the
//! only thing it needs from one is an injected equality strategy. Backends
//! with vendor-specific "are these queries equal" helpers implement
//! [`Comparator`] over their descriptor type; plain value descriptors get
//! [`StructuralEq`] for free.

use crate::error::ComparisonError;

/// Strategy deciding whether two descriptors denote the same query.
///
/// Implementations must not panic on malformed descriptors - return a
/// [`ComparisonError`] instead. The stabilizer treats a failed comparison
/// as "not equal" (preferring a redundant resubscription over silently
/// reusing the wrong query).
pub trait Comparator<Q>: Send + Sync {
    /// Compare two descriptors structurally.
    ///
    /// # Errors
    /// [`ComparisonError`] when equality cannot be determined.
    fn compare(&self, a: &Q, b: &Q) -> Result<bool, ComparisonError>;
}

/// Default comparator for descriptors with derived value equality
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralEq;

impl<Q: PartialEq> Comparator<Q> for StructuralEq {
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Result<bool, ComparisonError> {
        Ok(a == b)
    }
}

impl<Q, F> Comparator<Q> for F
where
    F: Fn(&Q, &Q) -> Result<bool, ComparisonError> + Send + Sync,
{
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Result<bool, ComparisonError> {
        self(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_eq_compares_values() {
        let cmp = StructuralEq;
        assert!(cmp.compare(&1, &1).unwrap());
        assert!(!cmp.compare(&1, &2).unwrap());
    }

    #[test]
    fn closures_are_comparators() {
        let cmp = |a: &String, b: &String| -> Result<bool, ComparisonError> {
            Ok(a.to_lowercase() == b.to_lowercase())
        };
        assert!(cmp.compare(&"Open".to_string(), &"open".to_string()).unwrap());
    }

    #[test]
    fn fallible_comparator_surfaces_error() {
        let cmp = |_: &String, _: &String| -> Result<bool, ComparisonError> {
            Err(ComparisonError::new("malformed"))
        };
        let err = cmp
            .compare(&"a".to_string(), &"b".to_string())
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
