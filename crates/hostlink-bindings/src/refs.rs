//! Value references handed across the wasm boundary.
//!
//! A guest only ever holds `i32` references. Each reference names a slot in
//! the [`RefTable`] of its run; the slot holds the [`HostValue`], including
//! primitives, until the guest drops it.

use hostlink_common::HostError;

use crate::HostValue;

/// Per-run table of values referenced by a guest.
#[derive(Debug, Default)]
pub struct RefTable {
    slots: Vec<Option<HostValue>>,
    free: Vec<u32>,
    pinned: usize,
}

impl RefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table whose first references hold `values` and can never be
    /// released.
    pub fn with_pinned(values: impl IntoIterator<Item = HostValue>) -> Self {
        let slots: Vec<_> = values.into_iter().map(Some).collect();
        Self {
            pinned: slots.len(),
            slots,
            free: Vec::new(),
        }
    }

    /// Store a value and return its reference. Released slots are reused.
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert(&mut self, value: HostValue) -> u32 {
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(value);
            return slot;
        }
        self.slots.push(Some(value));
        (self.slots.len() - 1) as u32
    }

    /// Look up a live reference.
    pub fn get(&self, reference: u32) -> Result<&HostValue, HostError> {
        self.slots
            .get(reference as usize)
            .and_then(Option::as_ref)
            .ok_or(HostError::InvalidHandle { handle: reference })
    }

    /// Release a reference. Returns `false` if it was not live or is pinned.
    pub fn release(&mut self, reference: u32) -> bool {
        if (reference as usize) < self.pinned {
            return false;
        }
        match self.slots.get_mut(reference as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.free.push(reference);
                true
            }
            _ => false,
        }
    }

    /// Number of live references.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut refs = RefTable::new();
        let a = refs.insert("a".into());
        let b = refs.insert(HostValue::Null);

        assert_ne!(a, b);
        assert_eq!(refs.get(a).unwrap(), &HostValue::from("a"));
        assert_eq!(refs.get(b).unwrap(), &HostValue::Null);
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_release_and_reuse() {
        let mut refs = RefTable::new();
        let a = refs.insert(1.into());
        let _b = refs.insert(2.into());

        assert!(refs.release(a));
        assert!(!refs.release(a));
        assert_eq!(
            refs.get(a).unwrap_err(),
            HostError::InvalidHandle { handle: a }
        );
        assert_eq!(refs.len(), 1);

        let c = refs.insert(3.into());
        assert_eq!(c, a);
        assert_eq!(refs.get(c).unwrap(), &HostValue::from(3));
    }

    #[test]
    fn test_pinned_references_survive_release() {
        let mut refs = RefTable::with_pinned([HostValue::from("window")]);

        assert!(!refs.release(0));
        assert_eq!(refs.get(0).unwrap(), &HostValue::from("window"));

        let next = refs.insert(HostValue::Null);
        assert_eq!(next, 1);
        assert!(refs.release(next));
    }

    #[test]
    fn test_unknown_reference() {
        let refs = RefTable::new();
        assert!(refs.is_empty());
        assert!(refs.get(12).is_err());
    }
}
