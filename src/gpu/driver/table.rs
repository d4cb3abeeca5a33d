use std::num::NonZeroU32;

use rustc_hash::FxHashMap;

/// Name-to-object map handing out fresh, never reused, non-zero names.
pub(crate) struct ObjectTable<T> {
    issued: u32,
    objects: FxHashMap<NonZeroU32, T>,
}

impl<T> Default for ObjectTable<T> {
    fn default() -> Self {
        Self {
            issued: 0,
            objects: FxHashMap::default(),
        }
    }
}

impl<T> ObjectTable<T> {
    /// Store `value` under a new name.
    pub(crate) fn insert(&mut self, value: T) -> NonZeroU32 {
        let name = NonZeroU32::MIN.saturating_add(self.issued);
        self.issued = self.issued.saturating_add(1);
        let _ = self.objects.insert(name, value);
        name
    }

    pub(crate) fn get(&self, name: NonZeroU32) -> Option<&T> {
        self.objects.get(&name)
    }

    pub(crate) fn get_mut(&mut self, name: NonZeroU32) -> Option<&mut T> {
        self.objects.get_mut(&name)
    }

    pub(crate) fn remove(&mut self, name: NonZeroU32) -> Option<T> {
        self.objects.remove(&name)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_never_reused() {
        let mut table = ObjectTable::default();
        let a = table.insert("a");
        let b = table.insert("b");
        assert_ne!(a, b);
        assert_eq!(table.remove(a), Some("a"));
        let c = table.insert("c");
        assert_ne!(c, a);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(c), Some(&"c"));
        assert_eq!(table.get(a), None);
    }
}
