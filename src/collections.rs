/// Collections

use crate::debug::MemoryUse;

/// Densely packed storage addressed by sparse keys
///
/// Keys are entity slot indices. Items are stored contiguously, removal swaps the last item into the
/// hole, so iteration order is not insertion order
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    sparse: Vec<usize>,
    dense: Vec<usize>,
    data: Vec<T>,
}

const EMPTY_KEY: usize = std::usize::MAX;

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        SparseSet::new()
    }
}

impl<T> SparseSet<T> {
    pub fn new() -> SparseSet<T> {
        SparseSet {
            sparse: Vec::new(),
            dense: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Returns true if the `SparseSet` contains an item for `key`
    pub fn contains(&self, key: usize) -> bool {
        self.get_idx(key).is_some()
    }

    /// Inserts the item with the given key, if there is already a stored item associated with the key, returns Some(stored)
    ///
    /// Returns None if there wasn't
    pub fn insert_with(&mut self, key: usize, item: T) -> Option<T> {
        if key >= self.capacity() {
            self.sparse.resize(key + 1, EMPTY_KEY);
        }

        if let Some(stored) = self.get_mut(key) {
            Some(std::mem::replace(stored, item))
        } else {
            self.sparse[key] = self.len();
            self.dense.push(key);
            self.data.push(item);
            None
        }
    }

    pub fn remove(&mut self, key: usize) -> Option<T> {
        let idx = self.get_idx(key)?;
        let last = self.len() - 1;

        self.dense.swap_remove(idx);
        let item = self.data.swap_remove(idx);

        // the previously last item now lives at idx
        if idx != last {
            let moved = self.dense[idx];
            self.sparse[moved] = idx;
        }

        // Set the sparse item to a marker value, for quicker testing of empty spaces
        self.sparse[key] = EMPTY_KEY;
        Some(item)
    }

    pub fn capacity(&self) -> usize {
        self.sparse.len()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.data.clear();
    }

    pub fn get(&self, key: usize) -> Option<&T> {
        self.get_idx(key).map(|idx| &self.data[idx])
    }

    pub fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        match self.get_idx(key) {
            Some(idx) => Some(&mut self.data[idx]),
            None => None,
        }
    }

    pub fn keys(&self) -> &[usize] {
        self.dense.as_slice()
    }

    /// Key/value pairs in storage order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.dense.iter().copied().zip(self.data.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.dense.iter().copied().zip(self.data.iter_mut())
    }

    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }

    fn get_idx(&self, key: usize) -> Option<usize> {
        let idx = *self.sparse.get(key)?;
        if idx < self.len() && self.dense[idx] == key {
            Some(idx)
        } else {
            None
        }
    }
}

impl<T> MemoryUse for SparseSet<T> {
    fn memory_use_estimate(&self) -> usize {
        let mut total = std::mem::size_of::<Self>();
        total += self.sparse.capacity() * std::mem::size_of::<usize>();
        total += self.dense.capacity() * std::mem::size_of::<usize>();
        total += self.data.capacity() * std::mem::size_of::<T>();
        total
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sparse_set() {
        let n = 8;
        let mut set = SparseSet::new();

        fn to_letter(i: usize) -> char { (i + 97) as u8 as char }

        for i in 0..n {
            assert_eq!(None, set.insert_with(i, to_letter(i)));
        }

        for i in 0..n {
            assert_eq!(&to_letter(i), set.get(i).unwrap());
        }

        for i in 0..n {
            assert_eq!(to_letter(i), set.remove(i).unwrap());

            for j in (i+1)..n {
                assert_eq!(&to_letter(j), set.get(j).unwrap());
            }
        }
        assert!(set.is_empty());
    }

    #[test]
    fn remove_keeps_other_keys_addressable() {
        let mut set = SparseSet::new();
        set.insert_with(10, "ten");
        set.insert_with(3, "three");
        set.insert_with(7, "seven");

        assert_eq!(Some("ten"), set.remove(10));
        assert_eq!(None, set.remove(10));
        assert_eq!(Some(&"three"), set.get(3));
        assert_eq!(Some(&"seven"), set.get(7));
        assert!(!set.contains(10));

        let mut keys = set.keys().to_vec();
        keys.sort();
        assert_eq!(vec![3, 7], keys);
    }

    #[test]
    fn insert_replaces_existing() {
        let mut set = SparseSet::new();
        assert_eq!(None, set.insert_with(2, 1.0));
        assert_eq!(Some(1.0), set.insert_with(2, 2.0));
        assert_eq!(1, set.len());

        for (key, value) in set.iter_mut() {
            assert_eq!(2, key);
            *value *= 2.0;
        }
        assert_eq!(Some(&4.0), set.get(2));
    }
}
