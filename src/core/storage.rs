use crate::core::{BodyHandle, ContactHandle, JointHandle};
use crate::error::PhysicsError;
use crate::Result;
use std::marker::PhantomData;

/// A handle that addresses a slot in a `SlotStorage`
pub trait SlotHandle: Copy + std::fmt::Debug {
    /// Creates a handle for the given slot
    fn from_slot(slot: u32) -> Self;

    /// The slot this handle addresses
    fn slot(&self) -> usize;
}

macro_rules! impl_slot_handle {
    ($($handle:ty),*) => {
        $(
            impl SlotHandle for $handle {
                #[inline]
                fn from_slot(slot: u32) -> Self {
                    Self(slot)
                }

                #[inline]
                fn slot(&self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

impl_slot_handle!(BodyHandle, JointHandle, ContactHandle);

/// Generic storage trait for physics objects
pub trait Storage<T, H> {
    /// Creates a new empty storage
    fn new() -> Self;

    /// Adds an item to the storage and returns its handle
    fn add(&mut self, item: T) -> H;

    /// Gets a reference to an item by its handle
    fn get(&self, handle: H) -> Option<&T>;

    /// Gets a mutable reference to an item by its handle
    fn get_mut(&mut self, handle: H) -> Option<&mut T>;

    /// Removes an item from the storage
    fn remove(&mut self, handle: H) -> Option<T>;

    /// Returns the number of items in the storage
    fn len(&self) -> usize;

    /// Returns whether the storage is empty
    fn is_empty(&self) -> bool;

    /// Clears all items from the storage
    fn clear(&mut self);

    /// Returns all live handles in insertion order
    fn handles(&self) -> Vec<H>;
}

/// Insertion-ordered storage whose handles stay valid until removal
///
/// Slots are never reused, so a removed handle cannot alias a newer item and
/// iteration order is deterministic.
#[derive(Debug, Clone)]
pub struct SlotStorage<T, H> {
    items: Vec<Option<T>>,
    live: usize,
    _handle: PhantomData<H>,
}

/// Storage for rigid bodies
pub type BodyStorage<T> = SlotStorage<T, BodyHandle>;

/// Storage for joints
pub type JointStorage<T> = SlotStorage<T, JointHandle>;

/// Storage for contacts
pub type ContactStorage<T> = SlotStorage<T, ContactHandle>;

impl<T, H> Default for SlotStorage<T, H> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            live: 0,
            _handle: PhantomData,
        }
    }
}

impl<T, H: SlotHandle> Storage<T, H> for SlotStorage<T, H> {
    fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, item: T) -> H {
        let handle = H::from_slot(self.items.len() as u32);
        self.items.push(Some(item));
        self.live += 1;
        handle
    }

    fn get(&self, handle: H) -> Option<&T> {
        self.items.get(handle.slot()).and_then(|slot| slot.as_ref())
    }

    fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.items.get_mut(handle.slot()).and_then(|slot| slot.as_mut())
    }

    fn remove(&mut self, handle: H) -> Option<T> {
        let removed = self.items.get_mut(handle.slot()).and_then(|slot| slot.take());
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    fn len(&self) -> usize {
        self.live
    }

    fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn clear(&mut self) {
        self.items.clear();
        self.live = 0;
    }

    fn handles(&self) -> Vec<H> {
        self.iter().map(|(h, _)| h).collect()
    }
}

impl<T, H: SlotHandle> SlotStorage<T, H> {
    /// Iterates over live items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (H::from_slot(i as u32), item)))
    }

    /// Iterates mutably over live items in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> + '_ {
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|item| (H::from_slot(i as u32), item)))
    }

    /// Number of slots ever allocated, including removed ones
    pub fn slot_count(&self) -> usize {
        self.items.len()
    }

    /// Gets an item by its handle, returning an error if not found
    pub fn get_checked(&self, handle: H) -> Result<&T> {
        self.get(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("{:?} not found", handle)))
    }

    /// Gets a mutable reference to an item by its handle, returning an error if not found
    pub fn get_checked_mut(&mut self, handle: H) -> Result<&mut T> {
        self.get_mut(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("{:?} not found", handle)))
    }

    /// Gets two distinct items mutably
    pub fn get_pair_mut(&mut self, a: H, b: H) -> Result<(&mut T, &mut T)> {
        let (ia, ib) = (a.slot(), b.slot());
        if ia == ib {
            return Err(PhysicsError::InvalidParameter(format!(
                "{:?} requested twice",
                a
            )));
        }
        if ia >= self.items.len() || ib >= self.items.len() {
            return Err(PhysicsError::ResourceNotFound(format!("{:?} or {:?} not found", a, b)));
        }

        let (first, second) = if ia < ib {
            let (lo, hi) = self.items.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.items.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        };

        match (first.as_mut(), second.as_mut()) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(PhysicsError::ResourceNotFound(format!("{:?} or {:?} not found", a, b))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_survive_removal() {
        let mut storage: BodyStorage<i32> = Storage::new();
        let a = storage.add(1);
        let b = storage.add(2);
        let c = storage.add(3);

        assert_eq!(storage.remove(b), Some(2));
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get(c), Some(&3));
        assert!(storage.get_checked(b).is_err());
        assert_eq!(storage.handles(), vec![a, c]);
    }

    #[test]
    fn test_pair_access() {
        let mut storage: JointStorage<i32> = Storage::new();
        let a = storage.add(1);
        let b = storage.add(2);

        {
            let (x, y) = storage.get_pair_mut(b, a).unwrap();
            *x += 10;
            *y += 20;
        }
        assert_eq!(storage.get(a), Some(&21));
        assert_eq!(storage.get(b), Some(&12));
        assert!(storage.get_pair_mut(a, a).is_err());
    }
}
