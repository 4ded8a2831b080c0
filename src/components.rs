use std::{any::Any, fmt::{ Debug, Display }};
use unsafe_any::UnsafeAnyExt;

use crate::{collections::SparseSet, debug::MemoryUse, math::DVec3};

pub trait Component: Debug + Any + 'static {}
impl<T> Component for T where T: Debug + Any + 'static {}

/// Proper-frame acceleration currently applied to a body, written by whatever steers it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Acceleration(pub DVec3);

/// Marks the reference body whose proper time drives every frame. At most one may exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pilot;

/// Display name of a body, not required to be unique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

/// Type-erased storage for a component type owned by a collaborator, such as a renderer's model or camera
///
/// The simulation never reads these, it only keeps them keyed by entity and drops them with the entity
pub struct ComponentSet {
    set: Box<dyn Any>, // SparseSet<T>
    remove: fn(&mut dyn Any, usize) -> bool,
    len: fn(&dyn Any) -> usize,
    memory_use: fn(&dyn Any) -> usize,

    // for debug display purposes
    name: &'static str,
}

impl Display for ComponentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentSet(\"{name}\", count={count})", name=self.name, count=self.len())
    }
}

impl Debug for ComponentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSet")
        .field("name", &self.name)
        .field("count", &self.len())
        .finish()
    }
}

fn remove_erased<T: Component>(set: &mut dyn Any, key: usize) -> bool {
    match set.downcast_mut::<SparseSet<T>>() {
        Some(set) => set.remove(key).is_some(),
        None => false,
    }
}

fn len_erased<T: Component>(set: &dyn Any) -> usize {
    set.downcast_ref::<SparseSet<T>>().map(|set| set.len()).unwrap_or(0)
}

fn memory_use_erased<T: Component>(set: &dyn Any) -> usize {
    set.downcast_ref::<SparseSet<T>>().map(|set| set.memory_use_estimate()).unwrap_or(0)
}

impl ComponentSet {
    pub(crate) fn new<T: Component>() -> Self {
        ComponentSet {
            set: Box::new(SparseSet::<T>::new()),
            remove: remove_erased::<T>,
            len: len_erased::<T>,
            memory_use: memory_use_erased::<T>,
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        (self.len)(&*self.set)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn remove(&mut self, key: usize) -> bool {
        (self.remove)(&mut *self.set, key)
    }

    pub fn is<T: Component>(&self) -> bool {
        self.set.is::<SparseSet<T>>()
    }

    pub(crate) fn raw_set<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.set.downcast_ref::<SparseSet<T>>()
    }

    pub(crate) fn raw_set_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        self.set.downcast_mut::<SparseSet<T>>()
    }

    /// Safety: the set must have been created by `ComponentSet::new::<T>()`
    pub(crate) unsafe fn raw_set_unchecked_mut<T: Component>(&mut self) -> &mut SparseSet<T> {
        self.set.downcast_mut_unchecked::<SparseSet<T>>()
    }
}

impl MemoryUse for ComponentSet {
    fn memory_use_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + (self.memory_use)(&*self.set)
    }
}
