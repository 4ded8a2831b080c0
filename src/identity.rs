/// Entity identity

use std::fmt::Display;

pub type Generation = u32;

/// An opaque identifier for any given entity in the world. Corresponds to exactly one entity, alive or dead.
///
/// The index is reused once an entity is despawned, the generation is not, so a handle to a dead entity
/// never resolves to whatever took its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: Generation,
}

impl EntityId {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityAllocator {
    generations: Vec<Generation>,
    alive: Vec<bool>,
    free: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return EntityId { index, generation: self.generations[slot] }
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        EntityId { index, generation: 0 }
    }

    /// Frees the entity's slot, returns false if the handle was already dead
    pub fn free(&mut self, entity: EntityId) -> bool {
        if !self.is_alive(entity) {
            return false
        }

        let slot = entity.index();
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        let slot = entity.index();
        slot < self.generations.len() && self.alive[slot] && self.generations[slot] == entity.generation
    }

    /// The live entity currently occupying slot `index`
    pub fn id_at(&self, index: usize) -> Option<EntityId> {
        if index < self.generations.len() && self.alive[index] {
            Some(EntityId { index: index as u32, generation: self.generations[index] })
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.generations.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live entity, in slot order
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.generations.iter().zip(self.alive.iter()).enumerate()
            .filter(|(_, (_, alive))| **alive)
            .map(|(index, (generation, _))| EntityId { index: index as u32, generation: *generation })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allocate_and_free() {
        let mut entities = EntityAllocator::new();
        let a = entities.allocate();
        let b = entities.allocate();

        assert_ne!(a, b);
        assert_eq!(2, entities.len());
        assert!(entities.is_alive(a));

        assert!(entities.free(a));
        assert!(!entities.free(a));
        assert!(!entities.is_alive(a));
        assert_eq!(1, entities.len());
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut entities = EntityAllocator::new();
        let a = entities.allocate();
        entities.free(a);
        let c = entities.allocate();

        assert_eq!(a.index(), c.index());
        assert_ne!(a.generation(), c.generation());
        assert!(!entities.is_alive(a));
        assert!(entities.is_alive(c));
        assert_eq!(vec![c], entities.iter().collect::<Vec<_>>());
    }
}
