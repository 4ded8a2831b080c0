/// World

use std::{any::TypeId, collections::HashMap};

use crate::{
    collections::SparseSet,
    components::{Acceleration, Component, ComponentSet, Name, Pilot},
    config::ConfigError,
    debug::*,
    identity::{EntityAllocator, EntityId},
    math::*,
    pilot::PilotControl,
    sim::SimError,
    state::{RelativisticState, StateError},
    timeline::Timeline,
};

/// Every body of the simulation and the components they hold
///
/// Core components live in their own statically typed `SparseSet`, keyed by the entity's slot index, so the
/// stages can borrow them side by side. Components owned by collaborators go in the type-erased attachment store
#[derive(Debug)]
pub struct World {
    pub(crate) entities: EntityAllocator,
    pub(crate) bodies: SparseSet<RelativisticState>,
    pub(crate) accelerations: SparseSet<Acceleration>,
    pub(crate) pilots: SparseSet<Pilot>,
    pub(crate) controls: SparseSet<PilotControl>,
    pub(crate) timelines: SparseSet<Timeline<RelativisticState>>,
    names: SparseSet<Name>,
    attachments: HashMap<TypeId, ComponentSet>,
    speed_of_light: f64,
}

/// Access to the set holding one core component type
pub trait Storage<T> {
    fn storage(&self) -> &SparseSet<T>;
    fn storage_mut(&mut self) -> &mut SparseSet<T>;
}

macro_rules! impl_storage {
    ($t:ty, $field:ident) => {
        impl Storage<$t> for World {
            fn storage(&self) -> &SparseSet<$t> {
                &self.$field
            }

            fn storage_mut(&mut self) -> &mut SparseSet<$t> {
                &mut self.$field
            }
        }
    };
}

impl_storage!(RelativisticState, bodies);
impl_storage!(Acceleration, accelerations);
impl_storage!(Pilot, pilots);
impl_storage!(PilotControl, controls);
impl_storage!(Timeline<RelativisticState>, timelines);
impl_storage!(Name, names);

impl World {
    pub fn new(speed_of_light: f64) -> Self {
        World {
            entities: EntityAllocator::new(),
            bodies: SparseSet::new(),
            accelerations: SparseSet::new(),
            pilots: SparseSet::new(),
            controls: SparseSet::new(),
            timelines: SparseSet::new(),
            names: SparseSet::new(),
            attachments: HashMap::new(),
            speed_of_light,
        }
    }

    pub fn speed_of_light(&self) -> f64 {
        self.speed_of_light
    }

    /// Allocates an entity with no components
    pub fn spawn(&mut self) -> EntityId {
        self.entities.allocate()
    }

    /// Removes the entity and every component it holds, attachments included
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), SimError> {
        if !self.entities.is_alive(entity) {
            return Err(SimError::NoSuchEntity(entity))
        }

        let key = entity.index();
        self.bodies.remove(key);
        self.accelerations.remove(key);
        self.pilots.remove(key);
        self.controls.remove(key);
        self.timelines.remove(key);
        self.names.remove(key);
        for set in self.attachments.values_mut() {
            set.remove(key);
        }

        self.entities.free(entity);
        debug!("despawned entity {}", entity);
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter()
    }

    pub fn get<T>(&self, entity: EntityId) -> Option<&T> where Self: Storage<T> {
        if !self.entities.is_alive(entity) {
            return None
        }
        <Self as Storage<T>>::storage(self).get(entity.index())
    }

    pub fn get_mut<T>(&mut self, entity: EntityId) -> Option<&mut T> where Self: Storage<T> {
        if !self.entities.is_alive(entity) {
            return None
        }
        <Self as Storage<T>>::storage_mut(self).get_mut(entity.index())
    }

    /// Inserts or replaces a core component, returning the replaced value
    pub fn insert<T>(&mut self, entity: EntityId, component: T) -> Result<Option<T>, SimError> where Self: Storage<T> {
        if !self.entities.is_alive(entity) {
            return Err(SimError::NoSuchEntity(entity))
        }
        Ok(<Self as Storage<T>>::storage_mut(self).insert_with(entity.index(), component))
    }

    pub fn remove<T>(&mut self, entity: EntityId) -> Option<T> where Self: Storage<T> {
        if !self.entities.is_alive(entity) {
            return None
        }
        <Self as Storage<T>>::storage_mut(self).remove(entity.index())
    }

    /// Every live entity holding a `T`, with the component
    pub fn each<'a, T: 'a>(&'a self) -> impl Iterator<Item = (EntityId, &'a T)> + 'a where Self: Storage<T> {
        let entities = &self.entities;
        <Self as Storage<T>>::storage(self).iter().filter_map(move |(key, component)| entities.id_at(key).map(|entity| (entity, component)))
    }

    pub fn each_body(&self) -> impl Iterator<Item = (EntityId, &RelativisticState)> + '_ {
        self.each::<RelativisticState>()
    }

    /// Entities marked as `Pilot` that also have a body to take the proper time of
    pub fn pilots(&self) -> Vec<EntityId> {
        self.pilots.keys().iter()
            .copied()
            .filter(|key| self.bodies.contains(*key))
            .filter_map(|key| self.entities.id_at(key))
            .collect()
    }

    pub fn name(&self, entity: EntityId) -> Option<&str> {
        self.get::<Name>(entity).map(|name| name.0.as_str())
    }

    /// Every live entity with the given name, names are not unique
    pub fn named(&self, name: &str) -> Vec<EntityId> {
        self.each::<Name>()
            .filter(|(_, n)| n.0 == name)
            .map(|(entity, _)| entity)
            .collect()
    }

    /// Attaches a collaborator-owned component, returning the one it replaced
    pub fn attach<T: Component>(&mut self, entity: EntityId, component: T) -> Result<Option<T>, SimError> {
        if !self.entities.is_alive(entity) {
            return Err(SimError::NoSuchEntity(entity))
        }

        let set = self.attachments.entry(TypeId::of::<T>()).or_insert_with(|| {
            debug!("new attachment set for {}", std::any::type_name::<T>());
            ComponentSet::new::<T>()
        });

        // sets are keyed by TypeId::of::<T>, so the erased set always holds SparseSet<T>
        let set = unsafe { set.raw_set_unchecked_mut::<T>() };
        Ok(set.insert_with(entity.index(), component))
    }

    pub fn attachment<T: Component>(&self, entity: EntityId) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None
        }
        self.attachments.get(&TypeId::of::<T>())?.raw_set::<T>()?.get(entity.index())
    }

    pub fn attachment_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None
        }
        let set = self.attachments.get_mut(&TypeId::of::<T>())?;
        unsafe { set.raw_set_unchecked_mut::<T>() }.get_mut(entity.index())
    }

    pub fn detach<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        if !self.entities.is_alive(entity) {
            return None
        }
        self.attachments.get_mut(&TypeId::of::<T>())?.raw_set_mut::<T>()?.remove(entity.index())
    }

    pub fn attachment_sets(&self) -> impl Iterator<Item = &ComponentSet> {
        self.attachments.values()
    }

    pub fn make_body(&mut self) -> BodyBuilder<'_> {
        BodyBuilder {
            world: self,
            name: None,
            position: None,
            rotation: None,
            momentum: None,
            acceleration: None,
            pilot: false,
            controls: None,
            timeline_window: None,
            relative_body: None,
        }
    }
}

impl MemoryUse for World {
    fn memory_use_estimate(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.bodies.memory_use_estimate()
            + self.accelerations.memory_use_estimate()
            + self.pilots.memory_use_estimate()
            + self.controls.memory_use_estimate()
            + self.timelines.memory_use_estimate()
            + self.timelines.iter().map(|(_, timeline)| timeline.memory_use_estimate()).sum::<usize>()
            + self.names.memory_use_estimate()
            + self.attachments.values().map(|set| set.memory_use_estimate()).sum::<usize>()
    }
}

/// Builds a body out of the core components, validating everything before the entity is spawned
pub struct BodyBuilder<'a> {
    world: &'a mut World,
    name: Option<String>,
    position: Option<DVec3>,
    rotation: Option<Quat>,
    momentum: Option<DVec3>,
    acceleration: Option<DVec3>,
    pilot: bool,
    controls: Option<PilotControl>,
    timeline_window: Option<f64>,
    relative_body: Option<EntityId>,
}

impl<'a> BodyBuilder<'a> {
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(String::from(name));
        self
    }

    pub fn at(mut self, position: DVec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_momentum(mut self, momentum: DVec3) -> Self {
        self.momentum = Some(momentum);
        self
    }

    pub fn accelerating(mut self, acceleration: DVec3) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    pub fn pilot(mut self) -> Self {
        self.pilot = true;
        self
    }

    pub fn with_controls(mut self, controls: PilotControl) -> Self {
        self.controls = Some(controls);
        self
    }

    pub fn with_timeline(mut self, retention_window: f64) -> Self {
        self.timeline_window = Some(retention_window);
        self
    }

    /// Positions the body relative to another body's current position
    pub fn relative_to(mut self, entity: EntityId) -> Self {
        self.relative_body = Some(entity);
        self
    }

    /// Validates the body and adds it to the world
    pub fn add(self) -> Result<EntityId, SimError> {
        let BodyBuilder { world, name, position, rotation, momentum, acceleration, pilot, controls, timeline_window, relative_body } = self;

        let mut state = RelativisticState::at_rest(world.speed_of_light);
        state.position = position.unwrap_or_else(DVec3::zero);

        if let Some(entity) = relative_body {
            match world.get::<RelativisticState>(entity) {
                Some(relative) => state.position += relative.position,
                None => return Err(SimError::NoSuchEntity(entity)),
            }
        }

        if !state.position.is_finite() {
            return Err(SimError::State(StateError::NonFinite))
        }
        if let Some(rotation) = rotation {
            state.set_rotation(rotation)?;
        }
        if let Some(momentum) = momentum {
            state.set_momentum(momentum)?;
        }
        if let Some(acceleration) = acceleration {
            if !acceleration.is_finite() {
                return Err(SimError::State(StateError::NonFinite))
            }
        }
        if let Some(window) = timeline_window {
            if !window.is_finite() || window < 0.0 {
                return Err(SimError::Config(ConfigError::InvalidRetentionWindow(window)))
            }
        }
        if pilot && !world.pilots().is_empty() {
            warn!("adding a second pilot body, frames will be rejected until one is removed");
        }

        let entity = world.spawn();
        let key = entity.index();
        world.bodies.insert_with(key, state);
        if let Some(name) = name {
            world.names.insert_with(key, Name(name));
        }
        if let Some(acceleration) = acceleration {
            world.accelerations.insert_with(key, Acceleration(acceleration));
        }
        if pilot {
            world.pilots.insert_with(key, Pilot);
        }
        if let Some(controls) = controls {
            world.controls.insert_with(key, controls);
        }
        if let Some(window) = timeline_window {
            world.timelines.insert_with(key, Timeline::new(window));
        }

        debug!("added body {} at {:?}", entity, state.position);
        Ok(entity)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Model(&'static str);

    #[derive(Debug, PartialEq)]
    struct Camera(f64);

    #[test]
    fn build_body() {
        let mut world = World::new(2.0);
        let body = world.make_body()
            .named("marker")
            .at(DVec3::new(1.0, 2.0, 3.0))
            .with_momentum(DVec3::new(1.0, 0.0, 0.0))
            .accelerating(DVec3::new(0.0, 1.0, 0.0))
            .with_timeline(5.0)
            .add()
            .unwrap();

        let state = world.get::<RelativisticState>(body).unwrap();
        assert_eq!(DVec3::new(1.0, 2.0, 3.0), state.position);
        assert_eq!(2.0, state.speed_of_light());
        assert!((state.energy() - 5f64.sqrt()).abs() < EPSILON);

        assert_eq!(Some(&Acceleration(DVec3::new(0.0, 1.0, 0.0))), world.get::<Acceleration>(body));
        assert_eq!(Some(5.0), world.get::<Timeline<RelativisticState>>(body).map(|t| t.retention_window()));
        assert_eq!(Some("marker"), world.name(body));
        assert_eq!(vec![body], world.named("marker"));
        assert!(world.get::<Pilot>(body).is_none());
        assert!(world.pilots().is_empty());
    }

    #[test]
    fn relative_position() {
        let mut world = World::new(1.0);
        let anchor = world.make_body().at(DVec3::new(10.0, 0.0, 0.0)).add().unwrap();
        let body = world.make_body().at(DVec3::new(0.0, 1.0, 0.0)).relative_to(anchor).add().unwrap();
        assert_eq!(DVec3::new(10.0, 1.0, 0.0), world.get::<RelativisticState>(body).unwrap().position);
    }

    #[test]
    fn invalid_bodies_are_not_added() {
        let mut world = World::new(1.0);

        let result = world.make_body().with_momentum(DVec3::new(f64::NAN, 0.0, 0.0)).add();
        assert_eq!(Err(SimError::State(StateError::NonFinite)), result);

        let result = world.make_body().rotated(Quat::zero()).add();
        assert_eq!(Err(SimError::Math(MathError::DegenerateQuaternion)), result);

        let result = world.make_body().with_timeline(-1.0).add();
        assert_eq!(Err(SimError::Config(ConfigError::InvalidRetentionWindow(-1.0))), result);

        assert!(world.is_empty());
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut world = World::new(1.0);
        let body = world.make_body().named("old").add().unwrap();
        world.despawn(body).unwrap();

        assert_eq!(Err(SimError::NoSuchEntity(body)), world.despawn(body));
        assert_eq!(Err(SimError::NoSuchEntity(body)), world.insert(body, Pilot));

        // the slot is reused, the old handle must not see the new body
        let reused = world.make_body().named("new").add().unwrap();
        assert_eq!(body.index(), reused.index());
        assert!(world.get::<RelativisticState>(body).is_none());
        assert!(world.name(body).is_none());
        assert_eq!(Some("new"), world.name(reused));
    }

    #[test]
    fn attachments() {
        let mut world = World::new(1.0);
        let a = world.make_body().add().unwrap();
        let b = world.make_body().add().unwrap();

        assert_eq!(Ok(None), world.attach(a, Model("ship")));
        assert_eq!(Ok(Some(Model("ship"))), world.attach(a, Model("cube")));
        world.attach(b, Model("cube")).unwrap();
        world.attach(a, Camera(90.0)).unwrap();

        assert_eq!(Some(&Model("cube")), world.attachment::<Model>(a));
        assert!(world.attachment::<Camera>(b).is_none());

        world.attachment_mut::<Camera>(a).unwrap().0 = 60.0;
        assert_eq!(Some(&Camera(60.0)), world.attachment::<Camera>(a));

        assert_eq!(Some(Model("cube")), world.detach::<Model>(b));
        assert!(world.detach::<Model>(b).is_none());
        assert_eq!(2, world.attachment_sets().count());
    }

    #[test]
    fn despawn_removes_everything() {
        let mut world = World::new(1.0);
        let body = world.make_body()
            .named("pilot")
            .pilot()
            .accelerating(DVec3::zero())
            .with_controls(PilotControl::new(1.0, 1.0))
            .with_timeline(1.0)
            .add()
            .unwrap();
        world.attach(body, Model("ship")).unwrap();
        assert_eq!(vec![body], world.pilots());

        world.despawn(body).unwrap();
        assert!(!world.is_alive(body));
        assert!(world.pilots().is_empty());
        assert_eq!(0, world.bodies.len());
        assert_eq!(0, world.accelerations.len());
        assert_eq!(0, world.controls.len());
        assert_eq!(0, world.timelines.len());
        assert!(world.attachment_sets().all(|set| set.is_empty()));
    }

    #[test]
    fn pilots_need_a_body() {
        let mut world = World::new(1.0);
        let bodiless = world.spawn();
        world.insert(bodiless, Pilot).unwrap();
        assert!(world.pilots().is_empty());

        let pilot = world.make_body().pilot().add().unwrap();
        assert_eq!(vec![pilot], world.pilots());
        assert_eq!(2, world.len());
        assert_eq!(1, world.each_body().count());
    }

    #[test]
    fn remove_components() {
        let mut world = World::new(1.0);
        let a = world.make_body().accelerating(DVec3::new(1.0, 0.0, 0.0)).add().unwrap();
        let b = world.make_body().pilot().add().unwrap();
        assert_eq!(vec![a, b], world.entities().collect::<Vec<_>>());

        assert_eq!(Some(Acceleration(DVec3::new(1.0, 0.0, 0.0))), world.remove::<Acceleration>(a));
        assert!(world.remove::<Acceleration>(a).is_none());
        assert_eq!(Some(Pilot), world.remove::<Pilot>(b));
        assert!(world.pilots().is_empty());

        // the bodies themselves stay alive
        assert_eq!(2, world.entities().count());
        world.despawn(a).unwrap();
        assert!(world.remove::<RelativisticState>(a).is_none());
        assert_eq!(vec![b], world.entities().collect::<Vec<_>>());
    }
}
