use std::fmt::{Debug, Display};

use crate::{identity::EntityId, sim::SimError, state::{RelativisticState, StateError}, world::World};

/// One frame's worth of time: `delta` of coordinate time, `delta_prime` of the pilot's proper time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProperTimeEvent {
    pub delta_prime: f64,
    pub delta: f64,
}

/// A per-body update that was refused, the body kept its previous state
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub entity: EntityId,
    pub stage: &'static str,
    pub error: SimError,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rejected the update of {}: {}", self.stage, self.entity, self.error)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageReport {
    pub updated: usize,
    pub evicted: usize,
    pub rejections: Vec<Rejection>,
}

impl StageReport {
    pub fn merge(&mut self, other: StageReport) {
        self.updated += other.updated;
        self.evicted += other.evicted;
        self.rejections.extend(other.rejections);
    }
}

/// A named step of the frame pipeline
#[derive(Clone, Copy)]
pub struct Stage {
    name: &'static str,
    func: fn(&mut World, &ProperTimeEvent) -> StageReport,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn run(&self, world: &mut World, event: &ProperTimeEvent) -> StageReport {
        (self.func)(world, event)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
        .field("name", &self.name)
        .field("func", &"fn(&mut World, &ProperTimeEvent) -> StageReport")
        .finish()
    }
}

/// Stages run in this order every frame that has a proper time event. Momentum is integrated before
/// position, and the timelines record the state after both
pub const PIPELINE: [Stage; 3] = [
    Stage { name: "acceleration", func: integrate_acceleration },
    Stage { name: "position", func: integrate_position },
    Stage { name: "timeline", func: record_timelines },
];

/// Runs every stage of `PIPELINE` in order and merges their reports
pub fn run_pipeline(world: &mut World, event: &ProperTimeEvent) -> StageReport {
    let mut report = StageReport::default();
    for stage in PIPELINE.iter() {
        let stage_report = log_context!((stage.name()) {
            stage.run(world, event)
        });
        report.merge(stage_report);
    }
    report
}

/// Converts the frame's coordinate time into the pilot's proper time
///
/// Without a pilot there is no clock to drive the frame and `None` is returned. More than one pilot is a
/// configuration error, nothing may be advanced until it is resolved
pub fn schedule_proper_time(world: &World, delta: f64) -> Result<Option<ProperTimeEvent>, SimError> {
    if !delta.is_finite() || delta < 0.0 {
        return Err(SimError::InvalidTimestep(delta))
    }

    let pilots = world.pilots();
    let pilot = match pilots.as_slice() {
        [] => {
            debug!("no pilot body, frame does not advance");
            return Ok(None)
        },
        [pilot] => *pilot,
        _ => return Err(SimError::MultipleReferenceBodies(pilots.len())),
    };

    let state = world.get::<RelativisticState>(pilot).ok_or(SimError::NoSuchEntity(pilot))?;
    let delta_prime = state.gamma() * delta;
    if !delta_prime.is_finite() {
        return Err(SimError::InvalidTimestep(delta_prime))
    }

    Ok(Some(ProperTimeEvent { delta_prime, delta }))
}

/// `p += delta_prime * a` for every body with an acceleration
pub fn integrate_acceleration(world: &mut World, event: &ProperTimeEvent) -> StageReport {
    let mut report = StageReport::default();

    for (key, acceleration) in world.accelerations.iter() {
        let (entity, state) = match (world.entities.id_at(key), world.bodies.get_mut(key)) {
            (Some(entity), Some(state)) => (entity, state),
            _ => continue,
        };

        let momentum = state.momentum() + acceleration.0 * event.delta_prime;
        match state.set_momentum(momentum) {
            Ok(()) => report.updated += 1,
            Err(e) => {
                warn!("keeping the momentum of {}: {}", entity, e);
                report.rejections.push(Rejection { entity, stage: "acceleration", error: SimError::from(e) });
            }
        }
    }
    report
}

/// `position += delta_prime * p * c / E` for every body
pub fn integrate_position(world: &mut World, event: &ProperTimeEvent) -> StageReport {
    let mut report = StageReport::default();

    for (key, state) in world.bodies.iter_mut() {
        let c = state.speed_of_light();
        let position = state.position + event.delta_prime * state.momentum() * c / state.energy();

        if position.is_finite() {
            state.position = position;
            report.updated += 1;
        } else if let Some(entity) = world.entities.id_at(key) {
            warn!("keeping the position of {}, integration produced {:?}", entity, position);
            report.rejections.push(Rejection { entity, stage: "position", error: SimError::State(StateError::NonFinite) });
        }
    }
    report
}

/// Ages every timeline by `delta_prime` and records the body's current state
pub fn record_timelines(world: &mut World, event: &ProperTimeEvent) -> StageReport {
    let mut report = StageReport::default();

    for (key, timeline) in world.timelines.iter_mut() {
        let state = match world.bodies.get(key) {
            Some(state) => state,
            None => continue,
        };

        match timeline.advance(event.delta_prime, *state) {
            Ok(evicted) => {
                report.evicted += evicted;
                report.updated += 1;
            },
            Err(e) => if let Some(entity) = world.entities.id_at(key) {
                warn!("keeping the timeline of {}: {}", entity, e);
                report.rejections.push(Rejection { entity, stage: "timeline", error: SimError::from(e) });
            },
        }
    }
    report
}
