use std::{error::Error, fmt::Display};

use crate::{
    config::{ConfigError, SimulationConfig, TerminationCondition},
    debug::*,
    identity::EntityId,
    math::MathError,
    output::OutputDevice,
    pilot,
    state::StateError,
    systems::{self, ProperTimeEvent, Rejection},
    timeline::TimelineError,
    world::{BodyBuilder, World},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// More than one body is marked as the pilot, so there is no single proper time to follow
    MultipleReferenceBodies(usize),
    InvalidTimestep(f64),
    InvalidConfig(String),
    Config(ConfigError),
    NoSuchEntity(EntityId),
    Math(MathError),
    State(StateError),
    Timeline(TimelineError),
}

impl Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleReferenceBodies(n) => write!(f, "expected at most one pilot body, found {}", n),
            Self::InvalidTimestep(dt) => write!(f, "invalid timestep: {}", dt),
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            Self::Config(inner) => write!(f, "invalid configuration: {}", inner),
            Self::NoSuchEntity(entity) => write!(f, "no such entity: {}", entity),
            Self::Math(inner) => write!(f, "math error: {}", inner),
            Self::State(inner) => write!(f, "state error: {}", inner),
            Self::Timeline(inner) => write!(f, "timeline error: {}", inner),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(inner) => Some(inner),
            Self::Math(inner) => Some(inner),
            Self::State(inner) => Some(inner),
            Self::Timeline(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<MathError> for SimError {
    fn from(e: MathError) -> Self {
        SimError::Math(e)
    }
}

impl From<StateError> for SimError {
    fn from(e: StateError) -> Self {
        SimError::State(e)
    }
}

impl From<TimelineError> for SimError {
    fn from(e: TimelineError) -> Self {
        SimError::Timeline(e)
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(e)
    }
}

/// What happened during one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: usize,
    /// `None` when there was no pilot to take the proper time from, and nothing moved
    pub event: Option<ProperTimeEvent>,
    pub updated: usize,
    pub evicted: usize,
    pub rejections: Vec<Rejection>,
}

#[derive(Debug)]
pub struct Simulation {
    world: World,
    config: SimulationConfig,
    frame: usize,
    elapsed: f64, // coordinate time
    proper_elapsed: f64, // pilot's proper time
    output_device: Option<OutputDevice>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Simulation, SimError> {
        config.validate()?;
        Ok(Simulation {
            world: World::new(config.speed_of_light),
            config,
            frame: 0,
            elapsed: 0.0,
            proper_elapsed: 0.0,
            output_device: None,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn make_body(&mut self) -> BodyBuilder<'_> {
        self.world.make_body()
    }

    /// Frames stepped so far
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn proper_elapsed(&self) -> f64 {
        self.proper_elapsed
    }

    /// The pilot body, if there is exactly one
    pub fn pilot(&self) -> Option<EntityId> {
        match self.world.pilots().as_slice() {
            [pilot] => Some(*pilot),
            _ => None,
        }
    }

    pub fn set_output_device(&mut self, device: OutputDevice) {
        self.output_device = Some(device);
    }

    pub fn set_termination_condition(&mut self, condition: TerminationCondition) {
        self.config.termination = condition;
    }

    /// Steps one frame with the configured timestep
    pub fn step(&mut self) -> Result<FrameReport, SimError> {
        self.step_with(self.config.timestep)
    }

    /// Steps one frame of `delta` coordinate time
    ///
    /// On error nothing was changed and the frame is not counted
    pub fn step_with(&mut self, delta: f64) -> Result<FrameReport, SimError> {
        log_context!(("frame") {
            let event = systems::schedule_proper_time(&self.world, delta)?;
            let mut report = FrameReport {
                frame: self.frame + 1,
                event,
                updated: 0,
                evicted: 0,
                rejections: Vec::new(),
            };

            if let Some(event) = event {
                let mut stages = pilot::steer_pilots(&mut self.world);
                stages.merge(systems::run_pipeline(&mut self.world, &event));

                report.updated = stages.updated;
                report.evicted = stages.evicted;
                report.rejections = stages.rejections;
                self.proper_elapsed += event.delta_prime;
            }

            self.frame += 1;
            self.elapsed += delta;
            Ok(report)
        })
    }

    pub fn is_finished(&self) -> bool {
        match self.config.termination {
            TerminationCondition::Frames(n) => self.frame >= n,
            TerminationCondition::ElapsedTime(t) => self.elapsed >= t,
            TerminationCondition::ProperTime(t) => self.proper_elapsed >= t,
        }
    }

    /// Steps until the termination condition holds, stopping at the first error
    pub fn run(&mut self) -> Result<(), SimError> {
        log!("running until {:?}", self.config.termination);

        while !self.is_finished() {
            let report = self.step()?;

            // proper time only advances with a pilot, without one this would never finish
            if report.event.is_none() {
                if let TerminationCondition::ProperTime(_) = self.config.termination {
                    return Err(SimError::InvalidConfig(String::from("a proper time limit needs a pilot body")))
                }
            }

            if let Some(output) = &self.output_device {
                output.output(self, &report);
            }
        }

        log!("finished after {} frames, t={:.4}, tau={:.4}", self.frame, self.elapsed, self.proper_elapsed);
        Ok(())
    }
}

impl MemoryUse for Simulation {
    fn memory_use_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + self.world.memory_use_estimate()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{components::Pilot, math::*, state::RelativisticState, timeline::Timeline};

    fn sim() -> Simulation {
        Simulation::new(SimulationConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.speed_of_light = -1.0;
        match Simulation::new(config) {
            Err(SimError::Config(ConfigError::InvalidSpeedOfLight(c))) => assert_eq!(-1.0, c),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn frame_without_pilot_changes_nothing() {
        let mut sim = sim();
        let body = sim.make_body()
            .with_momentum(DVec3::new(0.5, 0.0, 0.0))
            .accelerating(DVec3::new(1.0, 0.0, 0.0))
            .with_timeline(10.0)
            .add()
            .unwrap();
        let before = *sim.world().get::<RelativisticState>(body).unwrap();

        let report = sim.step().unwrap();
        assert!(report.event.is_none());
        assert_eq!(1, report.frame);
        assert_eq!(before, *sim.world().get::<RelativisticState>(body).unwrap());
        assert!(sim.world().get::<Timeline<RelativisticState>>(body).unwrap().is_empty());
        assert_eq!(0.0, sim.proper_elapsed());
    }

    #[test]
    fn multiple_pilots_halt_the_frame() {
        let mut sim = sim();
        let a = sim.make_body().pilot().accelerating(DVec3::new(1.0, 0.0, 0.0)).add().unwrap();
        let b = sim.make_body().with_momentum(DVec3::new(0.0, 0.2, 0.0)).add().unwrap();
        sim.world_mut().insert(b, Pilot).unwrap();

        let before: Vec<_> = [a, b].iter().map(|e| *sim.world().get::<RelativisticState>(*e).unwrap()).collect();
        assert_eq!(Err(SimError::MultipleReferenceBodies(2)), sim.step());
        let after: Vec<_> = [a, b].iter().map(|e| *sim.world().get::<RelativisticState>(*e).unwrap()).collect();

        assert_eq!(before, after);
        assert_eq!(0, sim.frame());
        assert_eq!(None, sim.pilot());
    }

    #[test]
    fn accelerating_pilot() {
        let mut sim = sim();
        let pilot = sim.make_body().pilot().accelerating(DVec3::new(1.0, 0.0, 0.0)).add().unwrap();

        // at rest gamma is exactly one, so the first frame advances the full delta
        let report = sim.step_with(1.0).unwrap();
        assert_eq!(Some(ProperTimeEvent { delta_prime: 1.0, delta: 1.0 }), report.event);
        assert!(report.rejections.is_empty());

        let state = sim.world().get::<RelativisticState>(pilot).unwrap();
        assert_eq!(DVec3::new(1.0, 0.0, 0.0), state.momentum());
        assert!((state.energy() - 2f64.sqrt()).abs() < EPSILON);
        // position is integrated with the new momentum
        assert!((state.position.x - 1.0 / 2f64.sqrt()).abs() < EPSILON);

        assert_eq!(Some(pilot), sim.pilot());
        assert_eq!(1.0, sim.proper_elapsed());
    }

    #[test]
    fn zero_delta_frame_is_idempotent() {
        let mut sim = sim();
        let pilot = sim.make_body()
            .pilot()
            .with_momentum(DVec3::new(0.1, 0.2, 0.3))
            .accelerating(DVec3::new(1.0, 1.0, 1.0))
            .add()
            .unwrap();
        let before = *sim.world().get::<RelativisticState>(pilot).unwrap();

        sim.step_with(0.0).unwrap();
        assert_eq!(before, *sim.world().get::<RelativisticState>(pilot).unwrap());
    }

    #[test]
    fn run_until_frames() {
        let mut sim = sim();
        sim.make_body().pilot().accelerating(DVec3::new(0.0, 0.0, -0.1)).with_timeline(1.0).add().unwrap();
        sim.set_termination_condition(TerminationCondition::Frames(120));

        sim.run().unwrap();
        assert_eq!(120, sim.frame());
        assert!((sim.elapsed() - 2.0).abs() < 1e-9);
        assert!(sim.proper_elapsed() > 0.0);
    }

    #[test]
    fn run_until_proper_time() {
        let mut sim = sim();
        sim.make_body().pilot().add().unwrap();
        sim.set_termination_condition(TerminationCondition::ProperTime(0.49));

        sim.run().unwrap();
        assert!(sim.proper_elapsed() >= 0.49);
        assert_eq!(30, sim.frame());
    }

    #[test]
    fn proper_time_limit_without_pilot() {
        let mut sim = sim();
        sim.set_termination_condition(TerminationCondition::ProperTime(1.0));
        assert!(sim.run().is_err());
    }

    #[test]
    fn run_stops_at_first_error() {
        let mut sim = sim();
        sim.make_body().pilot().add().unwrap();
        let second = sim.make_body().add().unwrap();
        sim.world_mut().insert(second, Pilot).unwrap();

        assert_eq!(Err(SimError::MultipleReferenceBodies(2)), sim.run());
        assert_eq!(0, sim.frame());
    }

    #[test]
    fn error_sources() {
        let e = SimError::from(StateError::NonFinite);
        assert!(e.source().is_some());
        assert!(SimError::InvalidTimestep(-1.0).source().is_none());
        assert!(format!("{}", SimError::MultipleReferenceBodies(3)).contains('3'));
    }
}
