use std::{error::Error, fmt::Display};

use crate::{constants::*, debug::LogLevel};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidSpeedOfLight(f64),
    InvalidTimestep(f64),
    InvalidRetentionWindow(f64),
    InvalidTermination(String),
    InvalidNumber { option: &'static str, value: String },
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSpeedOfLight(c) => write!(f, "speed of light must be positive and finite, got {}", c),
            Self::InvalidTimestep(dt) => write!(f, "timestep must be positive and finite, got {}", dt),
            Self::InvalidRetentionWindow(w) => write!(f, "retention window must be non-negative and finite, got {}", w),
            Self::InvalidTermination(reason) => write!(f, "invalid termination condition: {}", reason),
            Self::InvalidNumber { option, value } => write!(f, "option --{} expects a number, got \"{}\"", option, value),
            Self::InvalidLogLevel(name) => write!(f, "unknown log level \"{}\"", name),
        }
    }
}

impl Error for ConfigError {}

/// When `Simulation::run` stops stepping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationCondition {
    /// After this many frames have been stepped
    Frames(usize),
    /// Once this much coordinate time has elapsed
    ElapsedTime(f64),
    /// Once the pilot has aged this much
    ProperTime(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub speed_of_light: f64,
    pub timestep: f64,
    pub retention_window: f64,
    pub termination: TerminationCondition,
    pub log_level: LogLevel,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            speed_of_light: DEFAULT_SPEED_OF_LIGHT,
            timestep: DEFAULT_TIMESTEP,
            retention_window: DEFAULT_RETENTION_WINDOW,
            termination: TerminationCondition::Frames(DEFAULT_RUN_FRAMES),
            log_level: LogLevel::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed_of_light.is_finite() || self.speed_of_light <= 0.0 {
            return Err(ConfigError::InvalidSpeedOfLight(self.speed_of_light))
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(ConfigError::InvalidTimestep(self.timestep))
        }
        if !self.retention_window.is_finite() || self.retention_window < 0.0 {
            return Err(ConfigError::InvalidRetentionWindow(self.retention_window))
        }

        match self.termination {
            TerminationCondition::Frames(_) => {},
            TerminationCondition::ElapsedTime(t) | TerminationCondition::ProperTime(t) => {
                if !t.is_finite() || t < 0.0 {
                    return Err(ConfigError::InvalidTermination(format!("time limit {} is not a non-negative finite number", t)))
                }
            }
        }
        Ok(())
    }
}

/// Parses a numeric option value, naming the option on failure
pub fn parse_number<T: std::str::FromStr>(option: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber { option, value: String::from(value) })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert_eq!(Ok(()), config.validate());
        assert_eq!(1.0, config.speed_of_light);
        assert_eq!(10.0, config.retention_window);
    }

    #[test]
    fn invalid_values() {
        let mut config = SimulationConfig::default();
        config.speed_of_light = 0.0;
        assert_eq!(Err(ConfigError::InvalidSpeedOfLight(0.0)), config.validate());

        let mut config = SimulationConfig::default();
        config.timestep = -1.0;
        assert_eq!(Err(ConfigError::InvalidTimestep(-1.0)), config.validate());

        let mut config = SimulationConfig::default();
        config.retention_window = -0.5;
        assert_eq!(Err(ConfigError::InvalidRetentionWindow(-0.5)), config.validate());

        // a zero window is allowed, it keeps only the newest snapshot
        config.retention_window = 0.0;
        assert_eq!(Ok(()), config.validate());

        config.termination = TerminationCondition::ProperTime(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn number_parsing() {
        assert_eq!(Ok(2.5), parse_number::<f64>("timestep", " 2.5"));
        assert_eq!(Ok(12), parse_number::<usize>("frames", "12"));
        assert_eq!(
            Err(ConfigError::InvalidNumber { option: "window", value: String::from("ten") }),
            parse_number::<f64>("window", "ten")
        );
    }
}
