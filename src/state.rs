use std::{error::Error, fmt::Display};
use crate::math::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateError {
    /// The momentum, or the energy derived from it, is NaN or infinite
    NonFinite,
    /// The derived speed `|p| * c / E` reached the speed of light
    Superluminal { speed: f64, c: f64 },
}

impl Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite => write!(f, "momentum or energy is not finite"),
            Self::Superluminal { speed, c } => write!(f, "derived speed {} is not below the speed of light {}", speed, c),
        }
    }
}

impl Error for StateError {}

/// Kinematic state of one body
///
/// Units are chosen so that rest energy equals `c`. Momentum and energy are private, they only change
/// together through `set_momentum`, which keeps `energy^2 == c^2 + |momentum|^2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativisticState {
    pub position: DVec3,
    rotation: Quat,
    momentum: DVec3,
    energy: f64,
    c: f64,
}

impl RelativisticState {
    /// A body at the origin with identity orientation, zero momentum and energy `c`
    pub fn at_rest(c: f64) -> Self {
        RelativisticState {
            position: DVec3::zero(),
            rotation: Quat::identity(),
            momentum: DVec3::zero(),
            energy: c,
            c,
        }
    }

    pub fn speed_of_light(&self) -> f64 {
        self.c
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn momentum(&self) -> DVec3 {
        self.momentum
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Stores the normalized orientation
    pub fn set_rotation(&mut self, rotation: Quat) -> Result<(), MathError> {
        self.rotation = rotation.unit()?;
        Ok(())
    }

    /// Sets the momentum and re-derives the energy. On error the state is left untouched
    pub fn set_momentum(&mut self, momentum: DVec3) -> Result<(), StateError> {
        if !momentum.is_finite() {
            return Err(StateError::NonFinite)
        }

        let energy = (self.c * self.c + momentum.norm_squared()).sqrt();
        if !energy.is_finite() {
            return Err(StateError::NonFinite)
        }

        // only reachable once c^2 is lost to rounding against |p|^2
        let speed = momentum.norm() * self.c / energy;
        if speed >= self.c {
            return Err(StateError::Superluminal { speed, c: self.c })
        }

        self.momentum = momentum;
        self.energy = energy;
        Ok(())
    }

    /// Coordinate velocity, `p * c / E`
    pub fn velocity(&self) -> DVec3 {
        self.momentum * self.c / self.energy
    }

    /// Time dilation factor used by the proper time scheduler, `(E^2 - |p|^2) / c^2`
    pub fn gamma(&self) -> f64 {
        (self.energy * self.energy - self.momentum.norm_squared()) / (self.c * self.c)
    }

    /// How far the stored energy is from satisfying the energy-momentum relation
    pub fn invariant_residual(&self) -> f64 {
        (self.energy * self.energy - (self.c * self.c + self.momentum.norm_squared())).abs()
    }
}
