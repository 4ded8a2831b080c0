use std::f64::consts::{FRAC_PI_2, PI};

use crate::{math::*, sim::SimError, systems::{Rejection, StageReport}, world::World};

/// Which directions the pilot is currently thrusting in, relative to where it faces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrustIntents {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

/// Look angles and thrust settings of the pilot body
///
/// Whatever maps input devices to intents writes here, `steer_pilots` turns it into the body's rotation
/// and acceleration once per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PilotControl {
    pub yaw: f64, // rad, about +Y
    pub pitch: f64, // rad, about +X
    pub sensitivity: f64, // rad per unit of look input
    pub thrust: f64, // magnitude of the proper acceleration while any intent is held
    pub intents: ThrustIntents,
}

impl PilotControl {
    pub fn new(sensitivity: f64, thrust: f64) -> Self {
        PilotControl {
            yaw: 0.0,
            pitch: 0.0,
            sensitivity,
            thrust,
            intents: ThrustIntents::default(),
        }
    }

    /// Turns by a look delta, pitch is clamped to straight up/down and yaw wraps into `[0, 2pi)`
    pub fn look(&mut self, dx: f64, dy: f64) {
        self.yaw += self.sensitivity * dx;
        self.pitch -= self.sensitivity * dy;

        self.pitch = self.pitch.max(-FRAC_PI_2).min(FRAC_PI_2);
        self.yaw = self.yaw.rem_euclid(2.0 * PI);
    }

    /// Orientation described by the look angles, yaw applied after pitch
    pub fn rotation(&self) -> Result<Quat, MathError> {
        let yaw = AxisAngle::new(DVec3::new(0.0, 1.0, 0.0), self.yaw).quat()?;
        let pitch = AxisAngle::new(DVec3::new(1.0, 0.0, 0.0), self.pitch).quat()?;
        (yaw * pitch).unit()
    }

    /// Thrust in the pilot's own frame, forward is -Z and right is +X
    pub fn local_thrust(&self) -> DVec3 {
        let mut direction = DVec3::zero();
        if self.intents.forward { direction -= DVec3::new(0.0, 0.0, 1.0); }
        if self.intents.backward { direction += DVec3::new(0.0, 0.0, 1.0); }
        if self.intents.right { direction += DVec3::new(1.0, 0.0, 0.0); }
        if self.intents.left { direction -= DVec3::new(1.0, 0.0, 0.0); }

        // opposing intents cancel out to no thrust at all
        match direction.unit() {
            Ok(unit) => unit * self.thrust,
            Err(_) => DVec3::zero(),
        }
    }
}

/// Applies every `PilotControl` to its body: sets the orientation and, for bodies that can accelerate,
/// the world-frame acceleration
pub fn steer_pilots(world: &mut World) -> StageReport {
    let mut report = StageReport::default();

    for (key, control) in world.controls.iter() {
        let entity = match world.entities.id_at(key) {
            Some(entity) => entity,
            None => continue,
        };

        let state = match world.bodies.get_mut(key) {
            Some(state) => state,
            None => continue,
        };

        let rotation = match control.rotation() {
            Ok(rotation) => rotation,
            Err(e) => {
                warn!("pilot {} has degenerate look angles, keeping its orientation: {}", entity, e);
                report.rejections.push(Rejection { entity, stage: "steering", error: SimError::from(e) });
                continue
            }
        };

        if let Err(e) = state.set_rotation(rotation) {
            report.rejections.push(Rejection { entity, stage: "steering", error: SimError::from(e) });
            continue
        }

        if let Some(acceleration) = world.accelerations.get_mut(key) {
            match control.local_thrust().rotate_by(&state.rotation()) {
                Ok(thrust) => acceleration.0 = thrust,
                Err(e) => report.rejections.push(Rejection { entity, stage: "steering", error: SimError::from(e) }),
            }
        }
        report.updated += 1;
    }
    report
}
