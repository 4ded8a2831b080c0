/// Units are chosen so a body at rest has energy equal to the speed of light
pub const DEFAULT_SPEED_OF_LIGHT: f64 = 1.0;

pub const DEFAULT_TIMESTEP: f64 = 1.0 / 60.0; // s
pub const DEFAULT_RETENTION_WINDOW: f64 = 10.0; // s of proper time

pub const DEFAULT_PILOT_THRUST: f64 = 1.0;
pub const DEFAULT_LOOK_SENSITIVITY: f64 = 1.0; // rad per unit of look input

/// The demo scene places a square grid of markers in front of the pilot
pub const DEFAULT_GRID_SIZE: usize = 11;
pub const GRID_SPACING: f64 = 1.0;
pub const GRID_DISTANCE: f64 = 10.0;

pub const DEFAULT_RUN_FRAMES: usize = 600;
