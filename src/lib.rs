#[macro_use]
pub mod debug;

pub mod math;
pub mod identity;
pub mod collections;
pub mod components;
pub mod state;
pub mod timeline;
pub mod world;
pub mod pilot;
pub mod systems;
pub mod lightcone;
pub mod config;
pub mod constants;
pub mod sim;
pub mod output;
pub mod cli;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Notes
//
// Units:
//  Rest energy equals c, so E^2 = c^2 + |p|^2 and a body at rest has E = c
//
// Frame order:
//  1. proper time scheduler, gamma of the pilot turns delta into delta_prime
//  2. pilot steering
//  3. acceleration, position, timeline stages in PIPELINE order
//
// Coordinate system:
//  Right handed, the pilot looks down -Z with +Y up and +X to the right
//
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
