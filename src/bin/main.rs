extern crate relsim;

use relsim::{error, log};
use relsim::cli::{self, SceneOptions};
use relsim::constants::*;
use relsim::debug::{set_log_level, shutdown_log};
use relsim::math::DVec3;
use relsim::output::OutputDevice;
use relsim::pilot::PilotControl;
use relsim::sim::{SimError, Simulation};

/// The pilot at the origin facing -Z with constant forward thrust, and a grid of markers ahead of it
fn build_scene(sim: &mut Simulation, options: &SceneOptions) -> Result<(), SimError> {
    let window = sim.config().retention_window;

    let mut controls = PilotControl::new(DEFAULT_LOOK_SENSITIVITY, options.thrust);
    controls.intents.forward = true;

    let pilot = sim.make_body()
        .named("pilot")
        .pilot()
        .accelerating(DVec3::zero())
        .with_controls(controls)
        .with_timeline(window)
        .add()?;

    let half = (options.grid_size as f64 - 1.0) / 2.0;
    for i in 0..options.grid_size {
        for j in 0..options.grid_size {
            let offset = DVec3::new(
                (i as f64 - half) * GRID_SPACING,
                (j as f64 - half) * GRID_SPACING,
                -GRID_DISTANCE,
            );
            sim.make_body()
                .named("marker")
                .at(offset)
                .relative_to(pilot)
                .with_timeline(window)
                .add()?;
        }
    }

    log!("scene has {} bodies", sim.world().len());
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli::parse_command_line();
    let config = cli::config_from_matches(&matches)?;
    let options = SceneOptions::from_matches(&matches)?;
    set_log_level(config.log_level);

    let mut sim = Simulation::new(config)?;
    build_scene(&mut sim, &options)?;

    if let Some(device) = OutputDevice::from_cli_config(&sim, &matches)? {
        sim.set_output_device(device);
    }

    sim.run()?;
    Ok(())
}

fn main() {
    let result = run();
    if let Err(e) = &result {
        error!("{}", e);
    }
    shutdown_log();

    if result.is_err() {
        std::process::exit(1);
    }
}
