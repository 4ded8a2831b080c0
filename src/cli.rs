extern crate clap;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use crate::{
    config::{parse_number, ConfigError, SimulationConfig, TerminationCondition},
    constants::*,
    debug::LogLevel,
};

fn app() -> App<'static, 'static> {
    let track_targ_option = Arg::with_name("target")
        .long("target")
        .short("t")
        .required(true)
        .takes_value(true)
        .min_values(1);

    let track_subcommand = SubCommand::with_name("track")
        .about("prints the state of named bodies")
        .arg(Arg::with_name("position").long("position").short("p"))
        .arg(Arg::with_name("momentum").long("momentum").short("m"))
        .arg(Arg::with_name("energy").long("energy").short("e"))
        .arg(Arg::with_name("velocity").long("velocity").short("v"))
        .arg(Arg::with_name("apparent").long("apparent").short("l").help("where the pilot sees the body"))
        .arg(track_targ_option);

    let output_targ_option = Arg::with_name("target")
        .long("target")
        .short("t")
        .required(true)
        .takes_value(true)
        .possible_values(&["console", "csv"]);

    let output_frequency_option = Arg::with_name("frequency")
        .long("frequency")
        .short("f")
        .takes_value(true)
        .help("print every n-th frame");

    let output_subcommand = SubCommand::with_name("output")
        .about("prints simulation data after each frame")
        .arg(output_targ_option)
        .arg(output_frequency_option)
        .arg(Arg::with_name("frames").long("frames").short("n"))
        .arg(Arg::with_name("time").long("time").short("s"))
        .arg(Arg::with_name("gamma").long("gamma").short("g"))
        .arg(Arg::with_name("memoryuse").long("memuse").short("m"))
        .subcommand(track_subcommand);

    App::new("relsim")
        .version("0.1.0")
        .about("Relativistic kinematics of a piloted body and its surroundings")
        .setting(AppSettings::AllowNegativeNumbers)
        .arg(Arg::with_name("timestep").long("timestep").short("d").takes_value(true).help("coordinate time per frame, seconds"))
        .arg(Arg::with_name("frames").long("frames").short("n").takes_value(true).conflicts_with("maxsimtime"))
        .arg(Arg::with_name("maxsimtime").long("maxsimtime").short("t").takes_value(true).help("stop after this much coordinate time"))
        .arg(Arg::with_name("maxpropertime").long("maxpropertime").short("p").takes_value(true)
            .conflicts_with_all(&["frames", "maxsimtime"]).help("stop once the pilot has aged this much"))
        .arg(Arg::with_name("lightspeed").long("lightspeed").short("c").takes_value(true))
        .arg(Arg::with_name("window").long("window").short("w").takes_value(true).help("seconds of history kept per body"))
        .arg(Arg::with_name("thrust").long("thrust").short("a").takes_value(true).help("pilot acceleration"))
        .arg(Arg::with_name("grid").long("grid").short("g").takes_value(true).help("side length of the marker grid"))
        .arg(Arg::with_name("loglevel").long("loglevel").short("l").takes_value(true)
            .possible_values(&["debug", "log", "warn", "error", "off"]))
        .subcommand(output_subcommand)
}

pub fn parse_command_line() -> ArgMatches<'static> {
    app().get_matches()
}

/// Settings for the demo scene, not part of the simulation itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneOptions {
    pub thrust: f64,
    pub grid_size: usize,
}

impl Default for SceneOptions {
    fn default() -> Self {
        SceneOptions {
            thrust: DEFAULT_PILOT_THRUST,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl SceneOptions {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let mut options = SceneOptions::default();
        if let Some(value) = matches.value_of("thrust") {
            options.thrust = parse_number("thrust", value)?;
        }
        if let Some(value) = matches.value_of("grid") {
            options.grid_size = parse_number("grid", value)?;
        }
        Ok(options)
    }
}

/// Builds and validates the simulation settings from the command line, anything not given keeps its default
pub fn config_from_matches(matches: &ArgMatches) -> Result<SimulationConfig, ConfigError> {
    let mut config = SimulationConfig::default();

    if let Some(value) = matches.value_of("timestep") {
        config.timestep = parse_number("timestep", value)?;
    }
    if let Some(value) = matches.value_of("lightspeed") {
        config.speed_of_light = parse_number("lightspeed", value)?;
    }
    if let Some(value) = matches.value_of("window") {
        config.retention_window = parse_number("window", value)?;
    }
    if let Some(value) = matches.value_of("frames") {
        config.termination = TerminationCondition::Frames(parse_number("frames", value)?);
    }
    if let Some(value) = matches.value_of("maxsimtime") {
        config.termination = TerminationCondition::ElapsedTime(parse_number("maxsimtime", value)?);
    }
    if let Some(value) = matches.value_of("maxpropertime") {
        config.termination = TerminationCondition::ProperTime(parse_number("maxpropertime", value)?);
    }
    if let Some(name) = matches.value_of("loglevel") {
        config.log_level = LogLevel::from_name(name).ok_or_else(|| ConfigError::InvalidLogLevel(String::from(name)))?;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches<'static> {
        app().get_matches_from_safe(args.iter()).unwrap()
    }

    #[test]
    fn defaults() {
        let m = matches(&["relsim"]);
        assert_eq!(Ok(SimulationConfig::default()), config_from_matches(&m));
        assert_eq!(Ok(SceneOptions::default()), SceneOptions::from_matches(&m));
    }

    #[test]
    fn simulation_options() {
        let m = matches(&["relsim", "--timestep", "0.5", "--lightspeed", "3", "--window", "2", "--maxsimtime", "60", "--loglevel", "warn"]);
        let config = config_from_matches(&m).unwrap();
        assert_eq!(0.5, config.timestep);
        assert_eq!(3.0, config.speed_of_light);
        assert_eq!(2.0, config.retention_window);
        assert_eq!(TerminationCondition::ElapsedTime(60.0), config.termination);
        assert_eq!(LogLevel::Warn, config.log_level);
    }

    #[test]
    fn invalid_values() {
        let m = matches(&["relsim", "--lightspeed", "0"]);
        assert_eq!(Err(ConfigError::InvalidSpeedOfLight(0.0)), config_from_matches(&m));

        let m = matches(&["relsim", "--window=-1"]);
        assert_eq!(Err(ConfigError::InvalidRetentionWindow(-1.0)), config_from_matches(&m));

        let m = matches(&["relsim", "--timestep", "fast"]);
        assert!(config_from_matches(&m).is_err());

        let m = matches(&["relsim", "--grid=-3"]);
        assert!(SceneOptions::from_matches(&m).is_err());
    }

    #[test]
    fn output_subcommand() {
        let m = matches(&["relsim", "--frames", "10", "output", "--target", "csv", "--gamma", "track", "--target", "pilot", "marker", "-p", "-l"]);
        assert_eq!(TerminationCondition::Frames(10), config_from_matches(&m).unwrap().termination);

        let output = m.subcommand_matches("output").unwrap();
        assert_eq!(Some("csv"), output.value_of("target"));
        assert!(output.is_present("gamma"));

        let track = output.subcommand_matches("track").unwrap();
        assert_eq!(vec!["pilot", "marker"], track.values_of("target").unwrap().collect::<Vec<_>>());
        assert!(track.is_present("apparent"));
    }

    #[test]
    fn conflicting_termination() {
        assert!(app().get_matches_from_safe(["relsim", "--frames", "3", "--maxsimtime", "1"].iter()).is_err());
    }
}
