use std::{cell::Cell, fmt::Write};

use crate::{
    config::{parse_number, ConfigError},
    debug::*,
    identity::EntityId,
    lightcone::apparent_state,
    math::DVec3,
    sim::{FrameReport, Simulation},
    state::RelativisticState,
    timeline::Timeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Csv,
}

impl Default for OutputFormat { fn default() -> Self { Self::Pretty } }

/// Represents a specific field to include in the output data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputField {
    Frames,
    Time,
    Gamma,
    MemoryUse,
    Position,
    Momentum,
    Energy,
    Velocity,
    /// Where the pilot sees the body, from its timeline
    Apparent,
}

/// Prints selected values of the simulation after each frame
#[derive(Debug, Clone)]
pub struct OutputDevice {
    format: OutputFormat,
    frequency: usize, // every n-th frame
    global_fields: Vec<OutputField>,
    tracked_bodies: Vec<(String, EntityId, Vec<OutputField>)>,
    header_written: Cell<bool>,
}

impl Default for OutputDevice {
    fn default() -> Self {
        OutputDevice {
            format: OutputFormat::default(),
            frequency: 1,
            global_fields: Vec::new(),
            tracked_bodies: Vec::new(),
            header_written: Cell::new(false),
        }
    }
}

impl OutputDevice {
    pub fn new(format: OutputFormat, frequency: usize) -> Self {
        OutputDevice {
            format,
            frequency: frequency.max(1),
            ..Default::default()
        }
    }

    pub fn with_global_field(mut self, field: OutputField) -> Self {
        self.global_fields.push(field);
        self
    }

    /// Tracks every body with this name
    pub fn track(mut self, sim: &Simulation, name: &str, fields: &[OutputField]) -> Self {
        let bodies = sim.world().named(name);
        if bodies.is_empty() {
            warn!("no body named \"{}\" to track", name);
        }
        for entity in bodies {
            self.tracked_bodies.push((String::from(name), entity, fields.to_vec()));
        }
        self
    }

    /// Builds the device from the `output` subcommand, `None` if it was not given
    pub fn from_cli_config(sim: &Simulation, matches: &clap::ArgMatches) -> Result<Option<OutputDevice>, ConfigError> {
        let matches = match matches.subcommand_matches("output") {
            Some(matches) => matches,
            None => return Ok(None),
        };

        let format = match matches.value_of("target") {
            Some("csv") => OutputFormat::Csv,
            _ => OutputFormat::Pretty,
        };
        let frequency = match matches.value_of("frequency") {
            Some(value) => parse_number::<usize>("frequency", value)?,
            None => 1,
        };

        let mut device = OutputDevice::new(format, frequency);
        if matches.is_present("frames") { device.global_fields.push(OutputField::Frames); }
        if matches.is_present("time") { device.global_fields.push(OutputField::Time); }
        if matches.is_present("gamma") { device.global_fields.push(OutputField::Gamma); }
        if matches.is_present("memoryuse") { device.global_fields.push(OutputField::MemoryUse); }

        if let Some(matches) = matches.subcommand_matches("track") {
            let mut fields = Vec::new();
            if matches.is_present("position") { fields.push(OutputField::Position); }
            if matches.is_present("momentum") { fields.push(OutputField::Momentum); }
            if matches.is_present("energy") { fields.push(OutputField::Energy); }
            if matches.is_present("velocity") { fields.push(OutputField::Velocity); }
            if matches.is_present("apparent") { fields.push(OutputField::Apparent); }

            if let Some(targets) = matches.values_of("target") {
                for target in targets {
                    device = device.track(sim, target, &fields);
                }
            }
        }
        Ok(Some(device))
    }

    pub fn output(&self, sim: &Simulation, report: &FrameReport) {
        if let Some(text) = self.render(sim, report) {
            print!("{}", text);
        }
    }

    /// The text to print for this frame, `None` on frames skipped by the frequency
    pub fn render(&self, sim: &Simulation, report: &FrameReport) -> Option<String> {
        if report.frame % self.frequency != 0 {
            return None
        }

        match self.format {
            OutputFormat::Pretty => Some(self.render_pretty(sim, report)),
            OutputFormat::Csv => Some(self.render_csv(sim, report)),
        }
    }

    fn render_pretty(&self, sim: &Simulation, report: &FrameReport) -> String {
        let mut out = String::new();
        let indent = "  ";

        // writing into a String cannot fail
        let _ = writeln!(out, "------------------------------------------");
        for field in self.global_fields.iter() {
            match field {
                OutputField::Frames => {
                    let _ = writeln!(out, "Frame: {}", report.frame);
                },
                OutputField::Time => {
                    let (t, tp) = format_si_value(sim.elapsed());
                    let (tau, taup) = format_si_value(sim.proper_elapsed());
                    let _ = writeln!(out, "Time: t={:.04}{}s tau={:.04}{}s", t, tp, tau, taup);
                },
                OutputField::Gamma => {
                    match pilot_gamma(sim) {
                        Some(gamma) => { let _ = writeln!(out, "Gamma: {:.06}", gamma); },
                        None => { let _ = writeln!(out, "Gamma: no pilot"); },
                    }
                },
                OutputField::MemoryUse => {
                    let (m, mp) = format_mem_value(sim.memory_use_estimate());
                    let _ = writeln!(out, "Memory Use: {:.04}{}B", m, mp);
                },
                _ => continue, // not a global field
            }
        }

        for rejection in report.rejections.iter() {
            let _ = writeln!(out, "Rejected: {}", rejection);
        }

        if self.tracked_bodies.is_empty() {
            return out
        }

        let _ = writeln!(out, "Tracked Bodies:");
        for (name, entity, fields) in self.tracked_bodies.iter() {
            let state = match sim.world().get::<RelativisticState>(*entity) {
                Some(state) => state,
                None => {
                    let _ = writeln!(out, "{}{} ({}) is gone", indent, name, entity);
                    continue
                }
            };

            let _ = writeln!(out, "{}{} ({})", indent, name, entity);
            for field in fields.iter() {
                let i = indent.repeat(2);
                match field {
                    OutputField::Position => { let _ = writeln!(out, "{}POS={}", i, format_vec(state.position)); },
                    OutputField::Momentum => { let _ = writeln!(out, "{}MOM={}", i, format_vec(state.momentum())); },
                    OutputField::Energy => { let _ = writeln!(out, "{}E={:+.06}", i, state.energy()); },
                    OutputField::Velocity => { let _ = writeln!(out, "{}VEL={}", i, format_vec(state.velocity())); },
                    OutputField::Apparent => {
                        match apparent_position(sim, *entity) {
                            Some(position) => { let _ = writeln!(out, "{}SEEN={}", i, format_vec(position)); },
                            None => { let _ = writeln!(out, "{}SEEN=not yet visible", i); },
                        }
                    },
                    _ => continue, // not a body field
                }
            }
        }
        out
    }

    fn render_csv(&self, sim: &Simulation, report: &FrameReport) -> String {
        let mut out = String::new();

        if !self.header_written.get() {
            let mut columns = Vec::new();
            for field in self.global_fields.iter() {
                match field {
                    OutputField::Frames => columns.push(String::from("frame")),
                    OutputField::Time => { columns.push(String::from("t")); columns.push(String::from("tau")); },
                    OutputField::Gamma => columns.push(String::from("gamma")),
                    OutputField::MemoryUse => columns.push(String::from("memuse")),
                    _ => {},
                }
            }
            for (name, entity, fields) in self.tracked_bodies.iter() {
                for field in fields.iter() {
                    let prefix = format!("{}_{}", name, entity);
                    match field {
                        OutputField::Position => vec_columns(&mut columns, &prefix, "pos"),
                        OutputField::Momentum => vec_columns(&mut columns, &prefix, "mom"),
                        OutputField::Energy => columns.push(format!("{}_energy", prefix)),
                        OutputField::Velocity => vec_columns(&mut columns, &prefix, "vel"),
                        OutputField::Apparent => vec_columns(&mut columns, &prefix, "seen"),
                        _ => {},
                    }
                }
            }
            let _ = writeln!(out, "{}", columns.join(","));
            self.header_written.set(true);
        }

        let mut values = Vec::new();
        for field in self.global_fields.iter() {
            match field {
                OutputField::Frames => values.push(report.frame.to_string()),
                OutputField::Time => { values.push(sim.elapsed().to_string()); values.push(sim.proper_elapsed().to_string()); },
                OutputField::Gamma => values.push(pilot_gamma(sim).map(|g| g.to_string()).unwrap_or_default()),
                OutputField::MemoryUse => values.push(sim.memory_use_estimate().to_string()),
                _ => {},
            }
        }
        for (_, entity, fields) in self.tracked_bodies.iter() {
            let state = sim.world().get::<RelativisticState>(*entity);
            for field in fields.iter() {
                let value = match field {
                    OutputField::Position => state.map(|s| s.position),
                    OutputField::Momentum => state.map(|s| s.momentum()),
                    OutputField::Velocity => state.map(|s| s.velocity()),
                    OutputField::Apparent => apparent_position(sim, *entity),
                    OutputField::Energy => {
                        values.push(state.map(|s| s.energy().to_string()).unwrap_or_default());
                        continue
                    },
                    _ => continue,
                };
                match value {
                    Some(v) => values.extend([v.x, v.y, v.z].iter().map(|c| c.to_string())),
                    None => values.extend(std::iter::repeat(String::new()).take(3)),
                }
            }
        }
        let _ = writeln!(out, "{}", values.join(","));
        out
    }
}

fn vec_columns(columns: &mut Vec<String>, prefix: &str, name: &str) {
    for axis in ["x", "y", "z"].iter() {
        columns.push(format!("{}_{}_{}", prefix, name, axis));
    }
}

fn pilot_gamma(sim: &Simulation) -> Option<f64> {
    let pilot = sim.pilot()?;
    sim.world().get::<RelativisticState>(pilot).map(|state| state.gamma())
}

/// Where the pilot currently sees `entity`, if both exist and the entity keeps a timeline
fn apparent_position(sim: &Simulation, entity: EntityId) -> Option<DVec3> {
    let pilot = sim.pilot()?;
    let observer = sim.world().get::<RelativisticState>(pilot)?.position;
    let timeline = sim.world().get::<Timeline<RelativisticState>>(entity)?;
    apparent_state(timeline, &observer, sim.world().speed_of_light()).map(|apparent| apparent.position)
}

fn format_vec(v: DVec3) -> String {
    let (x, xp) = format_si_value(v.x);
    let (y, yp) = format_si_value(v.y);
    let (z, zp) = format_si_value(v.z);
    format!("{:+09.04}{}, {:+09.04}{}, {:+09.04}{}", x, xp, y, yp, z, zp)
}

fn format_si_value(n: f64) -> (f64, &'static str) {
    if n == 0.0 || !n.is_finite() {
        return (n, "")
    }

    match n.abs() {
        x if x < 1e-6 => (n * 1e9, "n"),
        x if x < 1e-3 => (n * 1e6, "u"),
        x if x < 1.0 => (n * 1e3, "m"),
        x if x < 1e3 => (n, ""),
        x if x < 1e6 => (n / 1e3, "K"),
        x if x < 1e9 => (n / 1e6, "M"),
        x if x < 1e12 => (n / 1e9, "G"),
        x if x < 1e15 => (n / 1e12, "T"),
        _ => (n / 1e15, "P"),
    }
}

fn format_mem_value(n: usize) -> (f64, &'static str) {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    match n as f64 {
        x if x < KB => (x, ""),
        x if x < MB => (x / KB, "Ki"),
        x if x < GB => (x / MB, "Mi"),
        x => (x / GB, "Gi"),
    }
}
