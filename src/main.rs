use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ascent_sim::config::{self, Configuration};
use ascent_sim::io;
use ascent_sim::physics::atmosphere;
use ascent_sim::sim::{self, event::EventKind, Dispersion, SimOutcome};
use ascent_sim::vehicle::{presets, Mission};

/// Multi-stage ascent to a parking orbit with closed-loop guidance.
#[derive(Debug, Parser)]
#[command(name = "ascent-sim", version, about)]
struct Args {
    /// Vehicle JSON file (defaults to the Meridian preset)
    #[arg(long)]
    vehicle: Option<PathBuf>,

    /// Mission JSON file (defaults to a 220 km parking orbit)
    #[arg(long)]
    mission: Option<PathBuf>,

    /// Write per-step telemetry as CSV
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Write the terminal report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Fly N dispersed runs instead of a single nominal one
    #[arg(long, value_name = "N")]
    monte_carlo: Option<usize>,

    /// RNG seed for --monte-carlo
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let mission = match &args.vehicle {
        Some(path) => config::load_vehicle(path)
            .with_context(|| format!("loading vehicle from {}", path.display()))?,
        None => presets::meridian(),
    };
    let config = match &args.mission {
        Some(path) => Configuration::load(path)
            .with_context(|| format!("loading mission from {}", path.display()))?,
        None => Configuration::default(),
    };

    if let Some(runs) = args.monte_carlo {
        let (_, summary) = sim::run_batch(&mission, &config, runs, args.seed, &Dispersion::default());
        print_batch(&mission, runs, args.seed, &summary);
        return Ok(());
    }

    let outcome = sim::simulate(&mission, &config);

    if let Some(path) = &args.telemetry {
        io::write_telemetry_file(path, &outcome.telemetry)
            .with_context(|| format!("writing telemetry to {}", path.display()))?;
    }
    if let Some(path) = &args.report {
        io::write_report_file(path, &mission, &outcome.report, &outcome.summary, &outcome.events)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    print_flight(&mission, &config, &outcome);
    Ok(())
}

fn print_vehicle(mission: &Mission) {
    println!("  Vehicle");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Liftoff mass:  {:>10.0} kg    Payload:      {:>8.0} kg",
        mission.total_mass(),
        mission.payload_mass
    );
    println!("  Ideal Δv:      {:>10.0} m/s", mission.total_delta_v());
    for (i, stage) in mission.stages.iter().enumerate() {
        println!(
            "  [{}] {:<12} prop {:>8.0} kg   thrust {:>8.0} kN   Isp {:>5.0} s   Δv {:>6.0} m/s",
            i,
            stage.name,
            stage.propellant_mass,
            stage.thrust_vac / 1000.0,
            stage.isp_vac,
            stage.delta_v(mission.upper_mass(i)),
        );
    }
    println!();
}

fn print_flight(mission: &Mission, config: &Configuration, outcome: &SimOutcome) {
    let radius = config.body.radius;
    println!();
    println!("====================================================================");
    println!("  ASCENT SIMULATION — {}", mission.name);
    println!("====================================================================");
    println!();
    print_vehicle(mission);

    println!("  Mission Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for event in &outcome.events {
        println!("  t={:>7.1}s   {}", event.time(), event.describe());
    }
    for event in &outcome.flight_events {
        let label = match &event.kind {
            EventKind::Liftoff => "LIFTOFF".to_string(),
            EventKind::MaxQ { dynamic_pressure } => format!("MAX-Q     q={:.1} kPa", dynamic_pressure / 1000.0),
            EventKind::AltitudeCrossed { altitude, .. } => format!("CROSSED   {:.0} km", altitude / 1000.0),
            EventKind::Apogee => "APOGEE".to_string(),
        };
        println!("  t={:>7.1}s   {}   alt={:.1} km", event.time, label, event.altitude / 1000.0);
    }
    println!();

    let report = &outcome.report;
    println!("  Outcome");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Final phase:   {}", report.final_phase);
    match report.failure_reason {
        Some(reason) => println!("  Result:        FAILED ({reason})"),
        None if report.success => println!("  Result:        SUCCESS"),
        None => println!("  Result:        INCOMPLETE"),
    }
    if let Some(el) = &report.final_elements {
        match el.periapsis_altitude(radius) {
            Some(peri) if el.is_elliptical => println!(
                "  Orbit:         {:.1} x {:.1} km   e={:.5}   i={:.2}°",
                peri / 1000.0,
                el.apoapsis_altitude(radius) / 1000.0,
                el.eccentricity,
                el.inclination.unwrap_or(0.0).to_degrees(),
            ),
            _ => println!("  Orbit:         e={:.4} (not closed)", el.eccentricity),
        }
    }
    println!("  Δv expended:   {:>10.0} m/s", report.total_delta_v);
    println!();

    let s = &outcome.summary;
    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Max altitude:  {:>10.1} km   at t={:.0} s", s.max_altitude / 1000.0, s.max_altitude_time);
    println!(
        "  Max speed:     {:>10.0} m/s  (Mach {:.1} at sea level)",
        s.max_speed,
        s.max_speed / atmosphere::isa(0.0).sound_speed
    );
    println!("  Max q:         {:>10.1} kPa  at t={:.0} s", s.max_q / 1000.0, s.max_q_time);
    println!("  Flight time:   {:>10.0} s", s.flight_time);
    println!("  Final mass:    {:>10.0} kg", s.final_mass);
    println!();

    print_phase_table(outcome);

    println!("  Simulation: {} records, dt={} s", outcome.telemetry.len(), config.sim.dt);
    println!("====================================================================");
    println!();
}

fn print_phase_table(outcome: &SimOutcome) {
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>6}  {:>9}  {:<18}",
        "t (s)", "alt (km)", "vel (m/s)", "pitch", "mass (kg)", "phase"
    );
    println!("  {}", "─".repeat(66));

    let records = &outcome.telemetry;
    let interval = (records.len() / 30).max(1);
    for (i, r) in records.iter().enumerate() {
        let phase_change = i > 0 && records[i - 1].phase != r.phase;
        if i % interval != 0 && !phase_change && i + 1 != records.len() {
            continue;
        }
        println!(
            "  {:>7.1}  {:>9.2}  {:>9.1}  {:>6.1}  {:>9.0}  {:<18}",
            r.time,
            r.altitude / 1000.0,
            r.speed,
            r.pitch_deg,
            r.mass,
            r.phase.name()
        );
    }
    println!();
}

fn print_batch(mission: &Mission, runs: usize, seed: u64, summary: &sim::BatchSummary) {
    println!();
    println!("====================================================================");
    println!("  MONTE CARLO — {}  ({} runs, seed {})", mission.name, runs, seed);
    println!("====================================================================");
    println!();
    println!("  Successes:     {:>6} / {}   ({:.1} %)", summary.successes, summary.runs, 100.0 * summary.success_rate);
    if let Some(dv) = summary.mean_delta_v {
        println!("  Mean Δv:       {:>8.0} m/s", dv);
    }
    if !summary.failures.is_empty() {
        println!();
        println!("  Failures");
        println!("  ──────────────────────────────────────────────────────────────────");
        for (reason, count) in &summary.failures {
            println!("  {:<28} {:>6}", reason.as_str(), count);
        }
    }
    println!("====================================================================");
    println!();
}
