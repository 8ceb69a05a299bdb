use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints, VLine};

use ascent_sim::config::Configuration;
use ascent_sim::gnc::MissionEvent;
use ascent_sim::io::TelemetryRecord;
use ascent_sim::sim::{self, SimOutcome};
use ascent_sim::vehicle::{presets, Mission};

fn main() -> eframe::Result {
    let mission = presets::meridian();
    let config = Configuration::default();
    let outcome = sim::simulate(&mission, &config);

    let app = AscentViz { outcome, mission };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Ascent Simulator", options, Box::new(|_| Ok(Box::new(app))))
}

struct AscentViz {
    outcome: SimOutcome,
    mission: Mission,
}

impl AscentViz {
    fn series(&self, f: impl Fn(&TelemetryRecord) -> Option<f64>) -> PlotPoints<'static> {
        self.outcome
            .telemetry
            .iter()
            .filter_map(|r| f(r).map(|y| [r.time, y]))
            .collect()
    }

    /// Vertical markers at every phase change.
    fn phase_marks(&self) -> Vec<VLine> {
        self.outcome
            .events
            .iter()
            .filter_map(|e| match e {
                MissionEvent::PhaseChanged { time, to, .. } => Some(VLine::new(to.name(), *time)),
                _ => None,
            })
            .collect()
    }

    fn plot(&self, ui: &mut egui::Ui, id: &str, width: f32, height: f32, lines: Vec<Line<'static>>) {
        let marks = self.phase_marks();
        Plot::new(id)
            .width(width)
            .height(height)
            .x_axis_label("Time (s)")
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for line in lines {
                    plot_ui.line(line);
                }
                for mark in marks {
                    plot_ui.vline(mark);
                }
            });
    }
}

impl eframe::App for AscentViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            let report = &self.outcome.report;
            ui.heading(format!("Mission: {}", self.mission.name));
            ui.label(format!(
                "Final phase: {}  |  Δv: {:.0} m/s  |  Max altitude: {:.1} km  |  Stages: {}  |  Flight: {:.0} s",
                report.final_phase,
                report.total_delta_v,
                self.outcome.summary.max_altitude / 1000.0,
                self.mission.stages.len(),
                report.final_time,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Altitude (km)");
                    let alt = Line::new("Altitude", self.series(|r| Some(r.altitude / 1000.0)));
                    self.plot(ui, "altitude", half_w, half_h, vec![alt]);
                });
                ui.vertical(|ui| {
                    ui.label("Speed (m/s)");
                    let speed = Line::new("Speed", self.series(|r| Some(r.speed)));
                    self.plot(ui, "speed", half_w, half_h, vec![speed]);
                });
            });

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Pitch (deg)");
                    let cmd = Line::new("Commanded", self.series(|r| Some(r.pitch_deg)));
                    let fpa = Line::new("Flight path", self.series(|r| Some(r.flight_path_angle_deg)));
                    self.plot(ui, "pitch", half_w, half_h, vec![cmd, fpa]);
                });
                ui.vertical(|ui| {
                    ui.label("Apsides (km)");
                    let apo = Line::new("Apoapsis", self.series(|r| r.apoapsis_altitude.map(|a| a / 1000.0)));
                    let peri = Line::new("Periapsis", self.series(|r| r.periapsis_altitude.map(|p| p / 1000.0)));
                    self.plot(ui, "apsides", half_w, half_h, vec![apo, peri]);
                });
            });
        });
    }
}
