use serde::Serialize;

// ---------------------------------------------------------------------------
// Simulation events
// ---------------------------------------------------------------------------

/// Kinds of passively detected flight events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Liftoff,
    MaxQ { dynamic_pressure: f64 },
    AltitudeCrossed { altitude: f64, ascending: bool },
    Apogee,
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    pub time: f64,
    pub altitude: f64,
    pub kind: EventKind,
}

/// What detectors see of each integration step.
#[derive(Debug, Clone, Copy)]
pub struct FlightSample {
    pub time: f64,
    pub altitude: f64,
    pub vertical_speed: f64,
    pub dynamic_pressure: f64,
}

/// Trait for passive event detectors.
/// Implementations inspect consecutive samples and report events.
pub trait EventDetector {
    fn check(&mut self, prev: &FlightSample, current: &FlightSample) -> Option<EventKind>;
}

/// Fires once when the vehicle leaves the pad.
#[derive(Debug, Default)]
pub struct LiftoffDetector {
    fired: bool,
}

impl EventDetector for LiftoffDetector {
    fn check(&mut self, _prev: &FlightSample, current: &FlightSample) -> Option<EventKind> {
        if !self.fired && current.altitude > 1.0 {
            self.fired = true;
            Some(EventKind::Liftoff)
        } else {
            None
        }
    }
}

/// Detects the first apogee (vertical speed going from positive to negative).
#[derive(Debug, Default)]
pub struct ApogeeDetector {
    fired: bool,
}

impl EventDetector for ApogeeDetector {
    fn check(&mut self, prev: &FlightSample, current: &FlightSample) -> Option<EventKind> {
        if !self.fired && prev.vertical_speed > 0.0 && current.vertical_speed <= 0.0 && current.altitude > 100.0 {
            self.fired = true;
            Some(EventKind::Apogee)
        } else {
            None
        }
    }
}

/// Detects when altitude crosses a threshold (ascending or descending).
pub struct AltitudeDetector {
    pub altitude: f64,
    pub ascending: bool,
    fired: bool,
}

impl AltitudeDetector {
    pub fn new(altitude: f64, ascending: bool) -> Self {
        Self { altitude, ascending, fired: false }
    }
}

impl EventDetector for AltitudeDetector {
    fn check(&mut self, prev: &FlightSample, current: &FlightSample) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        let crossed = if self.ascending {
            prev.altitude < self.altitude && current.altitude >= self.altitude
        } else {
            prev.altitude > self.altitude && current.altitude <= self.altitude
        };
        if crossed {
            self.fired = true;
            Some(EventKind::AltitudeCrossed { altitude: self.altitude, ascending: self.ascending })
        } else {
            None
        }
    }
}

/// Reports the dynamic-pressure peak once q has clearly fallen past it.
#[derive(Debug)]
pub struct MaxQDetector {
    /// Fraction of the peak q must fall to before the peak is reported.
    pub drop_fraction: f64,
    peak: f64,
    fired: bool,
}

impl MaxQDetector {
    pub fn new(drop_fraction: f64) -> Self {
        Self { drop_fraction, peak: 0.0, fired: false }
    }
}

impl Default for MaxQDetector {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl EventDetector for MaxQDetector {
    fn check(&mut self, _prev: &FlightSample, current: &FlightSample) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        if current.dynamic_pressure > self.peak {
            self.peak = current.dynamic_pressure;
            return None;
        }
        if self.peak > 0.0 && current.dynamic_pressure < self.drop_fraction * self.peak {
            self.fired = true;
            return Some(EventKind::MaxQ { dynamic_pressure: self.peak });
        }
        None
    }
}

/// The detectors every run carries.
pub fn standard_detectors() -> Vec<Box<dyn EventDetector>> {
    vec![
        Box::new(LiftoffDetector::default()),
        Box::new(MaxQDetector::default()),
        Box::new(AltitudeDetector::new(100_000.0, true)),
        Box::new(ApogeeDetector::default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(alt: f64, vz: f64, q: f64) -> FlightSample {
        FlightSample { time: 0.0, altitude: alt, vertical_speed: vz, dynamic_pressure: q }
    }

    #[test]
    fn apogee_detected() {
        let mut det = ApogeeDetector::default();
        let prev = sample(5000.0, 10.0, 0.0);
        let curr = sample(5005.0, -1.0, 0.0);
        assert_eq!(det.check(&prev, &curr), Some(EventKind::Apogee));
        assert_eq!(det.check(&prev, &curr), None);
    }

    #[test]
    fn altitude_detector_ascending() {
        let mut det = AltitudeDetector::new(100_000.0, true);
        let prev = sample(99_900.0, 1000.0, 0.0);
        let curr = sample(100_050.0, 1000.0, 0.0);
        assert!(det.check(&prev, &curr).is_some());
        // Should not fire again
        assert!(det.check(&prev, &curr).is_none());
    }

    #[test]
    fn max_q_reports_the_peak() {
        let mut det = MaxQDetector::default();
        let qs = [1_000.0, 20_000.0, 35_000.0, 34_000.0, 30_000.0, 20_000.0, 10_000.0];
        let mut reported = None;
        for pair in qs.windows(2) {
            if let Some(kind) = det.check(&sample(10_000.0, 500.0, pair[0]), &sample(10_000.0, 500.0, pair[1])) {
                reported = Some(kind);
            }
        }
        assert_eq!(reported, Some(EventKind::MaxQ { dynamic_pressure: 35_000.0 }));
    }
}
