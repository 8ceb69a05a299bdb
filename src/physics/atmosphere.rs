use crate::dynamics::state::G0;

// ---------------------------------------------------------------------------
// ISA 1976 Standard Atmosphere (sea level to 86 km, exponential tail above)
// ---------------------------------------------------------------------------

const R_AIR: f64 = 287.052_87; // specific gas constant for dry air, J/(kg·K)
const GAMMA: f64 = 1.4;        // ratio of specific heats

pub const SEA_LEVEL_PRESSURE: f64 = 101_325.0; // Pa

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy)]
pub struct Atmo {
    pub density: f64,      // kg/m^3
    pub pressure: f64,     // Pa
    pub temperature: f64,  // K
    pub sound_speed: f64,  // m/s
}

impl Atmo {
    /// Ambient pressure relative to sea level, 1.0 on the pad and ~0 in vacuum.
    /// Drives the sea-level/vacuum interpolation of engine performance.
    pub fn pressure_ratio(&self) -> f64 {
        (self.pressure / SEA_LEVEL_PRESSURE).clamp(0.0, 1.0)
    }
}

/// One layer of the piecewise temperature profile.
struct Layer {
    base_altitude: f64, // m
    base_temp: f64,     // K
    lapse: f64,         // K/m (0 = isothermal)
    base_pressure: f64, // Pa
}

const LAYERS: [Layer; 7] = [
    Layer { base_altitude: 0.0, base_temp: 288.15, lapse: -0.0065, base_pressure: SEA_LEVEL_PRESSURE },
    Layer { base_altitude: 11_000.0, base_temp: 216.65, lapse: 0.0, base_pressure: 22_632.1 },
    Layer { base_altitude: 20_000.0, base_temp: 216.65, lapse: 0.001, base_pressure: 5_474.89 },
    Layer { base_altitude: 32_000.0, base_temp: 228.65, lapse: 0.0028, base_pressure: 868.019 },
    Layer { base_altitude: 47_000.0, base_temp: 270.65, lapse: 0.0, base_pressure: 110.906 },
    Layer { base_altitude: 51_000.0, base_temp: 270.65, lapse: -0.0028, base_pressure: 66.9389 },
    Layer { base_altitude: 71_000.0, base_temp: 214.65, lapse: -0.002, base_pressure: 3.956_42 },
];

const TOP_OF_TABLE: f64 = 86_000.0;
const UPPER_DECAY: f64 = 0.000_15; // 1/m

/// ISA 1976 standard atmosphere model.
///
/// Clamps negative altitudes to sea level. Above 86 km pressure decays
/// exponentially, which is plenty for drag on an ascending vehicle.
pub fn isa(altitude_m: f64) -> Atmo {
    let h = altitude_m.max(0.0);

    let (temperature, pressure) = if h >= TOP_OF_TABLE {
        // Isothermal tail anchored to the top of the last layer
        let (t_top, p_top) = LAYERS[LAYERS.len() - 1].evaluate(TOP_OF_TABLE);
        (t_top, p_top * (-UPPER_DECAY * (h - TOP_OF_TABLE)).exp())
    } else {
        let layer = LAYERS
            .iter()
            .rev()
            .find(|l| h >= l.base_altitude)
            .unwrap_or(&LAYERS[0]);
        layer.evaluate(h)
    };

    let density = if temperature > 0.0 {
        pressure / (R_AIR * temperature)
    } else {
        0.0
    };

    Atmo {
        density,
        pressure,
        temperature,
        sound_speed: (GAMMA * R_AIR * temperature).sqrt(),
    }
}

impl Layer {
    fn evaluate(&self, h: f64) -> (f64, f64) {
        let dh = h - self.base_altitude;
        if self.lapse == 0.0 {
            let p = self.base_pressure * ((-G0 / (R_AIR * self.base_temp)) * dh).exp();
            (self.base_temp, p)
        } else {
            let t = self.base_temp + self.lapse * dh;
            let p = self.base_pressure * (t / self.base_temp).powf(-G0 / (self.lapse * R_AIR));
            (t, p)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
