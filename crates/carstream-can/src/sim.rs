//! Synthetic signal generator
//!
//! Produces correlated, plausible values when no bus is available. Speed
//! drives RPM and consumption; fuel drains a little each tick and jumps
//! back to the reset volume when it would fall under the minimum.

use carstream_core::{Reading, SimParams};

/// Litres drained per tick
const FUEL_PER_TICK: f64 = 0.0009;
/// Fixed economy used for the range estimate (km per litre)
const RANGE_KM_PER_LITRE: f64 = 12.5;

/// One generator tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSample {
    pub speed_kmh: f64,
    pub rpm: f64,
    pub engine_temp_c: f64,
    pub instant_consumption: f64,
    pub fuel_liters: f64,
    pub range_km: f64,
}

impl SimSample {
    /// The six published quantities
    pub fn readings(&self) -> [Reading; 6] {
        [
            Reading::new("speedKmh", self.speed_kmh as f32),
            Reading::new("rpm", self.rpm as f32),
            Reading::new("engineTempC", self.engine_temp_c as f32),
            Reading::new("instantConsumption", self.instant_consumption as f32),
            Reading::new("fuelLiters", self.fuel_liters as f32),
            Reading::new("rangeKm", self.range_km as f32),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Simulator {
    params: SimParams,
    fuel: f64,
}

impl Simulator {
    pub fn new(params: SimParams) -> Self {
        let fuel = params.fuel_start_l;
        Self { params, fuel }
    }

    /// Advance one tick; `t` is seconds since the run started
    pub fn step(&mut self, t: f64) -> SimSample {
        let p = &self.params;

        let speed = (70.0 + 28.0 * (t * 0.32).sin() + 6.0 * (t * 1.2).sin()).max(0.0);

        // Not f64::clamp: a misconfigured idle above redline must not panic
        let rpm = (p.idle_rpm + speed * 32.0 + 220.0 * (t * 0.9).sin())
            .max(p.idle_rpm)
            .min(p.redline_rpm);

        let temp = p.base_temp_c + 5.0 * (t * 0.10).sin();
        let consumption = 6.2 + 2.0 * (t * 0.28).sin().abs() + (speed / 140.0) * 3.0;

        self.fuel -= FUEL_PER_TICK;
        if self.fuel < p.fuel_min_l {
            tracing::debug!(reset_to = p.fuel_reset_l, "Simulated refuel");
            self.fuel = p.fuel_reset_l;
        }

        SimSample {
            speed_kmh: speed,
            rpm,
            engine_temp_c: temp,
            instant_consumption: consumption,
            fuel_liters: self.fuel,
            range_km: self.fuel * RANGE_KM_PER_LITRE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carstream_core::SimConfig;

    #[test]
    fn test_six_quantities() {
        let mut sim = Simulator::new(SimParams::default());
        let names: Vec<String> = sim.step(0.05).readings().into_iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "speedKmh",
                "rpm",
                "engineTempC",
                "instantConsumption",
                "fuelLiters",
                "rangeKm"
            ]
        );
    }

    #[test]
    fn test_rpm_bounded_by_idle_and_redline() {
        let params = SimConfig {
            idle_rpm: Some(900),
            redline_rpm: Some(2500),
            ..Default::default()
        }
        .resolve();
        let mut sim = Simulator::new(params);

        for tick in 0..4000 {
            let sample = sim.step(tick as f64 * 0.05);
            assert!(sample.rpm >= 900.0, "rpm {} below idle", sample.rpm);
            assert!(sample.rpm <= 2500.0, "rpm {} above redline", sample.rpm);
            assert!(sample.speed_kmh >= 0.0);
        }
    }

    #[test]
    fn test_fuel_never_below_minimum() {
        let params = SimConfig {
            fuel_start_l: Some(8.002),
            fuel_min_l: Some(8.0),
            fuel_reset_l: Some(45.0),
            ..Default::default()
        }
        .resolve();
        let mut sim = Simulator::new(params);

        let mut refueled = false;
        for tick in 0..10 {
            let sample = sim.step(tick as f64 * 0.05);
            assert!(sample.fuel_liters >= 8.0, "fuel {}", sample.fuel_liters);
            if sample.fuel_liters > 40.0 {
                refueled = true;
            }
        }
        assert!(refueled);
    }

    #[test]
    fn test_range_tracks_fuel() {
        let mut sim = Simulator::new(SimParams::default());
        let sample = sim.step(1.0);
        assert!((sample.range_km - sample.fuel_liters * 12.5).abs() < 1e-9);
        assert!((sample.fuel_liters - (42.0 - 0.0009)).abs() < 1e-9);
    }

    #[test]
    fn test_misconfigured_bounds_do_not_panic() {
        let params = SimConfig {
            idle_rpm: Some(8000),
            redline_rpm: Some(7000),
            ..Default::default()
        }
        .resolve();
        let sample = Simulator::new(params).step(0.0);
        assert_eq!(sample.rpm, 7000.0);
    }
}
