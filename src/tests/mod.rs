
use log::LevelFilter;
use std::sync::Once;

use crate::prelude::{Duration, Epoch, Fix, Vector3};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Synthetic fix stream builder: constant velocity trajectory with a
/// stable oscillator, onto which test cases graft anomalies.
pub struct StreamBuilder {
    t0: Epoch,
    period: Duration,
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    clock_bias_s: f64,
    clock_drift_s_s: f64,
    elapsed: Duration,
}

impl StreamBuilder {
    pub fn new(velocity_m_s: Vector3<f64>) -> Self {
        Self {
            t0: Epoch::from_gpst_seconds(0.0),
            period: Duration::from_seconds(1.0),
            position: Vector3::zeros(),
            velocity: velocity_m_s,
            clock_bias_s: 0.0,
            clock_drift_s_s: 1.0E-9,
            elapsed: Duration::ZERO,
        }
    }

    pub fn stationary() -> Self {
        Self::new(Vector3::zeros())
    }

    /// Moves the stream start to given [Epoch].
    pub fn starting_at(mut self, t0: Epoch) -> Self {
        self.t0 = t0;
        self
    }

    /// Advances one period and emits the next nominal fix.
    pub fn next_fix(&mut self) -> Fix {
        let fix = Fix::new(self.t0 + self.elapsed, self.position, self.velocity)
            .with_clock_state(self.clock_bias_s, self.clock_drift_s_s);

        let dt = self.period.to_seconds();
        self.elapsed += self.period;
        self.position += self.velocity * dt;
        self.clock_bias_s += self.clock_drift_s_s * dt;

        fix
    }

    /// Emits `count` nominal fixes.
    pub fn take(&mut self, count: usize) -> Vec<Fix> {
        (0..count).map(|_| self.next_fix()).collect()
    }

    /// Displaces the trajectory instantaneously by `offset_m`.
    pub fn jump(&mut self, offset_m: Vector3<f64>) {
        self.position += offset_m;
    }

    /// Applies a clock drift step of `step_s_s`.
    pub fn drift_step(&mut self, step_s_s: f64) {
        self.clock_drift_s_s += step_s_s;
    }

    /// Applies a clock bias step of `step_s` (leap second style).
    pub fn bias_step(&mut self, step_s: f64) {
        self.clock_bias_s += step_s;
    }

    /// Skips `gap` of stream time without emitting fixes.
    pub fn pause(&mut self, gap: Duration) {
        let dt = gap.to_seconds();
        self.elapsed += gap;
        self.position += self.velocity * dt;
        self.clock_bias_s += self.clock_drift_s_s * dt;
    }
}
