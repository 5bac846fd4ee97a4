use log::debug;

use crate::{
    prelude::{
        AnomalyScore, ClockBounds, Config, DetectorId, Duration, Fix, Rationale, Window,
    },
    score::saturating_score,
};

/// Tolerance around a declared leap second epoch within which a one
/// second bias step is treated as legitimate.
fn leap_epoch_tolerance() -> Duration {
    Duration::from_seconds(2.0)
}

/// Checks the receiver clock solution against oscillator physics.
/// The receiver oscillator is stable: the drift solution varies
/// slowly (temperature, aging), so a fast drift change or a bias
/// departing from its drift-predicted trajectory points at a
/// counterfeit timing solution being walked away.
pub struct ClockDetector {
    bounds: ClockBounds,
    min_history: usize,
    seen: usize,
    /// (bias [s], drift [s/s]) history.
    samples: Window<(f64, f64)>,
}

impl ClockDetector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            bounds: cfg.clock.clone(),
            min_history: cfg.min_history,
            seen: 0,
            samples: Window::new(cfg.window_duration, cfg.window_capacity),
        }
    }

    pub fn reset(&mut self) {
        self.seen = 0;
        self.samples.clear();
    }

    /// True if this epoch sits close enough to a declared leap second
    /// for a one second bias step to be legitimate.
    fn near_leap_second(&self, fix: &Fix) -> bool {
        self.bounds.leap_second_epochs.iter().any(|leap| {
            let dt = fix.epoch - *leap;
            dt.abs() <= leap_epoch_tolerance()
        })
    }

    pub fn update(&mut self, fix: &Fix) -> AnomalyScore {
        let previous = self.samples.newest().map(|(t, s)| (*t, *s));

        if self
            .samples
            .push(fix.epoch, (fix.clock_bias_s, fix.clock_drift_s_s))
            .is_err()
        {
            return AnomalyScore::insufficient_history(DetectorId::Clock, fix.epoch);
        }

        self.seen += 1;

        if self.seen < self.min_history {
            debug!(
                "{} - clock warm-up ({}/{})",
                fix.epoch, self.seen, self.min_history
            );
            return AnomalyScore::insufficient_history(DetectorId::Clock, fix.epoch);
        }

        let (t_prev, (bias_prev, drift_prev)) = match previous {
            Some(previous) => previous,
            None => {
                return AnomalyScore::insufficient_history(DetectorId::Clock, fix.epoch);
            },
        };

        let dt = (fix.epoch - t_prev).to_seconds();

        let bias_step = fix.clock_bias_s - bias_prev;
        if bias_step.abs() > 0.5 && self.near_leap_second(fix) {
            debug!("{} - leap second bias step excluded", fix.epoch);
            return AnomalyScore {
                detector: DetectorId::Clock,
                epoch: fix.epoch,
                value: 0.0,
                rationale: Rationale::LeapSecondExcluded,
            };
        }

        // drift must evolve within oscillator stability
        let drift_rate = (fix.clock_drift_s_s - drift_prev).abs() / dt;

        // local linear predictor: previous drift extrapolates the bias
        let predicted_bias = bias_prev + drift_prev * dt;
        let residual = (fix.clock_bias_s - predicted_bias).abs();

        let scored = [
            (
                saturating_score(
                    drift_rate,
                    self.bounds.max_drift_rate_s_s2,
                    self.bounds.score_scale,
                ),
                Rationale::DriftRateExceeded,
            ),
            (
                saturating_score(
                    residual,
                    self.bounds.max_bias_residual_s,
                    self.bounds.score_scale,
                ),
                Rationale::BiasPredictionError,
            ),
        ];

        let (value, rationale) = scored
            .into_iter()
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .unwrap_or((0.0, Rationale::Nominal));

        if value == 0.0 {
            return AnomalyScore::nominal(DetectorId::Clock, fix.epoch);
        }

        debug!("{} - clock anomaly {:.3} ({})", fix.epoch, value, rationale);

        AnomalyScore {
            detector: DetectorId::Clock,
            epoch: fix.epoch,
            value,
            rationale,
        }
    }
}

#[cfg(test)]
mod test {
    use super::ClockDetector;
    use crate::prelude::{Config, Epoch, Fix, Rationale, Vector3};

    const DRIFT: f64 = 1.0E-9;

    fn fix_at(t0: Epoch, secs: f64, bias_s: f64, drift_s_s: f64) -> Fix {
        Fix::new(
            t0 + hifitime::Duration::from_seconds(secs),
            Vector3::zeros(),
            Vector3::zeros(),
        )
        .with_clock_state(bias_s, drift_s_s)
    }

    fn fix(secs: f64, bias_s: f64, drift_s_s: f64) -> Fix {
        fix_at(Epoch::from_gpst_seconds(0.0), secs, bias_s, drift_s_s)
    }

    #[test]
    fn stable_oscillator_is_nominal() {
        let mut det = ClockDetector::new(&Config::default());

        // steady 1 ns/s drift, bias following it exactly
        for k in 0..20 {
            let t = k as f64;
            let score = det.update(&fix(t, DRIFT * t, DRIFT));
            if score.rationale != Rationale::InsufficientHistory {
                assert_eq!(score.value, 0.0, "t={}", t);
            }
        }
    }

    #[test]
    fn drift_ramp_is_flagged() {
        let mut det = ClockDetector::new(&Config::default());

        for k in 0..10 {
            let t = k as f64;
            det.update(&fix(t, DRIFT * t, DRIFT));
        }

        // drift steps by 1E-6 s/s in one second: far beyond 5E-9/s²
        let score = det.update(&fix(10.0, DRIFT * 10.0, 1.0E-6));
        assert_eq!(score.rationale, Rationale::DriftRateExceeded);
        assert!(score.value > 0.9, "score={}", score.value);
    }

    #[test]
    fn bias_pull_is_flagged() {
        let mut det = ClockDetector::new(&Config::default());

        for k in 0..10 {
            let t = k as f64;
            det.update(&fix(t, DRIFT * t, DRIFT));
        }

        // 100 µs bias step with unchanged drift
        let score = det.update(&fix(10.0, DRIFT * 10.0 + 1.0E-4, DRIFT));
        assert_eq!(score.rationale, Rationale::BiasPredictionError);
        assert!(score.value > 0.9, "score={}", score.value);
    }

    #[test]
    fn leap_second_step_is_excluded() {
        let mut cfg = Config::default();
        let leap = Epoch::from_gregorian_utc_at_midnight(2017, 1, 1);
        cfg.clock.leap_second_epochs = vec![leap];

        let mut det = ClockDetector::new(&cfg);

        let t0 = leap - hifitime::Duration::from_seconds(10.0);
        for k in 0..10 {
            let t = k as f64;
            det.update(&fix_at(t0, t, DRIFT * t, DRIFT));
        }

        // one full second step right at the leap epoch
        let score = det.update(&fix_at(t0, 10.0, DRIFT * 10.0 + 1.0, DRIFT));
        assert_eq!(score.rationale, Rationale::LeapSecondExcluded);
        assert_eq!(score.value, 0.0);

        // the same step far from any declared epoch alarms
        let mut det = ClockDetector::new(&Config::default());
        for k in 0..10 {
            let t = k as f64;
            det.update(&fix(t, DRIFT * t, DRIFT));
        }
        let score = det.update(&fix(10.0, DRIFT * 10.0 + 1.0, DRIFT));
        assert_eq!(score.rationale, Rationale::BiasPredictionError);
        assert!(score.value > 0.99);
    }
}
