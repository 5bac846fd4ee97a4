use itertools::Itertools;
use log::debug;

use crate::{
    prelude::{AnomalyScore, Config, DetectorId, Fix, KinematicBounds, Rationale, Vector3, Window},
    score::saturating_score,
};

/// Checks the position sequence against physically plausible motion
/// bounds. A position jump a genuine antenna could not have performed
/// (implied velocity, acceleration or jerk beyond the platform bounds)
/// is the classic position pull-off signature.
///
/// All finite differences are computed against elapsed wall time, not
/// sample counts, so the detector stays correct under variable fix
/// rates.
pub struct KinematicDetector {
    bounds: KinematicBounds,
    min_history: usize,
    /// Accepted fixes since start or last reset.
    seen: usize,
    positions: Window<Vector3<f64>>,
}

impl KinematicDetector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            bounds: cfg.kinematic,
            min_history: cfg.min_history,
            seen: 0,
            positions: Window::new(cfg.window_duration, cfg.window_capacity),
        }
    }

    pub fn reset(&mut self) {
        self.seen = 0;
        self.positions.clear();
    }

    pub fn update(&mut self, fix: &Fix) -> AnomalyScore {
        if self
            .positions
            .push(fix.epoch, fix.position_ecef_m)
            .is_err()
        {
            // unreachable behind the normalizer gate; never contribute
            return AnomalyScore::insufficient_history(DetectorId::Kinematic, fix.epoch);
        }

        self.seen += 1;

        if self.seen < self.min_history {
            debug!(
                "{} - kinematic warm-up ({}/{})",
                fix.epoch, self.seen, self.min_history
            );
            return AnomalyScore::insufficient_history(DetectorId::Kinematic, fix.epoch);
        }

        // implied velocities over the most recent sample pairs,
        // differentiated against elapsed wall time
        let skipped = self.positions.len().saturating_sub(4);

        let velocities: Vec<_> = self
            .positions
            .iter()
            .skip(skipped)
            .tuple_windows()
            .map(|((t0, p0), (t1, p1))| {
                let dt = (*t1 - *t0).to_seconds();
                (*t1, (p1 - p0) / dt)
            })
            .collect();

        let accelerations: Vec<_> = velocities
            .iter()
            .tuple_windows()
            .map(|((t0, v0), (t1, v1))| {
                let dt = (*t1 - *t0).to_seconds();
                (*t1, (v1 - v0) / dt)
            })
            .collect();

        let jerk = accelerations
            .iter()
            .tuple_windows()
            .map(|((t0, a0), (t1, a1))| {
                let dt = (*t1 - *t0).to_seconds();
                ((a1 - a0) / dt).norm()
            })
            .last();

        let velocity = velocities.last().map(|(_, v)| v.norm()).unwrap_or(0.0);
        let acceleration = accelerations.last().map(|(_, a)| a.norm()).unwrap_or(0.0);

        let scored = [
            (
                saturating_score(
                    velocity,
                    self.bounds.max_velocity_m_s,
                    self.bounds.score_scale,
                ),
                Rationale::VelocityExceeded,
            ),
            (
                saturating_score(
                    acceleration,
                    self.bounds.max_acceleration_m_s2,
                    self.bounds.score_scale,
                ),
                Rationale::AccelerationExceeded,
            ),
            (
                saturating_score(
                    jerk.unwrap_or(0.0),
                    self.bounds.max_jerk_m_s3,
                    self.bounds.score_scale,
                ),
                Rationale::JerkExceeded,
            ),
        ];

        let (value, rationale) = scored
            .into_iter()
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .unwrap_or((0.0, Rationale::Nominal));

        if value == 0.0 {
            return AnomalyScore::nominal(DetectorId::Kinematic, fix.epoch);
        }

        debug!(
            "{} - kinematic anomaly {:.3} ({})",
            fix.epoch, value, rationale
        );

        AnomalyScore {
            detector: DetectorId::Kinematic,
            epoch: fix.epoch,
            value,
            rationale,
        }
    }
}

#[cfg(test)]
mod test {
    use super::KinematicDetector;
    use crate::prelude::{Config, Epoch, Fix, Profile, Rationale, Vector3};

    fn detector() -> KinematicDetector {
        KinematicDetector::new(&Config::preset(Profile::Vehicular))
    }

    fn fix(secs: f64, x_m: f64) -> Fix {
        Fix::new(
            Epoch::from_gpst_seconds(secs),
            Vector3::new(x_m, 0.0, 0.0),
            Vector3::new(5.0, 0.0, 0.0),
        )
    }

    #[test]
    fn warm_up_then_nominal() {
        let mut det = detector();

        // 5 m/s along x, well within vehicular bounds
        for k in 0..3 {
            let score = det.update(&fix(k as f64, 5.0 * k as f64));
            assert_eq!(score.rationale, Rationale::InsufficientHistory);
            assert_eq!(score.value, 0.0);
        }

        for k in 3..10 {
            let score = det.update(&fix(k as f64, 5.0 * k as f64));
            assert_eq!(score.rationale, Rationale::Nominal, "fix {}", k);
            assert_eq!(score.value, 0.0);
        }
    }

    #[test]
    fn position_jump_saturates() {
        let mut det = detector();
        for k in 0..10 {
            det.update(&fix(k as f64, 5.0 * k as f64));
        }

        // 800 m jump in one second: ~800 m/s implied velocity
        let score = det.update(&fix(10.0, 5.0 * 9.0 + 800.0));
        assert!(score.value > 0.9, "score={}", score.value);
    }

    #[test]
    fn uneven_sampling_uses_wall_time() {
        let mut det = detector();

        // 5 m/s but sampled at 1 s, 3 s, 0.5 s intervals: implied
        // velocity stays 5 m/s when computed against elapsed time
        let mut t = 0.0;
        let mut x = 0.0;
        for dt in [1.0, 1.0, 1.0, 3.0, 0.5, 2.0, 1.0] {
            t += dt;
            x += 5.0 * dt;
            let score = det.update(&fix(t, x));
            if score.rationale != Rationale::InsufficientHistory {
                assert_eq!(score.value, 0.0, "t={}", t);
            }
        }
    }

    #[test]
    fn reset_reengages_warm_up() {
        let mut det = detector();
        for k in 0..6 {
            det.update(&fix(k as f64, 5.0 * k as f64));
        }

        det.reset();

        let score = det.update(&fix(100.0, 0.0));
        assert_eq!(score.rationale, Rationale::InsufficientHistory);
    }
}
