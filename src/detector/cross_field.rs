use log::debug;

use crate::{
    prelude::{
        AnomalyScore, Config, CrossFieldBounds, DetectorId, Epoch, Fix, Rationale, RunningSum,
        Vector3,
    },
    score::saturating_score,
};

/// Cross checks two independently derivable velocity estimates: the
/// finite difference of successive positions against the velocity the
/// receiver reports (Doppler derived). A spoofer walking the position
/// away while the velocity solution lags (or vice versa) opens a
/// sustained divergence between the two.
///
/// The score follows the time integrated divergence over a sliding
/// window, not the instantaneous difference, so one noisy sample
/// cannot raise it.
pub struct CrossFieldDetector {
    bounds: CrossFieldBounds,
    min_history: usize,
    seen: usize,
    /// Previous accepted position sample.
    previous: Option<(Epoch, Vector3<f64>)>,
    /// Divergence magnitude of the previous pair, for the trapezoidal
    /// integration term.
    last_divergence: f64,
    /// Trapezoidal terms of the divergence integral [m].
    integral: RunningSum,
}

impl CrossFieldDetector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            bounds: cfg.cross_field,
            min_history: cfg.min_history,
            seen: 0,
            previous: None,
            last_divergence: 0.0,
            integral: RunningSum::new(cfg.cross_field.integration_window, cfg.window_capacity),
        }
    }

    pub fn reset(&mut self) {
        self.seen = 0;
        self.previous = None;
        self.last_divergence = 0.0;
        self.integral.clear();
    }

    pub fn update(&mut self, fix: &Fix) -> AnomalyScore {
        let previous = self.previous.replace((fix.epoch, fix.position_ecef_m));
        self.seen += 1;

        let (t_prev, p_prev) = match previous {
            Some(previous) => previous,
            None => {
                return AnomalyScore::insufficient_history(DetectorId::CrossField, fix.epoch);
            },
        };

        let dt = (fix.epoch - t_prev).to_seconds();
        if dt <= 0.0 {
            // unreachable behind the normalizer gate
            return AnomalyScore::insufficient_history(DetectorId::CrossField, fix.epoch);
        }

        let implied = (fix.position_ecef_m - p_prev) / dt;
        let divergence = (implied - fix.velocity_m_s).norm();

        // trapezoidal term of the divergence integral
        let term = (divergence + self.last_divergence) / 2.0 * dt;
        self.last_divergence = divergence;

        if self.integral.push(fix.epoch, term).is_err() {
            return AnomalyScore::insufficient_history(DetectorId::CrossField, fix.epoch);
        }

        if self.seen < self.min_history {
            debug!(
                "{} - cross-field warm-up ({}/{})",
                fix.epoch, self.seen, self.min_history
            );
            return AnomalyScore::insufficient_history(DetectorId::CrossField, fix.epoch);
        }

        let elapsed = self.integral.elapsed().to_seconds();
        if elapsed <= 0.0 {
            return AnomalyScore::insufficient_history(DetectorId::CrossField, fix.epoch);
        }

        // time averaged divergence over the integration window [m/s]
        let averaged = self.integral.sum() / elapsed;

        let value = saturating_score(
            averaged,
            self.bounds.max_divergence_m_s,
            self.bounds.score_scale,
        );

        if value == 0.0 {
            return AnomalyScore::nominal(DetectorId::CrossField, fix.epoch);
        }

        debug!(
            "{} - cross-field anomaly {:.3} (averaged divergence {:.1} m/s)",
            fix.epoch, value, averaged
        );

        AnomalyScore {
            detector: DetectorId::CrossField,
            epoch: fix.epoch,
            value,
            rationale: Rationale::VelocityDivergence,
        }
    }
}
