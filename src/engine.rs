use log::{debug, info};

use crate::{
    detector::Detector,
    prelude::{
        AlertEvent, AlertMachine, AlertState, AnomalyScore, Config, ConfigError, Duration, Epoch,
        Fix, Fusion, Normalizer, Screening, Verdict,
    },
    Error,
};

/// Engine level event, delivered to the external sink.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Alarm transition (see [AlertEvent]).
    Alert(AlertEvent),
    /// The fix stream went quiet beyond the staleness bound:
    /// detection has paused, which must never be mistaken for a
    /// sustained NORMAL reading. Carries the quiet [Duration].
    Gap(Duration),
}

/// Outcome of processing one candidate [Fix].
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Normalizer [Screening] of the candidate.
    pub screening: Screening,
    /// Fused [Verdict], present for every accepted fix.
    pub verdict: Option<Verdict>,
    /// Events emitted while processing this fix (a post-gap fix may
    /// emit both a gap notice and an alarm transition).
    pub events: Vec<EngineEvent>,
}

/// The complete detection pipeline: normalizer -> three detectors ->
/// fusion -> alert machine. Owns every stage exclusively; instantiate
/// one [Engine] per monitored receiver.
///
/// Detectors run sequentially per fix. They are mutually independent
/// (none reads another's window) so they could equally run as parallel
/// tasks joined before fusion; the per-fix workload does not justify
/// it here.
pub struct Engine {
    cfg: Config,
    normalizer: Normalizer,
    detectors: [Detector; 3],
    fusion: Fusion,
    alert: AlertMachine,
    last_verdict: Option<Verdict>,
    /// Raised once a staleness timeout has been signaled, so a quiet
    /// stream does not re-emit gap events on every poll.
    stale_signaled: bool,
}

impl Engine {
    /// Builds a new [Engine] from given [Config].
    /// Configuration problems are fatal here and only here: once the
    /// engine is built, no input may terminate it.
    pub fn new(cfg: Config) -> Result<Self, ConfigError> {
        cfg.validate()?;

        info!(
            "deploying detection engine: {} profile, {} window",
            cfg.profile, cfg.window_duration
        );

        Ok(Self {
            normalizer: Normalizer::new(cfg.staleness_bound, cfg.accuracy_ceiling),
            detectors: Detector::build_all(&cfg),
            fusion: Fusion::new(cfg.fusion, cfg.alert.suspect_confidence),
            alert: AlertMachine::new(cfg.alert),
            last_verdict: None,
            stale_signaled: false,
            cfg,
        })
    }

    /// Current alarm state.
    pub fn state(&self) -> AlertState {
        self.alert.state()
    }

    /// Most recent fused [Verdict].
    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.last_verdict.as_ref()
    }

    /// Processes one candidate [Fix] through the whole pipeline.
    /// Rejected fixes touch no detector state; every accepted fix
    /// yields exactly one [Verdict].
    pub fn process(&mut self, fix: &Fix) -> Result<Outcome, Error> {
        let screening = self.normalizer.screen(fix);
        let mut events = Vec::new();

        match screening {
            Screening::Rejected(reason) => {
                debug!("{} - fix dropped ({})", fix.epoch, reason);
                return Ok(Outcome {
                    screening,
                    verdict: None,
                    events,
                });
            },
            Screening::Gap(dt) => {
                // history across the gap is not comparable
                self.reset_detectors();
                self.alert.note_gap();
                self.stale_signaled = false;
                events.push(EngineEvent::Gap(dt));
            },
            Screening::Accepted => {
                self.stale_signaled = false;
            },
        }

        let scores = self.update_detectors(fix);
        let verdict = self.fusion.fuse(scores)?;

        if let Some(event) = self.alert.apply(&verdict) {
            events.push(EngineEvent::Alert(event));
        }

        self.last_verdict = Some(verdict.clone());

        Ok(Outcome {
            screening,
            verdict: Some(verdict),
            events,
        })
    }

    /// Staleness watchdog, to be polled when no fix arrives: past the
    /// staleness bound it signals (once) that detection has paused.
    /// Detector history is discarded so warm-up re-engages with the
    /// next fix.
    pub fn check_stale(&mut self, now: Epoch) -> Option<EngineEvent> {
        let watermark = self.normalizer.watermark()?;

        if self.stale_signaled {
            return None;
        }

        let quiet = now - watermark;
        if quiet <= self.cfg.staleness_bound {
            return None;
        }

        info!("{} - stream stale for {}", now, quiet);

        self.reset_detectors();
        self.alert.note_gap();
        self.stale_signaled = true;

        Some(EngineEvent::Gap(quiet))
    }

    /// Clean shutdown: drains the pipeline and hands back the final
    /// fused [Verdict]. Verdicts are only ever produced whole, so
    /// there is no partial state to flush beyond this.
    pub fn finish(self) -> Option<Verdict> {
        self.last_verdict
    }

    /// Offline evaluation: replays a recorded fix stream through a
    /// fresh engine built from `cfg` and collects everything emitted.
    pub fn replay<I>(cfg: Config, fixes: I) -> Result<Replay, ConfigError>
    where
        I: IntoIterator<Item = Fix>,
    {
        let mut engine = Self::new(cfg)?;

        let mut events = Vec::new();
        let mut accepted = 0;
        let mut rejected = 0;

        for fix in fixes {
            // per-fix errors are absorbed: availability over strictness
            match engine.process(&fix) {
                Ok(outcome) => {
                    if outcome.screening.is_accepted() {
                        accepted += 1;
                    } else {
                        rejected += 1;
                    }
                    events.extend(outcome.events);
                },
                Err(error) => {
                    debug!("{} - replay: fix skipped ({})", fix.epoch, error);
                    rejected += 1;
                },
            }
        }

        let final_state = engine.state();
        let final_verdict = engine.finish();

        Ok(Replay {
            events,
            accepted,
            rejected,
            final_state,
            final_verdict,
        })
    }

    fn reset_detectors(&mut self) {
        for detector in self.detectors.iter_mut() {
            detector.reset();
        }
    }

    // fusion order is the build order: kinematic, clock, cross-field
    fn update_detectors(&mut self, fix: &Fix) -> [AnomalyScore; 3] {
        self.detectors
            .each_mut()
            .map(|detector| detector.update(fix))
    }
}

/// Everything collected by one [Engine::replay] run.
#[derive(Debug, Clone)]
pub struct Replay {
    /// All events, in emission order.
    pub events: Vec<EngineEvent>,
    /// Accepted fix count.
    pub accepted: usize,
    /// Rejected fix count.
    pub rejected: usize,
    /// Alarm state at end of stream.
    pub final_state: AlertState,
    /// Last fused [Verdict].
    pub final_verdict: Option<Verdict>,
}

impl Replay {
    /// Alarm transitions only.
    pub fn alerts(&self) -> impl Iterator<Item = &AlertEvent> {
        self.events.iter().filter_map(|event| match event {
            EngineEvent::Alert(alert) => Some(alert),
            EngineEvent::Gap(_) => None,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{Engine, EngineEvent};
    use crate::prelude::{
        AlertState, Classification, Config, Duration, Epoch, Fix, Profile, Screening, Vector3,
    };

    fn fix(secs: f64, x_m: f64) -> Fix {
        Fix::new(
            Epoch::from_gpst_seconds(secs),
            Vector3::new(x_m, 0.0, 0.0),
            Vector3::new(5.0, 0.0, 0.0),
        )
    }

    fn engine() -> Engine {
        Engine::new(Config::preset(Profile::Vehicular)).unwrap()
    }

    #[test]
    fn bad_config_is_fatal_at_startup() {
        let mut cfg = Config::default();
        cfg.min_history = 1;
        assert!(Engine::new(cfg).is_err());
    }

    #[test]
    fn accepted_fix_always_yields_verdict() {
        let mut engine = engine();

        let outcome = engine.process(&fix(0.0, 0.0)).unwrap();
        assert_eq!(outcome.screening, Screening::Accepted);

        let verdict = outcome.verdict.expect("accepted fix must yield a verdict");
        assert_eq!(verdict.classification, Classification::NoData);
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn rejected_fix_yields_no_verdict() {
        let mut engine = engine();
        engine.process(&fix(5.0, 0.0)).unwrap();

        let outcome = engine.process(&fix(4.0, 0.0)).unwrap();
        assert!(matches!(outcome.screening, Screening::Rejected(_)));
        assert!(outcome.verdict.is_none());
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn gap_resets_warm_up() {
        let mut engine = engine();

        for k in 0..10 {
            engine.process(&fix(k as f64, 5.0 * k as f64)).unwrap();
        }

        // 60 s quiet: well beyond the 10 s staleness bound
        let outcome = engine.process(&fix(70.0, 350.0)).unwrap();
        assert!(matches!(outcome.events[0], EngineEvent::Gap(_)));

        // post-gap verdict restarts from warm-up
        let verdict = outcome.verdict.unwrap();
        assert_eq!(verdict.classification, Classification::NoData);
    }

    #[test]
    fn stale_watchdog_signals_once() {
        let mut engine = engine();
        engine.process(&fix(0.0, 0.0)).unwrap();

        let now = Epoch::from_gpst_seconds(60.0);
        match engine.check_stale(now) {
            Some(EngineEvent::Gap(quiet)) => {
                assert_eq!(quiet, Duration::from_seconds(60.0));
            },
            other => panic!("expected gap event, got {:?}", other),
        }

        // signaled once only
        assert!(engine.check_stale(now + Duration::from_seconds(1.0)).is_none());

        // next fix re-arms the watchdog
        engine.process(&fix(120.0, 0.0)).unwrap();
        assert!(engine
            .check_stale(Epoch::from_gpst_seconds(300.0))
            .is_some());
    }

    #[test]
    fn finish_returns_last_verdict() {
        let mut engine = engine();
        for k in 0..5 {
            engine.process(&fix(k as f64, 5.0 * k as f64)).unwrap();
        }

        let verdict = engine.finish().expect("expected a final verdict");
        assert_eq!(verdict.epoch, Epoch::from_gpst_seconds(4.0));
    }

    #[test]
    fn replay_counts_and_state() {
        let mut fixes: Vec<_> = (0..20).map(|k| fix(k as f64, 5.0 * k as f64)).collect();
        fixes.push(fix(10.0, 0.0)); // out of order, dropped

        let replay = Engine::replay(Config::preset(Profile::Vehicular), fixes).unwrap();
        assert_eq!(replay.accepted, 20);
        assert_eq!(replay.rejected, 1);
        assert_eq!(replay.final_state, AlertState::Normal);
        assert!(replay.final_verdict.is_some());
    }
}
