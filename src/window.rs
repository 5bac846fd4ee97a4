use std::collections::VecDeque;

use crate::prelude::{Duration, Epoch};
use crate::Error;

/// Time ordered ring buffer of recent samples, covering a target
/// elapsed duration. One sample older than the window edge is retained
/// so that the buffered span is at least the target span, which keeps
/// finite differences across the whole window well defined.
///
/// Timestamps are strictly increasing within a [Window]: pushing a
/// non increasing [Epoch] is refused. The normalizer is the outer
/// ordering gate; this check is the inner invariant.
#[derive(Debug, Clone)]
pub struct Window<T> {
    /// Target elapsed span.
    target_span: Duration,
    /// Hard sample capacity. Oldest samples are evicted on overflow.
    capacity: usize,
    /// (epoch, sample) pairs, oldest first.
    inner: VecDeque<(Epoch, T)>,
}

impl<T> Window<T> {
    /// Builds a new [Window] covering `target_span` with at most
    /// `capacity` samples.
    pub fn new(target_span: Duration, capacity: usize) -> Self {
        Self {
            target_span,
            capacity,
            inner: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// [Epoch] of the most recent sample.
    pub fn newest_epoch(&self) -> Option<Epoch> {
        self.inner.back().map(|(t, _)| *t)
    }

    /// [Epoch] of the oldest buffered sample.
    pub fn oldest_epoch(&self) -> Option<Epoch> {
        self.inner.front().map(|(t, _)| *t)
    }

    /// Most recent sample.
    pub fn newest(&self) -> Option<&(Epoch, T)> {
        self.inner.back()
    }

    /// Oldest buffered sample.
    pub fn oldest(&self) -> Option<&(Epoch, T)> {
        self.inner.front()
    }

    /// Elapsed [Duration] between oldest and newest samples.
    /// Zero when fewer than two samples are buffered.
    pub fn elapsed(&self) -> Duration {
        match (self.oldest_epoch(), self.newest_epoch()) {
            (Some(t0), Some(t1)) if self.inner.len() > 1 => t1 - t0,
            _ => Duration::ZERO,
        }
    }

    /// Iterates buffered samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &(Epoch, T)> {
        self.inner.iter()
    }

    /// Pushes a new sample, evicting samples that fell out of the
    /// target span (keeping one sample prior to the window edge)
    /// and enforcing the hard capacity.
    pub fn push(&mut self, epoch: Epoch, sample: T) -> Result<(), Error> {
        if let Some(newest) = self.newest_epoch() {
            if epoch <= newest {
                return Err(Error::NonMonotonicSample {
                    last: newest,
                    got: epoch,
                });
            }
        }

        self.inner.push_back((epoch, sample));
        self.evict(epoch);
        Ok(())
    }

    /// Clears the buffer entirely.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    fn evict(&mut self, newest: Epoch) {
        let edge = newest - self.target_span;

        let mut stale = 0;
        for (t, _) in self.inner.iter() {
            if *t >= edge {
                break;
            }
            stale += 1;
        }

        // keep one sample before the window edge
        for _ in 1..stale {
            self.inner.pop_front();
        }

        while self.inner.len() > self.capacity {
            self.inner.pop_front();
        }
    }
}

/// Timed buffer of scalar terms that maintains the running sum of its
/// content in O(1): evicted terms are subtracted as they leave the
/// span. Used for time integrated metrics.
#[derive(Debug, Clone)]
pub struct RunningSum {
    sum: f64,
    target_span: Duration,
    capacity: usize,
    inner: VecDeque<(Epoch, f64)>,
}

impl RunningSum {
    pub fn new(target_span: Duration, capacity: usize) -> Self {
        Self {
            sum: 0.0,
            target_span,
            capacity,
            inner: VecDeque::with_capacity(capacity),
        }
    }

    /// Current sum over the buffered span.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Elapsed [Duration] covered by the buffered terms.
    pub fn elapsed(&self) -> Duration {
        match (self.inner.front(), self.inner.back()) {
            (Some((t0, _)), Some((t1, _))) if self.inner.len() > 1 => *t1 - *t0,
            _ => Duration::ZERO,
        }
    }

    pub fn push(&mut self, epoch: Epoch, value: f64) -> Result<(), Error> {
        if let Some((newest, _)) = self.inner.back() {
            if epoch <= *newest {
                return Err(Error::NonMonotonicSample {
                    last: *newest,
                    got: epoch,
                });
            }
        }

        self.inner.push_back((epoch, value));
        self.sum += value;

        let edge = epoch - self.target_span;
        while let Some((t, _)) = self.inner.front() {
            if *t >= edge || self.inner.len() <= 1 {
                break;
            }
            self.pop_oldest();
        }

        while self.inner.len() > self.capacity {
            self.pop_oldest();
        }

        Ok(())
    }

    fn pop_oldest(&mut self) {
        if let Some((_, v)) = self.inner.pop_front() {
            self.sum -= v;
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.sum = 0.0;
    }
}

/// M-of-N detection filter: remembers the last N boolean detections
/// and reports a sustained alarm once at least M of them are raised.
/// Filtering detections this way suppresses alarms from isolated
/// noise spikes.
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    min_detections: usize,
    raised: usize,
    flags: VecDeque<bool>,
    capacity: usize,
}

impl DetectionFilter {
    /// Builds a new M-of-N [DetectionFilter]. `sample_window` (N) must be
    /// at least `min_detections` (M); both must be non zero.
    ///
    /// Panics otherwise: a filter with M > N could never trigger.
    pub fn new(min_detections: usize, sample_window: usize) -> Self {
        assert!(
            min_detections > 0 && sample_window >= min_detections,
            "detection filter requires 0 < M <= N, got {} of {}",
            min_detections,
            sample_window
        );

        Self {
            min_detections,
            raised: 0,
            flags: VecDeque::with_capacity(sample_window),
            capacity: sample_window,
        }
    }

    /// Pushes the latest detection flag and returns the filtered alarm.
    pub fn push(&mut self, detected: bool) -> bool {
        if self.flags.len() == self.capacity {
            if let Some(true) = self.flags.pop_front() {
                self.raised -= 1;
            }
        }

        self.flags.push_back(detected);
        if detected {
            self.raised += 1;
        }

        self.raised >= self.min_detections
    }

    /// Number of raised flags among the last N samples.
    pub fn raised(&self) -> usize {
        self.raised
    }

    pub fn reset(&mut self) {
        self.flags.clear();
        self.raised = 0;
    }
}

#[cfg(test)]
mod test {
    use super::{DetectionFilter, RunningSum, Window};
    use crate::prelude::{Duration, Epoch};

    fn t(secs: f64) -> Epoch {
        Epoch::from_gpst_seconds(secs)
    }

    #[test]
    fn strictly_increasing_epochs() {
        let mut win = Window::new(Duration::from_seconds(10.0), 16);
        win.push(t(1.0), 1.0).unwrap();
        win.push(t(2.0), 2.0).unwrap();

        assert!(win.push(t(2.0), 3.0).is_err());
        assert!(win.push(t(1.5), 3.0).is_err());
        assert_eq!(win.len(), 2);
    }

    #[test]
    fn keeps_one_sample_before_edge() {
        let mut win = Window::new(Duration::from_seconds(5.0), 64);
        for k in 0..10 {
            win.push(t(k as f64), k).unwrap();
        }

        // window edge is t=4: samples 0..3 are stale, one is retained
        assert_eq!(win.oldest_epoch().unwrap(), t(3.0));
        assert_eq!(win.newest_epoch().unwrap(), t(9.0));
        assert!(win.elapsed() >= Duration::from_seconds(5.0));
    }

    #[test]
    fn hard_capacity() {
        let mut win = Window::new(Duration::from_seconds(1000.0), 4);
        for k in 0..10 {
            win.push(t(k as f64), k).unwrap();
        }
        assert_eq!(win.len(), 4);
        assert_eq!(win.oldest_epoch().unwrap(), t(6.0));
    }

    #[test]
    fn running_sum_tracks_evictions() {
        let mut sum = RunningSum::new(Duration::from_seconds(3.0), 64);
        for k in 0..10 {
            sum.push(t(k as f64), 1.0).unwrap();
        }

        let expected: f64 = sum.len() as f64;
        assert!((sum.sum() - expected).abs() < 1e-12);
    }

    #[test]
    fn m_of_n_filter() {
        let mut filter = DetectionFilter::new(3, 4);

        assert!(!filter.push(true));
        assert!(!filter.push(true));
        assert!(filter.push(true));

        // one miss within the window keeps the alarm
        assert!(filter.push(false));
        // a second miss drops below 3 of 4
        assert!(!filter.push(false));

        filter.reset();
        assert_eq!(filter.raised(), 0);
    }

    #[test]
    #[should_panic]
    fn untriggerable_filter_refused() {
        let _ = DetectionFilter::new(5, 4);
    }
}
