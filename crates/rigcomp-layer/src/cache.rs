//! Per-frame pose caching between locate and end-frame.
//!
//! Compositors do not guarantee that the display time stamped on a
//! frame submission exactly matches the one the application located
//! with, so lookups fall back to the nearest sample inside a small
//! tolerance window.

use rigcomp_tracker::DisplayTime;
use std::collections::BTreeMap;
use tracing::warn;

pub struct PoseCache<T: Clone> {
    samples: BTreeMap<DisplayTime, T>,
    /// Maximum |sample time - query time| accepted on fallback, ns.
    tolerance: DisplayTime,
    label: &'static str,
}

impl<T: Clone> PoseCache<T> {
    pub fn new(label: &'static str, tolerance: DisplayTime) -> Self {
        Self {
            samples: BTreeMap::new(),
            tolerance,
            label,
        }
    }

    pub fn set_tolerance(&mut self, tolerance: DisplayTime) {
        self.tolerance = tolerance;
    }

    pub fn add_sample(&mut self, time: DisplayTime, value: T) {
        self.samples.insert(time, value);
    }

    /// Exact hit, or the closest sample within tolerance. Misses are
    /// logged; the caller substitutes a neutral value.
    pub fn get_sample(&self, time: DisplayTime) -> Option<T> {
        if let Some(value) = self.samples.get(&time) {
            return Some(value.clone());
        }
        let lower = time.saturating_sub(self.tolerance);
        let upper = time.saturating_add(self.tolerance);
        let nearest = self
            .samples
            .range(lower..=upper)
            .min_by_key(|(sample_time, _)| (*sample_time - time).abs());
        match nearest {
            Some((sample_time, value)) => {
                warn!(
                    cache = self.label,
                    time,
                    sample_time,
                    "no exact cache entry, using closest within tolerance"
                );
                Some(value.clone())
            }
            None => {
                warn!(
                    cache = self.label,
                    time, "no cache entry within tolerance"
                );
                None
            }
        }
    }

    /// Drop every sample at or before `time`. Called once the frame
    /// with that display time has been submitted.
    pub fn cleanup(&mut self, time: DisplayTime) {
        self.samples = self.samples.split_off(&(time + 1));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.samples.len()
    }
}
