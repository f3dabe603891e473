//! Smoothing filters for tracker poses.
//!
//! Translation goes through cascaded exponential-moving-average stages,
//! rotation through cascaded slerp stages. Strength is the fraction of
//! the previous output retained per stage: 0.0 passes samples through
//! unchanged, values approaching 1.0 smooth (and lag) more. Strength is
//! always clamped to [0, 1) so a stage can never stop moving entirely.

use glam::{Quat, Vec3};
use tracing::warn;

/// Upper bound for the smoothing strength. Exactly 1.0 would freeze the
/// filter output forever.
const MAX_STRENGTH: f32 = 0.9999;

/// Number of cascaded stages. Changing the order discards the chain;
/// there is no online order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrder {
    Single,
    Double,
    Triple,
}

impl FilterOrder {
    pub fn stages(self) -> usize {
        match self {
            FilterOrder::Single => 1,
            FilterOrder::Double => 2,
            FilterOrder::Triple => 3,
        }
    }

    /// Parse a configured order, falling back to the given default when
    /// the value is out of range (config errors degrade, never abort).
    pub fn from_config(order: u32, default: FilterOrder) -> FilterOrder {
        match order {
            1 => FilterOrder::Single,
            2 => FilterOrder::Double,
            3 => FilterOrder::Triple,
            other => {
                warn!(order = other, "invalid filter order, using default");
                default
            }
        }
    }
}

fn clamp_strength(strength: f32) -> f32 {
    strength.clamp(0.0, MAX_STRENGTH)
}

/// Cascaded exponential-moving-average filter for translation.
pub struct EmaFilter {
    stages: Vec<Vec3>,
    strength: f32,
    seeded: bool,
}

impl EmaFilter {
    pub fn new(order: FilterOrder, strength: f32) -> Self {
        Self {
            stages: vec![Vec3::ZERO; order.stages()],
            strength: clamp_strength(strength),
            seeded: false,
        }
    }

    /// Feed one sample through all stages and return the smoothed value.
    pub fn filter(&mut self, sample: Vec3) -> Vec3 {
        if !self.seeded {
            self.reset(sample);
            return sample;
        }
        let mut input = sample;
        for stage in &mut self.stages {
            *stage = *stage * self.strength + input * (1.0 - self.strength);
            input = *stage;
        }
        input
    }

    /// Re-seed every stage, discarding smoothing history. Called when a
    /// new reference pose is set so stale history cannot bleed into the
    /// first frames after calibration.
    pub fn reset(&mut self, value: Vec3) {
        for stage in &mut self.stages {
            *stage = value;
        }
        self.seeded = true;
    }

    /// Set a new strength, returning the clamped value actually applied.
    pub fn set_strength(&mut self, strength: f32) -> f32 {
        self.strength = clamp_strength(strength);
        self.strength
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }
}

/// Cascaded spherical-linear-interpolation filter for rotation.
pub struct SlerpFilter {
    stages: Vec<Quat>,
    strength: f32,
    seeded: bool,
}

impl SlerpFilter {
    pub fn new(order: FilterOrder, strength: f32) -> Self {
        Self {
            stages: vec![Quat::IDENTITY; order.stages()],
            strength: clamp_strength(strength),
            seeded: false,
        }
    }

    /// Feed one orientation sample through all stages.
    pub fn filter(&mut self, sample: Quat) -> Quat {
        if !self.seeded {
            self.reset(sample);
            return sample;
        }
        let mut input = sample;
        for stage in &mut self.stages {
            // slerp handles hemisphere flips; the blend factor moves the
            // stage toward the incoming sample.
            *stage = stage.slerp(input, 1.0 - self.strength).normalize();
            input = *stage;
        }
        input
    }

    pub fn reset(&mut self, value: Quat) {
        for stage in &mut self.stages {
            *stage = value;
        }
        self.seeded = true;
    }

    pub fn set_strength(&mut self, strength: f32) -> f32 {
        self.strength = clamp_strength(strength);
        self.strength
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }
}

/// Step size for interactive strength adjustment: shrinks as the
/// strength approaches its upper bound so each step stays perceptible.
pub fn nudged_strength(current: f32, increase: bool) -> f32 {
    let amount = (1.1 - current) * 0.05;
    clamp_strength(current + if increase { amount } else { -amount })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_is_clamped() {
        let mut f = EmaFilter::new(FilterOrder::Single, 1.5);
        assert!(f.strength() < 1.0);
        assert!(f.set_strength(-0.2) >= 0.0);
        assert!(f.set_strength(7.0) < 1.0);

        let mut r = SlerpFilter::new(FilterOrder::Double, -3.0);
        assert!(r.strength() >= 0.0);
        assert!(r.set_strength(1.0) < 1.0);
    }

    #[test]
    fn zero_strength_passes_through() {
        let mut f = EmaFilter::new(FilterOrder::Triple, 0.0);
        f.reset(Vec3::ZERO);
        let sample = Vec3::new(1.0, -2.0, 3.0);
        assert!((f.filter(sample) - sample).length() < 1e-6);

        let mut r = SlerpFilter::new(FilterOrder::Triple, 0.0);
        r.reset(Quat::IDENTITY);
        let q = Quat::from_rotation_y(0.8);
        assert!(r.filter(q).dot(q).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn first_sample_seeds_without_transient() {
        let mut f = EmaFilter::new(FilterOrder::Double, 0.9);
        let sample = Vec3::new(5.0, 5.0, 5.0);
        // No reset yet: the first sample must come back unchanged
        // rather than being pulled toward a stale zero state.
        assert!((f.filter(sample) - sample).length() < 1e-6);
    }

    #[test]
    fn ema_converges_to_constant_input() {
        let mut f = EmaFilter::new(FilterOrder::Double, 0.5);
        f.reset(Vec3::ZERO);
        let target = Vec3::new(1.0, 0.0, 0.0);
        let mut out = Vec3::ZERO;
        for _ in 0..200 {
            out = f.filter(target);
        }
        assert!((out - target).length() < 1e-3);
    }

    #[test]
    fn higher_order_lags_more() {
        let target = Vec3::X;
        let mut single = EmaFilter::new(FilterOrder::Single, 0.8);
        let mut triple = EmaFilter::new(FilterOrder::Triple, 0.8);
        single.reset(Vec3::ZERO);
        triple.reset(Vec3::ZERO);
        let mut s = Vec3::ZERO;
        let mut t = Vec3::ZERO;
        for _ in 0..5 {
            s = single.filter(target);
            t = triple.filter(target);
        }
        assert!(t.x < s.x);
    }

    #[test]
    fn reset_discards_history() {
        let mut f = EmaFilter::new(FilterOrder::Single, 0.9);
        f.reset(Vec3::ZERO);
        for _ in 0..50 {
            f.filter(Vec3::new(10.0, 0.0, 0.0));
        }
        f.reset(Vec3::ZERO);
        // One sample after reset must look like a fresh filter.
        let fresh = EmaFilter::new(FilterOrder::Single, 0.9)
            .filter_after_reset(Vec3::ZERO, Vec3::X);
        assert!((f.filter(Vec3::X) - fresh).length() < 1e-6);
    }

    #[test]
    fn slerp_converges_to_constant_input() {
        let mut r = SlerpFilter::new(FilterOrder::Double, 0.5);
        r.reset(Quat::IDENTITY);
        let target = Quat::from_rotation_y(1.0);
        let mut out = Quat::IDENTITY;
        for _ in 0..200 {
            out = r.filter(target);
        }
        assert!(out.dot(target).abs() > 1.0 - 1e-4);
    }

    #[test]
    fn invalid_order_falls_back() {
        assert_eq!(
            FilterOrder::from_config(0, FilterOrder::Double),
            FilterOrder::Double
        );
        assert_eq!(
            FilterOrder::from_config(9, FilterOrder::Single),
            FilterOrder::Single
        );
        assert_eq!(
            FilterOrder::from_config(3, FilterOrder::Single),
            FilterOrder::Triple
        );
    }

    #[test]
    fn nudge_shrinks_near_limit() {
        let low_step = nudged_strength(0.0, true);
        let high = 0.95;
        let high_step = nudged_strength(high, true) - high;
        assert!(low_step > high_step);
        assert!(nudged_strength(0.999, true) < 1.0);
        assert!(nudged_strength(0.0, false) >= 0.0);
    }

    impl EmaFilter {
        /// Test helper: reset then filter one sample.
        fn filter_after_reset(mut self, seed: Vec3, sample: Vec3) -> Vec3 {
            self.reset(seed);
            self.filter(sample)
        }
    }
}
