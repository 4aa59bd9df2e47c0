use hub_core::cap::{light::BRIGHTNESS_MAX, sensor::PowerReading};
use tracing::debug;

use crate::error::{DimmerError, Result};

/// Discrete position of the lamp: `0` is off, `1..=N` are the lit levels.
pub type Step = u32;

/// Converts between power draw, brightness and steps for one lamp.
///
/// The lamp is modelled as a cyclic device with a single action: each toggle
/// flips the power, and every off-to-on transition lands on the step after
/// the one that was lit last (wrapping from `N` back to `1`). A lamp that has
/// been off long enough forgets its position and comes back on at step 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StepMapper {
    thresholds: Vec<f64>,
}

impl StepMapper {
    /// `thresholds` are the power draws (in watts) of steps `1..=N`, in any
    /// order. They must be finite and positive, and there must be at least one.
    pub fn new(thresholds: impl IntoIterator<Item = f64>) -> Result<Self> {
        let mut thresholds: Vec<f64> = thresholds.into_iter().collect();
        if thresholds.is_empty() {
            return Err(DimmerError::config("brightness steps cannot be empty"));
        }
        if let Some(bad) = thresholds.iter().find(|t| !t.is_finite() || **t <= 0.0) {
            return Err(DimmerError::config(format!(
                "brightness steps must be positive, got {bad}"
            )));
        }
        thresholds.sort_by(f64::total_cmp);
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Number of lit steps (`N`).
    pub fn num_steps(&self) -> Step {
        self.thresholds.len() as Step
    }

    /// The step whose threshold is nearest to `power`. Ties go to the lower
    /// step; zero, negative and unknown readings mean off. An infinite
    /// reading lands on the top step; NaN means off.
    pub fn power_to_step(&self, power: PowerReading) -> Step {
        let Some(watts) = power.watts().filter(|w| *w > 0.0) else {
            return 0;
        };
        if watts.is_infinite() {
            return self.num_steps();
        }
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (idx, threshold) in self.thresholds.iter().enumerate() {
            let distance = (threshold - watts).abs();
            if distance < best_distance {
                best = idx;
                best_distance = distance;
            }
        }
        best as Step + 1
    }

    /// `round(brightness / 255 * N)` with `brightness` clamped to `0..=255`.
    ///
    /// Evaluated in integers: 255 is odd, so the quotient is never exactly
    /// halfway between two steps and the rounding mode does not matter.
    pub fn brightness_to_step(&self, brightness: i64) -> Step {
        let max = i64::from(BRIGHTNESS_MAX);
        let b = brightness.clamp(0, max);
        let n = i64::from(self.num_steps());
        ((2 * b * n + max) / (2 * max)) as Step
    }

    /// `floor(step / N * 255)`; steps past `N` are treated as `N`.
    pub fn step_to_brightness(&self, step: Step) -> u8 {
        if step == 0 {
            return 0;
        }
        let n = u64::from(self.num_steps());
        let step = u64::from(step).min(n);
        (step * u64::from(BRIGHTNESS_MAX) / n) as u8
    }

    /// Brightness shown for a power reading.
    pub fn power_to_brightness(&self, power: PowerReading) -> u8 {
        self.step_to_brightness(self.power_to_step(power))
    }

    /// Number of switch actions needed to go from `current` to `target`.
    /// Steps past `N` are treated as `N`.
    ///
    /// Leaving off costs `2 * target - 1` (on at step 1, then an off/on pair
    /// per step). Moving up between lit steps costs an off/on pair per step,
    /// moving down has to wrap past `N`. Turning off is always a single action.
    pub fn toggles_between(&self, current: Step, target: Step) -> u32 {
        let n = self.num_steps();
        let (current, target) = (current.min(n), target.min(n));
        if target == current {
            0
        } else if target == 0 {
            1
        } else if current == 0 {
            2 * target - 1
        } else if target > current {
            2 * (target - current)
        } else {
            2 * (n.saturating_sub(current) + target)
        }
    }

    /// Actions needed to bring a lamp drawing `power` to `brightness`.
    pub fn toggles_for_brightness(&self, power: PowerReading, brightness: i64) -> u32 {
        let current = self.power_to_step(power);
        let target = self.brightness_to_step(brightness);
        let toggles = self.toggles_between(current, target);
        debug!(current, target, toggles, "step transition");
        toggles
    }
}
