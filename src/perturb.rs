//! Seeded perturbation of a profile and task table for robustness sweeps.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::demand::TaskRow;
use crate::profile::{HOURS, HourlyProfile};

/// Supply values are rounded to this many energy units (0.1 MW over one hour).
const SUPPLY_ROUNDING: f64 = 100.0;

/// One perturbed copy of the input data.
#[derive(Debug, Clone)]
pub struct Variant {
    /// 1-based variant number.
    pub index: usize,
    pub profile: HourlyProfile,
    pub tasks: Vec<TaskRow>,
}

/// Generates perturbed variants of a reference day.
///
/// Per variant: traditional prices share one scale factor in `[0.8, 1.2)`;
/// every non-zero supply hour moves by up to ±10% or ±20% (coin flip);
/// all task counts share one scale factor in `[0.85, 1.15)` and are rounded
/// to whole tasks. Green prices are left unchanged.
///
/// # Examples
///
/// ```
/// use energy_sched::dataset::{reference_profile, reference_tasks};
/// use energy_sched::perturb::RobustnessGenerator;
///
/// let mut generator = RobustnessGenerator::new(7);
/// let variants = generator.generate(&reference_profile(), &reference_tasks(), 3);
/// assert_eq!(variants.len(), 3);
/// ```
#[derive(Debug)]
pub struct RobustnessGenerator {
    rng: StdRng,
}

impl RobustnessGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produces `count` variants.
    pub fn generate(
        &mut self,
        profile: &HourlyProfile,
        tasks: &[TaskRow],
        count: usize,
    ) -> Vec<Variant> {
        (1..=count)
            .map(|index| Variant {
                index,
                profile: self.perturb_profile(profile),
                tasks: self.perturb_tasks(tasks),
            })
            .collect()
    }

    fn perturb_profile(&mut self, profile: &HourlyProfile) -> HourlyProfile {
        let scale = self.rng.random_range(0.8..1.2);
        let trad = profile.trad_prices().map(|p| round_to(p * scale, 0.01));

        let mut supply = [0.0; HOURS];
        for (h, slot) in supply.iter_mut().enumerate() {
            let value = profile.green_supply(h);
            if value == 0.0 {
                continue;
            }
            let spread = if self.rng.random_bool(0.5) { 0.1 } else { 0.2 };
            let factor = 1.0 + self.rng.random_range(-spread..spread);
            *slot = round_to((value * factor).max(0.0), SUPPLY_ROUNDING);
        }

        // Inputs come from a valid profile and stay finite and >= 0.
        HourlyProfile::new(trad, *profile.green_prices(), supply)
            .unwrap_or_else(|_| profile.clone())
    }

    fn perturb_tasks(&mut self, tasks: &[TaskRow]) -> Vec<TaskRow> {
        let scale = self.rng.random_range(0.85..1.15);
        let scaled = |count: f64| (count * scale).round().max(0.0);
        tasks
            .iter()
            .map(|row| TaskRow {
                time_range: row.time_range.clone(),
                high: scaled(row.high),
                mid: scaled(row.mid),
                low: scaled(row.low),
            })
            .collect()
    }
}

fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{reference_profile, reference_tasks};

    #[test]
    fn same_seed_same_variants() {
        let profile = reference_profile();
        let tasks = reference_tasks();
        let a = RobustnessGenerator::new(42).generate(&profile, &tasks, 4);
        let b = RobustnessGenerator::new(42).generate(&profile, &tasks, 4);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.profile, y.profile);
            assert_eq!(x.tasks, y.tasks);
        }
    }

    #[test]
    fn trad_prices_stay_within_scale_band() {
        let profile = reference_profile();
        let variants = RobustnessGenerator::new(1).generate(&profile, &reference_tasks(), 10);
        for v in &variants {
            for h in 0..HOURS {
                let ratio = v.profile.trad_price(h) / profile.trad_price(h);
                assert!((0.78..=1.22).contains(&ratio), "ratio {ratio} at hour {h}");
            }
        }
    }

    #[test]
    fn zero_supply_hours_stay_zero() {
        let profile = reference_profile();
        let variants = RobustnessGenerator::new(3).generate(&profile, &reference_tasks(), 5);
        for v in &variants {
            assert_eq!(v.profile.green_supply(0), 0.0);
            assert_eq!(v.profile.green_supply(23), 0.0);
            assert!(v.profile.green_supply(12) > 0.0);
        }
    }

    #[test]
    fn task_counts_are_whole_and_non_negative() {
        let variants =
            RobustnessGenerator::new(9).generate(&reference_profile(), &reference_tasks(), 5);
        for v in &variants {
            for row in &v.tasks {
                for c in [row.high, row.mid, row.low] {
                    assert!(c >= 0.0);
                    assert_eq!(c.fract(), 0.0);
                }
            }
        }
    }

    #[test]
    fn green_prices_unchanged() {
        let profile = reference_profile();
        let variants = RobustnessGenerator::new(5).generate(&profile, &reference_tasks(), 2);
        assert_eq!(variants[0].profile.green_prices(), profile.green_prices());
        assert_eq!(variants[1].index, 2);
    }
}
