//! Proportional mass removal from substance batches.

use crate::{Spill, SubstanceBatch};

/// Remove `amount` kg uniformly from every element of `batch`.
///
/// The removed fraction is capped at 1, so a batch never goes negative.
/// Returns the mass actually removed. No-op for an empty batch or a
/// non-positive amount.
pub fn remove_mass(batch: &mut SubstanceBatch, amount: f64) -> f64 {
    let total = batch.total_mass();
    if total <= 0.0 || amount <= 0.0 {
        return 0.0;
    }
    let fraction = (amount / total).min(1.0);
    let keep = 1.0 - fraction;
    for components in &mut batch.mass_components {
        for component in components.iter_mut() {
            *component *= keep;
        }
    }
    for (mass, components) in batch.mass.iter_mut().zip(&batch.mass_components) {
        *mass = components.iter().sum();
    }
    total - batch.total_mass()
}

/// Remove `amount` kg from the whole spill, split across batches by their
/// share of the total mass. Returns the mass actually removed.
pub fn remove_from_spill(spill: &mut Spill, amount: f64) -> f64 {
    let total = spill.total_mass();
    if total <= 0.0 || amount <= 0.0 {
        return 0.0;
    }
    let amount = amount.min(total);
    spill
        .batches
        .iter_mut()
        .filter(|batch| !batch.is_empty())
        .map(|batch| {
            let share = amount * batch.total_mass() / total;
            remove_mass(batch, share)
        })
        .sum()
}
