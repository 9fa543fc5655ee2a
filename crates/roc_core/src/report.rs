//! Implausibility advisories raised while an operation steps.

use std::mem::{discriminant, Discriminant};

use crate::{MassBalance, OperationId, PhysicalImplausibility};

/// Collects advisories between ledger flushes.
///
/// Each kind is logged and reported once per run; the same condition
/// re-detected on later steps stays quiet.
#[derive(Debug, Clone, Default)]
pub(crate) struct Advisories {
    raised: Vec<Discriminant<PhysicalImplausibility>>,
    pending: Vec<PhysicalImplausibility>,
}

impl Advisories {
    pub(crate) fn reset(&mut self) {
        self.raised.clear();
        self.pending.clear();
    }

    pub(crate) fn raise(&mut self, operation: &OperationId, advisory: PhysicalImplausibility) {
        let kind = discriminant(&advisory);
        if self.raised.contains(&kind) {
            return;
        }
        tracing::warn!(%operation, "{advisory}");
        self.raised.push(kind);
        self.pending.push(advisory);
    }

    pub(crate) fn flush(&mut self, operation: &OperationId, ledger: &mut MassBalance) {
        for advisory in self.pending.drain(..) {
            ledger.report(operation, advisory);
        }
    }
}
