//! Shared mass balance.
//!
//! Keys are either a removal category (`burned`, `boomed`, `skimmed`,
//! `chem_dispersed`) holding a cumulative oil mass in kg, or an operation id
//! holding that operation's own scalar or structured record. Operations only
//! ever add to the shared categories and only write their own id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{OperationId, PhysicalImplausibility};

pub const BURNED: &str = "burned";
pub const BOOMED: &str = "boomed";
pub const SKIMMED: &str = "skimmed";
pub const CHEM_DISPERSED: &str = "chem_dispersed";

/// Per-skimmer totals. Volumes in m³, area in m².
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkimRecord {
    pub fluid_collected: f64,
    pub emulsion_collected: f64,
    pub oil_collected: f64,
    pub water_collected: f64,
    pub water_decanted: f64,
    pub water_retained: f64,
    pub area_covered: f64,
    /// Onboard storage left at the end of the latest step.
    pub storage_remaining: f64,
}

/// Per-dispersant-platform totals. Volumes in m³, mass in kg, area in m².
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisperseRecord {
    pub dispersant_applied: f64,
    pub oil_treated: f64,
    pub area_covered: f64,
    /// Dispersant left on board at the end of the latest step.
    pub payload_remaining: f64,
    pub sorties_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    Mass(f64),
    Skim(SkimRecord),
    Disperse(DisperseRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MassBalance {
    entries: BTreeMap<String, LedgerEntry>,
    reports: BTreeMap<OperationId, Vec<PhysicalImplausibility>>,
}

impl MassBalance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a scalar key to zero, discarding any earlier total.
    pub fn reset_mass(&mut self, key: &str) {
        self.entries.insert(key.to_string(), LedgerEntry::Mass(0.0));
    }

    /// Set a key to the given entry, replacing whatever was there.
    pub fn reset_entry(&mut self, key: &str, entry: LedgerEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    /// Add `delta_kg` to a scalar key, creating it if absent.
    pub fn add_mass(&mut self, key: &str, delta_kg: f64) {
        match self
            .entries
            .entry(key.to_string())
            .or_insert(LedgerEntry::Mass(0.0))
        {
            LedgerEntry::Mass(total) => *total += delta_kg,
            LedgerEntry::Skim(_) | LedgerEntry::Disperse(_) => {
                tracing::error!(key, "mass added to a structured ledger entry; ignored");
            }
        }
    }

    /// Cumulative mass for a scalar key; zero if absent or structured.
    pub fn mass(&self, key: &str) -> f64 {
        match self.entries.get(key) {
            Some(LedgerEntry::Mass(total)) => *total,
            _ => 0.0,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    pub fn skim_record(&self, id: &OperationId) -> Option<&SkimRecord> {
        match self.entries.get(&id.0) {
            Some(LedgerEntry::Skim(record)) => Some(record),
            _ => None,
        }
    }

    /// The skimmer's record, if one was registered for `id`.
    pub fn skim_record_mut(&mut self, id: &OperationId) -> Option<&mut SkimRecord> {
        match self.entries.get_mut(&id.0) {
            Some(LedgerEntry::Skim(record)) => Some(record),
            _ => None,
        }
    }

    pub fn disperse_record(&self, id: &OperationId) -> Option<&DisperseRecord> {
        match self.entries.get(&id.0) {
            Some(LedgerEntry::Disperse(record)) => Some(record),
            _ => None,
        }
    }

    pub fn disperse_record_mut(&mut self, id: &OperationId) -> Option<&mut DisperseRecord> {
        match self.entries.get_mut(&id.0) {
            Some(LedgerEntry::Disperse(record)) => Some(record),
            _ => None,
        }
    }

    pub fn report(&mut self, id: &OperationId, advisory: PhysicalImplausibility) {
        self.reports.entry(id.clone()).or_default().push(advisory);
    }

    pub fn clear_reports(&mut self, id: &OperationId) {
        self.reports.remove(id);
    }

    pub fn reports(&self, id: &OperationId) -> &[PhysicalImplausibility] {
        self.reports.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Oil taken off the water by every mechanism, including oil still held
    /// in booms awaiting a burn.
    pub fn total_removed(&self) -> f64 {
        [BURNED, BOOMED, SKIMMED, CHEM_DISPERSED]
            .iter()
            .map(|key| self.mass(key))
            .sum()
    }
}
