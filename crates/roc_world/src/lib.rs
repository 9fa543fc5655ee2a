//! Platform catalog and scenario loading shared by roc_cli and the tests.

use anyhow::{bail, ensure, Context, Result};
use chrono::NaiveDateTime;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roc_core::{
    OperationConfig, PlatformCatalog, ResponseOperation, Spill, Substance, SubstanceBatch,
    Weatherer,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

fn default_time_step() -> f64 {
    900.0
}

fn default_components() -> Vec<f64> {
    vec![1.0]
}

/// Initial slick, described in aggregate and laid out by [`build_spill`].
#[derive(Debug, Clone, Deserialize)]
pub struct SpillSpec {
    pub elements: usize,
    pub total_mass_kg: f64,
    /// Mass fraction of each pseudo-component; normalized when laid out.
    #[serde(default = "default_components")]
    pub components: Vec<f64>,
    /// Total slick area, m².
    pub area_m2: f64,
    #[serde(default)]
    pub frac_water: f64,
    /// Per-element mass varies by up to ± this fraction.
    #[serde(default)]
    pub mass_jitter: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub start_time: NaiveDateTime,
    #[serde(default = "default_time_step")]
    pub time_step_s: f64,
    pub steps: u64,
    #[serde(default)]
    pub seed: Option<u64>,
    pub substance: Substance,
    pub spill: SpillSpec,
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
}

/// Checks a platform catalog for authoring errors: empty or repeated names.
pub fn validate_catalog(catalog: &PlatformCatalog) -> Result<()> {
    let mut names = HashSet::new();
    for platform in catalog.iter() {
        ensure!(!platform.name.trim().is_empty(), "platform with empty name");
        ensure!(
            names.insert(platform.name.as_str()),
            "platform '{}' is defined more than once",
            platform.name
        );
    }
    Ok(())
}

/// Checks the scenario's run parameters and initial slick.
pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    ensure!(!scenario.name.trim().is_empty(), "scenario name is empty");
    ensure!(
        scenario.time_step_s > 0.0,
        "scenario '{}': time_step_s must be positive, got {}",
        scenario.name,
        scenario.time_step_s
    );
    ensure!(scenario.steps > 0, "scenario '{}': steps must be positive", scenario.name);
    ensure!(
        scenario.substance.density_kg_per_m3 > 0.0,
        "scenario '{}': substance density must be positive",
        scenario.name
    );

    let spill = &scenario.spill;
    ensure!(spill.total_mass_kg >= 0.0, "spill total_mass_kg is negative");
    ensure!(spill.area_m2 >= 0.0, "spill area_m2 is negative");
    ensure!(
        (0.0..=1.0).contains(&spill.frac_water),
        "spill frac_water {} is outside [0, 1]",
        spill.frac_water
    );
    ensure!(
        (0.0..1.0).contains(&spill.mass_jitter),
        "spill mass_jitter {} is outside [0, 1)",
        spill.mass_jitter
    );
    ensure!(!spill.components.is_empty(), "spill has no components");
    ensure!(
        spill.components.iter().all(|f| *f >= 0.0),
        "spill component fractions must be non-negative"
    );
    ensure!(
        spill.components.iter().sum::<f64>() > 0.0,
        "spill component fractions sum to zero"
    );
    Ok(())
}

pub fn load_catalog(content_dir: &str) -> Result<PlatformCatalog> {
    let path = Path::new(content_dir).join("platforms.json");
    let catalog: PlatformCatalog = serde_json::from_str(
        &std::fs::read_to_string(&path).context("reading platforms.json")?,
    )
    .context("parsing platforms.json")?;
    let catalog = catalog.with_kinds();
    validate_catalog(&catalog)?;
    Ok(catalog)
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

/// Seed precedence: explicit override, then the scenario's seed, then random.
/// Returns the seed actually used with the RNG built from it.
pub fn scenario_rng(scenario: &Scenario, seed_override: Option<u64>) -> (u64, ChaCha8Rng) {
    let seed = seed_override
        .or(scenario.seed)
        .unwrap_or_else(rand::random);
    (seed, ChaCha8Rng::seed_from_u64(seed))
}

/// Lay out the scenario's slick as one batch of elements.
///
/// Every element gets an equal share of the area. Masses are jittered and then
/// rescaled so the batch carries exactly `total_mass_kg`.
pub fn build_spill(scenario: &Scenario, rng: &mut impl Rng) -> Spill {
    let layout = &scenario.spill;
    if layout.elements == 0 {
        return Spill::default();
    }
    let count = layout.elements as f64;

    let weights: Vec<f64> = (0..layout.elements)
        .map(|_| {
            if layout.mass_jitter > 0.0 {
                1.0 + rng.gen_range(-layout.mass_jitter..=layout.mass_jitter)
            } else {
                1.0
            }
        })
        .collect();
    let weight_sum: f64 = weights.iter().sum();
    let mass: Vec<f64> = weights
        .iter()
        .map(|w| layout.total_mass_kg * w / weight_sum)
        .collect();

    let component_sum: f64 = layout.components.iter().sum();
    let mass_components = mass
        .iter()
        .map(|m| {
            layout.components
                .iter()
                .map(|fraction| m * fraction / component_sum)
                .collect()
        })
        .collect();

    Spill {
        batches: vec![SubstanceBatch {
            substance: scenario.substance.clone(),
            mass,
            mass_components,
            area: vec![layout.area_m2 / count; layout.elements],
            frac_water: vec![layout.frac_water; layout.elements],
        }],
    }
}

/// Construct every configured operation. Ids must be unique across the run.
pub fn build_operations(
    scenario: &Scenario,
    catalog: &PlatformCatalog,
    rng: &mut impl Rng,
) -> Result<Vec<ResponseOperation>> {
    let mut operations = Vec::with_capacity(scenario.operations.len());
    let mut ids = HashSet::new();
    for (index, cfg) in scenario.operations.iter().enumerate() {
        let operation = cfg
            .build(catalog, rng)
            .with_context(|| format!("building operation #{index} of '{}'", scenario.name))?;
        if !ids.insert(operation.id().clone()) {
            bail!(
                "scenario '{}': operation id '{}' is used more than once",
                scenario.name,
                operation.id()
            );
        }
        operations.push(operation);
    }
    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roc_core::test_fixtures::{
        burn_config, make_rng, skim_config, start_time, test_catalog, test_substance, test_vessel,
    };
    use roc_core::OperationId;
    use std::io::Write;

    fn minimal_scenario() -> Scenario {
        Scenario {
            name: "test".to_string(),
            start_time: start_time(),
            time_step_s: 900.0,
            steps: 4,
            seed: Some(42),
            substance: test_substance(),
            spill: SpillSpec {
                elements: 10,
                total_mass_kg: 1000.0,
                components: vec![0.25, 0.75],
                area_m2: 5000.0,
                frac_water: 0.1,
                mass_jitter: 0.2,
            },
            operations: vec![],
        }
    }

    #[test]
    fn spill_layout_preserves_total_mass() {
        let spill = build_spill(&minimal_scenario(), &mut make_rng());
        assert_eq!(spill.element_count(), 10);
        assert!((spill.total_mass() - 1000.0).abs() < 1e-9);

        let batch = &spill.batches[0];
        for (mass, components) in batch.mass.iter().zip(&batch.mass_components) {
            assert!(*mass > 0.0);
            assert!((components.iter().sum::<f64>() - mass).abs() < 1e-9);
            assert!((components[1] - 3.0 * components[0]).abs() < 1e-9);
        }
        assert!(batch.area.iter().all(|a| (a - 500.0).abs() < 1e-12));
    }

    #[test]
    fn jitter_is_deterministic_per_seed() {
        let scenario = minimal_scenario();
        let a = build_spill(&scenario, &mut make_rng());
        let b = build_spill(&scenario, &mut make_rng());
        assert_eq!(a, b);
        let masses = &a.batches[0].mass;
        assert!(masses.iter().any(|m| (m - 100.0).abs() > 1e-6));
    }

    #[test]
    fn zero_elements_make_an_empty_spill() {
        let mut scenario = minimal_scenario();
        scenario.spill.elements = 0;
        assert_eq!(build_spill(&scenario, &mut make_rng()), Spill::default());
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut scenario = minimal_scenario();
        scenario.time_step_s = 0.0;
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.to_string().contains("time_step_s"));
    }

    #[test]
    fn water_fraction_above_one_is_rejected() {
        let mut scenario = minimal_scenario();
        scenario.spill.frac_water = 1.5;
        assert!(validate_scenario(&scenario).is_err());
    }

    #[test]
    fn duplicate_operation_ids_are_rejected() {
        let mut scenario = minimal_scenario();
        let mut first = burn_config();
        first.id = Some(OperationId("crew_a".to_string()));
        let mut second = skim_config();
        second.id = Some(OperationId("crew_a".to_string()));
        scenario.operations = vec![OperationConfig::Burn(first), OperationConfig::Skim(second)];

        let err = build_operations(&scenario, &test_catalog(), &mut make_rng()).unwrap_err();
        assert!(err.to_string().contains("used more than once"));
    }

    #[test]
    fn operation_errors_name_the_operation() {
        let mut scenario = minimal_scenario();
        let mut cfg = burn_config();
        cfg.throughput = 2.0;
        scenario.operations = vec![OperationConfig::Burn(cfg)];

        let err = build_operations(&scenario, &test_catalog(), &mut make_rng()).unwrap_err();
        assert!(err.to_string().contains("operation #0"));
    }

    #[test]
    fn duplicate_platform_names_are_rejected() {
        let mut catalog = test_catalog();
        catalog.vessel.push(test_vessel());
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn seed_override_wins() {
        let scenario = minimal_scenario();
        assert_eq!(scenario_rng(&scenario, Some(7)).0, 7);
        assert_eq!(scenario_rng(&scenario, None).0, 42);
    }

    #[test]
    fn catalog_loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "vessel": [test_vessel()],
            "aircraft": [],
        });
        let mut file = std::fs::File::create(dir.path().join("platforms.json")).unwrap();
        write!(file, "{json}").unwrap();

        let catalog = load_catalog(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(catalog.vessel.len(), 1);
        assert!(catalog.get("Test Vessel").is_some());
    }

    #[test]
    fn scenario_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        let json = serde_json::json!({
            "name": "defaults",
            "start_time": "2026-06-01T00:00:00",
            "steps": 8,
            "substance": { "name": "crude", "density_kg_per_m3": 880.0 },
            "spill": { "elements": 5, "total_mass_kg": 500.0, "area_m2": 100.0 },
            "operations": [
                { "type": "skim", "speed": 0.75, "storage": 500.0, "swath_width": 40.0,
                  "throughput": 0.75, "nameplate_pump": 400.0, "recovery_efficiency": 0.8,
                  "decant": 0.5, "decant_pump": 100.0, "transit_time": 3600.0 }
            ]
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let scenario = load_scenario(&path).unwrap();
        assert!((scenario.time_step_s - 900.0).abs() < 1e-12);
        assert!(scenario.seed.is_none());
        assert_eq!(scenario.spill.components, vec![1.0]);
        assert_eq!(scenario.operations.len(), 1);
    }

    #[test]
    fn missing_scenario_file_reports_path() {
        let err = load_scenario(Path::new("/nonexistent/scenario.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/scenario.json"));
    }
}
