use rand::Rng;
use uuid::Uuid;

use crate::OperationId;

/// Generate a deterministic v4-format UUID from a seeded RNG.
pub fn generate_uuid(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// Id for an operation configured without one, e.g. `burn-<uuid>`.
pub fn generate_operation_id(prefix: &str, rng: &mut impl Rng) -> OperationId {
    OperationId(format!("{prefix}-{}", generate_uuid(rng)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn deterministic_uuid_from_same_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let id1 = generate_uuid(&mut rng1);
        let id2 = generate_uuid(&mut rng2);
        assert_eq!(id1, id2);
        assert_eq!(id1.get_version(), Some(uuid::Version::Random));
    }

    #[test]
    fn operation_id_carries_prefix() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let id = generate_operation_id("skim", &mut rng);
        assert!(id.0.starts_with("skim-"));
        assert_eq!(id.0.len(), "skim-".len() + 36);
    }

    #[test]
    fn different_seeds_produce_different_ids() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(99);
        assert_ne!(
            generate_operation_id("burn", &mut rng1),
            generate_operation_id("burn", &mut rng2)
        );
    }
}
