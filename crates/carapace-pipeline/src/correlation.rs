//! Coercing a client-supplied `correlation` string into a [`CorrelationId`].
//!
//! The wire grammar only requires `correlation` to be non-empty ;
//! internally we key everything (the confirmation gate, the
//! pre-approval set, audit rows) off the typed [`CorrelationId`], so a
//! syntactically valid UUID round-trips exactly and anything else is
//! mapped deterministically via UUID v5 onto the same namespace. The
//! same malformed string always yields the same id within a process.

use carapace_core::CorrelationId;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0x4c, 0x1e, 0x9a, 0x70, 0x9e, 0x41, 0x4a, 0x77, 0x9c, 0x6a, 0x1b, 0x2e, 0x5f, 0x3d, 0x88, 0x01,
]);

/// Coerce a non-empty wire `correlation` string into a [`CorrelationId`].
#[must_use]
pub fn coerce(raw: &str) -> CorrelationId {
    match raw.parse::<Uuid>() {
        Ok(uuid) => CorrelationId::from_uuid(uuid),
        Err(_) => CorrelationId::from_uuid(Uuid::new_v5(&NAMESPACE, raw.as_bytes())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_uuid_round_trips_exactly() {
        let uuid = Uuid::new_v4();
        assert_eq!(coerce(&uuid.to_string()), CorrelationId::from_uuid(uuid));
    }

    #[test]
    fn malformed_correlation_is_mapped_deterministically() {
        let a = coerce("client-token-42");
        let b = coerce("client-token-42");
        assert_eq!(a, b);
    }

    #[test]
    fn different_malformed_tokens_map_differently() {
        assert_ne!(coerce("token-a"), coerce("token-b"));
    }
}
