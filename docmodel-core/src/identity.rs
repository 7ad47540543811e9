//! Record identifiers and timestamps.
//!
//! Identifiers are opaque strings: random UUIDs unless the caller supplies its own key.
//! No ordering is implied by an identifier's value.
//!
//! Timestamps come from the wall clock at millisecond granularity and never go backwards
//! within one process. Nothing orders timestamps issued by different processes or
//! machines, so `created` must not be used as a total order across writers without an
//! extra tie-breaker.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Point in time stored in `created` / `updated` and in timestamp fields.
pub type Timestamp = bson::DateTime;

/// Longest accepted document key, in bytes.
pub const MAX_ID_LEN: usize = 1500;

static LAST_MILLIS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Generates a new, globally unique document key.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Checks that a caller-supplied key can be used as a document key.
pub fn validate_id(id: &str) -> ModelResult<()> {
    if id.is_empty() {
        return Err(ModelError::Validation("document id must not be empty".to_string()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(ModelError::Validation(format!(
            "document id is {} bytes, the limit is {MAX_ID_LEN}",
            id.len()
        )));
    }
    if id.contains('/') {
        return Err(ModelError::Validation(format!("document id '{id}' must not contain '/'")));
    }
    if id == "." || id == ".." {
        return Err(ModelError::Validation(format!("document id '{id}' is reserved")));
    }

    Ok(())
}

/// Returns the current time, never earlier than any value previously returned
/// in this process.
pub fn now() -> Timestamp {
    let wall = Utc::now().timestamp_millis();
    let previous = LAST_MILLIS.fetch_max(wall, Ordering::AcqRel);

    Timestamp::from_millis(wall.max(previous))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_are_unique() {
        let ids = (0..1000).map(|_| new_id()).collect::<HashSet<_>>();

        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| validate_id(id).is_ok()));
    }

    #[test]
    fn rejects_unusable_ids() {
        assert!(validate_id("").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id(".").is_err());
        assert!(validate_id("..").is_err());
        assert!(validate_id(&"x".repeat(MAX_ID_LEN + 1)).is_err());
        assert!(validate_id("100800604002").is_ok());
    }

    #[test]
    fn clock_never_goes_backwards() {
        let mut last = now();

        for _ in 0..10_000 {
            let next = now();
            assert!(next >= last);
            last = next;
        }
    }
}
