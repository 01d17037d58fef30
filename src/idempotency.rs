//! Idempotency key derivation and validation.
//!
//! A key names one logical sync intent. Machine-derived keys have the shape
//! `sync-{owner}-{YYYY-MM-DD}-{source}-{8-hex-digest}` where the digest
//! covers the normalized entity-type set, so the same owner, source, and
//! entity types always produce the same key on a given calendar day.
//! Caller-supplied keys may instead use a looser custom shape. Pure
//! functions, no I/O.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;
use crate::models::sync_job::{EntityTypeSet, SyncSource};

/// Upper bound on key length, enforced for derived and supplied keys alike.
pub const MAX_KEY_LENGTH: usize = 255;

/// Separator joining entity-type names before hashing. Fixed so that the
/// digest is stable across releases.
const ENTITY_TYPE_SEPARATOR: &str = ",";

fn generated_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^sync-[\w-]+-\d{4}-\d{2}-\d{2}-[\w-]+-[0-9a-f]{8}$")
            .expect("generated key pattern is valid")
    })
}

fn custom_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // The bounded `{8,255}` repetition over Unicode `\w` unrolls past the
        // default 10 MiB compile-size limit, so raise the ceiling. The matched
        // set of keys is unchanged.
        RegexBuilder::new(r"^[\w-]{8,255}$")
            .size_limit(64 * 1024 * 1024)
            .build()
            .expect("custom key pattern is valid")
    })
}

/// Derives the deterministic key for one logical sync intent on `date`.
///
/// `entity_types` must already be normalized; [`EntityTypeSet::normalized`]
/// guarantees sorted order, which makes the digest order-insensitive.
pub fn derive_key(
    owner_id: &str,
    source: SyncSource,
    entity_types: &EntityTypeSet,
    date: NaiveDate,
) -> String {
    let joined = entity_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(ENTITY_TYPE_SEPARATOR);
    let digest = hex::encode(Sha256::digest(joined.as_bytes()));

    format!(
        "sync-{}-{}-{}-{}",
        owner_id,
        date.format("%Y-%m-%d"),
        source.as_str(),
        &digest[..8]
    )
}

/// Appends a millisecond timestamp to a key whose original form has been
/// consumed by a finished job, yielding a fresh unique key for the rerun.
pub fn with_timestamp_suffix(key: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", key, now.timestamp_millis())
}

/// Whether `key` matches the generated or the custom key shape.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && (generated_key_pattern().is_match(key) || custom_key_pattern().is_match(key))
}

/// Validates a caller-supplied key, surfacing the reason on rejection.
pub fn validate_key(key: &str) -> Result<(), LedgerError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.len() > MAX_KEY_LENGTH {
        "key is longer than 255 characters"
    } else if !generated_key_pattern().is_match(key) && !custom_key_pattern().is_match(key) {
        "key matches neither the generated nor the custom key format"
    } else {
        return Ok(());
    };

    Err(LedgerError::InvalidIdempotencyKey {
        key: key.to_string(),
        reason,
    })
}
