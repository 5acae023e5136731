//! ID generation for networks and tasks.

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix for network ids.
pub const NETWORK_PREFIX: &str = "nw";

/// Prefix for task ids.
pub const TASK_PREFIX: &str = "tk";

/// Build an id as `<prefix>-<10 hex chars>`.
///
/// The hex part is the first five bytes of a SHA-256 over the seed, the
/// creation time and eight random bytes, so equal seeds still get distinct ids.
pub fn generate_id(prefix: &str, seed: &str, created_at: DateTime<Utc>) -> String {
    let nanos = created_at.timestamp_nanos_opt().unwrap_or_default();
    let salt: [u8; 8] = rand::rng().random();

    let digest = Sha256::new()
        .chain_update(seed.as_bytes())
        .chain_update(nanos.to_le_bytes())
        .chain_update(salt)
        .finalize();

    let hex: String = digest[..5].iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", prefix, hex)
}
