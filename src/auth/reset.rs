use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::Duration;

/// How long a reset token stays usable. Not configurable.
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(10);

/// A freshly minted reset token. `plain` goes to the user over mail exactly
/// once; only `hash` may touch the database.
pub struct ResetToken {
    pub plain: String,
    pub hash: String,
}

pub fn generate_token() -> ResetToken {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let plain = hex::encode(bytes);
    let hash = hash_token(&plain);
    ResetToken { plain, hash }
}

/// SHA-256 hex digest of the plain token, the only form ever stored.
pub fn hash_token(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}
