use anyhow::{anyhow, Context, Result};
use bcrypt::Version;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Hashes `plaintext` with bcrypt, emitting the `$2a$` prefix the
/// application's JavaScript verifier produces and expects.
pub fn hash(plaintext: &str, cost: u32) -> Result<String> {
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(anyhow!(
            "bcrypt cost must be between {} and {}, got {}",
            MIN_COST,
            MAX_COST,
            cost
        ));
    }
    let parts = bcrypt::hash_with_result(plaintext, cost).context("Failed to hash password")?;
    Ok(parts.format_for_version(Version::TwoA))
}

pub fn verify(plaintext: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(plaintext, hash).context("Stored password is not a bcrypt hash")
}
