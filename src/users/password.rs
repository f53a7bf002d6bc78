use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// One-way hashing of login secrets.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;
    /// `Ok(true)` only when `plain` matches `hash`.
    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Reversible stand-in so tests don't pay for argon2.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHasher;

#[cfg(test)]
impl PasswordHasher for PlainHasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        Ok(format!("plain${plain}"))
    }

    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let stored = hash
            .strip_prefix("plain$")
            .ok_or_else(|| anyhow::anyhow!("not a plain hash"))?;
        Ok(stored == plain)
    }
}
