use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::config::HashConfig;
use crate::error::{AppError, AppResult};

/// Argon2id hasher configured with the service's cost parameters.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
    dummy: String,
}

const DUMMY_PASSWORD: &str = "userauth-no-such-user";

impl Argon2Hasher {
    pub fn new(cfg: &HashConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        let mut hasher = Self {
            params,
            dummy: String::new(),
        };
        hasher.dummy = hasher
            .hash(DUMMY_PASSWORD)
            .map_err(|e| anyhow::anyhow!("argon2 dummy hash: {e}"))?;
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash with a fresh random salt; the PHC output embeds salt and params.
    pub fn hash(&self, plain: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AppError::internal(e)
            })?
            .to_string();
        Ok(hash)
    }

    /// Constant-time check. A stored value that does not parse as a PHC
    /// string counts as a mismatch.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`Self::hash`] on the blocking pool.
    pub async fn hash_async(&self, plain: String) -> AppResult<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(AppError::internal)?
    }

    /// [`Self::verify`] on the blocking pool.
    pub async fn verify_async(&self, plain: String, hash: String) -> AppResult<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(AppError::internal)
    }

    /// Runs a full verify against a hash no account owns, so a login for an
    /// unknown user costs the same as a wrong password.
    pub async fn verify_dummy_async(&self, plain: String) -> AppResult<()> {
        self.verify_async(plain, self.dummy.clone()).await?;
        Ok(())
    }
}
