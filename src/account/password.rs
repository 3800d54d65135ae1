//! Password hashing factory.
//!
//! Every stored password goes through [`Hasher::hash`]. Hashes are Argon2id PHC
//! strings with a random salt; verification reads the cost parameters from the
//! stored hash, so changing the configured costs does not invalidate old rows.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
pub const DEFAULT_ITERATIONS: u32 = Params::DEFAULT_T_COST;

#[derive(Clone, Debug)]
pub struct Hasher {
    argon: Argon2<'static>,
}

impl Hasher {
    /// Build a hasher with explicit Argon2id memory (KiB) and iteration costs.
    ///
    /// # Errors
    /// Returns an error if the parameters are outside Argon2's accepted range.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, argon2::Error> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into its stored form.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    pub fn hash(&self, password: &SecretString) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon
            .hash_password(password.expose_secret().as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// Malformed hashes never verify.
    #[must_use]
    pub fn verify(&self, password: &SecretString, hash: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|parsed| {
            self.argon
                .verify_password(password.expose_secret().as_bytes(), &parsed)
                .is_ok()
        })
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            argon: Argon2::default(),
        }
    }
}
