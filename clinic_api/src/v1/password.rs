use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

pub struct PasswordHash {
    pub salt: [u8; SALT_LENGTH],
    pub hash: [u8; HASH_LENGTH],
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut hash);
    hash
}

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    PasswordHash {
        salt,
        hash: derive(password, &salt, PBKDF2_ITERATIONS),
    }
}

pub fn verify_password(password: &str, salt: &[u8], expected: &[u8]) -> bool {
    verify_with(password, salt, expected, PBKDF2_ITERATIONS)
}

fn verify_with(password: &str, salt: &[u8], expected: &[u8], iterations: u32) -> bool {
    let actual = derive(password, salt, iterations);
    actual.as_slice().ct_eq(expected).into()
}
