//! MySQL authentication plugins.
//!
//! # mysql_native_password
//!
//! ```text
//! SHA1(password) XOR SHA1(seed + SHA1(SHA1(password)))
//! ```
//!
//! # caching_sha2_password
//!
//! Fast auth (password hash cached on the server):
//! ```text
//! XOR(SHA256(password), SHA256(SHA256(SHA256(password)) + seed))
//! ```
//!
//! Full auth sends the password in clear over a Unix socket, otherwise
//! RSA-encrypted with the server's public key.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use rand::rngs::OsRng;

use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;

use crate::error::{LastError, client};

/// Well-known authentication plugin names.
pub mod plugins {
    pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
    pub const SHA256_PASSWORD: &str = "sha256_password";
    pub const MYSQL_CLEAR_PASSWORD: &str = "mysql_clear_password";
}

/// Status bytes of the caching_sha2_password exchange.
pub mod caching_sha2 {
    /// Client asks for the server's RSA public key
    pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// sha256_password asks for the server's public key with this byte.
pub const SHA256_REQUEST_PUBLIC_KEY: u8 = 0x01;

/// Compute the first auth response for `plugin`.
///
/// Unknown plugins fail with `CR_AUTH_PLUGIN_CANNOT_LOAD`.
pub fn scramble(plugin: &str, password: &str, seed: &[u8]) -> Result<Vec<u8>, LastError> {
    match plugin {
        plugins::MYSQL_NATIVE_PASSWORD => Ok(mysql_native_password(password, seed)),
        plugins::CACHING_SHA2_PASSWORD => Ok(caching_sha2_password(password, seed)),
        plugins::SHA256_PASSWORD if password.is_empty() => Ok(vec![0]),
        plugins::SHA256_PASSWORD => Ok(vec![SHA256_REQUEST_PUBLIC_KEY]),
        plugins::MYSQL_CLEAR_PASSWORD => Ok(clear_password(password)),
        other => Err(LastError::client(
            client::CR_AUTH_PLUGIN_CANNOT_LOAD,
            format!("Authentication plugin '{other}' cannot be loaded"),
        )),
    }
}

/// Whether [`scramble`] knows `plugin`.
pub fn is_supported(plugin: &str) -> bool {
    matches!(
        plugin,
        plugins::MYSQL_NATIVE_PASSWORD
            | plugins::CACHING_SHA2_PASSWORD
            | plugins::SHA256_PASSWORD
            | plugins::MYSQL_CLEAR_PASSWORD
    )
}

/// Compute the mysql_native_password response; empty for an empty password.
pub fn mysql_native_password(password: &str, auth_data: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![];
    }

    let seed = &auth_data[..auth_data.len().min(20)];

    let stage1: [u8; 20] = Sha1::digest(password.as_bytes()).into();
    let stage2: [u8; 20] = Sha1::digest(stage1).into();

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let stage3: [u8; 20] = hasher.finalize().into();

    stage1
        .iter()
        .zip(stage3.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// Compute the caching_sha2_password fast-auth response; empty for an
/// empty password.
pub fn caching_sha2_password(password: &str, auth_data: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![];
    }

    let seed = strip_seed(auth_data);

    let password_hash: [u8; 32] = Sha256::digest(password.as_bytes()).into();
    let password_hash_hash: [u8; 32] = Sha256::digest(password_hash).into();

    let mut hasher = Sha256::new();
    hasher.update(password_hash_hash);
    hasher.update(seed);
    let scramble: [u8; 32] = hasher.finalize().into();

    password_hash
        .iter()
        .zip(scramble.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// Password followed by a NUL terminator.
pub fn clear_password(password: &str) -> Vec<u8> {
    let mut out = password.as_bytes().to_vec();
    out.push(0);
    out
}

/// Encrypt the NUL-terminated password, XORed with the seed, using the
/// server's PEM public key and OAEP padding.
pub fn sha256_password_rsa(
    password: &str,
    seed: &[u8],
    public_key_pem: &[u8],
) -> Result<Vec<u8>, LastError> {
    let seed = strip_seed(seed);
    if seed.is_empty() {
        return Err(auth_failure("authentication seed is empty"));
    }

    let mut pw = clear_password(password);
    for (i, b) in pw.iter_mut().enumerate() {
        *b ^= seed[i % seed.len()];
    }

    let pem = std::str::from_utf8(public_key_pem)
        .map_err(|e| auth_failure(format!("public key is not valid PEM: {e}")))?;

    let pub_key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| auth_failure(format!("failed to parse RSA public key: {e}")))?;

    pub_key
        .encrypt(&mut OsRng, rsa::Oaep::new::<Sha1>(), &pw)
        .map_err(|e| auth_failure(format!("RSA encryption failed: {e}")))
}

/// Servers send the 20-byte scramble followed by a NUL.
fn strip_seed(auth_data: &[u8]) -> &[u8] {
    if auth_data.len() == 21 && auth_data.last() == Some(&0) {
        &auth_data[..20]
    } else {
        auth_data
    }
}

fn auth_failure(message: impl Into<String>) -> LastError {
    LastError::client(client::CR_AUTH_PLUGIN_CANNOT_LOAD, message)
}
