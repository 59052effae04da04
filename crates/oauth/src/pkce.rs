use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::{TryRngCore, rngs::OsRng},
    sha2::{Digest, Sha256},
};

use crate::{
    error::{Error, Result},
    types::PkceChallenge,
};

const VERIFIER_BYTES: usize = 32;

/// Fill `len` bytes from the OS CSPRNG and base64url-encode them without
/// padding. There is no fallback to a weaker generator.
pub(crate) fn random_urlsafe(len: usize) -> Result<String> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Randomness(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// Random code verifier: 32 bytes, 43 URL-safe characters.
pub fn generate_verifier() -> Result<String> {
    random_urlsafe(VERIFIER_BYTES)
}

/// S256 code challenge: base64url(SHA-256(verifier)), no padding.
pub fn derive_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

impl PkceChallenge {
    pub fn generate() -> Result<Self> {
        let verifier = generate_verifier()?;
        let challenge = derive_challenge(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }
}
