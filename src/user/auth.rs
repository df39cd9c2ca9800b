//! Password hashing and session token handling

use anyhow::{anyhow, bail, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Session tokens expire after this many days.
pub const SESSION_TOKEN_VALIDITY_DAYS: u64 = 7;

/// Length of the one-time email verification token.
pub const VERIFICATION_TOKEN_LEN: usize = 64;

/// A random A-z0-9 string
pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_verification_token() -> String {
    random_string(VERIFICATION_TOKEN_LEN)
}

mod mellow_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let argon2 = Argon2::default();
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string())
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let argon2 = Argon2::default();
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum PasswordHasher {
    Argon2,
    /// Fast test-only hasher - DO NOT use in production!
    /// Simply stores the password hex-encoded behind a marker prefix.
    #[cfg(feature = "test-fast-hasher")]
    TestFast,
}

impl Default for PasswordHasher {
    #[cfg(not(feature = "test-fast-hasher"))]
    fn default() -> Self {
        PasswordHasher::Argon2
    }

    #[cfg(feature = "test-fast-hasher")]
    fn default() -> Self {
        PasswordHasher::TestFast
    }
}

impl FromStr for PasswordHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "test_fast" => Ok(PasswordHasher::TestFast),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordHasher::Argon2 => write!(f, "argon2"),
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => write!(f, "test_fast"),
        }
    }
}

impl PasswordHasher {
    pub fn generate_b64_salt(&self) -> String {
        match self {
            PasswordHasher::Argon2 => mellow_argon2::generate_b64_salt(),
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => "test_salt".to_string(),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            PasswordHasher::Argon2 => mellow_argon2::hash(plain, b64_salt),
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => {
                let hex: String = plain.iter().map(|b| format!("{:02x}", b)).collect();
                Ok(format!("$testfast${}${}", b64_salt.as_ref(), hex))
            }
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T) -> Result<bool> {
        match self {
            PasswordHasher::Argon2 => {
                mellow_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => {
                let hash = target_hash.as_ref();
                if let Some(hex) = hash
                    .strip_prefix("$testfast$")
                    .and_then(|s| s.split('$').nth(1))
                {
                    let decoded: Vec<u8> = (0..hex.len())
                        .step_by(2)
                        .filter_map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
                        .collect();
                    Ok(decoded == plain_pw.as_ref().as_bytes())
                } else {
                    Ok(false)
                }
            }
        }
    }
}

/// Claims carried by a session token: the external user id and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
}

/// Issues and verifies signed session tokens (HS256).
#[derive(Clone)]
pub struct SessionTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionTokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, public_user_id: &str) -> Result<String> {
        self.issue_with_validity(
            public_user_id,
            Duration::from_secs(SESSION_TOKEN_VALIDITY_DAYS * 24 * 60 * 60),
        )
    }

    pub fn issue_with_validity(&self, public_user_id: &str, validity: Duration) -> Result<String> {
        let exp = (SystemTime::now() + validity)
            .duration_since(UNIX_EPOCH)?
            .as_secs() as usize;
        let claims = SessionClaims {
            sub: public_user_id.to_owned(),
            exp,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| anyhow!("Failed to sign session token: {}", err))
    }

    /// Checks signature and expiry. Returns the claims on success.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| anyhow!("Invalid session token: {}", err))
    }
}
