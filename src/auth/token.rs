//! Bearer tokens of the form `booklab_<lookup>_<secret>`.
//!
//! The lookup half is stored in clear so a presented token can be found in
//! one indexed read. Only an argon2id hash of the whole token is persisted.

use std::fmt;
use std::str::FromStr;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::Token;

const TOKEN_PREFIX: &str = "booklab_";
const LOOKUP_BYTES: usize = 4;
const SECRET_BYTES: usize = 12;
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// A token as presented by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    lookup: String,
    secret: String,
}

impl RawToken {
    fn mint() -> Self {
        Self {
            lookup: random_hex(LOOKUP_BYTES),
            secret: random_hex(SECRET_BYTES),
        }
    }

    #[must_use]
    pub fn lookup(&self) -> &str {
        &self.lookup
    }
}

impl fmt::Display for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TOKEN_PREFIX}{}_{}", self.lookup, self.secret)
    }
}

impl FromStr for RawToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (lookup, secret) = s
            .strip_prefix(TOKEN_PREFIX)
            .and_then(|rest| rest.split_once('_'))
            .ok_or(Error::InvalidTokenFormat)?;

        if !is_hex(lookup, LOOKUP_BYTES * 2) || !is_hex(secret, SECRET_BYTES * 2) {
            return Err(Error::InvalidTokenFormat);
        }

        Ok(Self {
            lookup: lookup.to_string(),
            secret: secret.to_string(),
        })
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    hex::encode(bytes)
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Who a new token acts for.
#[derive(Debug, Clone, Copy)]
pub enum TokenHolder<'a> {
    /// The server operator. Admin tokens reach only the admin API.
    Admin,
    /// A user account, by id.
    User(&'a str),
}

/// A stored token together with its raw value, which is never persisted.
pub struct IssuedToken {
    pub token: Token,
    pub raw: String,
}

/// Mints, hashes and checks tokens.
#[derive(Default)]
pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a token for `holder` and stores its hash. A lookup that
    /// collides with an existing token is re-minted.
    pub fn issue(
        &self,
        store: &dyn Store,
        holder: TokenHolder<'_>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<IssuedToken> {
        let (is_admin, user_id) = match holder {
            TokenHolder::Admin => (true, None),
            TokenHolder::User(id) => (false, Some(id.to_string())),
        };

        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let raw = RawToken::mint();
            let token = Token {
                id: Uuid::new_v4().to_string(),
                token_hash: self.hash(&raw)?,
                token_lookup: raw.lookup.clone(),
                is_admin,
                user_id: user_id.clone(),
                created_at: Utc::now(),
                expires_at,
                last_used_at: None,
            };

            match store.create_token(&token) {
                Ok(()) => {
                    return Ok(IssuedToken {
                        token,
                        raw: raw.to_string(),
                    });
                }
                Err(Error::TokenLookupCollision) => {
                    tracing::warn!(lookup = %raw.lookup, "token lookup collision, re-minting");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::TokenLookupCollision)
    }

    fn hash(&self, raw: &RawToken) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw.to_string().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))
    }

    /// Whether `raw` is the token `stored` was issued for.
    pub fn verify(&self, raw: &RawToken, stored: &Token) -> Result<bool> {
        if raw.lookup != stored.token_lookup {
            return Ok(false);
        }

        let hash = PasswordHash::new(&stored.token_hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(raw.to_string().as_bytes(), &hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify token: {e}"))),
        }
    }
}
