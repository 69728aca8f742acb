//! Per-run namespace tokens and content-addressed identifiers.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Separator between the session token and a local identifier.
pub const TOKEN_DELIMITER: &str = "_";

/// Width of a session token in characters.
pub const TOKEN_WIDTH: usize = 32;

/// Supplies one token per extraction session.
pub trait TokenSource {
    fn next_token(&mut self) -> String;
}

/// Random 32-hex-character tokens (UUID v4, simple form).
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Always hands out the same token. Used where output must be reproducible.
#[derive(Debug, Clone)]
pub struct FixedToken(pub String);

impl TokenSource for FixedToken {
    fn next_token(&mut self) -> String {
        self.0.clone()
    }
}

/// The identifier namespace of one extraction session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    token: String,
}

impl Namespace {
    pub fn new(source: &mut dyn TokenSource) -> Self {
        Self::from_token(source.next_token())
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `token` + `_` + `local_id`
    pub fn qualify(&self, local_id: &str) -> String {
        format!("{}{}{}", self.token, TOKEN_DELIMITER, local_id)
    }

    /// Inverse of [`Namespace::qualify`]; `None` for ids from another session.
    pub fn strip<'a>(&self, qualified: &'a str) -> Option<&'a str> {
        qualified
            .strip_prefix(self.token.as_str())
            .and_then(|rest| rest.strip_prefix(TOKEN_DELIMITER))
    }
}

/// Stable id derived from an edge's content: first 16 hex chars of
/// SHA-256 over `source|edge_type|target`.
pub fn content_address(source: &str, edge_type: &str, target: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(edge_type.as_bytes());
    hasher.update(b"|");
    hasher.update(target.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
