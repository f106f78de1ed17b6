use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of JWT: session access or email confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Confirmation,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Confirmation => "confirmation",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT payload. `sub` and `type` stay optional on the way in so that a
/// well-signed token lacking them is reported precisely instead of as a
/// parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>, // user email
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>, // "access" | "confirmation"
    #[serde(default)]
    pub iat: u64,
    pub exp: u64,
}
