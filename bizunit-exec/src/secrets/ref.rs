use std::fmt;

/// A `scheme://id` pointer to a secret held outside the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretRef {
    pub scheme: String,
    pub id: String,
}

impl SecretRef {
    pub fn parse(input: &str) -> Result<Self, SecretRefParseError> {
        let s = input.trim();
        let (scheme, id) = s
            .split_once("://")
            .ok_or(SecretRefParseError::MissingScheme)?;
        if scheme.is_empty() {
            return Err(SecretRefParseError::EmptyScheme);
        }
        if !is_valid_scheme(scheme) {
            return Err(SecretRefParseError::InvalidScheme(scheme.to_string()));
        }
        if id.is_empty() {
            return Err(SecretRefParseError::EmptyId);
        }
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            id: id.to_string(),
        })
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.id)
    }
}

// ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_valid_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SecretRefParseError {
    #[error("secret reference must look like scheme://id")]
    MissingScheme,
    #[error("secret reference scheme must not be empty")]
    EmptyScheme,
    #[error("invalid secret reference scheme: {0}")]
    InvalidScheme(String),
    #[error("secret reference id must not be empty")]
    EmptyId,
}
