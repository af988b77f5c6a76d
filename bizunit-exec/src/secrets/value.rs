use std::sync::Arc;

use zeroize::Zeroizing;

use super::SecretError;

/// Secret bytes that never print and are zeroized on drop.
#[derive(Clone)]
pub struct SecretValue(Arc<Zeroizing<Vec<u8>>>);

impl SecretValue {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Arc::new(Zeroizing::new(bytes)))
    }

    pub fn from_string(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }

    pub fn expose_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Trailing newlines (common in mounted secret files) are not part of the value.
    pub fn expose_str(&self) -> Result<&str, SecretError> {
        std::str::from_utf8(self.expose_bytes())
            .map(|s| s.trim_end_matches(['\n', '\r']))
            .map_err(|_| SecretError::NotUtf8)
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}
