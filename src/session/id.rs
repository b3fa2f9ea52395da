use rand::RngCore;
use std::fmt::{Display, Formatter};

const ENTROPY_BYTES: usize = 21;

/// Opaque session identifier. Used both as the cookie value and the memcached key.
///
/// Formatted as `_` followed by 42 lowercase hex characters, which keeps it a valid XML NCName
/// and a valid memcached key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; ENTROPY_BYTES];
        rand::rng().fill_bytes(&mut bytes);

        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("_{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}
