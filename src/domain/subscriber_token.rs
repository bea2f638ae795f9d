use std::fmt;
use uuid::Uuid;

/// Opaque credential embedded in confirmation, unsubscribe and management
/// links. 128 bits of randomness; rotated on confirmation so a confirmation
/// link is single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberToken(Uuid);

impl SubscriberToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| format!("{s} is not a valid subscription token."))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SubscriberToken {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubscriberToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
