use serde::{de::Visitor, Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::validate_email;

/// A validated subscriber email, trimmed and lower-cased on parse so the
/// uniqueness constraint on the subscribers table is case-insensitive.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SubscriberEmail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SubscriberEmailVisitor;

        impl<'de> Visitor<'de> for SubscriberEmailVisitor {
            type Value = SubscriberEmail;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a valid subscriber email string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match SubscriberEmail::parse(value.to_string()) {
                    Ok(email) => Ok(email),
                    Err(err) => Err(E::custom(err)),
                }
            }
        }

        deserializer.deserialize_str(SubscriberEmailVisitor)
    }
}

impl SubscriberEmail {
    pub fn parse(s: String) -> Result<Self, String> {
        let normalized = s.trim().to_lowercase();
        if validate_email(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(format!("{s} is not a valid subscriber email."))
        }
    }
}
