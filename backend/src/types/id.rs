//! Request identifier.
//!
//! Store IDs are UUIDs persisted as text. Inbound IDs may arrive wrapped in
//! foreign-system syntax, see [`RequestId::parse_lenient`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{Database, Decode, Encode, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Store-assigned identifier for an absence request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Uuid::parse_str(&s).map(Self).map_err(serde::de::Error::custom)
    }
}

// Stored as text, see the migration.
impl<'r, DB: Database> Decode<'r, DB> for RequestId
where
    String: Decode<'r, DB>,
{
    fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = String::decode(value)?;
        Uuid::parse_str(&s).map(Self).map_err(|e| e.into())
    }
}

impl<'q, DB: Database> Encode<'q, DB> for RequestId
where
    String: Encode<'q, DB>,
{
    fn encode_by_ref(
        &self,
        buf: &mut <DB as Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        self.0.to_string().encode_by_ref(buf)
    }
}

impl<DB: Database> Type<DB> for RequestId
where
    String: Type<DB>,
{
    fn type_info() -> <DB as Database>::TypeInfo {
        String::type_info()
    }

    fn compatible(ty: &<DB as Database>::TypeInfo) -> bool {
        String::compatible(ty)
    }
}

impl RequestId {
    /// Parses an ID that may still carry wrapper syntax from another system,
    /// e.g. `ObjectId("...")`, `"..."` or surrounding whitespace.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        unwrap_foreign_id(raw).parse().ok()
    }
}

/// Strips one or more layers of `Name(...)` call syntax and quote characters.
pub fn unwrap_foreign_id(raw: &str) -> &str {
    let mut current = raw.trim();
    loop {
        let before = current;
        if let Some(open) = current.find('(') {
            let callee = &current[..open];
            if current.ends_with(')')
                && !callee.is_empty()
                && callee.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                current = current[open + 1..current.len() - 1].trim();
            }
        }
        for quote in ['"', '\''] {
            if current.len() >= 2 && current.starts_with(quote) && current.ends_with(quote) {
                current = current[1..current.len() - 1].trim();
            }
        }
        if current == before {
            return current;
        }
    }
}
