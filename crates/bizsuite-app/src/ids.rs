// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

macro_rules! local_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

local_id!(RowId);
local_id!(NotificationId);

/// Backend-assigned identifier of a dropdown entity. Opaque to the client;
/// numeric ids from the wire are kept in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LookupId(String);

impl<'de> Deserialize<'de> for LookupId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

impl LookupId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for LookupId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for LookupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for LookupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::LookupId;

    #[test]
    fn numeric_and_text_ids_deserialize_alike() {
        let ids: Vec<LookupId> = serde_json::from_str(r#"["c1", 42]"#).expect("valid ids");
        assert_eq!(ids, vec![LookupId::new("c1"), LookupId::new("42")]);
        assert_eq!(
            serde_json::to_string(&ids).expect("serialize"),
            r#"["c1","42"]"#
        );
    }
}
