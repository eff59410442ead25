//! Newtype wrappers for domain identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

static FISCAL_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Z]{6}[0-9LMNPQRSTUV]{2}[ABCDEHLMPRST][0-9LMNPQRSTUV]{2}[A-Z][0-9LMNPQRSTUV]{3}[A-Z]$",
    )
    .expect("fiscal code pattern is valid")
});

/// Italian fiscal code identifying a citizen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalCode(String);

impl FiscalCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FiscalCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if FISCAL_CODE_RE.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidFiscalCode)
        }
    }
}

impl From<FiscalCode> for String {
    fn from(code: FiscalCode) -> Self {
        code.0
    }
}

impl FromStr for FiscalCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl fmt::Display for FiscalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! non_empty_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                if value.is_empty() {
                    Err(DomainError::Empty($field))
                } else {
                    Ok(Self(value))
                }
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::try_from(s.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

non_empty_id!(
    /// Identifies a message sent by a service to a citizen.
    MessageId,
    "message id"
);

non_empty_id!(
    /// Identifies the delivery of one message over its channels.
    NotificationId,
    "notification id"
);

non_empty_id!(
    /// Identifies the service that sent a message.
    ServiceId,
    "service id"
);
