use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Service plan, embedded as the first path segment of every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    Developer,
    Basic,
    Premium,
}

impl Subscription {
    pub const ALL: [Subscription; 3] = [Self::Developer, Self::Basic, Self::Premium];

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "developer" => Ok(Self::Developer),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            other => Err(Error::InvalidSubscriptionTier(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }
}

impl FromStr for Subscription {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
