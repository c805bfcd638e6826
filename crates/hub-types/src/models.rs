use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_AVATAR_URL: &str = "https://placehold.co/150x150/6366f1/ffffff?text=U";
pub const DEFAULT_COMMUNITY_IMAGE: &str =
    "https://placehold.co/400x200/6366f1/ffffff?text=Community";

/// What a community collects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coins,
    Cards,
    Vehicles,
    Stamps,
    Toys,
    Art,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Cards => "cards",
            Self::Vehicles => "vehicles",
            Self::Stamps => "stamps",
            Self::Toys => "toys",
            Self::Art => "art",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coins" => Ok(Self::Coins),
            "cards" => Ok(Self::Cards),
            "vehicles" => Ok(Self::Vehicles),
            "stamps" => Ok(Self::Stamps),
            "toys" => Ok(Self::Toys),
            "art" => Ok(Self::Art),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// Public view of a user embedded in posts, communities and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
}
