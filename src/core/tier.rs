//! Deployment tier routing

use std::fmt;

/// A deployment tier.
///
/// The three standard tiers have their own output matrices; every other
/// environment tag is routed into the shared custom bucket and keeps its
/// tag so downstream gating can depend on the tier it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tier {
    Dev,
    Int,
    Prod,
    Custom(String),
}

impl Tier {
    /// Map an environment tag to its tier
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "dev" => Tier::Dev,
            "int" => Tier::Int,
            "prod" => Tier::Prod,
            other => Tier::Custom(other.to_string()),
        }
    }

    /// Whether this is one of the three standard tiers
    pub fn is_standard(&self) -> bool {
        !matches!(self, Tier::Custom(_))
    }

    /// The environment tag this tier was built from
    pub fn tag(&self) -> &str {
        match self {
            Tier::Dev => "dev",
            Tier::Int => "int",
            Tier::Prod => "prod",
            Tier::Custom(name) => name,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
