//! Error-mode policy for lossy conversions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How an assignment treats values the destination cannot hold exactly.
///
/// Modes are ordered from least to most strict, except [`Default`] which
/// stands for whatever the engine is configured to use.
///
/// [`Default`]: AssignErrorMode::Default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignErrorMode {
    /// Wrap, truncate or saturate without checking.
    NoCheck,
    /// Reject values outside the destination range.
    Overflow,
    /// Overflow checks plus rejecting dropped fractional parts.
    Fractional,
    /// Reject any loss of information.
    Inexact,
    /// Placeholder resolved to the configured default before kernels are built.
    Default,
}

impl AssignErrorMode {
    /// The four modes kernels are actually built with.
    pub const CONCRETE: [AssignErrorMode; 4] = [
        AssignErrorMode::NoCheck,
        AssignErrorMode::Overflow,
        AssignErrorMode::Fractional,
        AssignErrorMode::Inexact,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            AssignErrorMode::NoCheck => "nocheck",
            AssignErrorMode::Overflow => "overflow",
            AssignErrorMode::Fractional => "fractional",
            AssignErrorMode::Inexact => "inexact",
            AssignErrorMode::Default => "default",
        }
    }

    /// Replaces [`AssignErrorMode::Default`] with `default`.
    pub fn or(self, default: AssignErrorMode) -> AssignErrorMode {
        match self {
            AssignErrorMode::Default => default,
            mode => mode,
        }
    }

    /// Whether string conversions should reject malformed data.
    pub fn is_checked(self) -> bool {
        self != AssignErrorMode::NoCheck
    }
}

impl fmt::Display for AssignErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AssignErrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "nocheck" | "none" => AssignErrorMode::NoCheck,
            "overflow" => AssignErrorMode::Overflow,
            "fractional" => AssignErrorMode::Fractional,
            "inexact" => AssignErrorMode::Inexact,
            "default" => AssignErrorMode::Default,
            other => return Err(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for mode in AssignErrorMode::CONCRETE {
            assert_eq!(mode.name().parse::<AssignErrorMode>(), Ok(mode));
        }
        assert_eq!("strict".parse::<AssignErrorMode>(), Err("strict".to_string()));
    }

    #[test]
    fn default_is_replaced() {
        assert_eq!(
            AssignErrorMode::Default.or(AssignErrorMode::Fractional),
            AssignErrorMode::Fractional
        );
        assert_eq!(
            AssignErrorMode::Overflow.or(AssignErrorMode::Fractional),
            AssignErrorMode::Overflow
        );
    }
}
