//! Aspect ratios and model tiers offered to the user.
//!
//! Each option carries a human label for menus and the identifier that is
//! actually sent to the Gemini API.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aspect ratio used when nothing else was chosen.
pub const DEFAULT_ASPECT_RATIO: AspectRatio = AspectRatio::Square;

/// Model tier used when nothing else was chosen.
pub const DEFAULT_MODEL: ModelTier = ModelTier::Flash;

/// Width:height hint forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    /// All ratios, in menu order.
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Wide,
        AspectRatio::Tall,
    ];

    /// The ratio string the API expects.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Landscape => "4:3",
            Self::Wide => "16:9",
            Self::Tall => "9:16",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Square => "Square (1:1)",
            Self::Portrait => "Portrait (3:4)",
            Self::Landscape => "Landscape (4:3)",
            Self::Wide => "Wide (16:9)",
            Self::Tall => "Tall (9:16)",
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        DEFAULT_ASPECT_RATIO
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = AppError;

    /// Accepts either the ratio (`16:9`) or the name (`wide`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| {
                ratio.as_str() == needle || format!("{ratio:?}").eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|r| r.as_str()).collect();
                AppError::validation(format!(
                    "Unknown aspect ratio '{}'. Expected one of: {}",
                    needle,
                    known.join(", ")
                ))
            })
    }
}

/// Which Gemini image model to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTier {
    /// Fast and free.
    #[serde(rename = "gemini-2.5-flash-image")]
    Flash,
    /// Higher quality; needs a billing-enabled key.
    #[serde(rename = "gemini-3-pro-image-preview")]
    Pro,
}

impl ModelTier {
    /// All tiers, in menu order.
    pub const ALL: [ModelTier; 2] = [ModelTier::Flash, ModelTier::Pro];

    /// Model identifier used in the API path.
    pub fn api_id(self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.5-flash-image",
            Self::Pro => "gemini-3-pro-image-preview",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Flash => "Flash (Fast)",
            Self::Pro => "Pro (High Quality)",
        }
    }

    /// Short name used on the command line and in history listings.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Pro => "pro",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Flash => "Generates images quickly. Good for iterations.",
            Self::Pro => {
                "Higher detail and better adherence to prompts. Requires paid API key."
            }
        }
    }

    /// Whether the key-gate must pass before this tier is called.
    pub fn requires_paid_key(self) -> bool {
        matches!(self, Self::Pro)
    }
}

impl Default for ModelTier {
    fn default() -> Self {
        DEFAULT_MODEL
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModelTier {
    type Err = AppError;

    /// Accepts the short name (`pro`) or the full model id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().trim_start_matches("models/");
        Self::ALL
            .into_iter()
            .find(|tier| tier.short_name().eq_ignore_ascii_case(needle) || tier.api_id() == needle)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown model '{}'. Expected 'flash' or 'pro'",
                    needle
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_parses_ratio_and_name() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Wide);
        assert_eq!("tall".parse::<AspectRatio>().unwrap(), AspectRatio::Tall);
        assert_eq!(" Portrait ".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert!("2:1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn aspect_ratio_serializes_as_api_string() {
        let json = serde_json::to_string(&AspectRatio::Landscape).unwrap();
        assert_eq!(json, "\"4:3\"");
        for ratio in AspectRatio::ALL {
            let json = serde_json::to_value(ratio).unwrap();
            assert_eq!(json, ratio.as_str());
        }
    }

    #[test]
    fn model_tier_parses_short_name_and_id() {
        assert_eq!("pro".parse::<ModelTier>().unwrap(), ModelTier::Pro);
        assert_eq!("FLASH".parse::<ModelTier>().unwrap(), ModelTier::Flash);
        assert_eq!(
            "models/gemini-3-pro-image-preview".parse::<ModelTier>().unwrap(),
            ModelTier::Pro
        );
        assert!("ultra".parse::<ModelTier>().is_err());
    }

    #[test]
    fn only_pro_needs_a_paid_key() {
        assert!(ModelTier::Pro.requires_paid_key());
        assert!(!ModelTier::Flash.requires_paid_key());
        assert_eq!(ModelTier::default(), ModelTier::Flash);
        assert_eq!(AspectRatio::default(), AspectRatio::Square);
    }
}
