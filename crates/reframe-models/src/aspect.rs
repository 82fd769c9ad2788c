//! Target aspect ratio and output resolution definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Aspect ratio for output video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Standard portrait (9:16) for TikTok/Reels
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    /// Instagram portrait (4:5)
    pub const INSTAGRAM_PORTRAIT: AspectRatio = AspectRatio {
        width: 4,
        height: 5,
    };

    /// Landscape (16:9)
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    ///
    /// `None` when either component is zero.
    pub fn as_f64(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f64 / self.height as f64)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = parse_pair(s, ':')?;
        Ok(AspectRatio { width, height })
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

/// Exact output pixel resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TargetResolution {
    pub width: u32,
    pub height: u32,
}

impl TargetResolution {
    /// 1080x1920 vertical output.
    pub const VERTICAL_1080: TargetResolution = TargetResolution {
        width: 1080,
        height: 1920,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Aspect ratio of this resolution, reduced to lowest terms.
    pub fn aspect_ratio(&self) -> AspectRatio {
        let divisor = gcd(self.width, self.height).max(1);
        AspectRatio::new(self.width / divisor, self.height / divisor)
    }
}

impl fmt::Display for TargetResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for TargetResolution {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = parse_pair(s, 'x')?;
        Ok(TargetResolution { width, height })
    }
}

impl Default for TargetResolution {
    fn default() -> Self {
        Self::VERTICAL_1080
    }
}

fn parse_pair(s: &str, separator: char) -> Result<(u32, u32), AspectRatioParseError> {
    let parts: Vec<&str> = s.trim().split(separator).collect();
    if parts.len() != 2 {
        return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
    }

    let width = parts[0]
        .trim()
        .parse()
        .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
    let height = parts[1]
        .trim()
        .parse()
        .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

    if width == 0 || height == 0 {
        return Err(AspectRatioParseError::ZeroValue);
    }

    Ok((width, height))
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid format: {0}, expected 'W:H' or 'WxH'")]
    InvalidFormat(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Dimensions cannot have zero values")]
    ZeroValue,
}
