// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FlatscanError, Result};

/// Pixel interpolation used when sampling the source image during the warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarpInterpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

/// Settings shared by the rectifier, tasks, and the task queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Inset (in source pixels) of the default quadrilateral used when
    /// detection ran but found nothing.
    pub default_margin: f64,
    /// Sampling filter for the perspective warp.
    pub interpolation: WarpInterpolation,
    /// RGBA colour written where the warp samples outside the source image.
    pub fill_color: [u8; 4],
    /// Largest output image (width * height) rendered at full resolution.
    /// Bigger warps fall back to a uniformly downscaled render.
    pub max_output_pixels: u64,
    /// How many rectifications a `RectificationQueue` runs at once.
    pub max_concurrent_tasks: usize,
    /// Optional host-side timeout applied by queue tickets.
    pub task_timeout_ms: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_margin: 75.0,
            interpolation: WarpInterpolation::Bilinear,
            fill_color: [255, 255, 255, 255],
            max_output_pixels: 64_000_000,
            max_concurrent_tasks: 2,
            task_timeout_ms: None,
        }
    }
}

impl ScanConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the rectifier or queue cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !self.default_margin.is_finite() || self.default_margin < 0.0 {
            return Err(FlatscanError::Config(format!(
                "default_margin must be a non-negative number, got {}",
                self.default_margin
            )));
        }
        if self.max_output_pixels == 0 {
            return Err(FlatscanError::Config(
                "max_output_pixels must be greater than zero".into(),
            ));
        }
        if self.max_concurrent_tasks == 0 {
            return Err(FlatscanError::Config(
                "max_concurrent_tasks must be greater than zero".into(),
            ));
        }
        if self.task_timeout_ms == Some(0) {
            return Err(FlatscanError::Config(
                "task_timeout_ms must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }

    /// The configured host-side timeout, if any.
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interpolation, WarpInterpolation::Bilinear);
        assert!(config.task_timeout().is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{ "default_margin": 20.0, "interpolation": "nearest" }"#;
        let config = ScanConfig::from_json(json).expect("valid config");
        assert_eq!(config.default_margin, 20.0);
        assert_eq!(config.interpolation, WarpInterpolation::Nearest);
        assert_eq!(config.max_concurrent_tasks, 2);
    }

    #[test]
    fn json_round_trip_keeps_timeout() {
        let config = ScanConfig {
            task_timeout_ms: Some(1500),
            ..ScanConfig::default()
        };
        let json = config.to_json().expect("serialize");
        let parsed = ScanConfig::from_json(&json).expect("parse");
        assert_eq!(parsed.task_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = ScanConfig::from_json(r#"{ "max_concurrent_tasks": 0 }"#).unwrap_err();
        assert!(matches!(err, FlatscanError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = ScanConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, FlatscanError::Serialization(_)));
    }

    #[test]
    fn negative_margin_is_rejected() {
        let config = ScanConfig {
            default_margin: -1.0,
            ..ScanConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
