//! Configuration management for gate thresholds and the feedback loop
//!
//! This module provides runtime configuration loading from JSON files, so
//! visibility thresholds, the transmission interval, and the backend address
//! can be tuned without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding [`FeedbackConfig::base_url`]
pub const BACKEND_URL_ENV: &str = "FORM_COACH_BACKEND_URL";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

/// Visibility thresholds for a single gate tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    /// A joint must have visibility strictly above this value
    pub confidence: f32,
    /// Largest normalized y accepted; rejects joints clipped at the frame bottom
    pub y_bound: f32,
}

/// Landmark gate configuration
///
/// The torso tier gates transmission, the limb tier gates angle trust.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub torso: GateThresholds,
    pub limb: GateThresholds,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            torso: GateThresholds {
                confidence: 0.5,
                y_bound: 1.0,
            },
            limb: GateThresholds {
                confidence: 0.6,
                y_bound: 1.0,
            },
        }
    }
}

/// Rate limits for outbound packets and announced cues
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum spacing between packets sent to the analysis service
    pub send_interval_ms: u64,
    /// Minimum spacing between two announced feedback cues
    pub cue_interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: 100,
            cue_interval_ms: 3000,
        }
    }
}

/// Remote analysis service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub base_url: String,
    pub realtime_path: String,
    pub analyze_path: String,
    /// Requests still pending after this long resolve to "no update"
    pub request_timeout_ms: u64,
    /// Separate, longer timeout for the end-of-session coaching request
    pub analyze_timeout_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            realtime_path: "/realtime-feedback".to_string(),
            analyze_path: "/analyze-workout".to_string(),
            request_timeout_ms: 2000,
            analyze_timeout_ms: 30_000,
        }
    }
}

impl FeedbackConfig {
    pub fn realtime_url(&self) -> String {
        join_url(&self.base_url, &self.realtime_path)
    }

    pub fn analyze_url(&self) -> String {
        join_url(&self.base_url, &self.analyze_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// the JSON is invalid. The backend URL environment override is applied
    /// in both cases.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    /// Load configuration from the default assets location
    pub fn load() -> Self {
        Self::load_from_file("assets/coach_config.json")
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                log::info!("[Config] Backend URL overridden by {}", BACKEND_URL_ENV);
                self.feedback.base_url = url;
            }
        }
        self
    }
}
