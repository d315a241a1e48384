use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookedConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
}

fn default_preferences_path() -> String {
    "hooked-preferences.yaml".to_string()
}

impl Default for HookedConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scanner: ScannerConfig::default(),
            remote: RemoteConfig::default(),
            speech: SpeechConfig::default(),
            preferences_path: default_preferences_path(),
        }
    }
}

impl HookedConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: HookedConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to the defaults when the file is missing.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "Configuration file '{}' not found, using default configuration",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let thresholds = &self.scanner.thresholds;
        if thresholds.suspicious > thresholds.phishing {
            anyhow::bail!(
                "suspicious threshold ({}) must not exceed phishing threshold ({})",
                thresholds.suspicious,
                thresholds.phishing
            );
        }
        if thresholds.phishing > 100 {
            anyhow::bail!("phishing threshold must be within 0..=100");
        }
        if self.remote.excerpt_chars == 0 {
            anyhow::bail!("remote.excerpt_chars must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Keyword lists, brand tables and scoring weights used by the local
/// heuristic layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub urgency_keywords: Vec<String>,
    pub financial_keywords: Vec<String>,
    pub known_brands: Vec<String>,
    /// Trusted domains whose login pages are not penalized (suffix match).
    pub major_domains: Vec<String>,
    #[serde(default = "default_brand_distance")]
    pub max_brand_distance: usize,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub thresholds: VerdictThresholds,
}

fn default_brand_distance() -> usize {
    2
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            urgency_keywords: strings(&[
                "urgent",
                "immediately",
                "act now",
                "limited time",
                "expires today",
                "verify now",
                "confirm now",
                "account suspended",
                "account locked",
                "unauthorized access",
                "suspicious activity",
                "security alert",
                "immediate action required",
                "respond immediately",
                "your account will be",
                "failure to verify",
                "click here now",
            ]),
            financial_keywords: strings(&[
                "password",
                "credit card",
                "social security",
                "bank account",
                "verify your account",
                "update your information",
                "billing information",
                "payment required",
                "invoice attached",
                "claim your prize",
                "you have won",
                "congratulations",
                "ssn",
                "cvv",
                "pin number",
                "login credentials",
                "sign in to verify",
            ]),
            known_brands: strings(&[
                "amazon.com",
                "paypal.com",
                "apple.com",
                "google.com",
                "microsoft.com",
                "bankofamerica.com",
            ]),
            major_domains: strings(&[
                "google.com",
                "gmail.com",
                "youtube.com",
                "facebook.com",
                "twitter.com",
                "x.com",
                "instagram.com",
                "linkedin.com",
                "github.com",
                "microsoft.com",
                "apple.com",
                "amazon.com",
                "paypal.com",
                "reddit.com",
                "wikipedia.org",
            ]),
            max_brand_distance: default_brand_distance(),
            scoring: ScoringWeights::default(),
            thresholds: VerdictThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub urgency_per_hit: u32,
    pub urgency_cap: u32,
    pub financial_per_hit: u32,
    pub financial_cap: u32,
    pub link_mismatch_per_hit: u32,
    pub link_mismatch_cap: u32,
    pub password_form: u32,
    pub brand_impersonation: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            urgency_per_hit: 10,
            urgency_cap: 30,
            financial_per_hit: 15,
            financial_cap: 30,
            link_mismatch_per_hit: 20,
            link_mismatch_cap: 40,
            password_form: 25,
            brand_impersonation: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictThresholds {
    pub suspicious: u32,
    pub phishing: u32,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            suspicious: 30,
            phishing: 70,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMode {
    /// Ask the generative model.
    Gemini,
    /// Answer with a canned assessment, no network access.
    Sample,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub mode: RemoteMode,
    pub model: String,
    pub api_base: String,
    /// Environment variable holding the model API key.
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub excerpt_chars: usize,
    /// Backend URL used by the relay when scanning over HTTP.
    pub endpoint: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            mode: RemoteMode::Gemini,
            model: "gemini-3-flash-preview".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_seconds: 20,
            excerpt_chars: 2000,
            endpoint: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub api_base: String,
    pub voice_id: String,
    pub model_id: String,
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.elevenlabs.io/v1".to_string(),
            voice_id: "AeRdCCKzvd23BpJoofzx".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            api_key_env: "ELEVENLABS_API_KEY".to_string(),
            timeout_seconds: 20,
        }
    }
}

/// Read an API key from the environment; empty values count as missing.
pub fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
