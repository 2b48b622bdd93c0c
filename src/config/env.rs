//! Process-wide security settings sourced from the environment.
//!
//! Read once at startup and shared read-only through an `Arc`.

use std::fmt;

pub const ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";
pub const PUBLIC_API_KEY: &str = "PUBLIC_API_KEY";
pub const INTERNAL_API_SECRET: &str = "INTERNAL_API_SECRET";
pub const APP_ENV: &str = "APP_ENV";
pub const PUBLIC_BASE_URL: &str = "PUBLIC_BASE_URL";

const DEFAULT_DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

/// Deployment mode.
///
/// Anything other than `production` or `development` is `Other`, which gets
/// neither HSTS nor the development leniency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    Development,
    #[default]
    Other,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Environment::Production,
            "development" => Environment::Development,
            _ => Environment::Other,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Secrets and allow-lists consulted by the gates.
#[derive(Clone, Default)]
pub struct SecuritySettings {
    pub allowed_origins: Vec<String>,
    pub public_api_key: Option<String>,
    pub internal_secret: Option<String>,
    pub environment: Environment,
    pub base_url: Option<String>,
}

// Secrets stay out of logs.
impl fmt::Debug for SecuritySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecuritySettings")
            .field("allowed_origins", &self.allowed_origins)
            .field("public_api_key", &self.public_api_key.as_ref().map(|_| "<set>"))
            .field("internal_secret", &self.internal_secret.as_ref().map(|_| "<set>"))
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SecuritySettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = get(PUBLIC_BASE_URL).map(|v| v.trim().to_string());

        // Browsers send origins without a trailing slash.
        let allowed_origins = match get(ALLOWED_ORIGINS) {
            Some(list) => list
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/'))
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_DEV_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .chain(
                    base_url
                        .as_deref()
                        .map(|base| base.trim_end_matches('/').to_string())
                        .filter(|base| !base.is_empty()),
                )
                .collect(),
        };

        Self {
            allowed_origins,
            public_api_key: get(PUBLIC_API_KEY),
            internal_secret: get(INTERNAL_API_SECRET),
            environment: get(APP_ENV)
                .map(|v| Environment::parse(&v))
                .unwrap_or_default(),
            base_url,
        }
    }

    /// Where callers are told to obtain an API key.
    pub fn api_key_hint(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| format!("Get your API key at {}/api-keys", base.trim_end_matches('/')))
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}
