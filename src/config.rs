use crate::{
    clients::auth::{AuthScheme, SigningCredentials},
    error::{MemeError, Result},
};
use std::env;
use std::time::Duration;

pub const DEFAULT_TEXT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TextGenerationConfig {
    pub api_url: Option<String>,
    pub auth: AuthScheme,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ImageGenerationConfig {
    pub api_url: Option<String>,
    pub auth: AuthScheme,
    pub timeout: Duration,
}

/// Everything read from the environment at startup. Built once and shared
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub text_generation: TextGenerationConfig,
    pub image_generation: ImageGenerationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MemeError::Config(format!("PORT `{}` is not a valid port", raw)))?,
            None => defaults.port,
        };
        let allowed_origins = lookup("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);

        Ok(ServerConfig {
            host,
            port,
            allowed_origins,
        })
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

impl Default for TextGenerationConfig {
    fn default() -> Self {
        TextGenerationConfig {
            api_url: None,
            auth: AuthScheme::None,
            timeout: DEFAULT_TEXT_TIMEOUT,
        }
    }
}

impl TextGenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(TextGenerationConfig {
            api_url: lookup("TEXT_GEN_API_URL"),
            auth: auth_from_lookup("TEXT_GEN", &lookup)?,
            timeout: timeout_from_lookup("TEXT_GEN_TIMEOUT_SECS", DEFAULT_TEXT_TIMEOUT, &lookup)?,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        ImageGenerationConfig {
            api_url: None,
            auth: AuthScheme::None,
            timeout: DEFAULT_IMAGE_TIMEOUT,
        }
    }
}

impl ImageGenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(ImageGenerationConfig {
            api_url: lookup("IMAGE_GEN_API_URL"),
            auth: auth_from_lookup("IMAGE_GEN", &lookup)?,
            timeout: timeout_from_lookup("IMAGE_GEN_TIMEOUT_SECS", DEFAULT_IMAGE_TIMEOUT, &lookup)?,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads every setting through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Config {
            server: ServerConfig::from_lookup(&lookup)?,
            text_generation: TextGenerationConfig::from_lookup(&lookup)?,
            image_generation: ImageGenerationConfig::from_lookup(&lookup)?,
        })
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    pub fn with_text_generation(mut self, config: TextGenerationConfig) -> Self {
        self.text_generation = config;
        self
    }

    pub fn with_image_generation(mut self, config: ImageGenerationConfig) -> Self {
        self.image_generation = config;
        self
    }

    /// Both upstream endpoints are known.
    pub fn is_ready(&self) -> bool {
        self.text_generation.api_url.is_some() && self.image_generation.api_url.is_some()
    }

    /// Non-fatal configuration problems worth reporting at startup and on the
    /// readiness probe.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.text_generation.api_url.is_none() {
            warnings.push("TEXT_GEN_API_URL is not configured".to_string());
        }
        if self.image_generation.api_url.is_none() {
            warnings.push("IMAGE_GEN_API_URL is not configured".to_string());
        }
        if self.image_generation.timeout < self.text_generation.timeout {
            warnings.push(format!(
                "image-generation timeout ({}s) is shorter than text-generation timeout ({}s)",
                self.image_generation.timeout.as_secs(),
                self.text_generation.timeout.as_secs()
            ));
        }
        warnings
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn timeout_from_lookup(
    key: &str,
    default: Duration,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Duration> {
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(MemeError::Config(format!(
                "{} must be a positive number of seconds, got `{}`",
                key, raw
            ))),
        },
        None => Ok(default),
    }
}

fn auth_from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<AuthScheme> {
    let auth_type = lookup(&format!("{}_AUTH_TYPE", prefix));
    let api_key = lookup(&format!("{}_API_KEY", prefix));

    let signing = match (lookup("AWS_ACCESS_KEY_ID"), lookup("AWS_SECRET_ACCESS_KEY")) {
        (Some(access_key), Some(secret_key)) => {
            let region = lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string());
            let service = lookup(&format!("{}_SIGNING_SERVICE", prefix))
                .unwrap_or_else(|| "execute-api".to_string());
            let credentials = SigningCredentials::new(access_key, secret_key, region, service);
            Some(match lookup("AWS_SESSION_TOKEN") {
                Some(token) => credentials.with_session_token(token),
                None => credentials,
            })
        }
        _ => None,
    };

    AuthScheme::parse(auth_type.as_deref(), api_key, signing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.allowed_origins, vec![DEFAULT_ALLOWED_ORIGIN]);
        assert_eq!(config.text_generation.timeout, Duration::from_secs(60));
        assert_eq!(config.image_generation.timeout, Duration::from_secs(120));
        assert_eq!(config.text_generation.auth, AuthScheme::None);
        assert!(!config.is_ready());
        assert_eq!(config.warnings().len(), 2);
    }

    #[test]
    fn test_full_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9090"),
            ("CORS_ORIGINS", "https://a.example.com, https://b.example.com,,"),
            ("TEXT_GEN_API_URL", "https://text.example.com/generate"),
            ("TEXT_GEN_AUTH_TYPE", "api_key"),
            ("TEXT_GEN_API_KEY", "abc"),
            ("TEXT_GEN_TIMEOUT_SECS", "30"),
            ("IMAGE_GEN_API_URL", "https://image.example.com/generate"),
            ("IMAGE_GEN_API_KEY", "xyz"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(config.text_generation.auth, AuthScheme::ApiKey("abc".into()));
        assert_eq!(config.text_generation.timeout, Duration::from_secs(30));
        assert_eq!(config.image_generation.auth, AuthScheme::Bearer("xyz".into()));
        assert!(config.is_ready());
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn test_signed_request_reads_aws_credentials() {
        let config = Config::from_lookup(lookup_from(&[
            ("TEXT_GEN_AUTH_TYPE", "signed_request"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_REGION", "eu-west-1"),
        ]))
        .unwrap();

        match config.text_generation.auth {
            AuthScheme::SignedRequest(credentials) => {
                assert_eq!(credentials.region, "eu-west-1");
                assert_eq!(credentials.service, "execute-api");
                assert!(credentials.session_token.is_none());
            }
            other => panic!("expected signed request, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(lookup_from(&[
            ("TEXT_GEN_API_URL", "   "),
            ("CORS_ORIGINS", ""),
        ]))
        .unwrap();
        assert!(config.text_generation.api_url.is_none());
        assert_eq!(config.server.allowed_origins, vec![DEFAULT_ALLOWED_ORIGIN]);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for pairs in [
            vec![("PORT", "eighty")],
            vec![("IMAGE_GEN_TIMEOUT_SECS", "0")],
            vec![("TEXT_GEN_AUTH_TYPE", "kerberos")],
            vec![("TEXT_GEN_AUTH_TYPE", "bearer")],
        ] {
            let result = Config::from_lookup(lookup_from(&pairs));
            assert!(matches!(result, Err(MemeError::Config(_))), "{:?}", pairs);
        }
    }

    #[test]
    fn test_short_image_timeout_warns() {
        let config = Config::new()
            .with_text_generation(TextGenerationConfig::new().with_url("http://t"))
            .with_image_generation(
                ImageGenerationConfig::new()
                    .with_url("http://i")
                    .with_timeout(Duration::from_secs(5)),
            );
        let warnings = config.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("shorter"));
    }
}
