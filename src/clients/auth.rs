use crate::error::{MemeError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{header::AUTHORIZATION, RequestBuilder, Url};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const API_KEY_HEADER: &str = "x-api-key";

/// Credentials for AWS Signature Version 4 request signing.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub service: String,
}

impl SigningCredentials {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
            region: region.into(),
            service: service.into(),
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

/// How an outbound call proves its identity to the upstream service.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    Bearer(String),
    ApiKey(String),
    SignedRequest(SigningCredentials),
}

impl fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::SignedRequest(credentials) => {
                f.debug_tuple("SignedRequest").field(credentials).finish()
            }
            other => f.write_str(other.kind()),
        }
    }
}

impl Default for AuthScheme {
    fn default() -> Self {
        AuthScheme::None
    }
}

impl AuthScheme {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthScheme::None => "none",
            AuthScheme::Bearer(_) => "bearer",
            AuthScheme::ApiKey(_) => "api_key",
            AuthScheme::SignedRequest(_) => "signed_request",
        }
    }

    /// Resolves a configured auth type name. With no explicit type, a present
    /// API key means bearer and no key means none.
    pub fn parse(
        auth_type: Option<&str>,
        api_key: Option<String>,
        signing: Option<SigningCredentials>,
    ) -> Result<Self> {
        let auth_type = match auth_type {
            Some(value) => value.trim().to_ascii_lowercase(),
            None if api_key.is_some() => "bearer".to_string(),
            None => "none".to_string(),
        };

        let require_key = |kind: &str| {
            api_key.clone().ok_or_else(|| {
                MemeError::Config(format!("auth type `{}` requires an API key", kind))
            })
        };

        match auth_type.as_str() {
            "none" => Ok(AuthScheme::None),
            "bearer" => Ok(AuthScheme::Bearer(require_key("bearer")?)),
            "api_key" | "api-key" | "apikey" => Ok(AuthScheme::ApiKey(require_key("api_key")?)),
            "signed_request" | "aws_signature" | "sigv4" => signing
                .map(AuthScheme::SignedRequest)
                .ok_or_else(|| {
                    MemeError::Config(
                        "auth type `signed_request` requires AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
                            .into(),
                    )
                }),
            other => Err(MemeError::Config(format!(
                "unknown auth type `{}` (expected bearer, api_key, signed_request or none)",
                other
            ))),
        }
    }

    /// Adds the credentials to an outgoing request. `body` and
    /// `content_type` must be exactly what will be sent.
    pub fn apply(
        &self,
        request: RequestBuilder,
        url: &Url,
        content_type: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<RequestBuilder> {
        let request = match self {
            AuthScheme::None => request,
            AuthScheme::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            AuthScheme::ApiKey(key) => request.header(API_KEY_HEADER, key),
            AuthScheme::SignedRequest(credentials) => {
                let signed = sign_request(credentials, "POST", url, content_type, body, now)?;
                let mut request = request
                    .header("x-amz-date", signed.amz_date)
                    .header("x-amz-content-sha256", signed.content_sha256)
                    .header(AUTHORIZATION, signed.authorization);
                if let Some(token) = signed.security_token {
                    request = request.header("x-amz-security-token", token);
                }
                request
            }
        };
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
    pub security_token: Option<String>,
}

pub fn sign_request(
    credentials: &SigningCredentials,
    method: &str,
    url: &Url,
    content_type: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<SignedHeaders> {
    let host = url
        .host_str()
        .ok_or_else(|| MemeError::Config(format!("cannot sign request to `{}`: no host", url)))?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let content_sha256 = hex::encode(Sha256::digest(body));

    let mut headers = vec![
        ("content-type", content_type.trim().to_string()),
        ("host", host),
        ("x-amz-content-sha256", content_sha256.clone()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        canonical_uri(url),
        canonical_query(url),
        canonical_headers,
        signed_headers,
        content_sha256
    );

    let scope = format!(
        "{}/{}/{}/aws4_request",
        date, credentials.region, credentials.service
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        SIGNING_ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(
        &credentials.secret_key,
        &date,
        &credentials.region,
        &credentials.service,
    )?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            SIGNING_ALGORITHM, credentials.access_key, scope, signed_headers, signature
        ),
        amz_date,
        content_sha256,
        security_token: credentials.session_token.clone(),
    })
}

pub fn signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| MemeError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (uri_encode(&key), uri_encode(&value)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
