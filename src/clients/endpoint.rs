use crate::{
    clients::auth::AuthScheme,
    error::{truncate_body, MemeError, Result},
    models::UpstreamService,
    schema,
};
use chrono::Utc;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Url,
};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A successful (2xx) upstream reply whose body parsed as JSON.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Value,
}

/// One configured upstream service: where it lives, how to authenticate,
/// and how long to wait. The inner `reqwest::Client` keeps its own
/// connection pool.
#[derive(Clone)]
pub struct UpstreamEndpoint {
    service: UpstreamService,
    url: Option<Url>,
    auth: AuthScheme,
    timeout: Duration,
    http: Client,
}

impl UpstreamEndpoint {
    pub fn new(
        service: UpstreamService,
        api_url: Option<&str>,
        auth: AuthScheme,
        timeout: Duration,
    ) -> Result<Self> {
        let url = api_url
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|e| {
                    MemeError::Config(format!(
                        "{} `{}` is not a valid URL: {}",
                        service.url_variable(),
                        raw,
                        e
                    ))
                })
            })
            .transpose()?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MemeError::Config(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            service,
            url,
            auth,
            timeout,
            http,
        })
    }

    /// Single attempt: POST `payload` as JSON and return the parsed body.
    pub async fn post_json<T: Serialize + ?Sized>(&self, payload: &T) -> Result<UpstreamReply> {
        let url = self.url.as_ref().ok_or_else(|| {
            MemeError::unavailable(
                self.service,
                format!("{} is not configured", self.service.url_variable()),
            )
        })?;

        let body = serde_json::to_vec(payload).map_err(|e| {
            MemeError::Internal(format!("could not serialize {} request: {}", self.service, e))
        })?;

        let request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE);
        let request = self
            .auth
            .apply(request, url, JSON_CONTENT_TYPE, &body, Utc::now())?
            .body(body);

        log::info!("Calling {} service at {}", self.service, url);

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            log::error!(
                "{} service returned status {}: {}",
                self.service,
                status,
                truncate_body(&text)
            );
            return Err(MemeError::upstream(self.service, status.as_u16(), &text));
        }

        log::debug!("{} raw response: {}", self.service, truncate_body(&text));

        let body = schema::parse_json(text.as_bytes()).map_err(|violation| {
            log::error!("{} response is not JSON: {}", self.service, violation);
            MemeError::schema(self.service, violation)
        })?;

        Ok(UpstreamReply {
            status: status.as_u16(),
            body,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> MemeError {
        if e.is_builder() {
            return MemeError::Internal(format!("could not build {} request: {}", self.service, e));
        }

        let reason = if e.is_timeout() {
            format!("request timed out after {}ms", self.timeout.as_millis())
        } else if e.is_connect() {
            format!("could not connect: {}", e)
        } else {
            format!("transport error: {}", e)
        };

        log::error!("{} service unavailable: {}", self.service, reason);
        MemeError::unavailable(self.service, reason)
    }
}
