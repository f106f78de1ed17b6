use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::AppConfig;

/// The only error shape the email and image providers surface.
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct ApiResponseError {
    pub status: Option<StatusCode>,
    pub cause: String,
}

impl ApiResponseError {
    fn status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            cause: format!("API request failed with status code {}", status.as_u16()),
        }
    }

    fn parsing(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            cause: "API response parsing failed".into(),
        }
    }

    fn transport(err: &reqwest::Error) -> Self {
        Self {
            status: None,
            cause: format!("API request failed: {err}"),
        }
    }
}

pub enum ProviderAuth<'a> {
    Basic { user: &'a str, password: &'a str },
    Header { name: &'a str, value: &'a str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedImage {
    pub output_url: String,
}

/// Outbound client for the email and image-generation providers.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    mail_url: String,
    mail_key: String,
    mail_sender: String,
    image_url: String,
    image_key: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            mail_url: format!(
                "{}/{}/messages",
                config.mail.api_base.trim_end_matches('/'),
                config.mail.domain
            ),
            mail_key: config.mail.api_key.clone(),
            mail_sender: config.mail.sender.clone(),
            image_url: config.image.endpoint.clone(),
            image_key: config.image.api_key.clone(),
        })
    }

    /// One-shot form POST; any non-2xx status becomes an [`ApiResponseError`].
    pub async fn post(
        &self,
        url: &str,
        auth: ProviderAuth<'_>,
        form: &[(&str, &str)],
    ) -> Result<Response, ApiResponseError> {
        let req = self.http.post(url).form(form);
        let req = match auth {
            ProviderAuth::Basic { user, password } => req.basic_auth(user, Some(password)),
            ProviderAuth::Header { name, value } => req.header(name, value),
        };

        let res = req.send().await.map_err(|e| {
            error!(error = %e, url, "outbound request failed");
            ApiResponseError::transport(&e)
        })?;

        let status = res.status();
        if !status.is_success() {
            error!(%status, url, "outbound request rejected");
            return Err(ApiResponseError::status(status));
        }
        debug!(%status, url, "outbound request ok");
        Ok(res)
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ApiResponseError> {
        self.post(
            &self.mail_url,
            ProviderAuth::Basic {
                user: "api",
                password: &self.mail_key,
            },
            &[
                ("from", self.mail_sender.as_str()),
                ("to", to),
                ("subject", subject),
                ("text", body),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ApiResponseError> {
        let res = self
            .post(
                &self.image_url,
                ProviderAuth::Header {
                    name: "api-key",
                    value: &self.image_key,
                },
                &[("text", prompt)],
            )
            .await?;

        let status = res.status();
        res.json::<GeneratedImage>().await.map_err(|e| {
            error!(error = %e, "image api returned an unexpected body");
            ApiResponseError::parsing(status)
        })
    }
}
