use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::ChallengeToken;

/// Client for Cloudflare Turnstile's `siteverify` endpoint.
///
/// The secret is optional here because its absence is not a startup failure:
/// in development mode it is never needed, and in production mode the relay
/// reports it per request (see `secret_is_configured`).
#[derive(Clone, Debug)]
pub struct TurnstileClient {
    http_client: Client,
    verify_url: String,
    secret: Option<Secret<String>>,
}

/// Form-encoded, as `siteverify` expects
#[derive(Serialize)]
struct SiteVerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
    remoteip: &'a str,
    idempotency_key: String,
}

/// What `siteverify` told us. A transport failure or non-2xx status is not a
/// `Verification`; it is returned as `Err` by `verify`.
#[derive(Deserialize, Debug, PartialEq, Eq)]
pub struct Verification {
    pub success: bool,
    /// Passed through unchanged to the caller on failure
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error("Turnstile secret key is not configured")]
    SecretMissing,
    #[error("Failed to reach the Turnstile verification service")]
    Request(#[from] reqwest::Error),
}

impl TurnstileClient {
    pub fn new(
        verify_url: String,
        secret: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            verify_url,
            secret,
        })
    }

    pub fn secret_is_configured(&self) -> bool { self.secret.is_some() }

    /// One verification attempt per call. A fresh idempotency key is generated
    /// each time; it protects a single attempt against duplicate delivery, it
    /// does not make two submissions of the same email idempotent.
    #[tracing::instrument(
        name = "Verifying Turnstile token",
        skip(self, token),
        fields(idempotency_key = tracing::field::Empty)
    )]
    pub async fn verify(
        &self,
        token: &ChallengeToken,
        remote_ip: Option<&str>,
    ) -> Result<Verification, VerifyError> {
        let secret = self.secret.as_ref().ok_or(VerifyError::SecretMissing)?;

        let idempotency_key = Uuid::new_v4().to_string();
        tracing::Span::current().record(
            "idempotency_key",
            tracing::field::display(&idempotency_key),
        );

        let body = SiteVerifyRequest {
            secret: secret.expose_secret(),
            response: token.as_ref(),
            remoteip: remote_ip.unwrap_or_default(),
            idempotency_key,
        };

        let verification = self
            .http_client
            .post(&self.verify_url)
            .form(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<Verification>()
            .await?;
        Ok(verification)
    }
}
