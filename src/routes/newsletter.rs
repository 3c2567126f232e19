use std::fmt::Debug;

use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;

use super::error_chain_fmt;
use crate::configuration::RunMode;
use crate::domain::ChallengeToken;
use crate::domain::SubscriptionRequest;
use crate::record_store::RecordStoreClient;
use crate::turnstile::TurnstileClient;
use crate::turnstile::VerifyError;

/// Carries the token produced by the Turnstile widget
pub const CHALLENGE_TOKEN_HEADER: &str = "cf-turnstile-response";
/// Set by Cloudflare's proxy; trust depends entirely on being behind it
pub const CLIENT_IP_HEADER: &str = "CF-Connecting-IP";
const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

pub const SUBSCRIPTION_SUCCESS_MESSAGE: &str = "Newsletter subscription successful";

#[derive(Deserialize)]
struct SubscriptionBody {
    email: String,
}

/// Every failure of the relay ends up here; the `Display` strings of the
/// first three variants are sent to the client verbatim, `UnexpectedError`
/// only ever shows the generic message (the cause chain is logged).
#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Server configuration error")]
    ServerConfigurationError,
    #[error("Turnstile token is missing")]
    ChallengeTokenMissing,
    /// Holds the provider's `error-codes`, unchanged
    #[error("Turnstile verification failed")]
    ChallengeVerificationFailed(Vec<String>),
    // store unreachable, malformed body, verification transport failure...
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for SubscribeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(rename = "errorCodes", skip_serializing_if = "Option::is_none")]
    error_codes: Option<&'a [String]>,
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ChallengeTokenMissing | Self::ChallengeVerificationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ServerConfigurationError | Self::UnexpectedError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        let body = match self {
            Self::ChallengeVerificationFailed(codes) => ErrorBody {
                error: "Turnstile verification failed",
                error_codes: Some(codes.as_slice()),
            },
            Self::UnexpectedError(_) => ErrorBody {
                error: "An error occurred while subscribing to the newsletter",
                error_codes: None,
            },
            Self::ServerConfigurationError => ErrorBody {
                error: "Server configuration error",
                error_codes: None,
            },
            Self::ChallengeTokenMissing => ErrorBody {
                error: "Turnstile token is missing",
                error_codes: None,
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// The IP the verifier should see. Cloudflare's header wins; otherwise the
/// first hop of `X-Forwarded-For`. Neither is authenticated.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let first_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    first_value(CLIENT_IP_HEADER).or_else(|| first_value(FORWARDED_FOR_HEADER))
}

/// An empty (or unreadable) header counts as no token at all
fn challenge_token(headers: &HeaderMap) -> Option<ChallengeToken> {
    headers
        .get(CHALLENGE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| ChallengeToken::parse(v.to_string()).ok())
}

/// The body is parsed by hand rather than with `web::Json`, because the
/// extractor answers malformed bodies with its own 400; here they are just
/// another unexpected failure.
fn parse_request(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<SubscriptionRequest, anyhow::Error> {
    let body: SubscriptionBody =
        serde_json::from_slice(body).context("Failed to parse subscription body")?;
    Ok(SubscriptionRequest {
        email: body.email,
        challenge_token: challenge_token(headers),
        client_ip: client_ip(headers),
    })
}

/// Production-mode gate. Order matters: a missing secret is reported before
/// a missing token, and no request leaves the server in either case.
async fn verify_challenge(
    turnstile: &TurnstileClient,
    sub: &SubscriptionRequest,
) -> Result<(), SubscribeError> {
    if !turnstile.secret_is_configured() {
        tracing::error!("Turnstile secret key is not configured");
        return Err(SubscribeError::ServerConfigurationError);
    }

    let token = sub
        .challenge_token
        .as_ref()
        .ok_or(SubscribeError::ChallengeTokenMissing)?;

    let verification = turnstile
        .verify(token, sub.client_ip.as_deref())
        .await
        .map_err(|e| match e {
            VerifyError::SecretMissing => SubscribeError::ServerConfigurationError,
            e => SubscribeError::UnexpectedError(
                anyhow::Error::new(e).context("Failed to verify Turnstile token"),
            ),
        })?;

    if !verification.success {
        tracing::warn!(
            error_codes = ?verification.error_codes,
            "Turnstile verification failed"
        );
        return Err(SubscribeError::ChallengeVerificationFailed(
            verification.error_codes,
        ));
    }
    Ok(())
}

/// `POST /api/newsletter`
///
/// Relays a sign-up to the record store, after checking the Turnstile token
/// (production mode only).
///
/// # Request example
///
/// ```sh
///     curl -i http://127.0.0.1:8000/api/newsletter \
///         -H 'Content-Type: application/json' \
///         -H 'cf-turnstile-response: tok123' \
///         --data '{"email":"a@b.com"}'
/// ```
///
/// # Responses
///
/// - 200 `{"message": "Newsletter subscription successful"}`
/// - 400 `{"error": "Turnstile token is missing"}`
/// - 400 `{"error": "Turnstile verification failed", "errorCodes": [...]}`
/// - 500 `{"error": "Server configuration error"}`
/// - 500 `{"error": "An error occurred while subscribing to the newsletter"}`
///
/// There are no retries and no deduplication: each accepted request makes
/// at most one verification call and one store write.
#[tracing::instrument(
    name = "Relaying newsletter subscription",
    skip(request, body, store, turnstile, mode),
    fields(
        subscriber_email = tracing::field::Empty,
        client_ip = tracing::field::Empty,
    )
)]
pub async fn subscribe(
    request: HttpRequest,
    body: web::Bytes,
    // all subsequent args are inherited via App.app_data
    store: web::Data<RecordStoreClient>,
    turnstile: web::Data<TurnstileClient>,
    mode: web::Data<RunMode>,
) -> Result<HttpResponse, SubscribeError> {
    let sub = parse_request(request.headers(), &body)?;

    tracing::Span::current().record("subscriber_email", tracing::field::display(&sub.email));
    if let Some(ip) = &sub.client_ip {
        tracing::Span::current().record("client_ip", tracing::field::display(ip));
    }

    // development mode trusts every request
    if !mode.is_development() {
        verify_challenge(&turnstile, &sub).await?;
    }

    store
        .create_record(&sub.record())
        .await
        .context("Failed to create newsletter record")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": SUBSCRIPTION_SUCCESS_MESSAGE })))
}
