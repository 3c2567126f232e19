use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use serde::Deserialize;

use super::ChallengeWidget;
use super::LoadState;
use super::ScriptLoader;
use super::WidgetId;
use super::CHALLENGE_SCRIPT;
use crate::configuration::RunMode;
use crate::domain::SubscriberEmail;
use crate::routes::CHALLENGE_TOKEN_HEADER;

/// How long the "thanks for subscribing" state is shown
pub const SUCCESS_DISPLAY_WINDOW: Duration = Duration::from_secs(5);

/// Element the challenge widget is rendered into
pub const CHALLENGE_CONTAINER: &str = "newsletter-turnstile";

const GENERIC_FAILURE: &str = "Newsletter subscription failed";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormState {
    Idle,
    /// A request is in flight; the submit control is disabled
    Submitting,
    Success {
        since: Instant,
    },
    /// Holds the text shown under the form
    Error(String),
}

#[derive(thiserror::Error, Debug)]
pub enum WidgetError {
    /// The widget is not rendered yet, or has not produced a token
    #[error("{0}")]
    ChallengeNotReady(&'static str),
    #[error("{0}")]
    InvalidEmail(String),
    /// The relay answered with a non-2xx status; holds its `error` message
    #[error("{0}")]
    Rejected(String),
    #[error("Could not reach the server")]
    NetworkFailure(#[source] reqwest::Error),
}

/// Error replies of the relay look like `{"error": "..."}`
#[derive(Deserialize)]
struct ErrorReply {
    error: Option<String>,
}

/// The sign-up form. One instance per mounted form.
pub struct NewsletterForm<W> {
    http_client: Client,
    endpoint: String,
    mode: RunMode,
    site_key: String,
    loader: Arc<ScriptLoader>,
    widget: W,
    widget_id: Option<WidgetId>,
    email: String,
    state: FormState,
    success_window: Duration,
}

impl<W: ChallengeWidget> NewsletterForm<W> {
    /// `endpoint` is the full URL of `POST /api/newsletter`. The form uses the
    /// process-wide `CHALLENGE_SCRIPT` loader unless `with_loader` says
    /// otherwise.
    pub fn new(
        endpoint: String,
        mode: RunMode,
        site_key: String,
        widget: W,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: Client::builder().build()?,
            endpoint,
            mode,
            site_key,
            loader: Arc::clone(&CHALLENGE_SCRIPT),
            widget,
            widget_id: None,
            email: String::new(),
            state: FormState::Idle,
            success_window: SUCCESS_DISPLAY_WINDOW,
        })
    }

    pub fn with_loader(
        mut self,
        loader: Arc<ScriptLoader>,
    ) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_success_window(
        mut self,
        window: Duration,
    ) -> Self {
        self.success_window = window;
        self
    }

    pub fn email(&self) -> &str { &self.email }

    pub fn set_email(
        &mut self,
        email: impl Into<String>,
    ) {
        self.email = email.into();
    }

    pub fn state(&self) -> &FormState { &self.state }

    pub fn is_submit_disabled(&self) -> bool { self.state == FormState::Submitting }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            FormState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn widget(&self) -> &W { &self.widget }

    pub fn widget_mut(&mut self) -> &mut W { &mut self.widget }

    /// Called when the form appears. In production mode this makes sure the
    /// challenge script is (being) loaded; `inject` receives the script URL
    /// and is only called if no other form got there first.
    ///
    /// The widget is rendered here only if the script is already `Ready`.
    /// While it is `Loading`, the loader keeps no list of waiting forms: the
    /// page must call `on_script_loaded` on every form mounted in the
    /// meantime, not just on the one that injected the script.
    pub fn mount<F>(
        &mut self,
        inject: F,
    ) where
        F: FnOnce(&str),
    {
        if self.mode.is_development() {
            return;
        }
        if self.loader.ensure_loaded(inject) == LoadState::Ready {
            self.render_challenge();
        }
    }

    /// The script's `onload`. Safe to call on every mounted form; each renders
    /// its own widget once.
    pub fn on_script_loaded(&mut self) {
        self.loader.mark_ready();
        self.render_challenge();
    }

    fn render_challenge(&mut self) {
        if self.mode.is_development()
            || self.widget_id.is_some()
            || self.loader.state() != LoadState::Ready
        {
            return;
        }
        let id = self.widget.render(CHALLENGE_CONTAINER, &self.site_key);
        tracing::debug!(widget_id = %id.0, "challenge widget rendered");
        self.widget_id = Some(id);
    }

    /// Leave the success state once the display window has passed
    pub fn tick(
        &mut self,
        now: Instant,
    ) {
        if let FormState::Success { since } = self.state {
            if now.saturating_duration_since(since) >= self.success_window {
                self.state = FormState::Idle;
            }
        }
    }

    /// Submit the current email. A no-op while a request is already in
    /// flight.
    ///
    /// On success the email is cleared and the challenge widget is reset, so a
    /// second submission needs a fresh token. On failure the email is kept for
    /// a retry and the error is shown (and also returned).
    pub async fn submit(&mut self) -> Result<(), WidgetError> {
        if self.is_submit_disabled() {
            return Ok(());
        }
        self.state = FormState::Submitting;

        match self.send().await {
            Ok(()) => {
                self.email.clear();
                self.state = FormState::Success {
                    since: Instant::now(),
                };
                if let Some(id) = &self.widget_id {
                    self.widget.reset(id);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error.message = %e, "newsletter subscription failed");
                self.state = FormState::Error(format!("An error occurred: {e}. Please try again."));
                Err(e)
            }
        }
    }

    fn challenge_token(&self) -> Result<Option<String>, WidgetError> {
        if self.mode.is_development() {
            return Ok(None);
        }
        let id = self
            .widget_id
            .as_ref()
            .ok_or(WidgetError::ChallengeNotReady("Turnstile is not initialized"))?;
        let token = self
            .widget
            .get_response(id)
            .filter(|t| !t.is_empty())
            .ok_or(WidgetError::ChallengeNotReady("Failed to get Turnstile response"))?;
        Ok(Some(token))
    }

    async fn send(&self) -> Result<(), WidgetError> {
        // what `<input type="email" required>` would have enforced
        let email = SubscriberEmail::parse(self.email.clone()).map_err(WidgetError::InvalidEmail)?;
        let token = self.challenge_token()?;

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "email": email.as_ref() }));
        if let Some(token) = token {
            request = request.header(CHALLENGE_TOKEN_HEADER, token);
        }

        let resp = request.send().await.map_err(WidgetError::NetworkFailure)?;
        if resp.status().is_success() {
            return Ok(());
        }

        let msg = resp
            .json::<ErrorReply>()
            .await
            .ok()
            .and_then(|r| r.error)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        Err(WidgetError::Rejected(msg))
    }
}
