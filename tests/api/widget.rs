use std::sync::Arc;

use claims::assert_ok;
use vemos_vamos::configuration::RunMode;
use vemos_vamos::widget::ChallengeWidget;
use vemos_vamos::widget::FormState;
use vemos_vamos::widget::NewsletterForm;
use vemos_vamos::widget::ScriptLoader;
use vemos_vamos::widget::WidgetError;
use vemos_vamos::widget::WidgetId;
use wiremock::matchers::any;
use wiremock::matchers::body_string_contains;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::spawn_app;
use crate::helpers::spawn_production_app;

/// A visitor who solves every challenge with the same token
struct SolvedWidget {
    token: Option<String>,
}

impl ChallengeWidget for SolvedWidget {
    fn render(
        &mut self,
        _container: &str,
        _site_key: &str,
    ) -> WidgetId {
        WidgetId("cf-chl-widget-1".to_string())
    }

    fn get_response(
        &self,
        _id: &WidgetId,
    ) -> Option<String> {
        self.token.clone()
    }

    fn reset(
        &mut self,
        _id: &WidgetId,
    ) {
        self.token = None;
    }
}

fn mounted_form(
    endpoint: String,
    mode: RunMode,
) -> NewsletterForm<SolvedWidget> {
    let widget = SolvedWidget {
        token: Some("tok123".to_string()),
    };
    let mut form = NewsletterForm::new(endpoint, mode, "site-key".to_string(), widget)
        .unwrap()
        .with_loader(Arc::new(ScriptLoader::new()));
    form.mount(|_| {});
    form.on_script_loaded();
    form
}

#[tokio::test]
async fn form_subscribes_through_the_relay() {
    let app = spawn_production_app().await;
    Mock::given(body_string_contains("response=tok123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })),
        )
        .expect(1)
        .mount(&app.turnstile_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.store_server)
        .await;

    let mut form = mounted_form(app.newsletter_url(), RunMode::Production);
    form.set_email("ursula@example.com");
    assert_ok!(form.submit().await);

    assert!(matches!(form.state(), FormState::Success { .. }));
    assert_eq!(form.email(), "");
    // reset after success
    assert_eq!(form.widget().token, None);
}

#[tokio::test]
async fn relay_rejection_is_shown_in_the_form() {
    let app = spawn_production_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error-codes": ["timeout-or-duplicate"],
        })))
        .mount(&app.turnstile_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.store_server)
        .await;

    let mut form = mounted_form(app.newsletter_url(), RunMode::Production);
    form.set_email("ursula@example.com");

    assert!(matches!(
        form.submit().await,
        Err(WidgetError::Rejected(_))
    ));
    assert_eq!(
        form.error_message(),
        Some("An error occurred: Turnstile verification failed. Please try again.")
    );
    assert_eq!(form.email(), "ursula@example.com");
    assert!(!form.is_submit_disabled());
}

#[tokio::test]
async fn development_form_needs_no_challenge() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.store_server)
        .await;

    let widget = SolvedWidget { token: None };
    let mut form = NewsletterForm::new(
        app.newsletter_url(),
        RunMode::Development,
        String::new(),
        widget,
    )
    .unwrap();
    form.set_email("ursula@example.com");

    assert_ok!(form.submit().await);
    assert!(matches!(form.state(), FormState::Success { .. }));
}
