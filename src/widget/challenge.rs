/// Handle returned by `ChallengeWidget::render`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetId(pub String);

/// The three calls the form makes on the Turnstile widget (`turnstile.render`,
/// `turnstile.getResponse`, `turnstile.reset` in the browser).
pub trait ChallengeWidget {
    /// Draw the widget into `container`; called at most once per form
    fn render(
        &mut self,
        container: &str,
        site_key: &str,
    ) -> WidgetId;

    /// The current token, if the visitor has solved the challenge. Tokens are
    /// single use, so this must be `None` again after `reset`.
    fn get_response(
        &self,
        id: &WidgetId,
    ) -> Option<String>;

    fn reset(
        &mut self,
        id: &WidgetId,
    );
}
