//! Client side of the sign-up: the newsletter form, headless.
//!
//! The page owns rendering; this module owns everything with a rule attached
//! to it. The challenge script is injected at most once per process
//! (`ScriptLoader`), the Turnstile widget sits behind `ChallengeWidget`, and
//! `NewsletterForm` walks `Idle -> Submitting -> {Success, Error}` against the
//! relay.

mod challenge;
mod form;
mod script;

pub use challenge::ChallengeWidget;
pub use challenge::WidgetId;
pub use form::FormState;
pub use form::NewsletterForm;
pub use form::WidgetError;
pub use form::CHALLENGE_CONTAINER;
pub use form::SUCCESS_DISPLAY_WINDOW;
pub use script::LoadState;
pub use script::ScriptLoader;
pub use script::CHALLENGE_SCRIPT;
pub use script::CHALLENGE_SCRIPT_URL;
