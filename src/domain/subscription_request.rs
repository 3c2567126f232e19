use serde::Serialize;

use super::ChallengeToken;

/// Identifies the site a subscription came from; written to the `Source`
/// column of every record.
pub const SUBSCRIPTION_SOURCE: &str = "VemosVamos";

/// One newsletter sign-up, assembled by the relay from the JSON body and the
/// request headers. Created per request, never stored locally.
#[derive(Debug)]
pub struct SubscriptionRequest {
    /// Not validated server-side; the widget is responsible for that
    pub email: String,
    /// Only required in production mode
    pub challenge_token: Option<ChallengeToken>,
    /// Best effort, from a proxy header; only passed on to the verifier
    pub client_ip: Option<String>,
}

impl SubscriptionRequest {
    pub fn record(&self) -> SubscriptionRecord<'_> {
        SubscriptionRecord {
            email: &self.email,
            source: SUBSCRIPTION_SOURCE,
        }
    }
}

/// Field set of a row in the store's newsletter table. Column names are
/// capitalised to match the table.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct SubscriptionRecord<'a> {
    #[serde(rename = "Email")]
    pub email: &'a str,
    #[serde(rename = "Source")]
    pub source: &'a str,
}
