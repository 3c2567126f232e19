mod challenge_token;
mod subscriber_email;
mod subscription_request;
// allow external `use` statements to skip `subscription_request` etc
pub use challenge_token::ChallengeToken;
pub use subscriber_email::SubscriberEmail;
pub use subscription_request::SubscriptionRecord;
pub use subscription_request::SubscriptionRequest;
pub use subscription_request::SUBSCRIPTION_SOURCE;
