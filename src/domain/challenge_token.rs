/// Opaque proof-of-humanity value issued by the Turnstile widget. Single use:
/// once it has been sent to `siteverify`, it cannot be verified again.
///
/// Must be instantiated with `ChallengeToken::parse`, which only rejects
/// empty values. Length, format and expiry are for the verification service
/// to judge, so that a bad token is reported with the provider's error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeToken(String);

impl ChallengeToken {
    pub fn parse(token: String) -> Result<Self, String> {
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err("Challenge token cannot be empty".to_string());
        }
        Ok(Self(token))
    }
}

impl AsRef<str> for ChallengeToken {
    fn as_ref(&self) -> &str { &self.0 }
}
