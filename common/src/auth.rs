use crate::validation::{require, ValidationError};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, ops::Deref, str::FromStr};

/// Identity as reported by the identity provider. Read only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub token: BearerToken,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn email(&self) -> &str {
        &self.user.email
    }
}

#[derive(Debug, Clone)]
pub struct TokenError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        BearerToken(token.into())
    }
}

impl FromStr for BearerToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().trim_start_matches("Bearer").trim();
        if token.is_empty() {
            return Err(TokenError);
        }
        Ok(BearerToken(token.to_string()))
    }
}

impl Deref for BearerToken {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email addresses compare without regard to case at the identity
/// provider, so every lookup keyed by email goes through this first.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalized_email<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|email| normalize_email(&email))
}

#[derive(Deserialize, Clone)]
pub struct Credentials {
    #[serde(deserialize_with = "normalized_email")]
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: impl Into<String>) -> Self {
        Credentials {
            email: normalize_email(email),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("email", &self.email)?;
        require("password", &self.password)?;
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn google_provider() -> String {
    String::from("google.com")
}

/// Proof of identity obtained from a federated provider (a Google ID token,
/// for instance).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FederatedAssertion {
    #[serde(default = "google_provider")]
    pub provider_id: String,
    pub id_token: String,
}

impl FederatedAssertion {
    pub fn google(id_token: impl Into<String>) -> Self {
        FederatedAssertion {
            provider_id: google_provider(),
            id_token: id_token.into(),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("password", &self.password)?;
        require("confirm password", &self.confirm_password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.email, self.password.clone())
    }
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            name: String::from("Meera"),
            email: String::from("meera@x.com"),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_bearer_token_from_header() {
        let token = BearerToken::from_str("Bearer abc.def").unwrap();
        assert_eq!(token.as_str(), "abc.def");
        assert_eq!(BearerToken::from_str("abc").unwrap().to_string(), "abc");
        assert!(BearerToken::from_str("Bearer ").is_err());
    }

    #[test]
    fn test_signup_form_validation() {
        assert!(form("secret", "secret").validate().is_ok());
        assert_eq!(
            form("secret", "secrets").validate(),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            form("", "").validate(),
            Err(ValidationError::MissingField("password"))
        );
    }

    #[test]
    fn test_emails_are_lowercased() {
        assert_eq!(Credentials::new(" Boss@X.com ", "pw").email, "boss@x.com");
        let parsed: Credentials =
            serde_json::from_value(serde_json::json!({"email": "A@x.COM", "password": "pw"}))
                .unwrap();
        assert_eq!(parsed.email, "a@x.com");
        let mut signup = form("secret", "secret");
        signup.email = String::from("Meera@X.com");
        assert_eq!(signup.credentials().email, "meera@x.com");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("a@x.com", "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));
        assert_eq!(
            Credentials::new(" ", "pw").validate(),
            Err(ValidationError::MissingField("email"))
        );
    }
}
