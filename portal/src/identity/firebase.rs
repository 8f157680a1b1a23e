use super::{IdentityProvider, ProviderError};
use async_trait::async_trait;
use keyvalue_common::{BearerToken, Credentials, FederatedAssertion, Session, User};
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};

const IDENTITY_TOOLKIT: &str = "https://identitytoolkit.googleapis.com/v1";

/// Firebase Authentication through the Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseIdentity {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    id_token: String,
    email: Option<String>,
    display_name: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>) -> Self {
        FirebaseIdentity {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: String::from(IDENTITY_TOOLKIT),
        }
    }

    /// Points at another Identity Toolkit host, e.g. the auth emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call(&self, method: &str, body: Value) -> Result<Session, ProviderError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => format!("HTTP {}", status),
            };
            debug!("accounts:{} failed: {}", method, message);
            return Err(classify(&message));
        }

        let auth: AuthResponse = response.json().await?;
        into_session(auth)
    }
}

fn into_session(auth: AuthResponse) -> Result<Session, ProviderError> {
    let email = match auth.email {
        Some(email) if !email.is_empty() => email,
        _ => {
            return Err(ProviderError::Rejected(String::from(
                "account has no email address",
            )))
        }
    };
    Ok(Session {
        user: User {
            uid: auth.local_id,
            email,
            display_name: auth.display_name.filter(|name| !name.is_empty()),
        },
        token: BearerToken::new(auth.id_token),
        refresh_token: auth.refresh_token,
    })
}

/// Maps an Identity Toolkit error message ("CODE" or "CODE : detail").
fn classify(message: &str) -> ProviderError {
    let code = message
        .split(|c: char| c == ' ' || c == ':')
        .next()
        .unwrap_or_default();
    match code {
        "EMAIL_EXISTS" => ProviderError::EmailExists,
        "EMAIL_NOT_FOUND"
        | "INVALID_PASSWORD"
        | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL"
        | "USER_DISABLED"
        | "INVALID_IDP_RESPONSE" => ProviderError::InvalidCredentials,
        _ => ProviderError::Rejected(message.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ProviderError> {
        let body = json!({
            "email": credentials.email.trim(),
            "password": credentials.password,
            "returnSecureToken": true,
        });
        self.call("signInWithPassword", body).await
    }

    async fn sign_in_federated(
        &self,
        assertion: &FederatedAssertion,
    ) -> Result<Session, ProviderError> {
        let body = json!({
            "postBody": format!("id_token={}&providerId={}", assertion.id_token, assertion.provider_id),
            "requestUri": "http://localhost",
            "returnSecureToken": true,
            "returnIdpCredential": true,
        });
        self.call("signInWithIdp", body).await
    }

    async fn create_account(
        &self,
        credentials: &Credentials,
        display_name: Option<&str>,
    ) -> Result<Session, ProviderError> {
        let mut body = json!({
            "email": credentials.email.trim(),
            "password": credentials.password,
            "returnSecureToken": true,
        });
        if let Some(name) = display_name {
            body["displayName"] = json!(name);
        }
        self.call("signUp", body).await
    }

    async fn sign_out(&self, session: &Session) -> Result<(), ProviderError> {
        // ID tokens are self-contained; dropping them is all sign-out means here
        debug!("signed out {}", session.email());
        Ok(())
    }
}
