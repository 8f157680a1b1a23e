use super::error::Error;
use super::middleware::RejectedToken;
use crate::state::Workspace;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use keyvalue_common::BearerToken;
use keyvalue_portal::Role;
use std::future::{ready, Ready};
use std::sync::Arc;

/// A request from a signed-in client.
pub struct Authenticated {
    pub token: BearerToken,
    workspace: Arc<Workspace>,
}

impl Authenticated {
    fn extract(req: &HttpRequest) -> Result<Self, Error> {
        if req.extensions().get::<RejectedToken>().is_some() {
            return Err(Error::AuthenticationError);
        }
        let workspace = req.extensions().get::<Arc<Workspace>>().cloned();
        let token = req.extensions().get::<BearerToken>().cloned();
        match (workspace, token) {
            (Some(workspace), Some(token)) => Ok(Authenticated { token, workspace }),
            _ => Err(Error::AuthenticationError),
        }
    }
}

impl FromRequest for Authenticated {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Self::extract(req))
    }
}

impl std::ops::Deref for Authenticated {
    type Target = Workspace;

    fn deref(&self) -> &Self::Target {
        &self.workspace
    }
}

/// A request from a signed-in organiser.
pub struct AdminAuthenticated(Authenticated);

impl FromRequest for AdminAuthenticated {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let result = Authenticated::extract(req).and_then(|auth| match auth.role {
            Role::Admin => Ok(AdminAuthenticated(auth)),
            _ => Err(Error::Forbidden),
        });
        ready(result)
    }
}

impl std::ops::Deref for AdminAuthenticated {
    type Target = Workspace;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
