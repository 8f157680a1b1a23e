use crate::state::{WebServerData, Workspace, WorkspaceLookup};
use actix_service::Transform;
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse},
    http::header,
    Error, HttpMessage,
};
use futures::{
    future::{ready, LocalBoxFuture, Ready},
    FutureExt,
};
use keyvalue_common::BearerToken;
use log::{debug, info};
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

/// Marks a request that carried a bearer token we could not honour.
#[derive(Clone, Copy, Debug)]
pub struct RejectedToken;

pub struct AuthenticateMiddlewareFactory {
    server_data: Rc<WebServerData>,
}

impl AuthenticateMiddlewareFactory {
    pub fn new(server_data: WebServerData) -> Self {
        AuthenticateMiddlewareFactory {
            server_data: Rc::new(server_data),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticateMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware {
            server_data: self.server_data.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct AuthenticateMiddleware<S> {
    server_data: Rc<WebServerData>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let server_data = self.server_data.clone();

        async move {
            if let Some(auth) = req.headers().get(header::AUTHORIZATION) {
                let token = auth
                    .to_str()
                    .ok()
                    .and_then(|value| BearerToken::from_str(value).ok());
                let lookup = match &token {
                    Some(token) => server_data.workspace(token),
                    None => WorkspaceLookup::Unknown,
                };
                match (token, lookup) {
                    (Some(token), WorkspaceLookup::Live(workspace)) => {
                        req.extensions_mut().insert::<Arc<Workspace>>(workspace);
                        req.extensions_mut().insert::<BearerToken>(token);
                    }
                    (_, WorkspaceLookup::Expired(workspace)) => {
                        info!("session expired on {}", req.path());
                        workspace.resolver.sign_out().await;
                        req.extensions_mut().insert(RejectedToken);
                    }
                    _ => {
                        debug!("unknown bearer token on {}", req.path());
                        req.extensions_mut().insert(RejectedToken);
                    }
                }
            }

            let res = srv.call(req).await?;
            Ok(res)
        }
        .boxed_local()
    }
}
