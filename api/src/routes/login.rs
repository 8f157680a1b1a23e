use crate::auth::extractor::Authenticated;
use crate::error::ApiError;
use crate::state::WebServerData;
use actix_web::web::{Data, Json};
use actix_web::{post, HttpResponse};
use keyvalue_common::{Credentials, FederatedAssertion, SignupForm};
use keyvalue_portal::{AuthError, RoleResolver, RoleSession};
use log::info;
use serde_json::json;

fn signed_in(
    ws_data: &WebServerData,
    resolver: RoleResolver,
    result: Result<RoleSession, AuthError>,
) -> Result<HttpResponse, ApiError> {
    let role_session = result?;
    ws_data.open_workspace(resolver, &role_session);
    let session = role_session.session();
    Ok(HttpResponse::Ok().json(json!({
        "token": session.token,
        "role": role_session.role(),
        "landing": role_session.landing(),
        "user": session.user,
    })))
}

#[post("/api/admin/login")]
pub async fn admin_login(
    ws_data: Data<WebServerData>,
    credentials: Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let resolver = ws_data.resolver();
    let result = resolver.admin_sign_in(&credentials).await;
    signed_in(&ws_data, resolver, result)
}

#[post("/api/admin/login/federated")]
pub async fn admin_login_federated(
    ws_data: Data<WebServerData>,
    assertion: Json<FederatedAssertion>,
) -> Result<HttpResponse, ApiError> {
    let resolver = ws_data.resolver();
    let result = resolver.admin_sign_in_federated(&assertion).await;
    signed_in(&ws_data, resolver, result)
}

#[post("/api/login")]
pub async fn login(
    ws_data: Data<WebServerData>,
    credentials: Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let resolver = ws_data.resolver();
    let result = resolver.sign_in(&credentials).await;
    signed_in(&ws_data, resolver, result)
}

#[post("/api/login/federated")]
pub async fn login_federated(
    ws_data: Data<WebServerData>,
    assertion: Json<FederatedAssertion>,
) -> Result<HttpResponse, ApiError> {
    let resolver = ws_data.resolver();
    let result = resolver.sign_in_federated(&assertion).await;
    signed_in(&ws_data, resolver, result)
}

#[post("/api/student/signup")]
pub async fn student_signup(
    ws_data: Data<WebServerData>,
    form: Json<SignupForm>,
) -> Result<HttpResponse, ApiError> {
    let resolver = ws_data.resolver();
    let result = resolver.student_sign_up(&form).await;
    signed_in(&ws_data, resolver, result)
}

#[post("/api/student/signup/federated")]
pub async fn student_signup_federated(
    ws_data: Data<WebServerData>,
    assertion: Json<FederatedAssertion>,
) -> Result<HttpResponse, ApiError> {
    let resolver = ws_data.resolver();
    let result = resolver.student_sign_up_federated(&assertion).await;
    signed_in(&ws_data, resolver, result)
}

#[post("/api/student/login")]
pub async fn student_login(
    ws_data: Data<WebServerData>,
    credentials: Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let resolver = ws_data.resolver();
    let result = resolver.student_sign_in(&credentials).await;
    signed_in(&ws_data, resolver, result)
}

#[post("/api/logout")]
pub async fn logout(ws_data: Data<WebServerData>, auth: Authenticated) -> HttpResponse {
    auth.resolver.sign_out().await;
    ws_data.close_workspace(&auth.token);
    info!("workspace closed");
    HttpResponse::NoContent().finish()
}
