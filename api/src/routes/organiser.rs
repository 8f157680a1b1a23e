use crate::auth::extractor::Authenticated;
use crate::error::ApiError;
use crate::state::WebServerData;
use actix_web::web::{Data, Query};
use actix_web::{get, HttpResponse};
use keyvalue_common::Display;
use keyvalue_portal::{EventFilter, OrganiserDesk, SessionContext};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug, Default)]
pub struct EventQuery {
    #[serde(default)]
    filter: EventFilter,
    #[serde(default)]
    q: String,
}

/// Events of the signed-in organiser; a client without a session gets the
/// empty guest dashboard.
#[get("/api/organiser/events")]
pub async fn get_events(
    ws_data: Data<WebServerData>,
    auth: Option<Authenticated>,
    query: Query<EventQuery>,
) -> Result<HttpResponse, ApiError> {
    let dashboard = match &auth {
        Some(auth) => auth.organiser.dashboard().await?,
        None => {
            OrganiserDesk::new(ws_data.store.clone(), SessionContext::new(), ws_data.timeout)
                .dashboard()
                .await?
        }
    };
    let events = dashboard.events(query.filter, &query.q).display();
    Ok(HttpResponse::Ok().json(json!({
        "organiserName": dashboard.organiser_name,
        "filter": query.filter,
        "events": events,
    })))
}

#[get("/api/organiser/profile")]
pub async fn get_profile(auth: Authenticated) -> Result<HttpResponse, ApiError> {
    let profile = auth.organiser.profile().await?;
    Ok(HttpResponse::Ok().json(profile.display()))
}
