use crate::auth::extractor::Authenticated;
use crate::error::ApiError;
use crate::state::WebServerData;
use crate::websockets::session::ComplaintWsActor;
use actix_web::web::{Data, Json, Path, Payload};
use actix_web::{get, post, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use keyvalue_common::Display;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ComplaintRequest {
    room: String,
    desc: String,
}

#[post("/api/maintenance")]
pub async fn raise_complaint(
    ws_data: Data<WebServerData>,
    auth: Option<Authenticated>,
    body: Json<ComplaintRequest>,
) -> Result<HttpResponse, ApiError> {
    let desk = match &auth {
        Some(auth) => auth.maintenance.clone(),
        None => ws_data.anonymous_desk(),
    };
    let complaint = desk.raise_complaint(&body.room, &body.desc).await?;
    Ok(HttpResponse::Created().json(complaint.display()))
}

#[get("/api/maintenance/{room}")]
pub async fn get_complaint(
    ws_data: Data<WebServerData>,
    path: Path<String>,
) -> Result<HttpResponse, ApiError> {
    let room = path.into_inner();
    match ws_data.anonymous_desk().complaint(&room).await? {
        Some(complaint) => Ok(HttpResponse::Ok().json(complaint.display())),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

#[get("/ws/maintenance/{room}")]
pub async fn ws_index(
    room: Path<String>,
    req: HttpRequest,
    body: Payload,
    ws_data: Data<WebServerData>,
) -> Result<HttpResponse, actix_web::Error> {
    let resp = ws::start(
        ComplaintWsActor::new(ws_data.anonymous_desk(), room.into_inner()),
        &req,
        body,
    );
    resp
}
