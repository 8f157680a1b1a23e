use crate::auth::extractor::AdminAuthenticated;
use crate::error::ApiError;
use actix_web::web::{Json, Path, Query};
use actix_web::{get, post, HttpResponse};
use keyvalue_common::{Display, NewTenant};
use keyvalue_portal::{AdminSurface, ViewMode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::MutexGuard;

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize, Debug)]
pub struct OpenMonthRequest {
    year: String,
    month: String,
    amount: String,
}

/// The organiser's surface, loaded on first use.
async fn ready_surface(auth: &AdminAuthenticated) -> Result<MutexGuard<'_, AdminSurface>, ApiError> {
    let mut surface = auth.admin.lock().await;
    if !surface.is_ready() {
        surface.load_all().await?;
    }
    Ok(surface)
}

fn empty_ledger() -> Value {
    json!({ "periods": [], "outstanding": 0.0 })
}

#[get("/api/admin/tenants")]
pub async fn get_tenants(
    auth: AdminAuthenticated,
    query: Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut surface = ready_surface(&auth).await?;
    surface.set_view(ViewMode::Tenants);
    let tenants = surface.filter_tenants(&query.q).display();
    Ok(HttpResponse::Ok().json(json!({
        "adminName": surface.admin_name(),
        "tenants": tenants,
    })))
}

#[post("/api/admin/tenants")]
pub async fn create_tenant(
    auth: AdminAuthenticated,
    form: Json<NewTenant>,
) -> Result<HttpResponse, ApiError> {
    let mut surface = ready_surface(&auth).await?;
    surface.open_add_tenant();
    let tenant = surface.add_tenant(&form).await?;
    Ok(HttpResponse::Created().json(tenant.display()))
}

/// Re-reads roster and ledger from the store.
#[post("/api/admin/refresh")]
pub async fn refresh(auth: AdminAuthenticated) -> Result<HttpResponse, ApiError> {
    let mut surface = auth.admin.lock().await;
    surface.load_all().await?;
    Ok(HttpResponse::Ok().json(json!({
        "adminName": surface.admin_name(),
        "tenants": surface.tenants().len(),
    })))
}

#[get("/api/admin/rent")]
pub async fn get_rent(
    auth: AdminAuthenticated,
    query: Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut surface = ready_surface(&auth).await?;
    surface.set_view(ViewMode::Rent);
    let rows: Vec<Value> = surface
        .filter_rent_tenants(&query.q)
        .into_iter()
        .map(|tenant| {
            let ledger = surface
                .ledger_for(&tenant.id)
                .map(|ledger| ledger.display())
                .unwrap_or_else(empty_ledger);
            json!({ "tenant": tenant.display(), "ledger": ledger })
        })
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "tenants": rows })))
}

#[post("/api/admin/rent/months")]
pub async fn open_month(
    auth: AdminAuthenticated,
    body: Json<OpenMonthRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut surface = ready_surface(&auth).await?;
    let opening = surface
        .open_month_for_all(&body.year, &body.month, &body.amount)
        .await?;
    Ok(HttpResponse::Ok().json(opening.display()))
}

#[get("/api/admin/rent/{tenant_id}")]
pub async fn get_rent_detail(
    auth: AdminAuthenticated,
    path: Path<String>,
) -> Result<HttpResponse, ApiError> {
    let tenant_id = path.into_inner();
    let mut surface = ready_surface(&auth).await?;
    surface.open_rent_detail(&tenant_id)?;
    match surface.rent_detail() {
        Some(detail) => Ok(HttpResponse::Ok().json(detail.display())),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

#[post("/api/admin/rent/{tenant_id}/{period}/paid")]
pub async fn mark_paid(
    auth: AdminAuthenticated,
    path: Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (tenant_id, period) = path.into_inner();
    let mut surface = ready_surface(&auth).await?;
    let ledger = surface.mark_paid(&tenant_id, &period).await?;
    Ok(HttpResponse::Ok().json(ledger.display()))
}
