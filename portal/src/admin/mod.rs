//! Admin surface: the organiser's view over the tenant roster and the rent
//! ledger.
//!
//! The surface starts `Loading` and becomes `Ready` once organiser name,
//! roster and ledger have all been read. Local state only ever changes from
//! documents the store confirmed, so a failed write leaves it untouched.
use crate::error::ManagerError;
use crate::session::SessionContext;
use crate::timeout::bounded;
use docstore::{DocumentModel, DocumentStore, ModelStore, StoreError};
use keyvalue_common::{Display, OrganiserRecord, RentLedger, RentStatus, Tenant};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

mod ledger;

pub use ledger::{FailedWrite, MonthOpening};

pub const DEFAULT_ADMIN_NAME: &str = "Admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceState {
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Tenants,
    Rent,
}

/// One tenant's ledger, laid out for the rent-detail overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct RentDetail {
    pub tenant: Tenant,
    pub periods: Vec<(String, RentStatus)>,
}

impl Display for RentDetail {
    fn display(&self) -> Value {
        let periods: Vec<Value> = self
            .periods
            .iter()
            .map(|(period, status)| json!({ "period": period, "state": status }))
            .collect();
        json!({ "tenant": self.tenant.display(), "periods": periods })
    }
}

pub struct AdminSurface {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    timeout: Duration,
    state: SurfaceState,
    view: ViewMode,
    add_tenant_open: bool,
    rent_detail_for: Option<String>,
    admin_name: String,
    tenants: Vec<Tenant>,
    ledger: HashMap<String, RentLedger>,
}

impl AdminSurface {
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionContext, timeout: Duration) -> Self {
        AdminSurface {
            store,
            session,
            timeout,
            state: SurfaceState::Loading,
            view: ViewMode::default(),
            add_tenant_open: false,
            rent_detail_for: None,
            admin_name: String::from(DEFAULT_ADMIN_NAME),
            tenants: Vec::new(),
            ledger: HashMap::new(),
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }

    pub fn tenant(&self, tenant_id: &str) -> Option<&Tenant> {
        self.tenants.iter().find(|tenant| tenant.id == tenant_id)
    }

    pub fn ledger_for(&self, tenant_id: &str) -> Option<&RentLedger> {
        self.ledger.get(tenant_id)
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn add_tenant_open(&self) -> bool {
        self.add_tenant_open
    }

    pub fn open_add_tenant(&mut self) {
        self.add_tenant_open = true;
    }

    pub fn close_add_tenant(&mut self) {
        self.add_tenant_open = false;
    }

    pub fn open_rent_detail(&mut self, tenant_id: &str) -> Result<(), ManagerError> {
        if self.tenant(tenant_id).is_none() {
            return Err(ManagerError::UnknownTenant(tenant_id.to_string()));
        }
        self.rent_detail_for = Some(tenant_id.to_string());
        Ok(())
    }

    pub fn close_rent_detail(&mut self) {
        self.rent_detail_for = None;
    }

    /// Ledger of the tenant in the open rent-detail overlay, oldest period
    /// first. A tenant with no ledger document shows no periods.
    pub fn rent_detail(&self) -> Option<RentDetail> {
        let tenant = self.tenant(self.rent_detail_for.as_deref()?)?;
        let periods = self
            .ledger
            .get(&tenant.id)
            .map(|ledger| {
                ledger
                    .entries()
                    .map(|(period, entry)| (period.clone(), entry.status()))
                    .collect()
            })
            .unwrap_or_default();
        Some(RentDetail {
            tenant: tenant.clone(),
            periods,
        })
    }

    pub fn filter_tenants(&self, query: &str) -> Vec<&Tenant> {
        self.tenants.iter().filter(|t| t.matches(query)).collect()
    }

    pub fn filter_rent_tenants(&self, query: &str) -> Vec<&Tenant> {
        self.tenants
            .iter()
            .filter(|t| t.matches_rent_search(query))
            .collect()
    }

    /// Reads organiser name, roster and ledger. Only a complete read makes
    /// the surface ready; calling it again refreshes everything.
    pub async fn load_all(&mut self) -> Result<(), ManagerError> {
        let email = self.session.email().ok_or(ManagerError::NotSignedIn)?;

        let name = match bounded(self.timeout, self.store.fetch::<OrganiserRecord>(&email)).await {
            Ok(Some(record)) if !record.name.trim().is_empty() => record.name,
            Ok(_) => String::from(DEFAULT_ADMIN_NAME),
            Err(e) => {
                warn!("could not read organiser name for {}: {}", email, e);
                String::from(DEFAULT_ADMIN_NAME)
            }
        };

        let tenants = self.read_collection::<Tenant>().await?;
        let ledger = self.read_collection::<RentLedger>().await?;

        self.admin_name = name;
        self.tenants = tenants
            .into_iter()
            .map(|(id, tenant)| tenant.with_id(id))
            .collect();
        self.ledger = ledger.into_iter().collect();
        self.state = SurfaceState::Ready;
        info!(
            "admin surface ready for {}: {} tenants, {} ledgers",
            email,
            self.tenants.len(),
            self.ledger.len()
        );
        Ok(())
    }

    /// Lists a collection and decodes each document on its own. Unreadable
    /// documents are logged and left out.
    async fn read_collection<T: DocumentModel>(&self) -> Result<Vec<(String, T)>, ManagerError> {
        let docs = bounded(self.timeout, self.store.list(T::collection()))
            .await
            .map_err(ManagerError::RemoteRead)?;
        let items = docs
            .into_iter()
            .filter_map(|doc| match doc.decode::<T>() {
                Ok(item) => Some((doc.key, item)),
                Err(e) => {
                    warn!("skipping unreadable {}/{}: {}", T::collection(), doc.key, e);
                    None
                }
            })
            .collect();
        Ok(items)
    }

    fn ensure_ready(&self) -> Result<(), ManagerError> {
        match self.state {
            SurfaceState::Ready => Ok(()),
            SurfaceState::Loading => Err(ManagerError::NotReady),
        }
    }

    fn write_failed(collection: &'static str, key: &str, source: StoreError) -> ManagerError {
        ManagerError::RemoteWrite {
            collection,
            key: key.to_string(),
            source,
        }
    }
}
