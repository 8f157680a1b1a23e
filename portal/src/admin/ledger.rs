use super::AdminSurface;
use crate::error::ManagerError;
use crate::timeout::bounded;
use docstore::{DocumentModel, Fields, ModelStore, StoreError, WriteMode};
use keyvalue_common::{
    parse_amount, require, Display, NewTenant, PeriodKey, RentEntry, RentLedger, Tenant,
    ValidationError,
};
use log::{info, warn};
use serde_json::{json, Value};

/// Outcome of opening a billing month across the roster. Writes are not
/// atomic: some tenants may have been billed while others failed.
#[derive(Debug)]
pub struct MonthOpening {
    pub period: String,
    pub amount: f64,
    pub updated: Vec<String>,
    pub failed: Vec<FailedWrite>,
}

#[derive(Debug)]
pub struct FailedWrite {
    pub tenant_id: String,
    pub error: StoreError,
}

impl MonthOpening {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.tenant_id.as_str()).collect()
    }
}

impl Display for MonthOpening {
    fn display(&self) -> Value {
        let failed: Vec<Value> = self
            .failed
            .iter()
            .map(|f| json!({ "tenantId": f.tenant_id, "error": f.error.to_string() }))
            .collect();
        json!({
            "period": self.period,
            "amount": self.amount,
            "updated": self.updated,
            "failed": failed,
        })
    }
}

fn period_patch(period: &str, entry: RentEntry) -> Fields {
    let mut patch = Fields::new();
    patch.insert(period.to_string(), json!({ "pendingDue": entry.pending_due }));
    patch
}

impl AdminSurface {
    /// Registers a tenant. Nothing is sent unless the form is complete and
    /// the id is new to the roster.
    pub async fn add_tenant(&mut self, form: &NewTenant) -> Result<Tenant, ManagerError> {
        self.ensure_ready()?;
        let tenant = form.validate()?;
        if self.tenant(&tenant.id).is_some() {
            return Err(ValidationError::DuplicateTenant(tenant.id).into());
        }

        let confirmed = bounded(
            self.timeout,
            self.store.save(&tenant.id, &tenant, WriteMode::Replace),
        )
        .await
        .map_err(|e| Self::write_failed(Tenant::collection(), &tenant.id, e))?
        .with_id(tenant.id.clone());

        info!("added tenant {} in room {}", confirmed.id, confirmed.room);
        self.tenants.push(confirmed.clone());
        self.add_tenant_open = false;
        Ok(confirmed)
    }

    /// Bills `amount` for the given month to every tenant on the roster,
    /// one write per tenant. Earlier dues for the same month are overwritten.
    pub async fn open_month_for_all(
        &mut self,
        year: &str,
        month: &str,
        amount: &str,
    ) -> Result<MonthOpening, ManagerError> {
        self.ensure_ready()?;
        require("year", year)?;
        require("month", month)?;
        require("amount", amount)?;
        let period = PeriodKey::from_inputs(year, month)?.to_string();
        let amount = parse_amount(amount)?;

        let targets: Vec<String> = self.tenants.iter().map(|t| t.id.clone()).collect();
        let mut opening = MonthOpening {
            period: period.clone(),
            amount,
            updated: Vec::with_capacity(targets.len()),
            failed: Vec::new(),
        };

        for tenant_id in targets {
            let patch = period_patch(&period, RentEntry::due(amount));
            let written = bounded(
                self.timeout,
                self.store
                    .set(RentLedger::collection(), &tenant_id, patch, WriteMode::Merge),
            )
            .await;
            match written {
                Ok(doc) => {
                    match doc.decode::<RentLedger>() {
                        Ok(ledger) => {
                            self.ledger.insert(tenant_id.clone(), ledger);
                        }
                        Err(e) => warn!("ledger for {} written but unreadable: {}", tenant_id, e),
                    }
                    opening.updated.push(tenant_id);
                }
                Err(error) => {
                    warn!("opening {} for {} failed: {}", period, tenant_id, error);
                    opening.failed.push(FailedWrite { tenant_id, error });
                }
            }
        }

        info!(
            "opened {} at {} for {} tenants, {} failed",
            opening.period,
            opening.amount,
            opening.updated.len(),
            opening.failed.len()
        );
        Ok(opening)
    }

    /// Zeroes the due for one period. `period` is the key as stored, so
    /// legacy unpadded keys can still be settled, but it must still name a
    /// year and month. Repeating it changes nothing.
    pub async fn mark_paid(
        &mut self,
        tenant_id: &str,
        period: &str,
    ) -> Result<RentLedger, ManagerError> {
        self.ensure_ready()?;
        let tenant_id = require("tenant id", tenant_id)?;
        let period = require("period", period)?;
        // only the shape is checked; the stored spelling is written back as is
        period.parse::<PeriodKey>()?;
        if self.tenant(tenant_id).is_none() {
            return Err(ManagerError::UnknownTenant(tenant_id.to_string()));
        }

        let patch = period_patch(period, RentEntry::paid());
        let doc = bounded(
            self.timeout,
            self.store
                .set(RentLedger::collection(), tenant_id, patch, WriteMode::Merge),
        )
        .await
        .map_err(|e| Self::write_failed(RentLedger::collection(), tenant_id, e))?;
        let ledger: RentLedger = doc.decode().map_err(ManagerError::RemoteRead)?;

        info!("{} marked paid for {}", period, tenant_id);
        self.ledger.insert(tenant_id.to_string(), ledger.clone());
        Ok(ledger)
    }
}
