use crate::validation::{require, ValidationError};
use docstore::DocumentModel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct RentEntry {
    #[serde(rename = "pendingDue", default)]
    pub pending_due: f64,
}

impl RentEntry {
    pub fn due(amount: f64) -> Self {
        RentEntry {
            pending_due: amount,
        }
    }

    pub fn paid() -> Self {
        RentEntry { pending_due: 0.0 }
    }

    /// A zero due reads as paid, whether or not anything was ever billed.
    pub fn status(&self) -> RentStatus {
        if self.pending_due > 0.0 {
            RentStatus::Pending(self.pending_due)
        } else {
            RentStatus::Paid
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "status", content = "amount", rename_all = "camelCase")]
pub enum RentStatus {
    Pending(f64),
    Paid,
}

/// Per-tenant ledger, keyed by the tenant id outside the document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, DocumentModel)]
#[document(collection = "rent")]
#[serde(transparent)]
pub struct RentLedger {
    pub periods: BTreeMap<String, RentEntry>,
}

impl RentLedger {
    pub fn entry(&self, period: &str) -> Option<&RentEntry> {
        self.periods.get(period)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &RentEntry)> {
        self.periods.iter()
    }

    /// Sum of everything still pending.
    pub fn outstanding(&self) -> f64 {
        self.periods.values().map(|entry| entry.pending_due.max(0.0)).sum()
    }
}

impl crate::Display for RentLedger {
    fn display(&self) -> Value {
        let periods: Vec<Value> = self
            .entries()
            .map(|(period, entry)| {
                json!({
                    "period": period,
                    "pendingDue": entry.pending_due,
                    "state": entry.status(),
                })
            })
            .collect();
        json!({ "periods": periods, "outstanding": self.outstanding() })
    }
}

/// A billing month, always rendered as zero-padded `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    year: u16,
    month: u8,
}

impl PeriodKey {
    pub fn new(year: u16, month: u8) -> Result<Self, ValidationError> {
        if !(1000..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidPeriod(format!("{}-{}", year, month)));
        }
        Ok(PeriodKey { year, month })
    }

    /// Builds a period from separate year and month inputs. `"3"` and `"03"`
    /// name the same month.
    pub fn from_inputs(year: &str, month: &str) -> Result<Self, ValidationError> {
        let year = require("year", year)?;
        let month = require("month", month)?;
        let invalid = || ValidationError::InvalidPeriod(format!("{}-{}", year, month));
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if month.len() > 2 || !month.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = year.parse::<u16>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        PeriodKey::new(year, month)
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = ValidationError;

    /// Accepts stored keys written without padding, such as `2024-3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((year, month)) => PeriodKey::from_inputs(year, month),
            None => Err(ValidationError::InvalidPeriod(s.to_string())),
        }
    }
}

/// Parses the amount billed for a period.
pub fn parse_amount(amount: &str) -> Result<f64, ValidationError> {
    let raw = require("amount", amount)?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(ValidationError::InvalidNumber {
            field: "amount",
            value: raw.to_string(),
        }),
    }
}
