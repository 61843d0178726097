//! Paper trading: saved portfolios tracked against virtual capital.
//!
//! Portfolios are created by an explicit save, deleted by id and never
//! expire. The whole book is one persisted record; every mutation is a
//! locked read-modify-write.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use insightlab_core::PortfolioResult;

use crate::store::{load_or_default, save_record, RecordStore, PAPER_PORTFOLIOS_KEY};

/// Virtual starting capital of every paper portfolio.
pub const INITIAL_CAPITAL: f64 = 10_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum PaperError {
    #[error("portfolio name must not be empty")]
    EmptyName,

    #[error("portfolio must hold at least one ticker")]
    NoHoldings,

    #[error("weight for '{ticker}' is not finite")]
    NonFiniteWeight { ticker: String },

    #[error("no paper portfolio with id '{0}'")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperPortfolio {
    pub id: String,
    pub name: String,
    pub initial_capital_units: f64,
    pub current_value: f64,
    pub tickers: Vec<String>,
    pub weights: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_of_last_result: Option<PortfolioResult>,
    pub is_active: bool,
}

impl Default for PaperPortfolio {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            initial_capital_units: INITIAL_CAPITAL,
            current_value: INITIAL_CAPITAL,
            tickers: Vec::new(),
            weights: BTreeMap::new(),
            created_at: DateTime::<Utc>::default(),
            last_updated: DateTime::<Utc>::default(),
            snapshot_of_last_result: None,
            is_active: true,
        }
    }
}

impl PaperPortfolio {
    /// Total return on virtual capital, as a fraction.
    pub fn total_return(&self) -> f64 {
        if self.initial_capital_units == 0.0 {
            return 0.0;
        }
        self.current_value / self.initial_capital_units - 1.0
    }
}

/// Fields to change on an existing portfolio. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct PaperUpdate {
    pub name: Option<String>,
    pub weights: Option<BTreeMap<String, f64>>,
    /// New result snapshot; also revalues the portfolio.
    pub snapshot: Option<PortfolioResult>,
    pub is_active: Option<bool>,
}

/// Value of a paper portfolio under a result's cumulative return series:
/// capital × last / first.
///
/// Falls back to the initial capital when there is no result, no series, or
/// the series cannot be read as a growth ratio.
pub fn paper_value(portfolio: &PaperPortfolio, result: Option<&PortfolioResult>) -> f64 {
    let capital = portfolio.initial_capital_units;
    let Some(series) = result.and_then(|r| r.return_series.as_deref()) else {
        return capital;
    };
    match (series.first(), series.last()) {
        (Some(first), Some(last))
            if first.value.is_finite() && first.value != 0.0 && last.value.is_finite() =>
        {
            capital * (last.value / first.value)
        }
        _ => capital,
    }
}

/// Content-hash id: `paper_` + 16 hex chars of BLAKE3 over name, creation
/// time and book size.
fn paper_id(name: &str, created_at: &DateTime<Utc>, book_len: usize, salt: u32) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    hasher.update(&(book_len as u64).to_le_bytes());
    hasher.update(&salt.to_le_bytes());
    let hex = hasher.finalize().to_hex();
    format!("paper_{}", &hex[..16])
}

fn validate_weights(weights: &BTreeMap<String, f64>) -> Result<(), PaperError> {
    if weights.is_empty() {
        return Err(PaperError::NoHoldings);
    }
    if let Some((ticker, _)) = weights.iter().find(|(_, w)| !w.is_finite()) {
        return Err(PaperError::NonFiniteWeight {
            ticker: ticker.clone(),
        });
    }
    Ok(())
}

/// The persisted list of paper portfolios.
///
/// Persistence failures are logged and swallowed: the in-memory answer is
/// still returned, it just will not survive a restart.
pub struct PaperBook<S> {
    store: S,
    lock: Mutex<()>,
}

impl<S: RecordStore> PaperBook<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// All portfolios in creation order.
    pub fn list(&self) -> Vec<PaperPortfolio> {
        load_or_default(&self.store, PAPER_PORTFOLIOS_KEY)
    }

    pub fn get(&self, id: &str) -> Option<PaperPortfolio> {
        self.list().into_iter().find(|p| p.id == id)
    }

    pub fn create(
        &self,
        name: &str,
        weights: BTreeMap<String, f64>,
        snapshot: Option<PortfolioResult>,
    ) -> Result<PaperPortfolio, PaperError> {
        self.create_at(name, weights, snapshot, Utc::now())
    }

    pub fn create_at(
        &self,
        name: &str,
        weights: BTreeMap<String, f64>,
        snapshot: Option<PortfolioResult>,
        now: DateTime<Utc>,
    ) -> Result<PaperPortfolio, PaperError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PaperError::EmptyName);
        }
        validate_weights(&weights)?;

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut book = self.list();

        let mut salt = 0;
        let mut id = paper_id(name, &now, book.len(), salt);
        while book.iter().any(|p| p.id == id) {
            salt += 1;
            id = paper_id(name, &now, book.len(), salt);
        }

        let portfolio = PaperPortfolio {
            id,
            name: name.to_string(),
            tickers: weights.keys().cloned().collect(),
            weights,
            created_at: now,
            last_updated: now,
            snapshot_of_last_result: snapshot,
            ..Default::default()
        };
        book.push(portfolio.clone());
        self.persist(&book);
        info!(id = %portfolio.id, name = %portfolio.name, "paper portfolio created");
        Ok(portfolio)
    }

    pub fn update(&self, id: &str, changes: PaperUpdate) -> Result<PaperPortfolio, PaperError> {
        self.update_at(id, changes, Utc::now())
    }

    /// Apply `changes` and bump `last_updated`.
    pub fn update_at(
        &self,
        id: &str,
        changes: PaperUpdate,
        now: DateTime<Utc>,
    ) -> Result<PaperPortfolio, PaperError> {
        if let Some(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(PaperError::EmptyName);
            }
        }
        if let Some(weights) = &changes.weights {
            validate_weights(weights)?;
        }

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut book = self.list();
        let portfolio = book
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PaperError::NotFound(id.to_string()))?;

        if let Some(name) = changes.name {
            portfolio.name = name.trim().to_string();
        }
        if let Some(weights) = changes.weights {
            portfolio.tickers = weights.keys().cloned().collect();
            portfolio.weights = weights;
        }
        if let Some(snapshot) = changes.snapshot {
            portfolio.current_value = paper_value(portfolio, Some(&snapshot));
            portfolio.snapshot_of_last_result = Some(snapshot);
        }
        if let Some(active) = changes.is_active {
            portfolio.is_active = active;
        }
        portfolio.last_updated = now;

        let updated = portfolio.clone();
        self.persist(&book);
        Ok(updated)
    }

    /// Remove a portfolio. Returns false if no portfolio had that id.
    pub fn delete(&self, id: &str) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut book = self.list();
        let before = book.len();
        book.retain(|p| p.id != id);
        if book.len() == before {
            return false;
        }
        self.persist(&book);
        info!(id, "paper portfolio deleted");
        true
    }

    fn persist(&self, book: &[PaperPortfolio]) {
        if let Err(e) = save_record(&self.store, PAPER_PORTFOLIOS_KEY, &book) {
            warn!(error = %e, "failed to persist paper portfolios");
        }
    }
}
