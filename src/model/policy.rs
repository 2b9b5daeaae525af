//! Usage-policy values and the license policy store.
//!
//! The policy store is the read-only catalog the expression engine resolves
//! leaves against. Policy authoring is external; the store only loads and
//! indexes records.

use crate::error::{LicenseToolsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Organization-defined verdict on whether a license may be used.
///
/// `Undefined` is both the miss outcome of a policy lookup and a
/// short-circuit input of the three-valued evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsagePolicy {
    Allow,
    Deny,
    NeedsReview,
    #[default]
    Undefined,
}

impl fmt::Display for UsagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
            Self::NeedsReview => write!(f, "needs-review"),
            Self::Undefined => write!(f, "UNDEFINED"),
        }
    }
}

impl UsagePolicy {
    /// Whether a lookup or evaluation produced an actual verdict.
    #[must_use]
    pub fn is_defined(self) -> bool {
        self != Self::Undefined
    }
}

/// A single license policy record as authored in the policy catalog.
///
/// `urls` is ordered; the first entry is the primary URL used when the
/// record is rendered into a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePolicyRecord {
    /// SPDX short identifier (e.g. `Apache-2.0`); empty for name-only records
    #[serde(default)]
    pub id: String,
    /// Canonical human-readable license name
    #[serde(default)]
    pub name: String,
    /// Alternate spellings that resolve to this record
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Known license-text URLs, primary first
    #[serde(default)]
    pub urls: Vec<String>,
    /// The organization's verdict for this license
    #[serde(default)]
    pub usage_policy: UsagePolicy,
}

impl LicensePolicyRecord {
    /// Miss record: carries the queried key as name so reports still show
    /// what was looked up, with an `Undefined` policy.
    fn undefined(key: &str) -> Self {
        Self {
            name: key.to_string(),
            ..Self::default()
        }
    }

    /// The primary URL, if any.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

/// Normalize a URL for index lookup: scheme and trailing slash are
/// insignificant, comparison is case-insensitive.
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_lowercase()
}

/// Read-only catalog mapping SPDX id, name, or URL to a policy record.
///
/// All three indexes point into one record table. A miss never fails; it
/// yields a record with `usage_policy == Undefined`.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    records: Vec<LicensePolicyRecord>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    by_url: HashMap<String, usize>,
}

impl PolicyStore {
    /// Create an empty store; every lookup yields an `Undefined` record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from authored records.
    ///
    /// Later records win on index collisions, mirroring how an
    /// organization's overrides are appended to a base catalog.
    #[must_use]
    pub fn from_records(records: Vec<LicensePolicyRecord>) -> Self {
        let mut store = Self {
            records,
            ..Self::default()
        };
        for (idx, record) in store.records.iter().enumerate() {
            if !record.id.is_empty() {
                store.by_id.insert(record.id.clone(), idx);
            }
            if !record.name.is_empty() {
                store.by_name.insert(record.name.to_lowercase(), idx);
            }
            for alias in &record.aliases {
                store.by_name.insert(alias.to_lowercase(), idx);
            }
            for url in &record.urls {
                store.by_url.insert(normalize_url(url), idx);
            }
        }
        store
    }

    /// Load a store from a JSON array of records.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<LicensePolicyRecord> = serde_json::from_str(json)
            .map_err(|e| LicenseToolsError::PolicyConfig(e.to_string()))?;
        Ok(Self::from_records(records))
    }

    /// Load a store from a JSON policy file reader.
    pub fn from_json_reader(reader: impl std::io::Read) -> Result<Self> {
        let records: Vec<LicensePolicyRecord> = serde_json::from_reader(reader)
            .map_err(|e| LicenseToolsError::PolicyConfig(e.to_string()))?;
        Ok(Self::from_records(records))
    }

    /// Number of loaded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up by SPDX id (exact, case-sensitive).
    ///
    /// A trailing `+` (or-later suffix) is retried without the suffix when
    /// the exact form is not catalogued.
    #[must_use]
    pub fn find_by_spdx_id(&self, id: &str) -> LicensePolicyRecord {
        if let Some(&idx) = self.by_id.get(id) {
            return self.records[idx].clone();
        }
        if let Some(stripped) = id.strip_suffix('+') {
            if let Some(&idx) = self.by_id.get(stripped) {
                return self.records[idx].clone();
            }
        }
        LicensePolicyRecord::undefined(id)
    }

    /// Look up by license name (exact, case-insensitive; aliases included).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> LicensePolicyRecord {
        match self.by_name.get(&name.trim().to_lowercase()) {
            Some(&idx) => self.records[idx].clone(),
            None => LicensePolicyRecord::undefined(name),
        }
    }

    /// Look up by license URL (normalized: scheme-insensitive, trailing
    /// slash ignored).
    #[must_use]
    pub fn find_by_url(&self, url: &str) -> LicensePolicyRecord {
        match self.by_url.get(&normalize_url(url)) {
            Some(&idx) => self.records[idx].clone(),
            None => LicensePolicyRecord::undefined(url),
        }
    }

    /// Resolve an expression leaf: id, then name, then URL.
    ///
    /// This is the lookup cascade the expression parser uses for every
    /// symbol, so that URL-list expressions and name-in-expression leaves
    /// still land on a catalogued record.
    #[must_use]
    pub fn resolve(&self, symbol: &str) -> LicensePolicyRecord {
        let by_id = self.find_by_spdx_id(symbol);
        if by_id.usage_policy.is_defined() {
            return by_id;
        }
        let by_name = self.find_by_name(symbol);
        if by_name.usage_policy.is_defined() {
            return by_name;
        }
        let by_url = self.find_by_url(symbol);
        if by_url.usage_policy.is_defined() {
            return by_url;
        }
        LicensePolicyRecord::undefined(symbol)
    }
}
