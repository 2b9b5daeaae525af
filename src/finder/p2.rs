//! Eclipse p2 license finder.
//!
//! p2 artifacts (plugins, features, installable units) have no registry
//! metadata of their own; the Eclipse Foundation's license-check service
//! answers for them. The service takes a JSON dependency list wrapped in a
//! form-encoded `request=` field and reports one approved entry whose
//! `license` attribute is an SPDX id or expression. Proprietary
//! `LicenseRef-*` tails are stripped before the string is interpreted.

use super::cache::LicenseCache;
use super::http::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
use super::{component_cache_key, license_string_to_choice, LicenseFinder};
use crate::error::{FinderErrorKind, LicenseToolsError, Result};
use crate::model::{Component, LicenseChoice};
use crate::normalize::NameNormalizer;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Matches purls starting with `pkg:maven/p2.`, carrying complete
/// group/artifact/version information and one of the p2 packaging types.
const P2_PURL_PATTERN: &str = r"^pkg:maven/p2\.[\w._-]+/[\w._-]+@[\w._-]+\?(classifier=[\w%.-]+&)?type=(eclipse-plugin|eclipse-feature|p2-installable-unit)$";

/// Trailing `AND|OR|WITH LicenseRef-…` conjunctions are proprietary
/// references that pollute a standard expression.
const LICENSE_REF_TAIL_PATTERN: &str = r"(\s+(AND|OR|WITH)\s+LicenseRef-[\w.-]+)+";

const ECLIPSE_LICENSE_CHECK_URL: &str =
    "https://www.eclipse.org/projects/services/license_check.php";
const P2_CACHE_FILE: &str = ".p2-license-cache.dat";

/// Configuration for the p2 finder.
#[derive(Debug, Clone)]
pub struct P2FinderConfig {
    /// License-check service endpoint
    pub service_url: String,
    /// Persistent cache location
    pub cache_path: PathBuf,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for P2FinderConfig {
    fn default() -> Self {
        Self {
            service_url: ECLIPSE_LICENSE_CHECK_URL.to_string(),
            cache_path: PathBuf::from(P2_CACHE_FILE),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// License finder for fully qualified Eclipse p2 components.
#[derive(Debug)]
pub struct P2LicenseFinder {
    config: P2FinderConfig,
    purl_regex: Regex,
    license_ref_regex: Regex,
    normalizer: NameNormalizer,
    cache: LicenseCache,
    http: HttpClient,
}

impl P2LicenseFinder {
    pub fn new(config: P2FinderConfig) -> Result<Self> {
        let http = HttpClient::new(config.timeout)?;
        let cache = LicenseCache::new(&config.cache_path);
        Ok(Self {
            config,
            purl_regex: Regex::new(P2_PURL_PATTERN).expect("static regex"),
            license_ref_regex: Regex::new(LICENSE_REF_TAIL_PATTERN).expect("static regex"),
            normalizer: NameNormalizer::new(),
            cache,
            http,
        })
    }

    fn query_license_check_service(&self, component: &Component) -> Result<LicenseCheckResponse> {
        let request = DependencyRequest {
            dependencies: vec![format!(
                "p2/orbit/{}/{}/{}",
                component.group, component.name, component.version
            )],
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            LicenseToolsError::finder(
                "encoding license-check request",
                FinderErrorKind::InvalidResponse(e.to_string()),
            )
        })?;

        tracing::debug!(
            url = %self.config.service_url,
            coordinate = %component.coordinate(),
            "querying Eclipse license-check service"
        );
        let body = self
            .http
            .post_form(&self.config.service_url, "request", &request_json)?;
        parse_license_check_response(&body)
    }
}

impl LicenseFinder for P2LicenseFinder {
    fn startup(&mut self) {
        self.cache.load();
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.cache.save() {
            tracing::warn!(error = %e, "failed to save p2 license cache");
        }
    }

    fn is_applicable(&self, component: &Component) -> bool {
        let applicable = self.purl_regex.is_match(&component.purl);
        if !applicable {
            tracing::debug!(purl = %component.purl, "not a fully qualified p2 component");
        }
        applicable
    }

    fn find_licenses(&mut self, component: &Component) -> Result<Vec<LicenseChoice>> {
        let cache_key = component_cache_key(component);
        if let Some(choices) = self.cache.get(&cache_key) {
            return Ok(choices.clone());
        }

        let response = self.query_license_check_service(component)?;
        let choices = extract_license_choices(&response, &self.license_ref_regex, &self.normalizer);

        self.cache.put(cache_key, choices.clone());
        Ok(choices)
    }
}

fn parse_license_check_response(body: &str) -> Result<LicenseCheckResponse> {
    serde_json::from_str(body).map_err(|e| {
        LicenseToolsError::finder(
            "parsing license-check response",
            FinderErrorKind::InvalidResponse(e.to_string()),
        )
    })
}

/// Take the single approved component's license string, strip any
/// `LicenseRef-*` conjunction tail, and emit an expression or id choice.
fn extract_license_choices(
    response: &LicenseCheckResponse,
    license_ref_regex: &Regex,
    normalizer: &NameNormalizer,
) -> Vec<LicenseChoice> {
    let Some(entry) = response.approved.values().next() else {
        return Vec::new();
    };
    let license = license_ref_regex.replace_all(&entry.license, "");
    let license = license.trim();
    if license.is_empty() {
        return Vec::new();
    }
    vec![license_string_to_choice(normalizer, license)]
}

// ---- Wire model ----

#[derive(Debug, Serialize)]
struct DependencyRequest {
    dependencies: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LicenseCheckResponse {
    approved: HashMap<String, ApprovedEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovedEntry {
    #[serde(default)]
    license: String,
}
