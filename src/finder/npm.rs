//! npm registry license finder.
//!
//! The registry document has carried license data in four shapes over the
//! years: `license` as a plain string, `license` as a `{type, url}` object,
//! `licenses` as an array of strings, and `licenses` as an array of
//! objects. Both fields can also appear per published version. The shapes
//! are modeled as an untagged serde sum type; the per-version field wins
//! over the top-level one.

use super::cache::LicenseCache;
use super::http::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
use super::{component_cache_key, license_string_to_choice, LicenseFinder};
use crate::error::{FinderErrorKind, LicenseToolsError, Result};
use crate::model::{Component, LicenseChoice};
use crate::normalize::NameNormalizer;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Matches purls starting with `pkg:npm` (optionally scoped) and carrying
/// complete name/version information.
const NPM_PURL_PATTERN: &str = r"^pkg:npm/(@?[\w._-]+/)?[\w._-]+@[\w._-]+$";

const NPM_BASE_URL: &str = "https://registry.npmjs.org";
const NPM_CACHE_FILE: &str = ".npm-license-cache.dat";

/// Configuration for the npm finder.
#[derive(Debug, Clone)]
pub struct NpmFinderConfig {
    /// Registry base URL
    pub base_url: String,
    /// Persistent cache location
    pub cache_path: PathBuf,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for NpmFinderConfig {
    fn default() -> Self {
        Self {
            base_url: NPM_BASE_URL.to_string(),
            cache_path: PathBuf::from(NPM_CACHE_FILE),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// License finder for fully qualified npm components.
#[derive(Debug)]
pub struct NpmLicenseFinder {
    config: NpmFinderConfig,
    purl_regex: Regex,
    normalizer: NameNormalizer,
    cache: LicenseCache,
    http: HttpClient,
}

impl NpmLicenseFinder {
    pub fn new(config: NpmFinderConfig) -> Result<Self> {
        let http = HttpClient::new(config.timeout)?;
        let cache = LicenseCache::new(&config.cache_path);
        Ok(Self {
            config,
            purl_regex: Regex::new(NPM_PURL_PATTERN).expect("static regex"),
            normalizer: NameNormalizer::new(),
            cache,
            http,
        })
    }

    fn fetch_package_info(&self, component: &Component) -> Result<PackageInfo> {
        let url = format_package_info_url(&self.config.base_url, component);
        tracing::debug!(url = %url, "fetching package info from npm registry");
        let body = self.http.get_string(&url)?;
        parse_package_info(&body)
    }
}

impl LicenseFinder for NpmLicenseFinder {
    fn startup(&mut self) {
        self.cache.load();
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.cache.save() {
            tracing::warn!(error = %e, "failed to save npm license cache");
        }
    }

    fn is_applicable(&self, component: &Component) -> bool {
        let applicable = self.purl_regex.is_match(&component.purl);
        if !applicable {
            tracing::debug!(purl = %component.purl, "not a fully qualified npm component");
        }
        applicable
    }

    fn find_licenses(&mut self, component: &Component) -> Result<Vec<LicenseChoice>> {
        let cache_key = component_cache_key(component);
        if let Some(choices) = self.cache.get(&cache_key) {
            return Ok(choices.clone());
        }

        let package_info = self.fetch_package_info(component)?;
        let license_strings = extract_license_strings(&package_info, component)?;
        let choices: Vec<LicenseChoice> = license_strings
            .iter()
            .map(|s| license_string_to_choice(&self.normalizer, s))
            .collect();

        self.cache.put(cache_key, choices.clone());
        Ok(choices)
    }
}

/// `https://registry.npmjs.org/@babel/code-frame` for scoped packages,
/// `https://registry.npmjs.org/express` for plain ones.
fn format_package_info_url(base_url: &str, component: &Component) -> String {
    if component.group.is_empty() {
        format!("{base_url}/{}", component.name)
    } else {
        format!("{base_url}/{}/{}", component.group, component.name)
    }
}

fn parse_package_info(body: &str) -> Result<PackageInfo> {
    serde_json::from_str(body).map_err(|e| {
        LicenseToolsError::finder(
            "parsing npm package info",
            FinderErrorKind::InvalidResponse(e.to_string()),
        )
    })
}

/// Pull the license strings out of the package document, preferring the
/// requested version's fields over the top-level ones.
fn extract_license_strings(
    package_info: &PackageInfo,
    component: &Component,
) -> Result<Vec<String>> {
    let mut values = Vec::new();
    if let Some(version_info) = package_info.versions.get(&component.version) {
        version_info.license_fields.collect_into(&mut values);
    }
    if values.is_empty() {
        package_info.license_fields.collect_into(&mut values);
    }
    if values.is_empty() {
        return Err(LicenseToolsError::finder(
            format!(
                "package info for {}@{} contains no license information",
                component.name, component.version
            ),
            FinderErrorKind::InvalidResponse("missing license/licenses field".to_string()),
        ));
    }

    Ok(values
        .into_iter()
        .map(|value| match value {
            NpmLicenseValue::Plain(s) => s,
            NpmLicenseValue::Typed { license_type } => license_type,
        })
        .collect())
}

// ---- Wire model ----

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageInfo {
    #[serde(flatten)]
    license_fields: NpmLicenseFields,
    versions: HashMap<String, VersionInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VersionInfo {
    #[serde(flatten)]
    license_fields: NpmLicenseFields,
}

/// The two field spellings; each may hold a single value or an array.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NpmLicenseFields {
    license: Option<NpmLicenseField>,
    licenses: Option<NpmLicenseField>,
}

impl NpmLicenseFields {
    /// Flatten whichever field is present into `values`, singular field
    /// first, array or scalar alike.
    fn collect_into(&self, values: &mut Vec<NpmLicenseValue>) {
        let field = self.license.as_ref().or(self.licenses.as_ref());
        match field {
            Some(NpmLicenseField::One(value)) => values.push(value.clone()),
            Some(NpmLicenseField::Many(items)) => values.extend(items.iter().cloned()),
            None => {}
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NpmLicenseField {
    One(NpmLicenseValue),
    Many(Vec<NpmLicenseValue>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NpmLicenseValue {
    Plain(String),
    Typed {
        #[serde(rename = "type")]
        license_type: String,
    },
}
