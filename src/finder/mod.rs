//! Remote license discovery for components without declared licenses.
//!
//! Each finder owns a package-URL regex, a vendor-specific remote lookup
//! and a persistent cache; the [`LicenseFinderService`] dispatches a
//! component to the first applicable finder. All state is per-instance:
//! regexes are compiled at construction and caches live in the finder,
//! with an explicit `startup`/`shutdown` lifecycle around the disk file.

mod cache;
mod http;
mod maven;
mod npm;
mod p2;
mod service;

pub use cache::LicenseCache;
pub use http::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
pub use maven::{MavenFinderConfig, MavenLicenseFinder};
pub use npm::{NpmFinderConfig, NpmLicenseFinder};
pub use p2::{P2FinderConfig, P2LicenseFinder};
pub use service::LicenseFinderService;

use crate::error::Result;
use crate::model::{Component, LicenseChoice};
use crate::normalize::NameNormalizer;

/// A vendor-specific remote license lookup with a persistent cache.
pub trait LicenseFinder {
    /// Load the persistent cache. Called once before any lookups.
    fn startup(&mut self);

    /// Persist the cache. Called once after the walk completes.
    fn shutdown(&mut self);

    /// Whether this finder can answer for the component (purl match).
    fn is_applicable(&self, component: &Component) -> bool;

    /// Look up the component's licenses; may legitimately return an empty
    /// list when the registry has no license data.
    fn find_licenses(&mut self, component: &Component) -> Result<Vec<LicenseChoice>>;
}

/// Cache key for a component: `group:name:version`.
pub(crate) fn component_cache_key(component: &Component) -> String {
    component.coordinate()
}

/// Turn a registry-provided license string into a choice: a compound
/// string becomes an expression, anything else an SPDX id.
pub(crate) fn license_string_to_choice(
    normalizer: &NameNormalizer,
    license: &str,
) -> LicenseChoice {
    if normalizer.is_expression(license) {
        LicenseChoice::expression(license)
    } else {
        LicenseChoice::id(license)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_string_to_choice() {
        let normalizer = NameNormalizer::new();
        assert_eq!(
            license_string_to_choice(&normalizer, "EPL-2.0"),
            LicenseChoice::id("EPL-2.0")
        );
        assert_eq!(
            license_string_to_choice(&normalizer, "Apache-2.0 AND EPL-2.0 AND W3C"),
            LicenseChoice::expression("Apache-2.0 AND EPL-2.0 AND W3C")
        );
    }
}
