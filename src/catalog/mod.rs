//! License catalog construction: the per-component discovery pipeline.
//!
//! For every component the walker hands over: declared licenses win; a
//! component without any is checked against the well-known table, then
//! against the remote finders. Whatever survives is normalized, resolved
//! against the policy store (expressions through the expression engine) and
//! filed into the catalog under its fingerprint key. A component that ends
//! up with nothing — including one whose remote lookup failed — is filed
//! under the `NOASSERTION` sentinel so it still appears in reports.

use crate::error::Result;
use crate::expression::parse_expression;
use crate::finder::LicenseFinderService;
use crate::model::{
    Component, LicenseChoice, LicenseLocation, PolicyStore, Service, UsagePolicy,
};
use crate::normalize::{LicenseKind, NameNormalizer, NormalizedLicense};
use crate::wellknown::lookup_well_known_licenses;
use indexmap::IndexMap;
use serde::Serialize;

/// Sentinel key for components and services without any license assertion.
pub const NO_ASSERTION: &str = "NOASSERTION";

/// Resource name for document-level licenses that belong to no component.
pub const NOT_APPLICABLE: &str = "N/A";

/// One resolved license occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseFinding {
    /// Local BOM reference of the declaring entity
    pub bom_ref: String,
    /// Name of the declaring component or service
    pub resource_name: String,
    /// Where in the document the license was found
    pub location: LicenseLocation,
    /// The (possibly normalized) license choice that was resolved
    pub license_choice: LicenseChoice,
    /// How the fingerprint key resolves; `None` for `NOASSERTION` entries
    pub kind: Option<LicenseKind>,
    /// Canonical display name of the license or expression
    pub license: String,
    /// The organization's verdict
    pub usage_policy: UsagePolicy,
    /// Primary URLs of the resolved licenses, in visit order
    pub urls: Vec<String>,
}

/// Insertion-ordered catalog of findings grouped by fingerprint key.
#[derive(Debug, Default, Serialize)]
pub struct LicenseCatalog {
    entries: IndexMap<String, Vec<LicenseFinding>>,
}

impl LicenseCatalog {
    /// Findings filed under one fingerprint key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[LicenseFinding]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Iterate keys with their findings, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[LicenseFinding])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every finding, in file order.
    pub fn findings(&self) -> impl Iterator<Item = &LicenseFinding> {
        self.entries.values().flatten()
    }

    /// Number of distinct fingerprint keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no findings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, finding: LicenseFinding) {
        self.entries.entry(key).or_default().push(finding);
    }
}

/// Builds a [`LicenseCatalog`] one component or service at a time.
pub struct CatalogBuilder<'a> {
    policy_store: &'a PolicyStore,
    normalizer: NameNormalizer,
    finder_service: Option<LicenseFinderService>,
    catalog: LicenseCatalog,
}

impl<'a> CatalogBuilder<'a> {
    /// A builder without remote discovery: declared licenses and the
    /// well-known table only.
    #[must_use]
    pub fn new(policy_store: &'a PolicyStore) -> Self {
        Self {
            policy_store,
            normalizer: NameNormalizer::new(),
            finder_service: None,
            catalog: LicenseCatalog::default(),
        }
    }

    /// Attach remote discovery. The finder caches are loaded here and
    /// persisted when [`finish`](Self::finish) runs.
    #[must_use]
    pub fn with_finder_service(mut self, mut service: LicenseFinderService) -> Self {
        service.startup();
        self.finder_service = Some(service);
        self
    }

    /// Hash the document-level metadata licenses. Each choice is filed
    /// individually; there is no component to join them for.
    pub fn add_metadata_licenses(&mut self, licenses: &[LicenseChoice]) {
        for choice in licenses {
            self.hash_choice(
                choice.clone(),
                NOT_APPLICABLE.to_string(),
                NOT_APPLICABLE.to_string(),
                LicenseLocation::Metadata,
            );
        }
    }

    /// Hash the metadata component (the subject of the document) and its
    /// nested components.
    pub fn add_metadata_component(&mut self, component: &Component) {
        self.hash_component(component.clone(), LicenseLocation::MetadataComponent);
    }

    /// Hash a component from the document's component list, recursively.
    pub fn add_component(&mut self, component: &Component) {
        self.hash_component(component.clone(), LicenseLocation::Components);
    }

    /// Hash a service from the document's service list, recursively.
    pub fn add_service(&mut self, service: &Service) {
        self.hash_service(service, LicenseLocation::Services);
    }

    /// Persist finder caches and hand over the catalog.
    #[must_use]
    pub fn finish(mut self) -> LicenseCatalog {
        if let Some(service) = &mut self.finder_service {
            service.shutdown();
        }
        self.catalog
    }

    fn hash_component(&mut self, mut component: Component, location: LicenseLocation) {
        component.split_composite_name();

        let mut choices = component.licenses.clone();

        if choices.is_empty() {
            if let Some(well_known) = lookup_well_known_licenses(
                &component.group,
                &component.name,
                &component.version,
            ) {
                choices = well_known;
            }
        }

        if choices.is_empty() {
            choices = self.discover_licenses(&component);
        }

        let bom_ref = component.bom_ref.clone().unwrap_or_default();
        match self.normalizer.join_choices(&choices) {
            Some(choice) => {
                self.hash_choice(choice, bom_ref, component.name.clone(), location);
            }
            None => {
                tracing::warn!(
                    bom_ref = %bom_ref,
                    name = %component.name,
                    version = %component.version,
                    purl = %component.purl,
                    "no license found for component"
                );
                self.file_no_assertion(bom_ref, component.name.clone(), location);
            }
        }

        for nested in &component.components {
            self.hash_component(nested.clone(), location);
        }
    }

    fn hash_service(&mut self, service: &Service, location: LicenseLocation) {
        let bom_ref = service.bom_ref.clone().unwrap_or_default();
        if service.licenses.is_empty() {
            tracing::warn!(
                bom_ref = %bom_ref,
                name = %service.name,
                version = %service.version,
                "no license found for service"
            );
            self.file_no_assertion(bom_ref, service.name.clone(), location);
        } else {
            for choice in &service.licenses {
                self.hash_choice(
                    choice.clone(),
                    bom_ref.clone(),
                    service.name.clone(),
                    location,
                );
            }
        }

        for nested in &service.services {
            self.hash_service(nested, location);
        }
    }

    /// Consult the remote finders. Failures are logged and leave the
    /// component license-less; the walk continues.
    fn discover_licenses(&mut self, component: &Component) -> Vec<LicenseChoice> {
        let Some(service) = &mut self.finder_service else {
            return Vec::new();
        };
        if !service.is_applicable(component) {
            return Vec::new();
        }
        tracing::info!(
            coordinate = %component.coordinate(),
            purl = %component.purl,
            "looking up license remotely"
        );
        match service.find_licenses(component) {
            Ok(choices) => {
                if choices.is_empty() {
                    tracing::warn!(purl = %component.purl, "unable to detect licenses remotely");
                }
                choices
            }
            Err(e) => {
                tracing::warn!(purl = %component.purl, error = %e, "license lookup failed");
                Vec::new()
            }
        }
    }

    /// Normalize and resolve one choice, then file the finding.
    fn hash_choice(
        &mut self,
        choice: LicenseChoice,
        bom_ref: String,
        resource_name: String,
        location: LicenseLocation,
    ) {
        match self.resolve_choice(&choice) {
            Ok(Some((normalized, finding_parts))) => {
                self.catalog.insert(
                    normalized.key.clone(),
                    LicenseFinding {
                        bom_ref,
                        resource_name,
                        location,
                        license_choice: normalized.choice,
                        kind: Some(normalized.kind),
                        license: finding_parts.display_name,
                        usage_policy: finding_parts.usage_policy,
                        urls: finding_parts.urls,
                    },
                );
            }
            Ok(None) => {
                tracing::warn!(
                    bom_ref = %bom_ref,
                    resource_name = %resource_name,
                    "license choice carries no id, name, URL or expression"
                );
                self.file_no_assertion(bom_ref, resource_name, location);
            }
            Err(e) => {
                tracing::warn!(bom_ref = %bom_ref, resource_name = %resource_name, error = %e, "unable to hash license");
                self.file_no_assertion(bom_ref, resource_name, location);
            }
        }
    }

    fn resolve_choice(
        &self,
        choice: &LicenseChoice,
    ) -> Result<Option<(NormalizedLicense, ResolvedParts)>> {
        let Some(normalized) = self.normalizer.normalize(choice) else {
            return Ok(None);
        };

        let parts = match normalized.kind {
            LicenseKind::Id => {
                let record = self.policy_store.find_by_spdx_id(&normalized.key);
                ResolvedParts {
                    display_name: if record.name.is_empty() {
                        normalized.key.clone()
                    } else {
                        record.name.clone()
                    },
                    usage_policy: record.usage_policy,
                    urls: record.primary_url().map(ToString::to_string).into_iter().collect(),
                }
            }
            LicenseKind::Name => {
                let (name, url) = match &normalized.choice {
                    LicenseChoice::License(license) => {
                        (license.name.as_str(), license.url.as_str())
                    }
                    LicenseChoice::Expression(_) => ("", ""),
                };
                // The declared name wins over the declared URL; the URL
                // only decides when the name is absent or uncatalogued.
                let mut record = if name.is_empty() {
                    self.policy_store.find_by_url(url)
                } else {
                    self.policy_store.find_by_name(name)
                };
                if !record.usage_policy.is_defined() && !name.is_empty() && !url.is_empty() {
                    record = self.policy_store.find_by_url(url);
                }
                ResolvedParts {
                    display_name: if record.usage_policy.is_defined() && !record.name.is_empty() {
                        record.name.clone()
                    } else {
                        normalized.key.clone()
                    },
                    usage_policy: record.usage_policy,
                    urls: if record.usage_policy.is_defined() {
                        record.primary_url().map(ToString::to_string).into_iter().collect()
                    } else {
                        Vec::new()
                    },
                }
            }
            LicenseKind::Expression => {
                let root = parse_expression(self.policy_store, &normalized.key)?;
                ResolvedParts {
                    display_name: root
                        .compound_name
                        .clone()
                        .unwrap_or_else(|| normalized.key.clone()),
                    usage_policy: root.compound_usage_policy,
                    urls: root.urls,
                }
            }
        };
        Ok(Some((normalized, parts)))
    }

    fn file_no_assertion(
        &mut self,
        bom_ref: String,
        resource_name: String,
        location: LicenseLocation,
    ) {
        self.catalog.insert(
            NO_ASSERTION.to_string(),
            LicenseFinding {
                bom_ref,
                resource_name,
                location,
                license_choice: LicenseChoice::name(NO_ASSERTION),
                kind: None,
                license: NO_ASSERTION.to_string(),
                usage_policy: UsagePolicy::Undefined,
                urls: Vec::new(),
            },
        );
    }
}

struct ResolvedParts {
    display_name: String,
    usage_policy: UsagePolicy,
    urls: Vec<String>,
}
