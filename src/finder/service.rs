//! Finder dispatch: route a component to the first applicable finder.

use super::{
    LicenseFinder, MavenFinderConfig, MavenLicenseFinder, NpmFinderConfig, NpmLicenseFinder,
    P2FinderConfig, P2LicenseFinder,
};
use crate::error::{FinderErrorKind, LicenseToolsError, Result};
use crate::model::{Component, LicenseChoice};

/// Ordered collection of license finders.
///
/// The default order is Maven, p2, npm; the p2 purl shape is a
/// `pkg:maven/p2.*` specialization that the Maven finder's packaging-type
/// filter already rejects, so the order is not load-bearing for the stock
/// finders but is preserved for custom ones.
pub struct LicenseFinderService {
    finders: Vec<Box<dyn LicenseFinder>>,
}

impl LicenseFinderService {
    /// The stock finder set with default configurations.
    pub fn new() -> Result<Self> {
        Ok(Self {
            finders: vec![
                Box::new(MavenLicenseFinder::new(MavenFinderConfig::default())?),
                Box::new(P2LicenseFinder::new(P2FinderConfig::default())?),
                Box::new(NpmLicenseFinder::new(NpmFinderConfig::default())?),
            ],
        })
    }

    /// A service over caller-provided finders (custom configs or test
    /// doubles), dispatched in the given order.
    #[must_use]
    pub fn with_finders(finders: Vec<Box<dyn LicenseFinder>>) -> Self {
        Self { finders }
    }

    /// Load every finder's persistent cache.
    pub fn startup(&mut self) {
        for finder in &mut self.finders {
            finder.startup();
        }
    }

    /// Persist every finder's cache.
    pub fn shutdown(&mut self) {
        for finder in &mut self.finders {
            finder.shutdown();
        }
    }

    /// Whether any finder can answer for the component.
    #[must_use]
    pub fn is_applicable(&self, component: &Component) -> bool {
        self.finders.iter().any(|f| f.is_applicable(component))
    }

    /// Dispatch to the first applicable finder. An applicable finder's
    /// error propagates; with no applicable finder this is a typed error.
    pub fn find_licenses(&mut self, component: &Component) -> Result<Vec<LicenseChoice>> {
        for finder in &mut self.finders {
            if finder.is_applicable(component) {
                return finder.find_licenses(component);
            }
        }
        Err(LicenseToolsError::finder(
            component.coordinate(),
            FinderErrorKind::NotApplicable(component.purl.clone()),
        ))
    }
}
