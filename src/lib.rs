//! **License discovery and usage-policy evaluation for CycloneDX SBOM components.**
//!
//! `license-tools` takes the components and services an SBOM walker hands
//! over and produces a catalog of the licenses that apply to them, each
//! annotated with an organization-defined usage policy
//! (allow / deny / needs-review / undefined).
//!
//! The core of the crate is the **license-expression engine**: a tokenizer,
//! a precedence-aware parser and a three-valued policy evaluator for
//! SPDX-style compound expressions (`Apache-2.0 AND (MIT OR GPL-2.0-only)`).
//! Around it sits the **discovery pipeline** that decides which string to
//! feed into that engine for each component:
//!
//! - licenses declared in the SBOM itself,
//! - a compile-time table of well-known components whose licenses are
//!   common knowledge but not machine-readable anywhere,
//! - remote lookups against package registries (Maven POMs, the Eclipse
//!   license-check service for p2 artifacts, the npm registry), backed by
//!   persistent on-disk caches,
//! - a normalization step that collapses the myriad spellings of
//!   Apache/BSD/MIT/EPL/CDDL and friends into canonical policy records.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: components, services, license choices, usage policies
//!   and the [`PolicyStore`] lookup catalog.
//! - **[`expression`]**: the tokenizer, parser and evaluator. Expressions
//!   evaluate under a non-classical three-valued algebra where `undefined`
//!   both short-circuits and survives as a legitimate outcome.
//! - **[`normalize`]**: license "hashing" preparation — URL lists become
//!   OR-expressions, expressions hiding in name fields are detected,
//!   multiple declared licenses are joined.
//! - **[`finder`]**: the remote finders and their dispatch service.
//! - **[`wellknown`]**: the static well-known-components table.
//! - **[`catalog`]**: the per-component pipeline and the resulting
//!   [`LicenseCatalog`].
//!
//! ## Getting Started
//!
//! ```no_run
//! use license_tools::{CatalogBuilder, Component, LicenseChoice, PolicyStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policies = PolicyStore::from_json_reader(std::fs::File::open("policies.json")?)?;
//!
//!     let mut builder = CatalogBuilder::new(&policies);
//!     builder.add_component(&Component {
//!         name: "commons-lang3".into(),
//!         group: "org.apache.commons".into(),
//!         version: "3.12.0".into(),
//!         licenses: vec![LicenseChoice::id("Apache-2.0")],
//!         ..Component::default()
//!     });
//!
//!     let catalog = builder.finish();
//!     for finding in catalog.findings() {
//!         println!("{}: {} ({})", finding.resource_name, finding.license, finding.usage_policy);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Remote discovery
//!
//! Components without declared licenses can be resolved against their
//! package registries. Lookups run with a 10-second deadline, are never
//! retried, and every found result is cached in a per-finder file so a
//! re-run is free:
//!
//! ```no_run
//! use license_tools::{CatalogBuilder, LicenseFinderService, PolicyStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policies = PolicyStore::new();
//! let finders = LicenseFinderService::new()?;
//! let builder = CatalogBuilder::new(&policies).with_finder_service(finders);
//! // … add components, then finish() to persist the caches
//! # Ok(())
//! # }
//! ```
//!
//! The CLI, document walking, schema validation and report formatting are
//! deliberately out of scope; this crate is the library those tiers call.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // # Errors sections are aspirational for the crate's fallible surface
    clippy::missing_errors_doc,
    // Policy/conjunction matches read better spelled out than collapsed
    clippy::match_same_arms
)]

pub mod catalog;
pub mod error;
pub mod expression;
pub mod finder;
pub mod model;
pub mod normalize;
pub mod wellknown;

// Re-export main types for convenience
pub use catalog::{CatalogBuilder, LicenseCatalog, LicenseFinding, NOT_APPLICABLE, NO_ASSERTION};
pub use error::{ExpressionError, FinderErrorKind, LicenseToolsError, Result};
pub use expression::{combine, parse_expression, tokenize, CompoundExpression, Conjunction, Token};
pub use finder::{
    LicenseFinder, LicenseFinderService, MavenFinderConfig, MavenLicenseFinder, NpmFinderConfig,
    NpmLicenseFinder, P2FinderConfig, P2LicenseFinder,
};
pub use model::{
    Component, License, LicenseChoice, LicenseLocation, LicensePolicyRecord, PolicyStore, Service,
    UsagePolicy,
};
pub use normalize::{LicenseKind, NameNormalizer, NormalizedLicense};
pub use wellknown::lookup_well_known_licenses;
