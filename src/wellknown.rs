//! Static license table for well-known components.
//!
//! Some vendors publish packages whose license is common knowledge but not
//! machine-readable in any registry: IDE platforms, language workbenches,
//! bundled runtimes. This table answers for those identifiers before any
//! remote finder is consulted, because its answers are authoritative and
//! free. Compile-time data only; no I/O.

use crate::model::{License, LicenseChoice};

/// What the table knows about a component's license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WellKnownLicense {
    Id(&'static str),
    Url(&'static str),
    Expression(&'static str),
}

impl WellKnownLicense {
    fn into_choices(self) -> Vec<LicenseChoice> {
        let choice = match self {
            Self::Id(id) => LicenseChoice::License(License {
                id: id.to_string(),
                ..License::default()
            }),
            Self::Url(url) => LicenseChoice::License(License {
                url: url.to_string(),
                ..License::default()
            }),
            Self::Expression(expression) => LicenseChoice::Expression(expression.to_string()),
        };
        vec![choice]
    }
}

/// Look up the license of a well-known component.
///
/// Matching is exact on `(group, name)` unless noted; a few entries match a
/// group prefix or a version prefix where a vendor's whole namespace (or a
/// particular release line) shares one license.
#[must_use]
pub fn lookup_well_known_licenses(
    group: &str,
    name: &str,
    version: &str,
) -> Option<Vec<LicenseChoice>> {
    let found = match group {
        "com.dslfoundry.javafx" if name == "plugin" => {
            WellKnownLicense::Url("https://www.apache.org/licenses/LICENSE-2.0")
        }
        "com.jetbrains.jdk" if name == "jbr_jcef" => {
            // JetBrains Runtime with the Chromium Embedded Framework bundled
            WellKnownLicense::Expression("GPL-2.0-only WITH Classpath-exception-2.0")
        }
        "com.jetbrains" if name == "mps" => {
            WellKnownLicense::Url("https://www.apache.org/licenses/LICENSE-2.0")
        }
        "com.mbeddr" if name == "platform" => {
            // mbeddr never moved off EPL 1.0
            WellKnownLicense::Url("http://www.eclipse.org/legal/epl-v10.html")
        }
        "de.itemis.mps.rapidfx" if name == "core" || name == "xdiagram" => {
            WellKnownLicense::Url("https://www.apache.org/licenses/LICENSE-2.0")
        }
        "de.itemis.mps" if name == "extensions" => {
            WellKnownLicense::Url("https://www.apache.org/licenses/LICENSE-2.0")
        }
        "org.graphviz" if name == "graphviz" && version.starts_with("2.") => {
            WellKnownLicense::Id("CPL-1.0")
        }
        "org.graphviz" if name == "graphviz" => {
            WellKnownLicense::Url("https://opensource.org/license/cpl1-0-txt")
        }
        _ if group.starts_with("org.modelix") => WellKnownLicense::Id("Apache-2.0"),
        _ => return None,
    };
    Some(found.into_choices())
}
