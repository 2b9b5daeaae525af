//! Maven Central license finder.
//!
//! Fetches the component's POM and reads its `<licenses>` section. POMs
//! routinely omit licenses and defer to a parent POM, so the lookup walks
//! the parent chain up to a fixed depth. POM files predate UTF-8-everywhere;
//! the declared charset is honored, with a BOM sniff and a lossy UTF-8
//! fallback behind it.

use super::cache::LicenseCache;
use super::http::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
use super::{component_cache_key, LicenseFinder};
use crate::error::{FinderErrorKind, LicenseToolsError, Result};
use crate::model::{Component, License, LicenseChoice};
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Matches purls starting with `pkg:maven`, carrying complete
/// group/artifact/version information and one of the Maven core packaging
/// types.
const MAVEN_PURL_PATTERN: &str =
    r"^pkg:maven/[\w._-]+/[\w._-]+@[\w._-]+(\?(classifier=[\w%.-]+&)?type=(jar|zip|pom))?$";

const MAVEN_BASE_URL: &str = "https://repo1.maven.org/maven2";
const MAVEN_CACHE_FILE: &str = ".maven-license-cache.dat";

/// POMs may defer licensing to a parent several levels up.
const MAX_PARENT_RECURSION_DEPTH: usize = 5;

/// Configuration for the Maven finder.
#[derive(Debug, Clone)]
pub struct MavenFinderConfig {
    /// Repository base URL
    pub base_url: String,
    /// Persistent cache location
    pub cache_path: PathBuf,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for MavenFinderConfig {
    fn default() -> Self {
        Self {
            base_url: MAVEN_BASE_URL.to_string(),
            cache_path: PathBuf::from(MAVEN_CACHE_FILE),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// License finder for fully qualified Maven components.
#[derive(Debug)]
pub struct MavenLicenseFinder {
    config: MavenFinderConfig,
    purl_regex: Regex,
    cache: LicenseCache,
    http: HttpClient,
}

impl MavenLicenseFinder {
    pub fn new(config: MavenFinderConfig) -> Result<Self> {
        let http = HttpClient::new(config.timeout)?;
        let cache = LicenseCache::new(&config.cache_path);
        Ok(Self {
            config,
            purl_regex: Regex::new(MAVEN_PURL_PATTERN).expect("static regex"),
            cache,
            http,
        })
    }

    fn fetch_pom(&self, group: &str, name: &str, version: &str) -> Result<PomProject> {
        let url = format_pom_url(&self.config.base_url, group, name, version);
        tracing::debug!(url = %url, "fetching POM from Maven repository");
        let body = self.http.get_bytes(&url)?;
        let text = decode_pom_text(&body);
        parse_pom(&text)
    }
}

impl LicenseFinder for MavenLicenseFinder {
    fn startup(&mut self) {
        self.cache.load();
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.cache.save() {
            tracing::warn!(error = %e, "failed to save Maven license cache");
        }
    }

    fn is_applicable(&self, component: &Component) -> bool {
        let applicable = self.purl_regex.is_match(&component.purl);
        if !applicable {
            tracing::debug!(purl = %component.purl, "not a fully qualified Maven component");
        }
        applicable
    }

    fn find_licenses(&mut self, component: &Component) -> Result<Vec<LicenseChoice>> {
        let cache_key = component_cache_key(component);
        if let Some(choices) = self.cache.get(&cache_key) {
            return Ok(choices.clone());
        }

        let mut group = component.group.clone();
        let mut name = component.name.clone();
        let mut version = component.version.clone();

        let mut choices = Vec::new();
        for _ in 0..MAX_PARENT_RECURSION_DEPTH {
            let pom = self.fetch_pom(&group, &name, &version)?;
            choices = extract_licenses_from_pom(&pom);
            if !choices.is_empty() {
                break;
            }
            let Some(parent) = pom.parent else { break };
            group = parent.group_id;
            name = parent.artifact_id;
            version = parent.version;
        }

        self.cache.put(cache_key, choices.clone());
        Ok(choices)
    }
}

/// `org.example` becomes `org/example` in the repository path; the POM file
/// is named `<artifact>-<version>.pom`.
fn format_pom_url(base_url: &str, group: &str, name: &str, version: &str) -> String {
    let group_path = group.replace('.', "/");
    format!("{base_url}/{group_path}/{name}/{version}/{name}-{version}.pom")
}

/// Decode POM bytes to text: declared charset first, then BOM, then UTF-8
/// with replacement characters.
fn decode_pom_text(bytes: &[u8]) -> String {
    if let Some(label) = declared_charset(bytes) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
            let (text, _, _) = encoding.decode(bytes);
            return text.into_owned();
        }
    }
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _, _) = encoding.decode(&bytes[bom_len..]);
        return text.into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Read the `encoding` attribute of the XML declaration, if any. The
/// declaration itself is ASCII in every encoding this parser supports.
fn declared_charset(bytes: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let declaration_start = prefix.find("<?xml")?;
    let declaration_end = prefix[declaration_start..].find("?>")?;
    let declaration = &prefix[declaration_start..declaration_start + declaration_end];
    let encoding_pos = declaration.find("encoding")?;
    let after = &declaration[encoding_pos + "encoding".len()..];
    let quote_start = after.find(['"', '\''])?;
    let quote_char = after.as_bytes()[quote_start] as char;
    let value = &after[quote_start + 1..];
    let quote_end = value.find(quote_char)?;
    Some(value[..quote_end].to_string())
}

fn parse_pom(text: &str) -> Result<PomProject> {
    quick_xml::de::from_str(text).map_err(|e| {
        LicenseToolsError::finder(
            "parsing POM",
            FinderErrorKind::InvalidResponse(e.to_string()),
        )
    })
}

fn extract_licenses_from_pom(pom: &PomProject) -> Vec<LicenseChoice> {
    let Some(licenses) = &pom.licenses else {
        return Vec::new();
    };
    licenses
        .license
        .iter()
        .map(|entry| {
            LicenseChoice::License(License {
                name: entry.name.clone().unwrap_or_default(),
                url: entry.url.clone().unwrap_or_default(),
                ..License::default()
            })
        })
        .collect()
}

// ---- POM wire model (only the parts this finder reads) ----

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PomProject {
    licenses: Option<PomLicenses>,
    parent: Option<PomParent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PomLicenses {
    license: Vec<PomLicense>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PomLicense {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PomParent {
    group_id: String,
    artifact_id: String,
    version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELOAD4J_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>ch.qos.reload4j</groupId>
  <artifactId>reload4j</artifactId>
  <version>1.2.22</version>
  <licenses>
    <license>
      <name>The Apache Software License, Version 2.0</name>
      <url>http://www.apache.org/licenses/LICENSE-2.0.txt</url>
      <distribution>repo</distribution>
    </license>
  </licenses>
</project>"#;

    const PARENT_ONLY_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>example-parent</artifactId>
    <version>7</version>
  </parent>
  <artifactId>example-child</artifactId>
</project>"#;

    fn finder() -> MavenLicenseFinder {
        MavenLicenseFinder::new(MavenFinderConfig::default()).unwrap()
    }

    #[test]
    fn test_is_applicable() {
        let finder = finder();
        let purls = [
            ("pkg:maven/ch.qos.reload4j/reload4j@1.2.22", true),
            ("pkg:maven/org.apache.ant/ant@1.10.6?type=jar", true),
            (
                "pkg:maven/org.apache.ant/ant@1.10.6?classifier=lib%2Fant-apache-bcel.jar&type=jar",
                true,
            ),
            ("pkg:maven/p2.eclipse.plugin/org.apache.ant@1.10.12?type=eclipse-plugin", false),
            ("pkg:npm/express@5.0.1", false),
            ("pkg:maven/incomplete", false),
        ];
        for (purl, expected) in purls {
            let component = Component {
                purl: purl.to_string(),
                ..Component::default()
            };
            assert_eq!(finder.is_applicable(&component), expected, "purl: {purl}");
        }
    }

    #[test]
    fn test_format_pom_url() {
        assert_eq!(
            format_pom_url(MAVEN_BASE_URL, "ch.qos.reload4j", "reload4j", "1.2.22"),
            "https://repo1.maven.org/maven2/ch/qos/reload4j/reload4j/1.2.22/reload4j-1.2.22.pom"
        );
    }

    #[test]
    fn test_extract_licenses_from_pom() {
        let pom = parse_pom(RELOAD4J_POM).unwrap();
        let choices = extract_licenses_from_pom(&pom);
        assert_eq!(
            choices,
            vec![LicenseChoice::name_and_url(
                "The Apache Software License, Version 2.0",
                "http://www.apache.org/licenses/LICENSE-2.0.txt",
            )]
        );
    }

    #[test]
    fn test_pom_parent_coordinates() {
        let pom = parse_pom(PARENT_ONLY_POM).unwrap();
        assert!(extract_licenses_from_pom(&pom).is_empty());
        let parent = pom.parent.unwrap();
        assert_eq!(parent.group_id, "org.example");
        assert_eq!(parent.artifact_id, "example-parent");
        assert_eq!(parent.version, "7");
    }

    #[test]
    fn test_pom_without_licenses_or_parent() {
        let pom = parse_pom(
            r#"<project><modelVersion>4.0.0</modelVersion><artifactId>x</artifactId></project>"#,
        )
        .unwrap();
        assert!(extract_licenses_from_pom(&pom).is_empty());
        assert!(pom.parent.is_none());
    }

    #[test]
    fn test_declared_charset() {
        assert_eq!(
            declared_charset(br#"<?xml version="1.0" encoding="ISO-8859-1"?><project/>"#),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(
            declared_charset(br"<?xml version='1.0' encoding='UTF-8'?><project/>"),
            Some("UTF-8".to_string())
        );
        assert_eq!(declared_charset(b"<project/>"), None);
    }

    #[test]
    fn test_decode_latin1_pom() {
        // "Licence générale" in ISO-8859-1: the e-acute is a single 0xE9 byte
        let mut bytes =
            br#"<?xml version="1.0" encoding="ISO-8859-1"?><project><licenses><license><name>Licence g"#
                .to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"n");
        bytes.push(0xE9);
        bytes.extend_from_slice(b"rale</name></license></licenses></project>");

        let text = decode_pom_text(&bytes);
        assert!(text.contains("g\u{e9}n\u{e9}rale"), "decoded text: {text}");
        let pom = parse_pom(&text).unwrap();
        let choices = extract_licenses_from_pom(&pom);
        assert_eq!(choices.len(), 1);
    }

    #[test]
    fn test_decode_invalid_bytes_fall_back_to_replacement() {
        let bytes = b"<project><licenses><license><name>x\xFF</name></license></licenses></project>";
        let text = decode_pom_text(bytes);
        assert!(text.contains('\u{FFFD}'));
    }
}
