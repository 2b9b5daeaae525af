//! License name and URL normalization ("license hashing" preparation).
//!
//! Declared license data arrives in every imaginable spelling: SPDX ids,
//! marketing names, bare URLs, comma-separated URL lists, whole expressions
//! stuffed into the `name` field. This module collapses a raw
//! [`LicenseChoice`] into a fingerprint: the key the catalog groups by,
//! tagged with how the key should be resolved against the policy store.

use crate::model::{License, LicenseChoice};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a normalized license key is resolved and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseKind {
    /// An SPDX short identifier; resolved via the id index
    Id,
    /// A human-readable name or a bare URL; resolved via name then URL
    Name,
    /// A compound SPDX-style expression; resolved by the expression engine
    Expression,
}

/// A normalized license choice: the fingerprint key plus the (possibly
/// rewritten) choice it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLicense {
    pub key: String,
    pub kind: LicenseKind,
    pub choice: LicenseChoice,
}

/// Normalizer with its detection regexes compiled once.
#[derive(Debug)]
pub struct NameNormalizer {
    expression_re: Regex,
    url_re: Regex,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NameNormalizer {
    /// Compile the detection regexes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            // Conjunctions embedded in a name are uppercase in practice;
            // a lowercase "or" inside a quoted license title must not
            // flip the name into an expression.
            expression_re: Regex::new(r"\s+(AND|OR|WITH)\s+").expect("static regex"),
            url_re: Regex::new(r"^https?://\S+$").expect("static regex"),
        }
    }

    /// Whether a string is a compound license expression rather than a
    /// single id.
    #[must_use]
    pub fn is_expression(&self, s: &str) -> bool {
        self.expression_re.is_match(s)
    }

    /// Whether a name is really one or more URLs (comma/whitespace
    /// separated, every part carrying an http(s) scheme).
    #[must_use]
    pub fn is_urlish(&self, name: &str) -> bool {
        let parts = split_urls(name);
        !parts.is_empty() && parts.iter().all(|p| self.url_re.is_match(p))
    }

    /// Whether a name embeds a logical conjunction or preposition and
    /// should be parsed as an expression: uppercase ` AND `/` OR `/` WITH `,
    /// a "with exception" phrase, or parentheses.
    #[must_use]
    pub fn has_logical_conjunction_or_preposition(&self, name: &str) -> bool {
        self.is_expression(name)
            || name.to_lowercase().contains("with exception")
            || name.contains('(')
            || name.contains(')')
    }

    /// Collapse one license choice into its fingerprint.
    ///
    /// Rules, in order: an SPDX id is used as-is; a URL-ish name becomes a
    /// URL (one entry) or an OR-expression of URLs (two or more); a name
    /// embedding a conjunction becomes an expression; otherwise the name
    /// (or the URL when the name is empty) is the key.
    #[must_use]
    pub fn normalize(&self, choice: &LicenseChoice) -> Option<NormalizedLicense> {
        match choice {
            LicenseChoice::Expression(expression) => {
                if expression.is_empty() {
                    return None;
                }
                Some(NormalizedLicense {
                    key: expression.clone(),
                    kind: LicenseKind::Expression,
                    choice: choice.clone(),
                })
            }
            LicenseChoice::License(license) => self.normalize_license(license),
        }
    }

    fn normalize_license(&self, license: &License) -> Option<NormalizedLicense> {
        if !license.id.is_empty() {
            return Some(NormalizedLicense {
                key: license.id.clone(),
                kind: LicenseKind::Id,
                choice: LicenseChoice::License(license.clone()),
            });
        }

        let mut license = license.clone();

        if !license.name.is_empty() && self.is_urlish(&license.name) {
            let urls = split_urls(&license.name);
            license.name.clear();
            if urls.len() == 1 {
                license.url = urls.into_iter().next().unwrap_or_default();
            } else {
                let expression = urls.join(" OR ");
                return Some(NormalizedLicense {
                    key: expression.clone(),
                    kind: LicenseKind::Expression,
                    choice: LicenseChoice::Expression(expression),
                });
            }
        }

        if !license.name.is_empty() && self.has_logical_conjunction_or_preposition(&license.name) {
            let expression = std::mem::take(&mut license.name);
            return Some(NormalizedLicense {
                key: expression.clone(),
                kind: LicenseKind::Expression,
                choice: LicenseChoice::Expression(expression),
            });
        }

        let key = if license.name.is_empty() {
            license.url.clone()
        } else {
            license.name.clone()
        };
        if key.is_empty() {
            return None;
        }
        Some(NormalizedLicense {
            key,
            kind: LicenseKind::Name,
            choice: LicenseChoice::License(license),
        })
    }

    /// Join a component's multiple declared choices into one OR-expression.
    ///
    /// Per choice the id is preferred, then the URL, then the name;
    /// already-compound members are parenthesized. Empty members are
    /// skipped with a warning.
    #[must_use]
    pub fn join_choices(&self, choices: &[LicenseChoice]) -> Option<LicenseChoice> {
        match choices {
            [] => None,
            [single] => Some(single.clone()),
            _ => {
                let mut parts = Vec::with_capacity(choices.len());
                for choice in choices {
                    match choice {
                        LicenseChoice::License(license) => {
                            if !license.id.is_empty() {
                                parts.push(license.id.clone());
                            } else if !license.url.is_empty() {
                                parts.push(license.url.clone());
                            } else if !license.name.is_empty() {
                                parts.push(license.name.clone());
                            } else {
                                tracing::warn!(
                                    "skipping license without id, URL or name while joining \
                                     multiple licenses into one expression"
                                );
                            }
                        }
                        LicenseChoice::Expression(expression) if !expression.is_empty() => {
                            parts.push(format!("( {expression} )"));
                        }
                        LicenseChoice::Expression(_) => {
                            tracing::warn!(
                                "skipping empty expression while joining multiple licenses"
                            );
                        }
                    }
                }
                if parts.is_empty() {
                    return None;
                }
                Some(LicenseChoice::Expression(parts.join(" OR ")))
            }
        }
    }
}

/// Split a URL list on commas and whitespace, dropping empty parts.
#[must_use]
pub fn split_urls(s: &str) -> Vec<String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_used_as_is() {
        let normalizer = NameNormalizer::new();
        let normalized = normalizer.normalize(&LicenseChoice::id("Apache-2.0")).unwrap();
        assert_eq!(normalized.key, "Apache-2.0");
        assert_eq!(normalized.kind, LicenseKind::Id);
    }

    #[test]
    fn test_plain_name_is_name_key() {
        let normalizer = NameNormalizer::new();
        let normalized = normalizer
            .normalize(&LicenseChoice::name("The Apache Software License, Version 2.0"))
            .unwrap();
        assert_eq!(normalized.key, "The Apache Software License, Version 2.0");
        assert_eq!(normalized.kind, LicenseKind::Name);
    }

    #[test]
    fn test_lowercase_or_inside_title_is_not_expression() {
        let normalizer = NameNormalizer::new();
        let name = "BSD 3-Clause \"New\" or \"Revised\" License";
        assert!(!normalizer.has_logical_conjunction_or_preposition(name));
        let normalized = normalizer.normalize(&LicenseChoice::name(name)).unwrap();
        assert_eq!(normalized.kind, LicenseKind::Name);
    }

    #[test]
    fn test_uppercase_or_flips_name_into_expression() {
        let normalizer = NameNormalizer::new();
        let name = "BSD 3-Clause \"New\" or \"Revised\" License OR MIT License";
        let normalized = normalizer.normalize(&LicenseChoice::name(name)).unwrap();
        assert_eq!(normalized.kind, LicenseKind::Expression);
        assert_eq!(normalized.key, name);
    }

    #[test]
    fn test_with_exception_phrase_flips_into_expression() {
        let normalizer = NameNormalizer::new();
        let normalized = normalizer
            .normalize(&LicenseChoice::name("GPL 2.0 with exception for linking"))
            .unwrap();
        assert_eq!(normalized.kind, LicenseKind::Expression);
    }

    #[test]
    fn test_single_url_in_name_moves_to_url() {
        let normalizer = NameNormalizer::new();
        let normalized = normalizer
            .normalize(&LicenseChoice::name("https://jsoup.org/license"))
            .unwrap();
        assert_eq!(normalized.kind, LicenseKind::Name);
        assert_eq!(normalized.key, "https://jsoup.org/license");
        match normalized.choice {
            LicenseChoice::License(license) => {
                assert!(license.name.is_empty());
                assert_eq!(license.url, "https://jsoup.org/license");
            }
            LicenseChoice::Expression(_) => panic!("should stay a structured license"),
        }
    }

    #[test]
    fn test_url_list_in_name_becomes_or_expression() {
        let normalizer = NameNormalizer::new();
        let normalized = normalizer
            .normalize(&LicenseChoice::name(
                "https://glassfish.java.net/public/CDDL+GPL_1_1.html, \
                 https://oss.oracle.com/licenses/CDDL+GPL-1.1",
            ))
            .unwrap();
        assert_eq!(normalized.kind, LicenseKind::Expression);
        assert_eq!(
            normalized.key,
            "https://glassfish.java.net/public/CDDL+GPL_1_1.html OR \
             https://oss.oracle.com/licenses/CDDL+GPL-1.1"
        );
    }

    #[test]
    fn test_name_with_url_word_mixture_is_not_urlish() {
        let normalizer = NameNormalizer::new();
        assert!(!normalizer.is_urlish("see https://example.com/license"));
        assert!(!normalizer.is_urlish("MIT License"));
        assert!(!normalizer.is_urlish(""));
    }

    #[test]
    fn test_url_only_choice_keys_on_url() {
        let normalizer = NameNormalizer::new();
        let choice = LicenseChoice::License(License {
            url: "https://opensource.org/licenses/MIT".into(),
            ..License::default()
        });
        let normalized = normalizer.normalize(&choice).unwrap();
        assert_eq!(normalized.key, "https://opensource.org/licenses/MIT");
        assert_eq!(normalized.kind, LicenseKind::Name);
    }

    #[test]
    fn test_empty_choice_is_none() {
        let normalizer = NameNormalizer::new();
        assert!(normalizer.normalize(&LicenseChoice::License(License::default())).is_none());
        assert!(normalizer.normalize(&LicenseChoice::expression("")).is_none());
    }

    #[test]
    fn test_join_single_choice_unchanged() {
        let normalizer = NameNormalizer::new();
        let choice = LicenseChoice::id("MIT");
        assert_eq!(normalizer.join_choices(&[choice.clone()]), Some(choice));
    }

    #[test]
    fn test_join_multiple_choices_prefers_id_then_url_then_name() {
        let normalizer = NameNormalizer::new();
        let joined = normalizer
            .join_choices(&[
                LicenseChoice::id("MIT"),
                LicenseChoice::License(License {
                    name: "Apache".into(),
                    url: "https://www.apache.org/licenses/LICENSE-2.0".into(),
                    ..License::default()
                }),
                LicenseChoice::name("Bouncy Castle Licence"),
            ])
            .unwrap();
        assert_eq!(
            joined,
            LicenseChoice::expression(
                "MIT OR https://www.apache.org/licenses/LICENSE-2.0 OR Bouncy Castle Licence"
            )
        );
    }

    #[test]
    fn test_join_parenthesizes_compound_members() {
        let normalizer = NameNormalizer::new();
        let joined = normalizer
            .join_choices(&[
                LicenseChoice::expression("MIT OR CC0-1.0"),
                LicenseChoice::id("Apache-2.0"),
            ])
            .unwrap();
        assert_eq!(
            joined,
            LicenseChoice::expression("( MIT OR CC0-1.0 ) OR Apache-2.0")
        );
    }

    #[test]
    fn test_split_urls() {
        assert_eq!(
            split_urls("a, b  c,,d"),
            vec!["a".to_string(), "b".into(), "c".into(), "d".into()]
        );
        assert!(split_urls(" ,  ").is_empty());
    }
}
