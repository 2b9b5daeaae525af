//! Precedence-aware license expression parser.
//!
//! All three conjunctions sit at the same grammar level; the effective
//! precedence is imposed structurally while parsing. A node buffers one
//! conjunction plus one pending (subsequent) conjunction; when a third
//! operand arrives, the partially built triple is re-folded either to the
//! left (the existing pair becomes a child on the left) or to the right
//! (the existing right operand is paired with the new one in a child on
//! the right), depending on which conjunction binds tighter.

use super::evaluate::{combine, Conjunction};
use super::token::{tokenize, Token};
use crate::error::{ExpressionError, LicenseToolsError, Result};
use crate::model::{LicensePolicyRecord, PolicyStore, UsagePolicy};

/// AST node and evaluation accumulator for a compound license expression.
///
/// One type serves both roles: the parser mutates it in place while folding,
/// and each fold finalizes the produced child so its `compound_usage_policy`
/// is ready for the parent. After the root returns it is read-only.
/// Exactly one of `simple_left`/`compound_left` is populated on a finalized
/// node (same on the right); all three usage-policy fields start `Undefined`.
#[derive(Debug, Clone, Default)]
pub struct CompoundExpression {
    /// Leaf symbol when the left operand is a simple id
    pub simple_left: Option<String>,
    /// Resolved policy record for `simple_left`
    pub left_policy: Option<LicensePolicyRecord>,
    pub left_usage_policy: UsagePolicy,
    /// Child node when the left operand is a sub-expression
    pub compound_left: Option<Box<CompoundExpression>>,

    pub conjunction: Conjunction,
    /// Second conjunction buffered until the third operand forces a fold
    pub subsequent_conjunction: Conjunction,

    pub simple_right: Option<String>,
    pub right_policy: Option<LicensePolicyRecord>,
    pub right_usage_policy: UsagePolicy,
    pub compound_right: Option<Box<CompoundExpression>>,

    /// Result of evaluating this node
    pub compound_usage_policy: UsagePolicy,
    /// Canonical rendering of the whole expression (root node only)
    pub compound_name: Option<String>,
    /// Primary URLs of resolved leaves, in visit order (root node only)
    pub urls: Vec<String>,
}

impl CompoundExpression {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The rendered canonical spelling, falling back to nothing for
    /// non-root nodes.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.compound_name.as_deref()
    }
}

/// The third operand of a fold: a plain symbol or an already-parsed group.
enum Operand {
    Simple(String),
    Group(CompoundExpression),
}

/// Parse a raw license expression and evaluate its usage policy.
///
/// The returned root node carries the combined `compound_usage_policy`, a
/// canonical `compound_name` (each symbol replaced by its catalogued
/// license name where known) and the primary URLs of all resolved leaves.
pub fn parse_expression(store: &PolicyStore, raw_expression: &str) -> Result<CompoundExpression> {
    let tokens = tokenize(raw_expression);
    tracing::debug!(expression = raw_expression, ?tokens, "parsing license expression");

    let mut root = CompoundExpression::new();
    parse_compound(store, &mut root, &tokens, 0, 0)
        .map_err(|source| LicenseToolsError::expression(raw_expression, source))?;

    let (name, urls) = render_display(store, &tokens);
    root.compound_name = Some(name);
    root.urls = urls;

    if root.compound_usage_policy == UsagePolicy::Undefined {
        tracing::warn!(
            expression = raw_expression,
            left = %root.left_usage_policy,
            right = %root.right_usage_policy,
            "license expression evaluated to an undefined policy"
        );
    }
    Ok(root)
}

/// Parse one scope. The top-level call consumes the whole token list; a
/// recursive call consumes one parenthesized group and returns with the
/// index still on the closing paren (the caller steps past it).
fn parse_compound(
    store: &PolicyStore,
    expression: &mut CompoundExpression,
    tokens: &[Token],
    mut index: usize,
    depth: usize,
) -> std::result::Result<usize, ExpressionError> {
    while index < tokens.len() {
        match &tokens[index] {
            Token::LParen => {
                let mut child = CompoundExpression::new();
                index = parse_compound(store, &mut child, tokens, index + 1, depth + 1)?;
                if expression.subsequent_conjunction != Conjunction::Undefined {
                    // Third operand arrived as a group: fold like a symbol.
                    fold(store, expression, Operand::Group(child));
                } else if expression.conjunction == Conjunction::Undefined {
                    expression.left_usage_policy = child.compound_usage_policy;
                    expression.compound_left = Some(Box::new(child));
                } else {
                    expression.right_usage_policy = child.compound_usage_policy;
                    expression.compound_right = Some(Box::new(child));
                }
            }
            Token::RParen => {
                if depth == 0 {
                    return Err(ExpressionError::UnmatchedRightParen { index });
                }
                finalize(expression);
                // Do not step past the paren; the caller will.
                return Ok(index);
            }
            token @ (Token::And | Token::Or | Token::With) => {
                if expression.subsequent_conjunction != Conjunction::Undefined {
                    // Two conjunctions are already buffered; only an operand
                    // may follow.
                    return Err(ExpressionError::InvalidConjunction {
                        token: token.to_string(),
                        index,
                    });
                }
                let conjunction = conjunction_of(token);
                if expression.conjunction == Conjunction::Undefined {
                    expression.conjunction = conjunction;
                } else {
                    expression.subsequent_conjunction = conjunction;
                }
            }
            Token::Sym(symbol) => {
                if expression.conjunction == Conjunction::Undefined {
                    let record = store.resolve(symbol);
                    expression.simple_left = Some(symbol.clone());
                    expression.left_usage_policy = record.usage_policy;
                    expression.left_policy = Some(record);
                } else if expression.subsequent_conjunction == Conjunction::Undefined {
                    set_right_operand(store, expression, Operand::Simple(symbol.clone()));
                } else {
                    fold(store, expression, Operand::Simple(symbol.clone()));
                }
            }
        }
        index += 1;
    }

    if depth > 0 {
        return Err(ExpressionError::UnterminatedGroup);
    }
    finalize(expression);
    Ok(index)
}

fn conjunction_of(token: &Token) -> Conjunction {
    match token {
        Token::And => Conjunction::And,
        Token::Or => Conjunction::Or,
        Token::With => Conjunction::With,
        _ => Conjunction::Undefined,
    }
}

/// Re-fold `(L c1 R) c2 T` according to which conjunction binds tighter.
///
/// The WITH/WITH pairing re-expresses the right pair with OR. Whether that
/// was ever intended is unknown; the behavior is pinned by a test rather
/// than changed.
fn fold(store: &PolicyStore, expression: &mut CompoundExpression, operand: Operand) {
    use Conjunction::{And, Or, With};

    match (expression.conjunction, expression.subsequent_conjunction) {
        // left AND right AND another -> (left AND right) AND another
        (And, And) => fold_left_append_right(store, expression, And, operand),
        // left AND right OR another -> (left AND right) OR another
        (And, Or) => fold_left_append_right(store, expression, Or, operand),
        // left AND right WITH another -> left AND (right WITH another)
        (And, With) => fold_append_right(store, expression, With, operand),
        // left OR right AND another -> left OR (right AND another)
        (Or, And) => fold_append_right(store, expression, And, operand),
        // left OR right OR another -> left OR (right OR another)
        (Or, Or) => fold_append_right(store, expression, Or, operand),
        // left OR right WITH another -> left OR (right WITH another)
        (Or, With) => fold_append_right(store, expression, With, operand),
        // left WITH right AND another -> (left WITH right) AND another
        (With, And) => fold_left_append_right(store, expression, And, operand),
        // left WITH right OR another -> (left WITH right) OR another
        (With, Or) => fold_left_append_right(store, expression, Or, operand),
        // left WITH right WITH another -> left WITH (right OR another)
        (With, With) => fold_append_right(store, expression, Or, operand),
        // Folds only trigger with both conjunctions buffered.
        _ => {}
    }
}

/// The current triple becomes the new left child; the node itself becomes
/// `(child c T)`. Used when the prior pair binds at least as tightly as the
/// incoming conjunction.
fn fold_left_append_right(
    store: &PolicyStore,
    expression: &mut CompoundExpression,
    conjunction: Conjunction,
    operand: Operand,
) {
    let mut child = std::mem::take(expression);
    child.subsequent_conjunction = Conjunction::Undefined;
    finalize(&mut child);

    expression.left_usage_policy = child.compound_usage_policy;
    expression.compound_left = Some(Box::new(child));
    expression.conjunction = conjunction;
    set_right_operand(store, expression, operand);
}

/// Keep the current left; pair the current right with the new operand in a
/// child on the right: the node becomes `(L c1 child)`. Used when the
/// incoming conjunction binds tighter than the prior one.
fn fold_append_right(
    store: &PolicyStore,
    expression: &mut CompoundExpression,
    conjunction: Conjunction,
    operand: Operand,
) {
    let mut child = CompoundExpression::new();
    child.simple_left = expression.simple_right.take();
    child.left_policy = expression.right_policy.take();
    child.compound_left = expression.compound_right.take();
    child.left_usage_policy = expression.right_usage_policy;
    child.conjunction = conjunction;
    set_right_operand(store, &mut child, operand);
    finalize(&mut child);

    expression.subsequent_conjunction = Conjunction::Undefined;
    expression.right_usage_policy = child.compound_usage_policy;
    expression.compound_right = Some(Box::new(child));
}

fn set_right_operand(store: &PolicyStore, expression: &mut CompoundExpression, operand: Operand) {
    match operand {
        Operand::Simple(symbol) => {
            let record = store.resolve(&symbol);
            expression.simple_right = Some(symbol);
            expression.right_usage_policy = record.usage_policy;
            expression.right_policy = Some(record);
        }
        Operand::Group(child) => {
            expression.right_usage_policy = child.compound_usage_policy;
            expression.compound_right = Some(Box::new(child));
        }
    }
}

/// Evaluate this node's combined policy from its two sides.
fn finalize(expression: &mut CompoundExpression) {
    expression.compound_usage_policy = combine(
        expression.left_usage_policy,
        expression.conjunction,
        expression.right_usage_policy,
    );
    tracing::debug!(
        left = %expression.left_usage_policy,
        conjunction = %expression.conjunction,
        right = %expression.right_usage_policy,
        result = %expression.compound_usage_policy,
        "evaluated compound policy"
    );
}

/// Render the canonical display spelling and collect leaf URLs.
///
/// Symbols are replaced by their catalogued license names (the raw symbol
/// stands in on a miss), keywords are uppercased, parentheses are spaced.
/// URLs come out in token order, which equals left-DFS visit order.
fn render_display(store: &PolicyStore, tokens: &[Token]) -> (String, Vec<String>) {
    let mut parts = Vec::with_capacity(tokens.len());
    let mut urls = Vec::new();
    for token in tokens {
        match token {
            Token::Sym(symbol) => {
                let record = store.resolve(symbol);
                if record.usage_policy.is_defined() && !record.name.is_empty() {
                    parts.push(record.name.clone());
                } else {
                    parts.push(symbol.clone());
                }
                if record.usage_policy.is_defined() {
                    if let Some(url) = record.primary_url() {
                        urls.push(url.to_string());
                    }
                }
            }
            other => parts.push(other.to_string()),
        }
    }
    (parts.join(" "), urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store used by the expression scenarios: the listed ids are allow,
    /// GPL-2.0-only is deny, MPL-1.0 and AGPL-3.0 are needs-review,
    /// everything else misses.
    fn scenario_store() -> PolicyStore {
        let allow = |id: &str, name: &str, url: &str| LicensePolicyRecord {
            id: id.into(),
            name: name.into(),
            urls: vec![url.into()],
            usage_policy: UsagePolicy::Allow,
            ..LicensePolicyRecord::default()
        };
        PolicyStore::from_records(vec![
            allow(
                "Apache-2.0",
                "Apache License Version 2.0",
                "https://www.apache.org/licenses/LICENSE-2.0",
            ),
            allow("MIT", "MIT License", "https://opensource.org/licenses/MIT"),
            allow(
                "0BSD",
                "BSD Zero Clause License",
                "https://opensource.org/licenses/0BSD",
            ),
            allow(
                "Apache-1.0",
                "Apache License 1.0",
                "https://www.apache.org/licenses/LICENSE-1.0",
            ),
            allow(
                "Apache-1.1",
                "Apache License 1.1",
                "https://www.apache.org/licenses/LICENSE-1.1",
            ),
            allow(
                "CC0-1.0",
                "Creative Commons Zero v1.0 Universal",
                "https://creativecommons.org/publicdomain/zero/1.0/legalcode",
            ),
            allow(
                "Classpath-exception-2.0",
                "Classpath exception 2.0",
                "https://www.gnu.org/software/classpath/license.html",
            ),
            allow(
                "OpenJDK-assembly-exception-1.0",
                "OpenJDK Assembly exception 1.0",
                "http://openjdk.java.net/legal/assembly-exception.html",
            ),
            LicensePolicyRecord {
                id: "GPL-2.0-only".into(),
                name: "GNU General Public License v2.0 only".into(),
                urls: vec![
                    "https://www.gnu.org/licenses/old-licenses/gpl-2.0-standalone.html".into(),
                ],
                usage_policy: UsagePolicy::Deny,
                ..LicensePolicyRecord::default()
            },
            LicensePolicyRecord {
                id: "MPL-1.0".into(),
                name: "Mozilla Public License 1.0".into(),
                urls: vec!["https://opensource.org/licenses/MPL-1.0".into()],
                usage_policy: UsagePolicy::NeedsReview,
                ..LicensePolicyRecord::default()
            },
            LicensePolicyRecord {
                id: "AGPL-3.0".into(),
                name: "GNU Affero General Public License v3.0".into(),
                urls: vec!["https://www.gnu.org/licenses/agpl-3.0-standalone.html".into()],
                usage_policy: UsagePolicy::NeedsReview,
                ..LicensePolicyRecord::default()
            },
        ])
    }

    fn parse_policy(expression: &str) -> UsagePolicy {
        let store = scenario_store();
        parse_expression(&store, expression)
            .expect("expression should parse")
            .compound_usage_policy
    }

    #[test]
    fn test_allow_and_group_with_deny_alternative() {
        // inner = allow OR deny = allow; allow AND allow = allow
        assert_eq!(
            parse_policy("Apache-2.0 AND (MIT OR GPL-2.0-only)"),
            UsagePolicy::Allow
        );
    }

    #[test]
    fn test_needs_review_propagates_through_and() {
        assert_eq!(
            parse_policy("MPL-1.0 AND (MIT AND AGPL-3.0)"),
            UsagePolicy::NeedsReview
        );
    }

    #[test]
    fn test_compound_right_side_with_space_before_paren() {
        assert_eq!(
            parse_policy("Apache-2.0 AND (MIT OR GPL-2.0-only )"),
            UsagePolicy::Allow
        );
    }

    #[test]
    fn test_compound_left_side() {
        assert_eq!(
            parse_policy("(Apache-1.0 OR Apache-1.1 ) AND 0BSD"),
            UsagePolicy::Allow
        );
    }

    #[test]
    fn test_single_group() {
        assert_eq!(parse_policy("(MIT OR CC0-1.0)"), UsagePolicy::Allow);
    }

    #[test]
    fn test_group_of_two_unknowns_is_undefined() {
        assert_eq!(parse_policy("(FOO OR BAR)"), UsagePolicy::Undefined);
    }

    #[test]
    fn test_group_unknown_left() {
        assert_eq!(parse_policy("(FOO OR MIT)"), UsagePolicy::Allow);
    }

    #[test]
    fn test_group_unknown_right() {
        assert_eq!(parse_policy("(MIT OR BAR)"), UsagePolicy::Allow);
    }

    #[test]
    fn test_empty_group_is_undefined() {
        assert_eq!(parse_policy("()"), UsagePolicy::Undefined);
    }

    #[test]
    fn test_empty_expression_is_undefined() {
        assert_eq!(parse_policy(""), UsagePolicy::Undefined);
    }

    #[test]
    fn test_lone_conjunctions_are_undefined() {
        assert_eq!(parse_policy("AND"), UsagePolicy::Undefined);
        assert_eq!(parse_policy("OR"), UsagePolicy::Undefined);
    }

    #[test]
    fn test_leading_and_takes_deny_from_right() {
        assert_eq!(parse_policy("AND GPL-2.0-only"), UsagePolicy::Deny);
    }

    #[test]
    fn test_leading_or_takes_right_side() {
        assert_eq!(parse_policy("OR GPL-2.0-only"), UsagePolicy::Deny);
    }

    #[test]
    fn test_fold_and_and() {
        assert_eq!(
            parse_policy("Apache-2.0 AND MIT AND GPL-2.0-only"),
            UsagePolicy::Deny
        );
        assert_eq!(parse_policy("Apache-2.0 AND MIT AND 0BSD"), UsagePolicy::Allow);
    }

    #[test]
    fn test_fold_and_or_groups_left() {
        // (deny AND allow) OR allow = allow
        assert_eq!(
            parse_policy("GPL-2.0-only AND MIT OR Apache-2.0"),
            UsagePolicy::Allow
        );
    }

    #[test]
    fn test_fold_or_and_groups_right() {
        // allow OR (allow AND deny) = allow
        assert_eq!(
            parse_policy("Apache-2.0 OR MIT AND GPL-2.0-only"),
            UsagePolicy::Allow
        );
        // deny OR (allow AND deny) = deny
        assert_eq!(
            parse_policy("GPL-2.0-only OR MIT AND GPL-2.0-only"),
            UsagePolicy::Deny
        );
    }

    #[test]
    fn test_fold_and_with_groups_right() {
        // deny AND (deny WITH allow) = deny AND allow = deny
        assert_eq!(
            parse_policy("GPL-2.0-only AND GPL-2.0-only WITH Classpath-exception-2.0"),
            UsagePolicy::Deny
        );
        // allow AND (deny WITH allow) = allow
        assert_eq!(
            parse_policy("MIT AND GPL-2.0-only WITH Classpath-exception-2.0"),
            UsagePolicy::Allow
        );
    }

    #[test]
    fn test_fold_with_and_groups_left() {
        // (deny WITH allow) AND allow = allow AND allow = allow
        assert_eq!(
            parse_policy("GPL-2.0-only WITH Classpath-exception-2.0 AND MIT"),
            UsagePolicy::Allow
        );
    }

    // Pins the WITH/WITH -> OR re-expression: left WITH right WITH another
    // becomes left WITH (right OR another).
    #[test]
    fn test_fold_with_with_becomes_or_on_right() {
        let store = scenario_store();
        let root = parse_expression(
            &store,
            "GPL-2.0-only WITH Classpath-exception-2.0 WITH OpenJDK-assembly-exception-1.0",
        )
        .unwrap();
        let right = root.compound_right.as_ref().expect("right child");
        assert_eq!(right.conjunction, Conjunction::Or);
        assert_eq!(root.conjunction, Conjunction::With);
        // exception side resolves allow, so the whole expression allows
        assert_eq!(root.compound_usage_policy, UsagePolicy::Allow);
    }

    #[test]
    fn test_fold_third_operand_as_group() {
        // allow OR (allow AND (deny OR allow)) = allow
        assert_eq!(
            parse_policy("Apache-2.0 OR MIT AND (GPL-2.0-only OR 0BSD)"),
            UsagePolicy::Allow
        );
        // (deny AND allow) OR (allow) via group third operand
        assert_eq!(
            parse_policy("GPL-2.0-only AND MIT OR (Apache-2.0)"),
            UsagePolicy::Allow
        );
    }

    #[test]
    fn test_redundant_outer_parens_do_not_change_result() {
        for expression in [
            "Apache-2.0 AND (MIT OR GPL-2.0-only)",
            "MPL-1.0 AND (MIT AND AGPL-3.0)",
            "GPL-2.0-only AND MIT OR Apache-2.0",
            "FOO OR MIT",
        ] {
            let plain = parse_policy(expression);
            let wrapped = parse_policy(&format!("({expression})"));
            assert_eq!(plain, wrapped, "parenthesizing `{expression}` changed the result");
        }
    }

    #[test]
    fn test_unmatched_right_paren_is_error() {
        let store = scenario_store();
        let err = parse_expression(&store, "MIT OR )").unwrap_err();
        assert!(matches!(
            err,
            LicenseToolsError::Expression {
                source: ExpressionError::UnmatchedRightParen { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_unterminated_group_is_error() {
        let store = scenario_store();
        let err = parse_expression(&store, "(MIT OR Apache-2.0").unwrap_err();
        assert!(matches!(
            err,
            LicenseToolsError::Expression {
                source: ExpressionError::UnterminatedGroup,
                ..
            }
        ));
    }

    #[test]
    fn test_conjunction_in_operand_position_is_error() {
        let store = scenario_store();
        let err = parse_expression(&store, "MIT AND Apache-2.0 OR AND 0BSD").unwrap_err();
        assert!(matches!(
            err,
            LicenseToolsError::Expression {
                source: ExpressionError::InvalidConjunction { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_display_name_and_urls() {
        let store = scenario_store();
        let root = parse_expression(&store, "Apache-2.0 AND (MIT OR GPL-2.0-only)").unwrap();
        assert_eq!(
            root.display_name().unwrap(),
            "Apache License Version 2.0 AND ( MIT License OR GNU General Public License v2.0 only )"
        );
        assert_eq!(
            root.urls,
            vec![
                "https://www.apache.org/licenses/LICENSE-2.0",
                "https://opensource.org/licenses/MIT",
                "https://www.gnu.org/licenses/old-licenses/gpl-2.0-standalone.html",
            ]
        );
    }

    #[test]
    fn test_display_name_keeps_unknown_symbols() {
        let store = scenario_store();
        let root = parse_expression(&store, "FOO OR MIT").unwrap();
        assert_eq!(root.display_name().unwrap(), "FOO OR MIT License");
        assert_eq!(root.urls, vec!["https://opensource.org/licenses/MIT"]);
    }

    #[test]
    fn test_finalized_sides_are_exclusive() {
        let store = scenario_store();
        let root = parse_expression(&store, "(Apache-1.0 OR Apache-1.1) AND 0BSD").unwrap();
        assert!(root.simple_left.is_none() && root.compound_left.is_some());
        assert!(root.simple_right.is_some() && root.compound_right.is_none());
    }
}
