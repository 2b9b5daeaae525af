//! Three-valued usage-policy algebra.
//!
//! The policy universe is `{allow, deny, needs-review, undefined}`. AND is
//! pessimistic, OR is optimistic, WITH is dominated by its right operand
//! (the exception). `Undefined` short-circuits: under AND it only survives
//! a `deny` on the other side; under OR and WITH the other side wins
//! outright. The evaluator is total; it never fails.

use crate::model::UsagePolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three infix conjunctions, or none (a bare term or group).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    And,
    Or,
    With,
    #[default]
    Undefined,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::With => write!(f, "WITH"),
            Self::Undefined => write!(f, ""),
        }
    }
}

/// Combine two usage policies under a conjunction.
///
/// AND and OR are commutative; WITH is not (the right operand names the
/// exception and dominates the result).
#[must_use]
pub fn combine(left: UsagePolicy, conjunction: Conjunction, right: UsagePolicy) -> UsagePolicy {
    use UsagePolicy::{Allow, Deny, NeedsReview, Undefined};

    match conjunction {
        // Pessimistic: any deny wins, then any needs-review, else allow.
        Conjunction::And => {
            if left == Undefined || right == Undefined {
                // Undefined short-circuit: only a deny on the other side
                // still produces a verdict.
                return if left == Deny || right == Deny {
                    Deny
                } else {
                    Undefined
                };
            }
            if left == Deny || right == Deny {
                Deny
            } else if left == NeedsReview || right == NeedsReview {
                NeedsReview
            } else {
                Allow
            }
        }
        // Optimistic: any allow wins, then any needs-review, else deny.
        Conjunction::Or => {
            if left == Undefined {
                return right;
            }
            if right == Undefined {
                return left;
            }
            if left == Allow || right == Allow {
                Allow
            } else if left == NeedsReview || right == NeedsReview {
                NeedsReview
            } else {
                Deny
            }
        }
        // The exception (right operand) dominates.
        Conjunction::With => {
            if left == Undefined {
                return right;
            }
            if right == Undefined {
                return left;
            }
            match right {
                Allow => Allow,
                NeedsReview => NeedsReview,
                Deny | Undefined => Deny,
            }
        }
        // A bare term or parenthesized group: the left side carries the
        // verdict when the right side never materialized.
        Conjunction::Undefined => {
            if left != Undefined && right == Undefined {
                left
            } else {
                Undefined
            }
        }
    }
}
