//! Substitution engine.
//!
//! Applies an operation list to a text value in declaration order. Operations
//! are never reordered or deduplicated, so applying `[D1, D2]` in sequence is
//! the same as applying `D1 ++ D2` once. A failing operation aborts the rest
//! of the list; no partially rewritten text is returned.

use std::borrow::Cow;

use tracing::{info, trace};

use crate::error::Result;
use crate::operation::{Operation, PatternKind};

/// Apply `operations` to `text`, returning the rewritten text.
pub fn apply(text: &str, operations: &[Operation]) -> Result<String> {
    apply_verbose(text, operations, false)
}

/// Like [`apply`], logging each regex operation at `info` when `verbose`.
pub fn apply_verbose(text: &str, operations: &[Operation], verbose: bool) -> Result<String> {
    let mut current = text.to_string();

    for (index, operation) in operations.iter().enumerate() {
        if operation.kind() == PatternKind::Regex {
            if verbose {
                info!(
                    index,
                    search = operation.search_pattern(),
                    replace = operation.replace_pattern(),
                    "Replacing using regex"
                );
            } else {
                trace!(index, search = operation.search_pattern(), "Applying regex operation");
            }
        }

        let replaced = match operation.apply(&current)? {
            Cow::Owned(next) => Some(next),
            Cow::Borrowed(_) => None,
        };
        if let Some(next) = replaced {
            current = next;
        }
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_sensitivity() {
        let op_a = Operation::literal("cm", "centimeters").unwrap();
        let op_b = Operation::literal("centi", "one-hundredth").unwrap();

        assert_eq!(
            apply("5 cm", &[op_a.clone(), op_b.clone()]).unwrap(),
            "5 one-hundredthmeters"
        );
        assert_eq!(apply("5 cm", &[op_b, op_a]).unwrap(), "5 centimeters");
    }

    #[test]
    fn test_composition_equals_concatenation() {
        let d1 = vec![
            Operation::regex(r"<[^>]+>", "").unwrap(),
            Operation::literal("&amp;", "and").unwrap(),
        ];
        let d2 = vec![
            Operation::regex(r"\s+", " ").unwrap(),
            Operation::literal("and", "&").unwrap(),
        ];
        let text = "<p>salt  &amp;\n pepper</p>";

        let sequential = apply(&apply(text, &d1).unwrap(), &d2).unwrap();
        let concatenated: Vec<Operation> = d1.iter().chain(d2.iter()).cloned().collect();

        assert_eq!(sequential, apply(text, &concatenated).unwrap());
        assert_eq!(sequential, "salt & pepper");
    }

    #[test]
    fn test_duplicates_are_not_removed() {
        let op = Operation::literal("a", "aa").unwrap();
        assert_eq!(apply("a", &[op.clone(), op]).unwrap(), "aaaa");
    }

    #[test]
    fn test_empty_operations_returns_input() {
        assert_eq!(apply("unchanged", &[]).unwrap(), "unchanged");
    }

    #[test]
    fn test_unset_replacement_deletes_matches() {
        let op = crate::operation::build_operation(
            crate::operation::RuleRow {
                search_pattern: Some(r"\[\d+\]".to_string()),
                ..Default::default()
            },
            &Default::default(),
        )
        .unwrap();
        assert_eq!(apply("see [12] here", &[op]).unwrap(), "see  here");
    }

    #[test]
    fn test_verbose_produces_same_output() {
        let ops = vec![Operation::regex("o+", "0").unwrap()];
        assert_eq!(apply_verbose("foo", &ops, true).unwrap(), apply("foo", &ops).unwrap());
    }

    #[test]
    fn test_plain_and_backtracking_operations_mix() {
        let ops = vec![
            Operation::regex(r"(?<=\d)\s*kg\b", " kilograms").unwrap(),
            Operation::regex(r"\s+", " ").unwrap(),
        ];
        assert_eq!(apply("5kg  and 3   kg", &ops).unwrap(), "5 kilograms and 3 kilograms");
    }
}
