//! Resolution-threshold pruning decisions.
//!
//! Deciding is pure; deleting is the batch driver's job.

use crate::types::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an image's size is compared against the minimum resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruneRule {
    /// Prune only when both width and height fall below the minimum.
    #[default]
    Both,
    /// Compare `(width, height)` as a tuple: width first, height breaks ties.
    ///
    /// A 1920x10 image survives an 800x600 minimum, but a 799x5000 one does not.
    Lexicographic,
}

impl fmt::Display for PruneRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PruneRule::Both => "both",
            PruneRule::Lexicographic => "lexicographic",
        })
    }
}

/// True if an image of `size` is too small under `rule`.
pub fn should_prune(size: Dimensions, min: Dimensions, rule: PruneRule) -> bool {
    match rule {
        PruneRule::Both => size.width < min.width && size.height < min.height,
        PruneRule::Lexicographic => (size.width, size.height) < (min.width, min.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Dimensions = Dimensions {
        width: 800,
        height: 600,
    };

    #[test]
    fn smaller_in_both_dimensions_is_pruned() {
        assert!(should_prune(Dimensions::new(640, 480), MIN, PruneRule::Both));
        assert!(should_prune(Dimensions::new(640, 480), MIN, PruneRule::Lexicographic));
    }

    #[test]
    fn exactly_minimum_is_kept() {
        assert!(!should_prune(MIN, MIN, PruneRule::Both));
        assert!(!should_prune(MIN, MIN, PruneRule::Lexicographic));
    }

    #[test]
    fn one_small_dimension_is_kept_under_both() {
        assert!(!should_prune(Dimensions::new(799, 5000), MIN, PruneRule::Both));
        assert!(!should_prune(Dimensions::new(5000, 10), MIN, PruneRule::Both));
    }

    #[test]
    fn lexicographic_compares_width_first() {
        assert!(should_prune(Dimensions::new(799, 5000), MIN, PruneRule::Lexicographic));
        assert!(!should_prune(Dimensions::new(1920, 10), MIN, PruneRule::Lexicographic));
        // Equal width, height decides
        assert!(should_prune(Dimensions::new(800, 599), MIN, PruneRule::Lexicographic));
    }

    #[test]
    fn default_rule_is_both() {
        assert_eq!(PruneRule::default(), PruneRule::Both);
    }
}
