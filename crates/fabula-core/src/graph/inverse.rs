//! Inverse labels used when a relation is created with a mirror.

const PAIRS: &[(&str, &str)] = &[
    ("parent_of", "child_of"),
    ("member_of", "has_member"),
    ("leader_of", "led_by"),
    ("located_in", "contains"),
    ("owns", "owned_by"),
    ("mentor_of", "mentored_by"),
];

/// Label of the mirror edge for `relation_type`.
///
/// Asymmetric labels map to their partner; everything else
/// (`sibling_of`, `ally_of`, `mentions`, ...) is its own inverse.
pub fn inverse_of(relation_type: &str) -> &str {
    PAIRS
        .iter()
        .find_map(|&(a, b)| {
            if a == relation_type {
                Some(b)
            } else if b == relation_type {
                Some(a)
            } else {
                None
            }
        })
        .unwrap_or(relation_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asymmetric_labels_swap() {
        assert_eq!(inverse_of("parent_of"), "child_of");
        assert_eq!(inverse_of("child_of"), "parent_of");
        assert_eq!(inverse_of("located_in"), "contains");
        assert_eq!(inverse_of("owned_by"), "owns");
    }

    #[test]
    fn other_labels_are_symmetric() {
        assert_eq!(inverse_of("ally_of"), "ally_of");
        assert_eq!(inverse_of("mentions"), "mentions");
    }
}
