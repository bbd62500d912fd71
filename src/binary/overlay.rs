use bitflags::bitflags;

bitflags! {
    /// Semantic hints attached to an identifier that alter how the values that
    /// follow it are decoded or grouped
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OverlayFlags: u8 {
        /// Decode an `i32` as a date
        const AS_DATE = 1 << 0;

        /// Decode a `long_float` as Q49.15 rounded to 5 digits
        const AS_Q = 1 << 1;

        /// Keep the date and Q flags active after they are used for a value
        const REPEATS = 1 << 2;

        /// Carry the flags into the container opened by the value
        const KEEP_FOR_CHILDREN = 1 << 3;

        /// Group repeated keys at one level under a single array
        const FLATTEN = 1 << 4;

        /// The array opened by the value may contain `key = value` pairs that
        /// are emitted as single key objects
        const HIDDEN_OBJECT_CONTAINER = 1 << 5;
    }
}

impl Default for OverlayFlags {
    fn default() -> Self {
        OverlayFlags::empty()
    }
}

impl OverlayFlags {
    /// Flags that describe how a scalar value is decoded
    pub(crate) const VALUE_FLAGS: OverlayFlags = OverlayFlags::AS_DATE
        .union(OverlayFlags::AS_Q)
        .union(OverlayFlags::REPEATS);
}

const DATE: OverlayFlags = OverlayFlags::AS_DATE;
const DATE_TREE: OverlayFlags = OverlayFlags::AS_DATE
    .union(OverlayFlags::REPEATS)
    .union(OverlayFlags::KEEP_FOR_CHILDREN);
const DATE_CHILD: OverlayFlags = OverlayFlags::AS_DATE.union(OverlayFlags::KEEP_FOR_CHILDREN);

/// Identifiers whose values need an overlay. Joined against the token
/// dictionary by name, so names the dictionary lacks are ignored.
pub const OVERLAYS: &[(&str, OverlayFlags)] = &[
    ("date", DATE),
    ("meta_date", DATE),
    ("meta_real_date", DATE),
    ("bookmark_date", DATE),
    ("start_time", DATE),
    ("start_date", DATE),
    ("end_date", DATE),
    ("expiration_date", DATE),
    ("history", DATE_TREE),
    ("reign_opinion_held_since", DATE),
    ("found_date", DATE),
    ("birth", DATE),
    ("became_ruler_date", DATE),
    ("pool_history", DATE),
    ("leave_court_date", DATE),
    ("decision_cooldowns", DATE_TREE),
    ("imprison_type_date", DATE),
    ("last_war_finish_date", DATE),
    ("arrival_date", DATE),
    ("spawn_date", DATE),
    ("scheme_cooldowns_0", DATE_CHILD),
    ("scheme_cooldowns_1", DATE_CHILD),
    ("cooldown_against_recipient_0", DATE_CHILD),
    ("cooldown_against_recipient_1", DATE_CHILD),
    ("cooldown", DATE),
    ("last_supply_date", DATE),
    ("gathered_date", DATE),
    ("last_councillor_change", DATE),
    ("hired_until", DATE),
    ("force", DATE),
    ("dates", DATE_TREE),
    ("last_action", DATE),
    ("atrtition_date", DATE),
    ("gold", OverlayFlags::AS_Q),
    ("levels", OverlayFlags::HIDDEN_OBJECT_CONTAINER),
    ("triggered_event", OverlayFlags::FLATTEN),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_ops() {
        let mut flags = OverlayFlags::AS_DATE | OverlayFlags::REPEATS;
        assert!(flags.contains(OverlayFlags::AS_DATE));
        assert!(!flags.contains(OverlayFlags::AS_Q));

        flags.remove(OverlayFlags::AS_DATE);
        assert_eq!(flags, OverlayFlags::REPEATS);

        flags.insert(OverlayFlags::FLATTEN);
        assert_eq!(flags & OverlayFlags::FLATTEN, OverlayFlags::FLATTEN);
        assert!((flags & !flags).is_empty());
    }

    #[test]
    fn test_flag_names() {
        let flags = OverlayFlags::AS_DATE | OverlayFlags::KEEP_FOR_CHILDREN;
        let names: Vec<_> = flags.iter_names().map(|(name, _)| name).collect();
        assert_eq!(names, ["AS_DATE", "KEEP_FOR_CHILDREN"]);
        assert!(format!("{:?}", flags).contains("AS_DATE | KEEP_FOR_CHILDREN"));
        assert!(OverlayFlags::default().is_empty());
    }

    #[test]
    fn test_date_tree_flags() {
        assert!(DATE_TREE.contains(OverlayFlags::AS_DATE | OverlayFlags::REPEATS));
        assert_eq!(DATE_TREE & OverlayFlags::VALUE_FLAGS, DATE | OverlayFlags::REPEATS);
    }

    #[test]
    fn test_curated_names_unique() {
        let mut names: Vec<_> = OVERLAYS.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), OVERLAYS.len());
    }
}
