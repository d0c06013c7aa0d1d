// tests/classify_props.rs

use fwatcher::events::flags::{flag_value, flags};
use fwatcher::events::{classify, classify_flags, EventFilterSet};
use proptest::prelude::*;

proptest! {
    #[test]
    fn classification_is_deterministic(mask in any::<u32>()) {
        prop_assert_eq!(classify(mask), classify(mask));
    }

    #[test]
    fn names_come_out_sorted_and_unique(mask in any::<u32>()) {
        let names = classify_flags(mask);
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(names, sorted);
    }

    #[test]
    fn every_listed_flag_is_fully_contained(mask in any::<u32>()) {
        let names = classify_flags(mask);
        for name in &names {
            let value = flag_value(name).unwrap();
            prop_assert_eq!(mask & value, value);
        }
        // ...and every contained flag is listed.
        for (name, value) in flags() {
            prop_assert_eq!(names.contains(&name), mask & value == value);
        }
    }

    #[test]
    fn label_is_the_joined_names_or_the_decimal_mask(mask in any::<u32>()) {
        let names = classify_flags(mask);
        let label = classify(mask);
        if names.is_empty() {
            prop_assert_eq!(label, mask.to_string());
        } else {
            prop_assert_eq!(label, names.join(","));
        }
    }

    #[test]
    fn filter_matches_only_whole_labels(mask in any::<u32>()) {
        let label = classify(mask);
        let exact = EventFilterSet::new([label.clone()]);
        prop_assert!(exact.matches(&label));

        let names = classify_flags(mask);
        if names.len() > 1 {
            // Any single component of a compound label does not match it.
            let single = EventFilterSet::new(names.iter().copied());
            prop_assert!(!single.matches(&label));
        }
    }
}
