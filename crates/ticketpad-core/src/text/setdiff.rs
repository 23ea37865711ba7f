/// Compute which elements were added to and removed from a small set.
///
/// `added` keeps the order of `new`, `removed` keeps the order of `old`.
/// Both inputs are expected to be free of duplicates. The scan is pairwise,
/// which is fine for label and component lists.
#[must_use]
pub fn diff_sets<T: PartialEq + Clone>(new: &[T], old: &[T]) -> (Vec<T>, Vec<T>) {
    let added = new.iter().filter(|x| !old.contains(x)).cloned().collect();
    let removed = old.iter().filter(|x| !new.contains(x)).cloned().collect();
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_added_one_removed() {
        let old = ["one", "two"];
        let new = ["two", "three"];
        let (added, removed) = diff_sets(&new, &old);
        assert_eq!(added, vec!["three"]);
        assert_eq!(removed, vec!["one"]);
    }

    #[test]
    fn identical_sets_have_no_difference() {
        let set = ["a", "b", "c"];
        let (added, removed) = diff_sets(&set, &set);
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }

    #[test]
    fn output_follows_source_order() {
        let old = ["z", "keep", "a"];
        let new = ["keep", "m", "b"];
        let (added, removed) = diff_sets(&new, &old);
        assert_eq!(added, vec!["m", "b"]);
        assert_eq!(removed, vec!["z", "a"]);
    }

    proptest! {
        #[test]
        fn added_and_removed_are_exact(
            new in proptest::collection::btree_set("[a-e]{1,2}", 0..8),
            old in proptest::collection::btree_set("[a-e]{1,2}", 0..8),
        ) {
            let new: Vec<String> = new.into_iter().collect();
            let old: Vec<String> = old.into_iter().collect();
            let (added, removed) = diff_sets(&new, &old);

            for x in &added {
                prop_assert!(new.contains(x) && !old.contains(x));
            }
            for x in &removed {
                prop_assert!(old.contains(x) && !new.contains(x));
            }
            for x in new.iter().filter(|x| old.contains(x)) {
                prop_assert!(!added.contains(x) && !removed.contains(x));
            }
            let expected_added = new.iter().filter(|x| !old.contains(x)).count();
            let expected_removed = old.iter().filter(|x| !new.contains(x)).count();
            prop_assert_eq!(added.len(), expected_added);
            prop_assert_eq!(removed.len(), expected_removed);
        }
    }
}
