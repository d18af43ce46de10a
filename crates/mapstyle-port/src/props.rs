// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property bags and field-level diffing.

use std::collections::BTreeMap;

use serde_json::Value;

/// Ordered property bag (`"line-color" -> "red"`).
///
/// A `BTreeMap` keeps iteration order deterministic so two bags with the same
/// entries compare and serialize identically.
pub type Properties = BTreeMap<String, Value>;

/// Compute the minimal property patch turning `old` into `new`.
///
/// Changed and added keys map to their new value. Keys present in `old` but
/// missing from `new` map to [`Value::Null`], which backends treat as "reset
/// to default". A key explicitly set to `null` is the same as an absent key.
/// An empty result means nothing changed.
pub fn diff_properties(old: &Properties, new: &Properties) -> Properties {
    let mut patch = Properties::new();
    for (key, value) in new {
        if old.get(key).unwrap_or(&Value::Null) != value {
            patch.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in old {
        if !value.is_null() && !new.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    patch
}

/// Apply a patch produced by [`diff_properties`] onto `target`.
///
/// `null` entries remove the key.
pub fn apply_patch(target: &mut Properties, patch: &Properties) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, Value)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn identical_bags_produce_empty_patch() {
        let a = props(&[("line-color", json!("red")), ("line-width", json!(2))]);
        assert!(diff_properties(&a, &a.clone()).is_empty());
    }

    #[test]
    fn only_changed_fields_are_carried() {
        let old = props(&[("line-color", json!("blue")), ("line-width", json!(2))]);
        let new = props(&[("line-color", json!("red")), ("line-width", json!(2))]);
        let patch = diff_properties(&old, &new);
        assert_eq!(patch, props(&[("line-color", json!("red"))]));
    }

    #[test]
    fn explicit_null_matches_absent_key() {
        let old = props(&[("line-color", json!("blue"))]);
        let new = props(&[("line-color", json!("blue")), ("line-blur", Value::Null)]);
        assert!(diff_properties(&old, &new).is_empty());
    }

    #[test]
    fn applying_patch_reaches_target() {
        let old = props(&[("a", json!(1)), ("b", json!(2))]);
        let new = props(&[("a", json!(3)), ("c", json!(4))]);
        let mut state = old.clone();
        apply_patch(&mut state, &diff_properties(&old, &new));
        assert_eq!(state, new);
    }

    #[test]
    fn removed_fields_reset_to_null() {
        let old = props(&[("line-color", json!("blue")), ("line-blur", json!(1))]);
        let new = props(&[("line-color", json!("blue")), ("line-opacity", json!(0.5))]);
        let patch = diff_properties(&old, &new);
        assert_eq!(
            patch,
            props(&[("line-blur", Value::Null), ("line-opacity", json!(0.5))])
        );
    }
}
