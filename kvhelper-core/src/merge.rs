//! Shallow configuration merging.

use std::collections::BTreeMap;

use crate::value::Value;

/// Flat configuration: setting name to scalar value.
pub type ConfigMap = BTreeMap<String, Value>;

/// Overlays the truthy entries of `overrides` onto a copy of `base`.
///
/// Override entries that are falsy (see [`Value::is_truthy`]) are skipped, so
/// they never replace a base value and are never added. If either side is
/// missing the result is empty, not a copy of the other side.
///
/// ```rust
/// use kvhelper_core::{merge, ConfigMap, Value};
///
/// let base = ConfigMap::from([
///     ("foo".to_string(), Value::from("123")),
///     ("bar".to_string(), Value::Int(1)),
/// ]);
/// let overrides = ConfigMap::from([
///     ("foo".to_string(), Value::Null),
///     ("bar".to_string(), Value::Int(2)),
/// ]);
///
/// let merged = merge(Some(&base), Some(&overrides));
/// assert_eq!(merged["foo"], Value::from("123"));
/// assert_eq!(merged["bar"], Value::Int(2));
/// ```
pub fn merge(base: Option<&ConfigMap>, overrides: Option<&ConfigMap>) -> ConfigMap {
    let (Some(base), Some(overrides)) = (base, overrides) else {
        return ConfigMap::new();
    };

    let mut merged = base.clone();
    merged.extend(
        overrides
            .iter()
            .filter(|(_, value)| value.is_truthy())
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, Value)]) -> ConfigMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_null_override_keeps_base_value() {
        let base = config(&[("foo", Value::from("123")), ("bar", Value::Int(1))]);
        let overrides = config(&[("foo", Value::Null), ("bar", Value::Int(2))]);

        let merged = merge(Some(&base), Some(&overrides));
        assert_eq!(
            merged,
            config(&[("foo", Value::from("123")), ("bar", Value::Int(2))])
        );
    }

    #[test]
    fn test_empty_base_receives_truthy_overrides() {
        let overrides = config(&[("foo", Value::Null), ("bar", Value::Int(2))]);

        let merged = merge(Some(&ConfigMap::new()), Some(&overrides));
        assert_eq!(merged, config(&[("bar", Value::Int(2))]));
    }

    #[test]
    fn test_truthy_override_replaces() {
        let base = config(&[("some", Value::from("123"))]);
        let overrides = config(&[("some", Value::from("124"))]);

        let merged = merge(Some(&base), Some(&overrides));
        assert_eq!(merged, config(&[("some", Value::from("124"))]));
    }

    #[test]
    fn test_falsy_override_never_added() {
        let base = config(&[("foo", Value::Null)]);
        let overrides = config(&[("bar", Value::Null)]);

        let merged = merge(Some(&base), Some(&overrides));
        assert_eq!(merged, config(&[("foo", Value::Null)]));
    }

    #[test]
    fn test_every_falsy_kind_is_skipped() {
        let base = config(&[
            ("a", Value::from("keep")),
            ("b", Value::from("keep")),
            ("c", Value::from("keep")),
            ("d", Value::from("keep")),
            ("e", Value::from("keep")),
            ("f", Value::from("keep")),
        ]);
        let overrides = config(&[
            ("a", Value::from("")),
            ("b", Value::Int(0)),
            ("c", Value::Null),
            ("d", Value::Undefined),
            ("e", Value::Bool(false)),
            ("f", Value::Float(0.0)),
        ]);

        let merged = merge(Some(&base), Some(&overrides));
        assert_eq!(merged, base);
    }

    #[test]
    fn test_falsy_override_does_not_replace_falsy_base() {
        let base = config(&[("timeout", Value::Int(0))]);
        let overrides = config(&[("timeout", Value::Null)]);

        let merged = merge(Some(&base), Some(&overrides));
        assert_eq!(merged["timeout"], Value::Int(0));
    }

    #[test]
    fn test_missing_side_yields_empty() {
        let some = config(&[("host", Value::from("localhost"))]);

        assert!(merge(None, Some(&some)).is_empty());
        assert!(merge(Some(&some), None).is_empty());
        assert!(merge(None, None).is_empty());
    }

    #[test]
    fn test_inputs_not_mutated() {
        let base = config(&[("host", Value::from("a"))]);
        let overrides = config(&[("host", Value::from("b")), ("port", Value::Int(1))]);
        let base_before = base.clone();
        let overrides_before = overrides.clone();

        let _ = merge(Some(&base), Some(&overrides));
        assert_eq!(base, base_before);
        assert_eq!(overrides, overrides_before);
    }
}
