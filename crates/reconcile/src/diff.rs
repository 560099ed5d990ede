//! Diff computation for monitoring objects
//!
//! Both sides are turned into a canonical text form (key-sorted, pretty JSON)
//! before comparing, so the diff of two equal objects is always empty and the
//! same inputs always produce the same lines.

use serde::Serialize;
use serde_json::Value;
use similar::TextDiff;
use std::collections::BTreeSet;

/// Lines of context around each change
pub const CONTEXT_LINES: usize = 3;

/// Field paths removed from both sides before comparing
///
/// Paths are dotted (`"grafana_alert.uid"`). When a path runs into an array,
/// the rest of the path is applied to every element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    paths: BTreeSet<Vec<String>>,
}

impl Exclusions {
    /// No exclusions
    pub fn none() -> Self {
        Self::default()
    }

    /// Build exclusions from dotted paths
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|p| {
                p.as_ref()
                    .split('.')
                    .filter(|segment| !segment.is_empty())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|segments| !segments.is_empty())
            .collect();
        Self { paths }
    }

    /// Add another path
    pub fn with(mut self, path: &str) -> Self {
        self.paths.extend(Self::new([path]).paths);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every excluded path from `value`
    pub fn strip(&self, value: &mut Value) {
        for path in &self.paths {
            strip_path(value, path);
        }
    }
}

fn strip_path(value: &mut Value, path: &[String]) {
    match value {
        Value::Object(map) => match path {
            [] => {}
            [last] => {
                map.remove(last);
            }
            [head, rest @ ..] => {
                if let Some(child) = map.get_mut(head) {
                    strip_path(child, rest);
                }
            }
        },
        Value::Array(items) => {
            for item in items {
                strip_path(item, path);
            }
        }
        _ => {}
    }
}

/// Rebuild objects with their keys in sorted order
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Canonical text form of an optional object
///
/// Absent objects canonicalize to the empty string.
pub fn canonicalize<T: Serialize>(
    value: Option<&T>,
    exclusions: &Exclusions,
) -> serde_json::Result<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };

    let mut json = serde_json::to_value(value)?;
    exclusions.strip(&mut json);

    let mut text = serde_json::to_string_pretty(&sort_keys(json))?;
    text.push('\n');
    Ok(text)
}

/// Unified diff from `before` (remote) to `after` (local)
///
/// Returns an empty list when the canonical forms are equal.
pub fn diff<T: Serialize>(
    before: Option<&T>,
    after: Option<&T>,
    exclusions: &Exclusions,
) -> serde_json::Result<Vec<String>> {
    let old = canonicalize(before, exclusions)?;
    let new = canonicalize(after, exclusions)?;

    if old == new {
        return Ok(Vec::new());
    }

    let text_diff = TextDiff::from_lines(&old, &new);
    let unified = text_diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header("remote", "local")
        .to_string();

    Ok(unified.lines().map(ToString::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_objects_have_no_diff() {
        let a = json!({"name": "foo", "labels": {"team": "ops"}});
        let b = json!({"labels": {"team": "ops"}, "name": "foo"});
        assert!(diff(Some(&a), Some(&b), &Exclusions::none()).unwrap().is_empty());
    }

    #[test]
    fn test_both_absent() {
        let lines = diff::<Value>(None, None, &Exclusions::none()).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_changed_field() {
        let remote = json!({"key": "foo", "name": "bar"});
        let local = json!({"key": "foo", "name": "foo"});
        let lines = diff(Some(&remote), Some(&local), &Exclusions::none()).unwrap();

        assert!(lines.iter().any(|l| l.starts_with('-') && l.contains("\"name\": \"bar\"")));
        assert!(lines.iter().any(|l| l.starts_with('+') && l.contains("\"name\": \"foo\"")));
        assert_eq!(lines[0], "--- remote");
        assert_eq!(lines[1], "+++ local");
    }

    #[test]
    fn test_creation_diff_adds_every_line() {
        let local = json!({"name": "foo"});
        let lines = diff(None, Some(&local), &Exclusions::none()).unwrap();

        let body: Vec<_> = lines.iter().skip(3).collect();
        assert!(!body.is_empty());
        assert!(body.iter().all(|l| l.starts_with('+')));
    }

    #[test]
    fn test_exclusions_hide_backend_fields() {
        let remote = json!({"grafana_alert": {"title": "cpu", "uid": "abc123"}});
        let local = json!({"grafana_alert": {"title": "cpu"}});

        let noisy = diff(Some(&remote), Some(&local), &Exclusions::none()).unwrap();
        assert!(!noisy.is_empty());

        let exclusions = Exclusions::new(["grafana_alert.uid"]);
        let quiet = diff(Some(&remote), Some(&local), &exclusions).unwrap();
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_exclusions_apply_to_array_elements() {
        let mut value = json!({"rules": [{"uid": "a", "expr": "up"}, {"uid": "b", "expr": "down"}]});
        Exclusions::new(["rules.uid"]).strip(&mut value);
        assert_eq!(value, json!({"rules": [{"expr": "up"}, {"expr": "down"}]}));
    }

    #[test]
    fn test_canonical_form_is_key_sorted() {
        let value = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let text = canonicalize(Some(&value), &Exclusions::none()).unwrap();
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let c = text.find("\"c\"").unwrap();
        let d = text.find("\"d\"").unwrap();
        assert!(a < b);
        assert!(c < d);
    }

    #[test]
    fn test_diff_is_deterministic() {
        let remote = json!({"name": "bar", "z": [1, 2, 3], "a": true});
        let local = json!({"a": false, "name": "foo", "z": [1, 2]});
        let first = diff(Some(&remote), Some(&local), &Exclusions::none()).unwrap();
        let second = diff(Some(&remote), Some(&local), &Exclusions::none()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exclusion_path_parsing() {
        let exclusions = Exclusions::new(["spec.uid", "", "..", "id"]).with("spec.version");
        assert_eq!(exclusions.paths.len(), 3);
        assert!(Exclusions::none().is_empty());
    }
}
