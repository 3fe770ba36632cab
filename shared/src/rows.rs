use serde::{Deserialize, Serialize};

/// How the list reflects server state after a successful save or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessPolicy {
    /// Reload the page so server-side pagination recomputes.
    #[default]
    Reload,
    /// Patch the table body in place from the returned row markup.
    Patch,
}

/// A change to the table body. Every patch is followed by renumbering the
/// row-index cells from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPatch {
    InsertTop { html: String },
    /// Replace the row with this DOM id, or insert at the top when it is gone.
    Replace { row_id: String, html: String },
    Remove { row_id: String },
}

pub fn row_dom_id(prefix: &str, pk: &str) -> String {
    format!("{prefix}{pk}")
}

/// Primary key of the submitted record: the serialized form value, else the
/// value of a same-named input (disabled fields are not serialized).
pub fn resolve_pk(form_value: Option<&str>, input_value: Option<&str>) -> Option<String> {
    [form_value, input_value]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Text for each row-index cell, numbered from 1.
pub fn index_labels(count: usize) -> impl Iterator<Item = String> {
    (1..=count).map(|i| i.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pk_falls_back_to_input_when_form_value_missing() {
        assert_eq!(resolve_pk(Some("42"), Some("7")).as_deref(), Some("42"));
        assert_eq!(resolve_pk(None, Some("7")).as_deref(), Some("7"));
        assert_eq!(resolve_pk(Some("  "), Some("7")).as_deref(), Some("7"));
        assert_eq!(resolve_pk(None, None), None);
    }

    #[test]
    fn row_ids_join_prefix_and_pk() {
        assert_eq!(row_dom_id("row-", "42"), "row-42");
        assert_eq!(row_dom_id("agent-row-", "A7"), "agent-row-A7");
    }

    #[test]
    fn index_labels_start_at_one() {
        let labels: Vec<String> = index_labels(3).collect();
        assert_eq!(labels, vec!["1", "2", "3"]);
        assert_eq!(index_labels(0).count(), 0);
    }

    #[test]
    fn success_policy_defaults_to_reload() {
        assert_eq!(SuccessPolicy::default(), SuccessPolicy::Reload);
        let policy: SuccessPolicy = serde_json::from_str("\"patch\"").unwrap();
        assert_eq!(policy, SuccessPolicy::Patch);
    }
}
