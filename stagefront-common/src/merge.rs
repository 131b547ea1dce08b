//! Declarative merge of site data layers
//!
//! The site is assembled from up to three layers applied in order: built-in
//! defaults, the local snapshot, the remote snapshot. Each top-level field of
//! `SiteData` has one [`MergeStrategy`] in [`SITE_MERGE_TABLE`]:
//!
//! - `Override`: a present, non-null overlay value replaces the base value
//! - `DeepMerge`: object fields merge key by key, recursively; arrays and
//!   scalars inside the object are replaced when present
//! - `ReplaceIfPresent`: a present array replaces the base array wholesale;
//!   lists are never merged element-wise
//!
//! Merging happens on `serde_json::Value` so partial overlays can be applied
//! before the result is decoded back into `SiteData`.

use crate::model::SiteData;
use crate::{Error, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// How an overlay field is combined with the base field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Override,
    DeepMerge,
    ReplaceIfPresent,
}

/// Field name (wire name) to strategy mapping for `SiteData`
pub const SITE_MERGE_TABLE: &[(&str, MergeStrategy)] = &[
    ("adminPassword", MergeStrategy::Override),
    ("navigation", MergeStrategy::ReplaceIfPresent),
    ("hero", MergeStrategy::DeepMerge),
    ("featuredAlbum", MergeStrategy::DeepMerge),
    ("tracks", MergeStrategy::ReplaceIfPresent),
    ("articles", MergeStrategy::ReplaceIfPresent),
    ("artists", MergeStrategy::ReplaceIfPresent),
    ("resources", MergeStrategy::ReplaceIfPresent),
    ("integrations", MergeStrategy::DeepMerge),
    ("contact", MergeStrategy::DeepMerge),
];

/// What happened to each overlay field during a merge
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Fields taken from the overlay
    pub applied: Vec<String>,
    /// Overlay fields ignored, with the reason
    pub skipped: Vec<(String, String)>,
}

impl MergeReport {
    fn skip(&mut self, field: &str, reason: impl Into<String>) {
        self.skipped.push((field.to_string(), reason.into()));
    }
}

/// Merge `overlay` into `base` in place, following `table`
///
/// Both values must be JSON objects. Fields of `overlay` that have no entry in
/// the table are skipped; fields absent from `overlay` leave `base` untouched.
pub fn merge_with_table(
    base: &mut Value,
    overlay: &Value,
    table: &[(&str, MergeStrategy)],
) -> Result<MergeReport> {
    let overlay = overlay
        .as_object()
        .ok_or_else(|| Error::InvalidInput(format!("overlay must be an object, got {}", kind(overlay))))?;
    let base = base
        .as_object_mut()
        .ok_or_else(|| Error::InvalidInput("base must be an object".to_string()))?;

    let mut report = MergeReport::default();

    for (field, value) in overlay {
        let Some((_, strategy)) = table.iter().find(|(name, _)| name == field) else {
            report.skip(field, "unknown field");
            continue;
        };

        if value.is_null() {
            report.skip(field, "null");
            continue;
        }

        match strategy {
            MergeStrategy::Override => {
                base.insert(field.clone(), value.clone());
                report.applied.push(field.clone());
            }
            MergeStrategy::ReplaceIfPresent => {
                if value.is_array() {
                    base.insert(field.clone(), value.clone());
                    report.applied.push(field.clone());
                } else {
                    report.skip(field, format!("expected array, got {}", kind(value)));
                }
            }
            MergeStrategy::DeepMerge => match value.as_object() {
                Some(obj) => {
                    let slot = base
                        .entry(field.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    deep_merge(slot, obj);
                    report.applied.push(field.clone());
                }
                None => report.skip(field, format!("expected object, got {}", kind(value))),
            },
        }
    }

    Ok(report)
}

/// Recursive key-by-key merge; non-object values replace, nulls are ignored
fn deep_merge(base: &mut Value, overlay: &Map<String, Value>) {
    if !base.is_object() {
        *base = Value::Object(Map::new());
    }
    let Some(base) = base.as_object_mut() else {
        return;
    };

    for (key, value) in overlay {
        match value {
            Value::Null => {}
            Value::Object(inner) => {
                let slot = base
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                deep_merge(slot, inner);
            }
            other => {
                base.insert(key.clone(), other.clone());
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Apply one overlay layer on top of `base`, producing a new `SiteData`
///
/// Fails when the overlay is not an object or when the merged value no longer
/// decodes as `SiteData` (e.g. a track id stored as a string). Callers keep
/// `base` in that case.
pub fn merge_site_data(base: &SiteData, overlay: &Value) -> Result<SiteData> {
    let mut merged = serde_json::to_value(base)?;
    let report = merge_with_table(&mut merged, overlay, SITE_MERGE_TABLE)?;

    for (field, reason) in &report.skipped {
        debug!("Merge skipped field '{}': {}", field, reason);
    }

    Ok(serde_json::from_value(merged)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;
    use serde_json::json;

    fn track(id: u64, title: &str) -> Value {
        json!({"id": id, "title": title})
    }

    #[test]
    fn test_every_site_field_has_a_strategy() {
        let value = serde_json::to_value(SiteData::default()).unwrap();
        for key in value.as_object().unwrap().keys() {
            assert!(
                SITE_MERGE_TABLE.iter().any(|(name, _)| name == key),
                "no merge strategy for '{}'",
                key
            );
        }
    }

    #[test]
    fn test_absent_fields_keep_base_values() {
        let base = SiteData::default();
        let merged = merge_site_data(&base, &json!({"hero": {"title": "NEW"}})).unwrap();

        assert_eq!(merged.hero.title, "NEW");
        assert_eq!(merged.hero.subtitle, base.hero.subtitle);
        assert_eq!(merged.tracks, base.tracks);
        assert_eq!(merged.contact, base.contact);
        assert_eq!(merged.navigation, base.navigation);
    }

    #[test]
    fn test_arrays_replace_instead_of_merging() {
        let base = SiteData::default();
        assert!(base.tracks.len() > 1);

        let merged = merge_site_data(&base, &json!({"tracks": [track(9, "Only")]})).unwrap();
        assert_eq!(merged.tracks.len(), 1);
        assert_eq!(merged.tracks[0].id, 9);
        // Element fields are not filled from the base list
        assert_eq!(merged.tracks[0].artist, "");
    }

    #[test]
    fn test_empty_array_still_replaces() {
        let merged = merge_site_data(&SiteData::default(), &json!({"resources": []})).unwrap();
        assert!(merged.resources.is_empty());
    }

    #[test]
    fn test_deep_merge_reaches_nested_integration_configs() {
        let base = SiteData::default();
        let merged = merge_site_data(
            &base,
            &json!({"integrations": {"netease": {"userId": "u-1"}}}),
        )
        .unwrap();

        assert_eq!(merged.integrations.netease.user_id, "u-1");
        assert_eq!(merged.integrations.netease.enabled, base.integrations.netease.enabled);
        assert_eq!(merged.integrations.cloud_storage, base.integrations.cloud_storage);
    }

    #[test]
    fn test_nested_arrays_inside_objects_replace() {
        let merged = merge_site_data(
            &SiteData::default(),
            &json!({"contact": {"socials": [{"platform": "x", "url": "https://x.com/nh"}]}}),
        )
        .unwrap();

        assert_eq!(merged.contact.socials.len(), 1);
        assert_eq!(merged.contact.email, SiteData::default().contact.email);
    }

    #[test]
    fn test_nulls_and_wrong_shapes_are_skipped() {
        let mut base = serde_json::to_value(SiteData::default()).unwrap();
        let report = merge_with_table(
            &mut base,
            &json!({"tracks": null, "articles": {"oops": 1}, "hero": "flat", "extra": 1}),
            SITE_MERGE_TABLE,
        )
        .unwrap();

        assert!(report.applied.is_empty());
        assert_eq!(report.skipped.len(), 4);
        assert_eq!(base, serde_json::to_value(SiteData::default()).unwrap());
    }

    #[test]
    fn test_override_replaces_scalar() {
        let merged =
            merge_site_data(&SiteData::default(), &json!({"adminPassword": "hunter2"})).unwrap();
        assert_eq!(merged.admin_password, "hunter2");
    }

    #[test]
    fn test_non_object_overlay_is_rejected() {
        assert!(merge_site_data(&SiteData::default(), &json!([1, 2])).is_err());
    }

    #[test]
    fn test_undecodable_result_is_an_error() {
        let result = merge_site_data(&SiteData::default(), &json!({"tracks": [{"id": "abc"}]}));
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_layers_apply_in_order() {
        let local = json!({"tracks": [track(1, "A"), track(2, "B")], "hero": {"title": "Local"}});
        let remote = json!({"hero": {"title": "Remote"}});

        let after_local = merge_site_data(&SiteData::default(), &local).unwrap();
        let after_remote = merge_site_data(&after_local, &remote).unwrap();

        assert_eq!(after_remote.hero.title, "Remote");
        let titles: Vec<&str> = after_remote.tracks.iter().map(|t: &Track| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }
}
