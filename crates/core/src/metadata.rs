// Metadata merging
// Native metadata from the loaded media is overlaid with externally supplied values

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// A single metadata value, coerced from whatever the native layer exposes
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Date(DateTime<Utc>),
    Number(f64),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetadataValue::Text(text) => f.write_str(text),
            MetadataValue::Date(date) => write!(f, "{}", date.to_rfc3339()),
            MetadataValue::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(value: DateTime<Utc>) -> Self {
        MetadataValue::Date(value)
    }
}

/// Key-ordered metadata mapping
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Metadata item as reported by a native player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeMetadataItem {
    /// Format-independent key (e.g. "title", "artist")
    pub common_key: Option<String>,
    /// Format-specific raw key
    pub key: Option<String>,
    pub string_value: Option<String>,
    pub date_value: Option<DateTime<Utc>>,
    pub number_value: Option<f64>,
}

impl NativeMetadataItem {
    pub fn text(common_key: &str, value: &str) -> Self {
        Self {
            common_key: Some(common_key.to_string()),
            string_value: Some(value.to_string()),
            ..Self::default()
        }
    }

    /// Common key, falling back to the raw key
    pub fn resolved_key(&self) -> Option<&str> {
        self.common_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .or_else(|| self.key.as_deref().filter(|key| !key.is_empty()))
    }

    /// String first, then date, then number
    pub fn coerced_value(&self) -> Option<MetadataValue> {
        if let Some(text) = self.string_value.as_ref().filter(|text| !text.is_empty()) {
            return Some(MetadataValue::Text(text.clone()));
        }
        if let Some(date) = self.date_value {
            return Some(MetadataValue::Date(date));
        }
        self.number_value.map(MetadataValue::Number)
    }
}

/// Build the combined view: native items first, external overrides win on conflict
pub fn combine(native: &[NativeMetadataItem], external: &Metadata) -> Metadata {
    let mut combined = Metadata::new();

    for item in native {
        match (item.resolved_key(), item.coerced_value()) {
            (Some(key), Some(value)) => {
                combined.insert(key.to_string(), value);
            }
            _ => log::trace!("Skipping native metadata item without key or value: {:?}", item),
        }
    }

    for (key, value) in external {
        combined.insert(key.clone(), value.clone());
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_external_metadata_wins() {
        let native = vec![
            NativeMetadataItem::text("title", "Native Title"),
            NativeMetadataItem::text("artist", "Native Artist"),
        ];
        let mut external = Metadata::new();
        external.insert("title".to_string(), "X".into());

        let combined = combine(&native, &external);

        assert_eq!(combined.get("title"), Some(&MetadataValue::Text("X".into())));
        assert_eq!(
            combined.get("artist"),
            Some(&MetadataValue::Text("Native Artist".into()))
        );
    }

    #[test]
    fn test_raw_key_fallback_and_value_coercion() {
        let released = Utc.with_ymd_and_hms(2017, 3, 1, 0, 0, 0).unwrap();
        let native = vec![
            NativeMetadataItem {
                key: Some("TDRC".to_string()),
                date_value: Some(released),
                ..Default::default()
            },
            NativeMetadataItem {
                common_key: Some(String::new()),
                key: Some("TRCK".to_string()),
                string_value: Some(String::new()),
                number_value: Some(7.0),
                ..Default::default()
            },
        ];

        let combined = combine(&native, &Metadata::new());

        assert_eq!(combined.get("TDRC"), Some(&MetadataValue::Date(released)));
        assert_eq!(combined.get("TRCK"), Some(&MetadataValue::Number(7.0)));
    }

    #[test]
    fn test_items_without_key_or_value_are_skipped() {
        let native = vec![
            NativeMetadataItem {
                string_value: Some("orphan".to_string()),
                ..Default::default()
            },
            NativeMetadataItem {
                common_key: Some("album".to_string()),
                ..Default::default()
            },
        ];

        assert!(combine(&native, &Metadata::new()).is_empty());
    }
}
