use serde::{Deserialize, Serialize};

/// Metadata value: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Free-form text.
    Text(String),
    /// Several values for one field (e.g. multiple tasks).
    List(Vec<String>),
}

impl MetaValue {
    /// Display form: text as-is, lists joined with `", "`.
    pub fn display(&self) -> String {
        match self {
            MetaValue::Text(text) => text.clone(),
            MetaValue::List(items) => items.join(", "),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(text: &str) -> Self {
        MetaValue::Text(text.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(text: String) -> Self {
        MetaValue::Text(text)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(items: Vec<String>) -> Self {
        MetaValue::List(items)
    }
}

impl From<Vec<&str>> for MetaValue {
    fn from(items: Vec<&str>) -> Self {
        MetaValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Fixed-schema metadata attached to a registered dataset.
///
/// The field set is closed: deserialization rejects unknown fields, so a
/// typo in a dataset manifest fails at registration time instead of
/// silently dropping metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Description {
    /// Anatomical region covered by the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_region: Option<MetaValue>,
    /// Usage license.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<MetaValue>,
    /// Home page or publication link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<MetaValue>,
    /// Imaging modality (CT, MRI, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<MetaValue>,
    /// Size of the prepared data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_data_size: Option<MetaValue>,
    /// Size of the raw data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data_size: Option<MetaValue>,
    /// Annotation task(s) the dataset supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<MetaValue>,
}

impl Description {
    /// Sets the body region.
    pub fn with_body_region(mut self, value: impl Into<MetaValue>) -> Self {
        self.body_region = Some(value.into());
        self
    }

    /// Sets the license.
    pub fn with_license(mut self, value: impl Into<MetaValue>) -> Self {
        self.license = Some(value.into());
        self
    }

    /// Sets the link.
    pub fn with_link(mut self, value: impl Into<MetaValue>) -> Self {
        self.link = Some(value.into());
        self
    }

    /// Sets the modality.
    pub fn with_modality(mut self, value: impl Into<MetaValue>) -> Self {
        self.modality = Some(value.into());
        self
    }

    /// Sets the prepared data size.
    pub fn with_prep_data_size(mut self, value: impl Into<MetaValue>) -> Self {
        self.prep_data_size = Some(value.into());
        self
    }

    /// Sets the raw data size.
    pub fn with_raw_data_size(mut self, value: impl Into<MetaValue>) -> Self {
        self.raw_data_size = Some(value.into());
        self
    }

    /// Sets the task(s).
    pub fn with_task(mut self, value: impl Into<MetaValue>) -> Self {
        self.task = Some(value.into());
        self
    }

    /// Fields in schema order, paired with their names.
    pub fn fields(&self) -> [(&'static str, &Option<MetaValue>); 7] {
        [
            ("body_region", &self.body_region),
            ("license", &self.license),
            ("link", &self.link),
            ("modality", &self.modality),
            ("prep_data_size", &self.prep_data_size),
            ("raw_data_size", &self.raw_data_size),
            ("task", &self.task),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<Description>(r#"{"licence": "CC-BY"}"#).unwrap_err();
        assert!(err.to_string().contains("licence"));
    }

    #[test]
    fn string_or_list_both_deserialize() {
        let parsed: Description =
            serde_json::from_str(r#"{"modality": "CT", "task": ["seg", "cls"]}"#).unwrap();
        assert_eq!(parsed.modality, Some(MetaValue::Text("CT".into())));
        assert_eq!(parsed.task.unwrap().display(), "seg, cls");
    }
}
