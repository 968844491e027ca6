use sea_orm::FromJsonQueryResult;

/// A license attached to a component, as stored on occurrences and in the license data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct License {
    pub spdx_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl License {
    pub fn new(spdx_identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            spdx_identifier: spdx_identifier.into(),
            name: Some(name.into()),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    FromJsonQueryResult,
)]
pub struct Licenses(pub Vec<License>);

impl Licenses {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<License>> for Licenses {
    fn from(value: Vec<License>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_without_optional_fields() {
        let licenses: Licenses =
            serde_json::from_value(serde_json::json!([{"spdx_identifier": "Apache-2.0"}])).unwrap();

        assert_eq!(
            licenses.0,
            vec![License {
                spdx_identifier: "Apache-2.0".into(),
                name: None,
                url: None,
            }]
        );
    }

    #[test]
    fn serialize_without_empty_fields() {
        let json = serde_json::to_value(License::new("MIT", "MIT License")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"spdx_identifier": "MIT", "name": "MIT License"})
        );
    }
}
