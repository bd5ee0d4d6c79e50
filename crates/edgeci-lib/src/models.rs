//! Core data models for proxy synchronization

use serde::{Deserialize, Deserializer, Serialize};

/// Metadata for a proxy as reported by the management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyMetadata {
    pub name: String,
    #[serde(rename = "revision", deserialize_with = "deserialize_revisions")]
    pub revisions: Vec<u32>,
    #[serde(rename = "metaData")]
    pub meta_data: ProxyMetaData,
}

impl ProxyMetadata {
    /// Last modification time in epoch milliseconds
    pub fn last_modified(&self) -> i64 {
        self.meta_data.last_modified_at
    }
}

/// Audit block nested in the proxy metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyMetaData {
    pub last_modified_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
}

/// Outcome of a metadata probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataProbe {
    Found(ProxyMetadata),
    /// The proxy does not exist remotely; a normal outcome, not a failure
    NotFound,
}

/// Cached view of the last observed state of a proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyState {
    pub proxy_name: String,
    pub last_revision: u32,
    /// Epoch milliseconds
    pub last_modified: i64,
}

impl ProxyState {
    pub fn last_modified_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.last_modified)
    }
}

/// Result of comparing fresh metadata with the cached state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    Unchanged,
    ChangedTo(u32),
}

/// Entry in an environment-scoped key value map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvmEntry {
    pub name: String,
    pub value: String,
}

/// Body returned by a successful bundle import
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ImportResponse {
    #[serde(deserialize_with = "deserialize_revision")]
    pub revision: u32,
}

/// Revisions arrive as JSON strings ("3") but numbers are tolerated
#[derive(Deserialize)]
#[serde(untagged)]
enum RevisionRepr {
    Number(u32),
    Text(String),
}

impl RevisionRepr {
    fn into_revision<E: serde::de::Error>(self) -> Result<u32, E> {
        match self {
            RevisionRepr::Number(n) => Ok(n),
            RevisionRepr::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid revision {:?}", s))),
        }
    }
}

fn deserialize_revisions<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<RevisionRepr>::deserialize(deserializer)?
        .into_iter()
        .map(RevisionRepr::into_revision)
        .collect()
}

fn deserialize_revision<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    RevisionRepr::deserialize(deserializer)?.into_revision()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_parses_string_revisions() {
        let body = r#"{
            "name": "orders-api",
            "revision": ["1", "2", "10"],
            "metaData": {
                "createdAt": 1500000000000,
                "lastModifiedAt": 1500000123456,
                "lastModifiedBy": "dev@example.com"
            }
        }"#;

        let metadata: ProxyMetadata = serde_json::from_str(body).unwrap();
        assert_eq!(metadata.name, "orders-api");
        assert_eq!(metadata.revisions, vec![1, 2, 10]);
        assert_eq!(metadata.last_modified(), 1500000123456);
        assert_eq!(
            metadata.meta_data.last_modified_by.as_deref(),
            Some("dev@example.com")
        );
    }

    #[test]
    fn test_metadata_accepts_numeric_revisions() {
        let body = r#"{"name":"a","revision":[3,5],"metaData":{"lastModifiedAt":7}}"#;
        let metadata: ProxyMetadata = serde_json::from_str(body).unwrap();
        assert_eq!(metadata.revisions, vec![3, 5]);
        assert_eq!(metadata.meta_data.created_at, None);
    }

    #[test]
    fn test_metadata_rejects_garbage_revision() {
        let body = r#"{"name":"a","revision":["x"],"metaData":{"lastModifiedAt":7}}"#;
        assert!(serde_json::from_str::<ProxyMetadata>(body).is_err());
    }

    #[test]
    fn test_import_response_revision() {
        let body = r#"{"name":"orders-api","revision":"4","configurationVersion":{}}"#;
        let response: ImportResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.revision, 4);
    }

    #[test]
    fn test_proxy_state_timestamp() {
        let state = ProxyState {
            proxy_name: "orders-api".to_string(),
            last_revision: 2,
            last_modified: 0,
        };
        assert_eq!(state.last_modified_at().unwrap().timestamp(), 0);
    }
}
