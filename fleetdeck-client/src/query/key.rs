//! Cache keys for collection queries.
//!
//! A query is identified by its collection plus the canonical form of its
//! filter parameters. Two keys are equal iff the collection matches and the
//! filter sets are deeply equal; field order and construction order never
//! matter.

use crate::error::ClientError;
use fleetdeck_core::Collection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical filter-parameter set: a sorted map of stringified fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterParams(BTreeMap<String, String>);

impl FilterParams {
    /// Canonicalize any serializable filter struct.
    ///
    /// The filters must serialize to a JSON object (unset fields skipped).
    /// Scalar values keep their string form; anything else falls back to
    /// its compact JSON encoding.
    pub fn from_filters<F: Serialize>(filters: &F) -> Result<Self, ClientError> {
        let value = serde_json::to_value(filters)?;
        let fields = match value {
            serde_json::Value::Object(fields) => fields,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(ClientError::InvalidFilter(format!(
                    "filter parameters must serialize to an object, got {}",
                    other
                )))
            }
        };

        let mut params = BTreeMap::new();
        for (field, value) in fields {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    params.insert(field, s);
                }
                other => {
                    params.insert(field, other.to_string());
                }
            }
        }
        Ok(Self(params))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Identifies one cached collection read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    collection: Collection,
    params: Option<FilterParams>,
}

impl QueryKey {
    /// Key for an unfiltered collection read.
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            params: None,
        }
    }

    /// Key for a filtered collection read. An all-unset filter set
    /// normalizes to the unfiltered key.
    pub fn filtered<F: Serialize>(collection: Collection, filters: &F) -> Result<Self, ClientError> {
        let params = FilterParams::from_filters(filters)?;
        Ok(Self {
            collection,
            params: (!params.is_empty()).then_some(params),
        })
    }

    pub fn collection_name(&self) -> Collection {
        self.collection
    }

    pub fn params(&self) -> Option<&FilterParams> {
        self.params.as_ref()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        if let Some(params) = &self.params {
            let mut sep = '?';
            for (field, value) in params.iter() {
                write!(f, "{}{}={}", sep, field, value)?;
                sep = '&';
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdeck_core::{AgentFilters, AgentStatus, TaskFilters, TaskStatus};

    #[test]
    fn test_empty_filters_normalize_to_unfiltered_key() {
        let filtered = QueryKey::filtered(Collection::Agents, &AgentFilters::default())
            .expect("canonicalize");
        assert_eq!(filtered, QueryKey::collection(Collection::Agents));
        assert!(filtered.params().is_none());
    }

    #[test]
    fn test_same_filters_same_key() {
        let a = QueryKey::filtered(
            Collection::Tasks,
            &TaskFilters {
                status: Some(TaskStatus::Running),
                ..Default::default()
            },
        )
        .expect("canonicalize");
        let b = QueryKey::filtered(
            Collection::Tasks,
            &TaskFilters {
                status: Some(TaskStatus::Running),
                ..Default::default()
            },
        )
        .expect("canonicalize");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_filters_different_keys() {
        let running = QueryKey::filtered(
            Collection::Tasks,
            &TaskFilters {
                status: Some(TaskStatus::Running),
                ..Default::default()
            },
        )
        .expect("canonicalize");
        let queued = QueryKey::filtered(
            Collection::Tasks,
            &TaskFilters {
                status: Some(TaskStatus::Queued),
                ..Default::default()
            },
        )
        .expect("canonicalize");
        assert_ne!(running, queued);
    }

    #[test]
    fn test_collection_distinguishes_keys() {
        assert_ne!(
            QueryKey::collection(Collection::Agents),
            QueryKey::collection(Collection::Tasks)
        );
    }

    #[test]
    fn test_display_includes_params() {
        let key = QueryKey::filtered(
            Collection::Agents,
            &AgentFilters {
                status: Some(AgentStatus::Active),
                role: Some("kiosk".to_string()),
                search: None,
            },
        )
        .expect("canonicalize");
        assert_eq!(key.to_string(), "agents?role=kiosk&status=active");
    }

    #[test]
    fn test_non_object_filters_rejected() {
        let result = QueryKey::filtered(Collection::Logs, &"not-an-object");
        assert!(matches!(result, Err(ClientError::InvalidFilter(_))));
    }
}
