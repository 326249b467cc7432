//! Function dispatcher: name + loose params -> envelope

use std::str::FromStr;
use serde_json::Value;
use crate::{Result, Error};
use crate::query::SubtreeQuery;
use crate::storage::Store;
use super::RpcResult;

/// Loosely typed call parameters, as received from the client
pub type RpcParams = serde_json::Map<String, Value>;

/// Registered RPC functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcFunction {
    IsPersonInSubtree,
}

impl RpcFunction {
    pub const ALL: &'static [RpcFunction] = &[RpcFunction::IsPersonInSubtree];

    pub fn as_str(&self) -> &'static str {
        match self {
            RpcFunction::IsPersonInSubtree => "is_person_in_subtree",
        }
    }
}

impl FromStr for RpcFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RpcFunction::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::UnknownFunction(s.to_string()))
    }
}

impl std::fmt::Display for RpcFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes RPC calls to their query implementation
pub struct RpcDispatcher<'a> {
    store: &'a Store,
}

impl<'a> RpcDispatcher<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Handle one call.
    ///
    /// Unknown functions and missing parameters come back as error
    /// envelopes. Store failures are returned as `Err` for the host to
    /// report.
    pub fn handle(&self, function_name: &str, params: &RpcParams) -> Result<RpcResult> {
        match self.dispatch(function_name, params) {
            Ok(data) => Ok(RpcResult::ok(data)),
            Err(e @ (Error::Validation(_) | Error::UnknownFunction(_))) => {
                tracing::warn!("RPC {} rejected: {}", function_name, e);
                Ok(RpcResult::err(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn dispatch(&self, function_name: &str, params: &RpcParams) -> Result<Value> {
        match function_name.parse::<RpcFunction>()? {
            RpcFunction::IsPersonInSubtree => {
                let (Some(root_id), Some(target_id)) =
                    (required_str(params, "root_id"), required_str(params, "target_id"))
                else {
                    return Err(Error::Validation("Missing root_id or target_id".to_string()));
                };

                let reachable = SubtreeQuery::new(self.store).is_reachable(root_id, target_id)?;
                Ok(Value::Bool(reachable))
            }
        }
    }
}

/// A non-empty string parameter; anything else counts as missing
fn required_str<'p>(params: &'p RpcParams, key: &str) -> Option<&'p str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SnapshotLocation;
    use serde_json::json;
    use tempfile::TempDir;

    fn params(value: Value) -> RpcParams {
        value.as_object().cloned().unwrap()
    }

    fn lineage_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(SnapshotLocation::new(dir.path()));
        store
            .execute_batch(
                "CREATE TABLE families (id TEXT PRIMARY KEY, father_id TEXT, mother_id TEXT);
                 CREATE TABLE children (family_id TEXT, person_id TEXT);
                 INSERT INTO families VALUES ('f1', 'p1', NULL);
                 INSERT INTO children VALUES ('f1', 'p2');",
            )
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_function_names() {
        assert_eq!(
            "is_person_in_subtree".parse::<RpcFunction>().unwrap(),
            RpcFunction::IsPersonInSubtree
        );
        assert!(matches!("foo".parse::<RpcFunction>(), Err(Error::UnknownFunction(_))));
    }

    #[test]
    fn test_success_envelope() {
        let (_dir, store) = lineage_store();
        let dispatcher = RpcDispatcher::new(&store);

        let result = dispatcher
            .handle("is_person_in_subtree", &params(json!({"root_id": "p1", "target_id": "p2"})))
            .unwrap();
        assert_eq!(result, RpcResult::ok(true));

        let result = dispatcher
            .handle("is_person_in_subtree", &params(json!({"root_id": "p2", "target_id": "p1"})))
            .unwrap();
        assert_eq!(result.data, json!(false));
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_params_do_not_touch_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(SnapshotLocation::new(dir.path()));
        let dispatcher = RpcDispatcher::new(&store);

        for bad in [
            json!({"root_id": "p1"}),
            json!({"target_id": "p1"}),
            json!({"root_id": "", "target_id": "p2"}),
            json!({"root_id": 7, "target_id": "p2"}),
            json!({}),
        ] {
            let result = dispatcher.handle("is_person_in_subtree", &params(bad)).unwrap();
            assert_eq!(result, RpcResult::err("Missing root_id or target_id"));
        }
        assert!(!store.is_open());
    }

    #[test]
    fn test_unknown_function_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(SnapshotLocation::new(dir.path()));

        let result = RpcDispatcher::new(&store).handle("foo", &RpcParams::new()).unwrap();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"data": null, "error": {"message": "Unknown RPC function: foo"}})
        );
    }

    #[test]
    fn test_store_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(SnapshotLocation::new(dir.path()));

        let err = RpcDispatcher::new(&store)
            .handle("is_person_in_subtree", &params(json!({"root_id": "p1", "target_id": "p2"})))
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }
}
