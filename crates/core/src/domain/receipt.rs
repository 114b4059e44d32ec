use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::run::{ExecutionHandle, RunReceipts};

/// Base addresses used to turn content identifiers and transaction hashes
/// into links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptLinks {
    pub gateway_url: Option<String>,
    pub explorer_url: Option<String>,
}

impl ReceiptLinks {
    pub fn new(gateway_url: Option<String>, explorer_url: Option<String>) -> Self {
        Self {
            gateway_url,
            explorer_url,
        }
    }

    fn cid_url(&self, cid: &str) -> Option<String> {
        self.gateway_url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), cid))
    }

    fn tx_url(&self, hash: &str) -> Option<String> {
        self.explorer_url
            .as_deref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), hash))
    }
}

/// Durable record of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Run id of the execution this receipt was derived from.
    pub id: String,
    pub job_id: Option<String>,
    pub plan_hash: Option<String>,
    /// First transaction hash reported for the run.
    pub tx_hash: Option<String>,
    pub tx_hashes: Vec<String>,
    pub cids: Vec<String>,
    pub cid_urls: Vec<String>,
    pub reward: Option<String>,
    pub reward_token: Option<String>,
    pub net_payout: Option<String>,
    pub explorer_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    /// Derive a receipt from the artifacts of a succeeded run.
    ///
    /// `fallback_plan_hash` is used when the status payload does not name
    /// the plan.
    pub fn derive(
        handle: &ExecutionHandle,
        artifacts: &RunReceipts,
        links: &ReceiptLinks,
        fallback_plan_hash: Option<&str>,
    ) -> Self {
        let tx_hash = artifacts.txs.first().cloned();
        let explorer_url = tx_hash.as_deref().and_then(|hash| links.tx_url(hash));
        let cid_urls = artifacts
            .cids
            .iter()
            .filter_map(|cid| links.cid_url(cid))
            .collect();

        Self {
            id: handle.run_id().to_string(),
            job_id: artifacts.job_id.clone(),
            plan_hash: artifacts
                .plan_id
                .clone()
                .or_else(|| fallback_plan_hash.map(str::to_string)),
            tx_hash,
            tx_hashes: artifacts.txs.clone(),
            cids: artifacts.cids.clone(),
            cid_urls,
            reward: artifacts.reward.clone(),
            reward_token: artifacts.reward_token.clone(),
            net_payout: artifacts.net_payout.clone(),
            explorer_url,
            created_at: Utc::now(),
        }
    }

    /// Validate a persisted receipt field by field.
    ///
    /// Returns `None` when the value is not an object, when `id` or
    /// `createdAt` is missing or malformed, or when any present field has
    /// the wrong type. Optional fields may be absent or `null`.
    pub fn decode(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let id = obj.get("id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }
        let created_at = DateTime::parse_from_rfc3339(obj.get("createdAt")?.as_str()?)
            .ok()?
            .with_timezone(&Utc);

        Some(Self {
            id: id.to_string(),
            job_id: opt_string(obj, "jobId")?,
            plan_hash: opt_string(obj, "planHash")?,
            tx_hash: opt_string(obj, "txHash")?,
            tx_hashes: string_array(obj, "txHashes")?,
            cids: string_array(obj, "cids")?,
            cid_urls: string_array(obj, "cidUrls")?,
            reward: opt_string(obj, "reward")?,
            reward_token: opt_string(obj, "rewardToken")?,
            net_payout: opt_string(obj, "netPayout")?,
            explorer_url: opt_string(obj, "explorerUrl")?,
            created_at,
        })
    }
}

/// `Some(None)` for an absent or null field, `Some(Some(_))` for a string,
/// `None` for any other type.
fn opt_string(obj: &Map<String, Value>, key: &str) -> Option<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some(Some(s.clone())),
        Some(_) => None,
    }
}

fn string_array(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifacts() -> RunReceipts {
        RunReceipts {
            job_id: Some("7".to_string()),
            plan_id: None,
            txs: vec!["0xaaa".to_string(), "0xbbb".to_string()],
            cids: vec!["bafy1".to_string()],
            reward: Some("45".to_string()),
            reward_token: Some("AGIALPHA".to_string()),
            net_payout: Some("44.1".to_string()),
        }
    }

    #[test]
    fn test_derive_resolves_links() {
        let handle = ExecutionHandle::new("run-42").unwrap();
        let links = ReceiptLinks::new(
            Some("https://ipfs.io/ipfs/".to_string()),
            Some("https://explorer.example".to_string()),
        );

        let receipt = Receipt::derive(&handle, &artifacts(), &links, Some("0xplan"));

        assert_eq!(receipt.id, "run-42");
        assert_eq!(receipt.job_id.as_deref(), Some("7"));
        assert_eq!(receipt.plan_hash.as_deref(), Some("0xplan"));
        assert_eq!(receipt.tx_hash.as_deref(), Some("0xaaa"));
        assert_eq!(receipt.tx_hashes.len(), 2);
        assert_eq!(receipt.cid_urls, vec!["https://ipfs.io/ipfs/bafy1".to_string()]);
        assert_eq!(
            receipt.explorer_url.as_deref(),
            Some("https://explorer.example/tx/0xaaa")
        );
    }

    #[test]
    fn test_derive_without_links_or_txs() {
        let handle = ExecutionHandle::new("run-1").unwrap();
        let receipt = Receipt::derive(
            &handle,
            &RunReceipts::default(),
            &ReceiptLinks::default(),
            None,
        );

        assert!(receipt.tx_hash.is_none());
        assert!(receipt.explorer_url.is_none());
        assert!(receipt.cid_urls.is_empty());
        assert!(receipt.plan_hash.is_none());
    }

    #[test]
    fn test_decode_round_trip() {
        let handle = ExecutionHandle::new("run-42").unwrap();
        let receipt = Receipt::derive(&handle, &artifacts(), &ReceiptLinks::default(), None);
        let value = serde_json::to_value(&receipt).unwrap();

        assert_eq!(Receipt::decode(&value), Some(receipt));
    }

    #[test]
    fn test_decode_rejects_malformed_entries() {
        assert!(Receipt::decode(&json!("not an object")).is_none());
        assert!(Receipt::decode(&json!({"createdAt": "2026-01-01T00:00:00Z"})).is_none());
        assert!(Receipt::decode(&json!({"id": "run-1"})).is_none());
        assert!(Receipt::decode(&json!({
            "id": "run-1",
            "createdAt": "2026-01-01T00:00:00Z",
            "jobId": 7
        }))
        .is_none());
        assert!(Receipt::decode(&json!({
            "id": "run-1",
            "createdAt": "2026-01-01T00:00:00Z",
            "cids": ["bafy", 3]
        }))
        .is_none());
    }

    #[test]
    fn test_decode_minimal_entry() {
        let receipt = Receipt::decode(&json!({
            "id": "run-1",
            "createdAt": "2026-01-01T00:00:00Z",
            "jobId": null
        }))
        .unwrap();

        assert_eq!(receipt.id, "run-1");
        assert!(receipt.job_id.is_none());
        assert!(receipt.tx_hashes.is_empty());
    }
}
