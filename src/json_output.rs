//! JSON output format for rebinned scalers

use crate::handler::StagedBin;
use crate::payload::SnPayload;
use crate::rebin::Rebinned;
use crate::stats::StatTotals;
use serde::{Deserialize, Serialize};

/// Rebinned events of one payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPayload {
    /// Start of the payload's first scaler slot (0.1 ns)
    pub utime: u64,
    /// DOM mainboard ID, hex
    pub dom_id: String,
    /// Hits per event
    pub counts: Vec<u32>,
    /// 2 ms bin index per event
    pub indices: Vec<u64>,
}

/// A completed staging bin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBin {
    pub utime: u64,
    pub total: u64,
    /// DOMs with at least one hit
    pub active_doms: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonSummary {
    pub payloads: u64,
    pub hits_in: u64,
    pub hits_out: u64,
    pub events: u64,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Start of 2 ms bin 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_start: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub payloads: Vec<JsonPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bins: Vec<JsonBin>,
    pub summary: JsonSummary,
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonOutput {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "snrebin-json-v1".to_string(),
            raw_start: None,
            payloads: Vec::new(),
            bins: Vec::new(),
            summary: JsonSummary::default(),
        }
    }

    pub fn set_raw_start(&mut self, utime: u64) {
        self.raw_start = Some(utime);
    }

    pub fn add_payload(&mut self, payload: &SnPayload, rebinned: &Rebinned) {
        self.payloads.push(JsonPayload {
            utime: payload.utime(),
            dom_id: format!("{:012x}", payload.dom_id()),
            counts: rebinned.counts.clone(),
            indices: rebinned.indices.clone(),
        });
    }

    pub fn add_bin(&mut self, bin: &StagedBin) {
        self.bins.push(JsonBin {
            utime: bin.utime,
            total: bin.total(),
            active_doms: bin.hits.iter().filter(|&&h| h > 0).count(),
        });
    }

    pub fn set_totals(&mut self, totals: &StatTotals) {
        self.summary = JsonSummary {
            payloads: totals.payloads,
            hits_in: totals.hits_in,
            hits_out: totals.hits_out,
            events: totals.events,
        };
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebin::{rebin_scalers, SCALER_UDT};

    #[test]
    fn test_payload_serialization() {
        let payload = SnPayload::new(SCALER_UDT, 0xabc, 0, vec![10]);
        let rebinned = rebin_scalers(0, payload.utime(), payload.scalers());
        let mut output = JsonOutput::new();
        output.set_raw_start(0);
        output.add_payload(&payload, &rebinned);

        let value: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();
        assert_eq!(value["format"], "snrebin-json-v1");
        assert_eq!(value["raw_start"], 0);
        assert_eq!(value["payloads"][0]["dom_id"], "000000000abc");
        assert_eq!(value["payloads"][0]["counts"], serde_json::json!([2, 8]));
        assert_eq!(value["payloads"][0]["indices"], serde_json::json!([0, 1]));
        assert!(value.get("bins").is_none());
    }

    #[test]
    fn test_bins_and_summary() {
        let mut output = JsonOutput::new();
        output.add_bin(&StagedBin {
            utime: 40,
            hits: vec![0, 3, 4],
        });
        output.set_totals(&StatTotals {
            doms: 2,
            payloads: 2,
            hits_in: 7,
            hits_out: 7,
            events: 2,
        });

        let parsed: JsonOutput = serde_json::from_str(&output.to_json().unwrap()).unwrap();
        assert_eq!(parsed.bins.len(), 1);
        assert_eq!(parsed.bins[0].total, 7);
        assert_eq!(parsed.bins[0].active_doms, 2);
        assert_eq!(parsed.summary.hits_out, 7);
        assert!(parsed.payloads.is_empty());
        assert!(parsed.raw_start.is_none());
    }
}
