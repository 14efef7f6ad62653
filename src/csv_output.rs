//! CSV output format for rebinned scalers

use crate::handler::StagedBin;
use crate::payload::SnPayload;
use crate::rebin::Rebinned;

/// One rebinned event as a CSV row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvEvent {
    pub utime: u64,
    pub dom_id: u64,
    pub index: u64,
    pub count: u32,
}

/// CSV formatter for per-payload events
#[derive(Debug, Default)]
pub struct CsvOutput {
    events: Vec<CsvEvent>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every event of a rebinned payload
    pub fn add_payload(&mut self, payload: &SnPayload, rebinned: &Rebinned) {
        self.events.extend(rebinned.iter().map(|event| CsvEvent {
            utime: payload.utime(),
            dom_id: payload.dom_id(),
            index: event.index,
            count: event.count,
        }));
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::from("utime,dom_id,index,count\n");
        for e in &self.events {
            output.push_str(&format!(
                "{},{:012x},{},{}\n",
                e.utime, e.dom_id, e.index, e.count
            ));
        }
        output
    }
}

/// CSV formatter for staged 2 ms bins (--stage mode)
#[derive(Debug, Default)]
pub struct CsvBinOutput {
    bins: Vec<(u64, u64, usize)>,
}

impl CsvBinOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bin(&mut self, bin: &StagedBin) {
        let active = bin.hits.iter().filter(|&&h| h > 0).count();
        self.bins.push((bin.utime, bin.total(), active));
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::from("utime,total,active_doms\n");
        for (utime, total, active) in &self.bins {
            output.push_str(&format!("{},{},{}\n", utime, total, active));
        }
        output
    }
}
