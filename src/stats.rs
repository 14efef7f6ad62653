//! Per-DOM rebinning statistics for -c mode
//!
//! Tracks how many hits went into the rebinner and how many came out, so a
//! run can confirm that no mass was lost between the 1.6384 ms and 2 ms grids.

use crate::rebin::Rebinned;
use std::collections::BTreeMap;

/// Statistics for a single DOM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomStats {
    /// Payloads rebinned for this DOM
    pub payloads: u64,
    /// Scaler slots seen
    pub scalers: u64,
    /// Sum of input scaler hits
    pub hits_in: u64,
    /// Sum of rebinned hits
    pub hits_out: u64,
    /// Rebinned events emitted
    pub events: u64,
}

/// Summary totals over all DOMs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatTotals {
    pub doms: usize,
    pub payloads: u64,
    pub hits_in: u64,
    pub hits_out: u64,
    pub events: u64,
}

impl StatTotals {
    /// Input minus output hits (zero when mass is conserved)
    pub fn residual(&self) -> i64 {
        self.hits_in as i64 - self.hits_out as i64
    }
}

/// Tracks statistics for all DOMs, keyed by mainboard ID
#[derive(Debug, Default)]
pub struct RebinStats {
    stats: BTreeMap<u64, DomStats>,
}

impl RebinStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one rebinned payload
    pub fn record(&mut self, dom_id: u64, scalers: &[u8], rebinned: &Rebinned) {
        let entry = self.stats.entry(dom_id).or_default();
        entry.payloads += 1;
        entry.scalers += scalers.len() as u64;
        entry.hits_in += scalers.iter().map(|&s| u64::from(s)).sum::<u64>();
        entry.hits_out += rebinned.total();
        entry.events += rebinned.len() as u64;
    }

    pub fn get(&self, dom_id: u64) -> Option<&DomStats> {
        self.stats.get(&dom_id)
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn calculate_totals(&self) -> StatTotals {
        self.stats.values().fold(
            StatTotals {
                doms: self.stats.len(),
                ..StatTotals::default()
            },
            |mut acc, s| {
                acc.payloads += s.payloads;
                acc.hits_in += s.hits_in;
                acc.hits_out += s.hits_out;
                acc.events += s.events;
                acc
            },
        )
    }

    /// Summary table, busiest DOMs first
    pub fn format_summary(&self) -> String {
        if self.stats.is_empty() {
            return "No payloads rebinned.\n".to_string();
        }

        let mut sorted: Vec<_> = self.stats.iter().collect();
        sorted.sort_by(|a, b| b.1.hits_in.cmp(&a.1.hits_in).then(a.0.cmp(b.0)));

        let mut out = String::new();
        out.push_str("dom_id        payloads   scalers   hits_in  hits_out    events\n");
        out.push_str("------------ --------- --------- --------- --------- ---------\n");
        for (dom_id, s) in sorted {
            out.push_str(&format!(
                "{:012x} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
                dom_id, s.payloads, s.scalers, s.hits_in, s.hits_out, s.events
            ));
        }

        let totals = self.calculate_totals();
        out.push_str("------------ --------- --------- --------- --------- ---------\n");
        out.push_str(&format!(
            "{:<12} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
            "total", totals.payloads, "", totals.hits_in, totals.hits_out, totals.events
        ));
        out.push_str(&format!(
            "{} DOMs, residual {} hits\n",
            totals.doms,
            totals.residual()
        ));
        out
    }

    /// Print the summary table to stderr
    pub fn print_summary(&self) {
        eprint!("{}", self.format_summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebin::rebin_scalers;

    #[test]
    fn test_record_accumulates_per_dom() {
        let mut stats = RebinStats::new();
        let scalers = [10u8, 0, 3];
        stats.record(7, &scalers, &rebin_scalers(0, 0, &scalers));
        stats.record(7, &scalers, &rebin_scalers(0, 0, &scalers));
        stats.record(9, &[1], &rebin_scalers(0, 0, &[1]));

        let dom = stats.get(7).unwrap();
        assert_eq!(dom.payloads, 2);
        assert_eq!(dom.scalers, 6);
        assert_eq!(dom.hits_in, 26);
        assert_eq!(dom.hits_out, 26);

        let totals = stats.calculate_totals();
        assert_eq!(totals.doms, 2);
        assert_eq!(totals.payloads, 3);
        assert_eq!(totals.hits_in, 27);
        assert_eq!(totals.residual(), 0);
    }

    #[test]
    fn test_empty_summary() {
        let stats = RebinStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.format_summary(), "No payloads rebinned.\n");
        assert_eq!(stats.calculate_totals(), StatTotals::default());
    }

    #[test]
    fn test_summary_lists_doms_and_residual() {
        let mut stats = RebinStats::new();
        stats.record(0xabc, &[5], &rebin_scalers(0, 0, &[5]));
        let summary = stats.format_summary();
        assert!(summary.contains("000000000abc"));
        assert!(summary.contains("1 DOMs, residual 0 hits"));
    }
}
