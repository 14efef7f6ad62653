//! Payload ingestion into the 2 ms staging window
//!
//! The first payload anchors the window: bin 0 starts at its utime. Every
//! payload is rebinned against the current front of the window, so the
//! returned indices are staging columns. Callers drain complete bins with
//! [`DataHandler::drain_ready`] before ingesting payloads that start later.

use crate::payload::SnPayload;
use crate::rebin::{rebin_scalers, Rebinned, RAW_UDT};
use crate::staging::{StagingBuffer, StagingError};
use crate::stats::RebinStats;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Payload {payload} could not be staged: {source}")]
    Staging {
        payload: String,
        #[source]
        source: StagingError,
    },
}

pub type Result<T> = std::result::Result<T, HandlerError>;

/// One completed 2 ms bin across all DOMs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBin {
    /// Start of the bin, 0.1 ns since start of year
    pub utime: u64,
    /// Hits per DOM index
    pub hits: Vec<u16>,
}

impl StagedBin {
    pub fn total(&self) -> u64 {
        self.hits.iter().map(|&h| u64::from(h)).sum()
    }
}

/// Rebins payloads and stages them per DOM
#[derive(Debug)]
pub struct DataHandler {
    staging: StagingBuffer,
    doms: HashMap<u64, usize>,
    front_utime: Option<u64>,
    /// Columns from the front that may hold hits
    horizon: usize,
    payloads_read: u64,
    stats: RebinStats,
}

impl DataHandler {
    pub fn new(ndom: usize, depth: usize) -> Self {
        Self {
            staging: StagingBuffer::new(ndom, depth),
            doms: HashMap::new(),
            front_utime: None,
            horizon: 0,
            payloads_read: 0,
            stats: RebinStats::new(),
        }
    }

    /// Start time of the front bin, once a payload has anchored the window
    pub fn front_utime(&self) -> Option<u64> {
        self.front_utime
    }

    pub fn payloads_read(&self) -> u64 {
        self.payloads_read
    }

    pub fn stats(&self) -> &RebinStats {
        &self.stats
    }

    pub fn staging(&self) -> &StagingBuffer {
        &self.staging
    }

    /// Dense index for a DOM, assigned in first-seen order
    pub fn dom_index(&self, dom_id: u64) -> Option<usize> {
        self.doms.get(&dom_id).copied()
    }

    fn register_dom(&mut self, dom_id: u64) -> Option<usize> {
        if let Some(&idx) = self.doms.get(&dom_id) {
            return Some(idx);
        }
        if self.doms.len() >= self.staging.ndom() {
            return None;
        }
        let idx = self.doms.len();
        debug!(dom_id = %format!("{:012x}", dom_id), idx, "registered DOM");
        self.doms.insert(dom_id, idx);
        Some(idx)
    }

    /// Rebin a payload into the staging window
    ///
    /// Returns the rebinned events, or `None` for a payload that carries no
    /// data or comes from a DOM beyond the window's capacity.
    pub fn ingest(&mut self, payload: &SnPayload) -> Result<Option<Rebinned>> {
        self.payloads_read += 1;
        if !payload.has_data() {
            trace!(utime = payload.utime(), "skipping payload without data");
            return Ok(None);
        }

        let Some(dom) = self.register_dom(payload.dom_id()) else {
            warn!(
                dom_id = %format!("{:012x}", payload.dom_id()),
                ndom = self.staging.ndom(),
                "DOM table full, skipping payload"
            );
            return Ok(None);
        };

        let front = *self.front_utime.get_or_insert(payload.utime());
        let rebinned = rebin_scalers(front, payload.utime(), payload.scalers());
        self.staging
            .add(dom, &rebinned)
            .map_err(|source| HandlerError::Staging {
                payload: payload.to_string(),
                source,
            })?;

        if let Some(&last) = rebinned.indices.last() {
            self.horizon = self.horizon.max(last as usize + 1);
        }
        self.stats
            .record(payload.dom_id(), payload.scalers(), &rebinned);
        Ok(Some(rebinned))
    }

    /// Pop the front bin and move the window forward by 2 ms
    ///
    /// `None` until a payload has anchored the window.
    pub fn advance(&mut self) -> Option<StagedBin> {
        let utime = self.front_utime?;
        let hits = self.staging.advance();
        self.front_utime = Some(utime + RAW_UDT);
        self.horizon = self.horizon.saturating_sub(1);
        Some(StagedBin { utime, hits })
    }

    /// Pop every bin that can no longer receive hits from a payload at `utime`
    ///
    /// A payload starting after the second staged bin's start cannot
    /// contribute to the front bin.
    pub fn drain_ready(&mut self, utime: u64) -> Vec<StagedBin> {
        let mut ready = Vec::new();
        while let Some(front) = self.front_utime {
            if front + RAW_UDT >= utime {
                break;
            }
            if let Some(bin) = self.advance() {
                ready.push(bin);
            }
        }
        ready
    }

    /// Pop every bin that still holds hits
    pub fn flush(&mut self) -> Vec<StagedBin> {
        let mut bins = Vec::with_capacity(self.horizon);
        while self.horizon > 0 {
            match self.advance() {
                Some(bin) => bins.push(bin),
                None => break,
            }
        }
        bins
    }
}
