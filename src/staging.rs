//! Per-DOM staging window of 2 ms bins
//!
//! Rebinned payloads land here until the front bin is complete for every DOM.
//! The window is a ring of `depth` columns; `advance` hands out the front
//! column and recycles it as an empty column at the back.

use crate::rebin::Rebinned;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StagingError {
    #[error("DOM index {dom} out of range (ndom = {ndom})")]
    UnknownDom { dom: usize, ndom: usize },

    #[error("Bin index {index} beyond staging depth {depth}")]
    OutOfWindow { index: u64, depth: usize },
}

pub type Result<T> = std::result::Result<T, StagingError>;

/// `ndom` rows by `depth` columns of 2 ms hit counts
#[derive(Debug, Clone)]
pub struct StagingBuffer {
    ndom: usize,
    depth: usize,
    /// Column-major: column `c` occupies `data[c * ndom..(c + 1) * ndom]`
    data: Vec<u16>,
    /// Physical column holding bin 0
    head: usize,
}

impl StagingBuffer {
    /// A zero `depth` is treated as one column
    pub fn new(ndom: usize, depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            ndom,
            depth,
            data: vec![0; ndom * depth],
            head: 0,
        }
    }

    pub fn ndom(&self) -> usize {
        self.ndom
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn column(&self, col: usize) -> usize {
        (self.head + col) % self.depth
    }

    fn slot(&self, dom: usize, col: usize) -> usize {
        self.column(col) * self.ndom + dom
    }

    /// Add a DOM's rebinned events, indexed from the front bin
    ///
    /// All events are checked before any is written. Counts saturate at
    /// `u16::MAX`.
    pub fn add(&mut self, dom: usize, rebinned: &Rebinned) -> Result<()> {
        if dom >= self.ndom {
            return Err(StagingError::UnknownDom {
                dom,
                ndom: self.ndom,
            });
        }
        if let Some(&index) = rebinned
            .indices
            .iter()
            .find(|&&i| usize::try_from(i).map_or(true, |i| i >= self.depth))
        {
            return Err(StagingError::OutOfWindow {
                index,
                depth: self.depth,
            });
        }

        for event in rebinned.iter() {
            let slot = self.slot(dom, event.index as usize);
            let add = u16::try_from(event.count).unwrap_or(u16::MAX);
            self.data[slot] = self.data[slot].saturating_add(add);
        }
        Ok(())
    }

    /// Hits for `dom` in bin `col` (0 = front)
    pub fn get(&self, dom: usize, col: usize) -> Option<u16> {
        (dom < self.ndom && col < self.depth).then(|| self.data[self.slot(dom, col)])
    }

    /// Front column, one value per DOM
    pub fn front(&self) -> &[u16] {
        let start = self.column(0) * self.ndom;
        &self.data[start..start + self.ndom]
    }

    /// Remove and return the front column; an empty column opens at the back
    pub fn advance(&mut self) -> Vec<u16> {
        let start = self.column(0) * self.ndom;
        let front = self.data[start..start + self.ndom].to_vec();
        self.data[start..start + self.ndom].fill(0);
        self.head = (self.head + 1) % self.depth;
        front
    }

    /// Zero every bin and reset the front
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.head = 0;
    }
}
