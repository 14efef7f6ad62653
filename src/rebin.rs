//! Scaler rebinning from the 1.6384 ms DOM cadence onto the 2 ms analysis grid
//!
//! Each DOM reports one supernova scaler byte per 1.6384 ms slot. The analysis
//! works on a 2 ms grid, so every payload is walked slot by slot against the
//! destination grid. A slot that straddles a 2 ms boundary is split in
//! proportion to the time it spends on either side, and the part beyond the
//! boundary is carried into the next destination bin.
//!
//! ```text
//!  source  |   s0   |   s1   |   s2   |   s3   |
//!  dest    |    d0     |    d1     |    d2     |
//!                   ^^^ carry of s1 into d1
//! ```
//!
//! All times are in 0.1 ns ticks (UTC since start of year).

use tracing::trace;

/// Width of one SN scaler slot: 250 * 2^16 ticks (1.6384 ms)
pub const SCALER_UDT: u64 = 250 * (1 << 16);

/// Width of one destination bin: 2 ms
pub const RAW_UDT: u64 = 20_000_000;

/// Source and destination bin widths, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Fine (source) bin width
    pub source: u64,
    /// Coarse (destination) bin width
    pub destination: u64,
}

impl Cadence {
    /// The SNDAQ cadences: 1.6384 ms scalers onto 2 ms bins
    pub const SNDAQ: Cadence = Cadence {
        source: SCALER_UDT,
        destination: RAW_UDT,
    };
}

impl Default for Cadence {
    fn default() -> Self {
        Self::SNDAQ
    }
}

/// One non-empty destination bin contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebinnedEvent {
    /// Destination bin index, relative to the call's destination start
    pub index: u64,
    /// Hits assigned to that bin
    pub count: u32,
}

/// Working state threaded through the per-sample step
///
/// `dest_start`/`dest_index` locate the current destination bin; `carry` holds
/// hits from the previous sample that belong to the bin after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebinState {
    pub dest_start: u64,
    pub dest_index: u64,
    pub carry: u32,
}

impl RebinState {
    /// Start at destination bin 0, which begins at `dest_start`
    pub fn new(dest_start: u64) -> Self {
        Self {
            dest_start,
            dest_index: 0,
            carry: 0,
        }
    }

    /// End of the current destination bin
    pub fn dest_end(&self, cadence: Cadence) -> u64 {
        self.dest_start.saturating_add(cadence.destination)
    }

    /// Move the destination grid forward until its current bin reaches `sample_time`
    ///
    /// Never moves backward: a sample that starts before `dest_start` stays in
    /// the current bin. Afterwards `dest_end >= sample_time` holds.
    /// Jumps straight to the target bin.
    fn walk_to(&mut self, cadence: Cadence, sample_time: u64) {
        if self.dest_end(cadence) < sample_time {
            let bins = (sample_time - self.dest_start - 1) / cadence.destination;
            self.dest_index += bins;
            self.dest_start += bins * cadence.destination;
        }
    }

    /// Hits of a `count`-hit sample at `sample_time` that fall past the current bin's end
    ///
    /// Zero unless the sample starts before the boundary and ends after it.
    /// Rounds half up, so 0.5 goes to the next bin.
    fn split(&self, cadence: Cadence, sample_time: u64, count: u32) -> u32 {
        let dest_end = self.dest_end(cadence);
        if sample_time.saturating_add(cadence.source) > dest_end && sample_time < dest_end {
            let frac = 1.0 - (dest_end - sample_time) as f64 / cadence.source as f64;
            (0.5 + frac * count as f64) as u32
        } else {
            0
        }
    }

    /// Process one source sample
    ///
    /// Returns the next state and, if the current bin received any hits, the
    /// event for it. Events for the same index may be emitted more than once
    /// when several samples land in one destination bin.
    pub fn step(
        mut self,
        cadence: Cadence,
        sample_time: u64,
        count: u8,
    ) -> (RebinState, Option<RebinnedEvent>) {
        if count == 0 && self.carry == 0 {
            return (self, None);
        }

        self.walk_to(cadence, sample_time);

        let count = u32::from(count);
        let carry = self.split(cadence, sample_time, count);
        let kept = count + self.carry - carry;
        self.carry = carry;

        if carry > 0 {
            trace!(
                index = self.dest_index,
                sample_time,
                kept,
                carry,
                "split scaler across 2 ms boundary"
            );
        }

        let event = (kept > 0).then_some(RebinnedEvent {
            index: self.dest_index,
            count: kept,
        });
        (self, event)
    }

    /// The residual carry, placed in the bin after the last one walked to
    pub fn finish(self) -> Option<RebinnedEvent> {
        (self.carry > 0).then_some(RebinnedEvent {
            index: self.dest_index + 1,
            count: self.carry,
        })
    }
}

/// Rebinned hits as two parallel sequences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rebinned {
    /// Hits per event, always positive
    pub counts: Vec<u32>,
    /// Destination bin index per event, non-decreasing
    pub indices: Vec<u64>,
}

impl Rebinned {
    fn push(&mut self, event: RebinnedEvent) {
        self.counts.push(event.count);
        self.indices.push(event.index);
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all emitted hits
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Events in emission order
    pub fn iter(&self) -> impl Iterator<Item = RebinnedEvent> + '_ {
        self.indices
            .iter()
            .zip(&self.counts)
            .map(|(&index, &count)| RebinnedEvent { index, count })
    }

    pub fn into_parts(self) -> (Vec<u32>, Vec<u64>) {
        (self.counts, self.indices)
    }
}

/// Rebin a payload's scalers onto the 2 ms grid
///
/// * `raw_utime` - start of destination bin 0
/// * `payload_utime` - start of the first scaler slot
/// * `scalers` - one hit count per 1.6384 ms slot
///
/// Hits are conserved exactly: the residual carry after the last slot is
/// emitted in the following bin. A `raw_utime` later than every slot does
/// not empty the output; those slots land unsplit in bin 0. Accumulated
/// counts are not checked for overflow.
pub fn rebin_scalers(raw_utime: u64, payload_utime: u64, scalers: &[u8]) -> Rebinned {
    rebin_scalers_with(Cadence::SNDAQ, raw_utime, payload_utime, scalers)
}

/// [`rebin_scalers`] with explicit cadences
pub fn rebin_scalers_with(
    cadence: Cadence,
    raw_utime: u64,
    payload_utime: u64,
    scalers: &[u8],
) -> Rebinned {
    let mut out = Rebinned::default();
    let mut state = RebinState::new(raw_utime);

    for (i, &scaler) in scalers.iter().enumerate() {
        let sample_time = payload_utime.saturating_add(i as u64 * cadence.source);
        let (next, event) = state.step(cadence, sample_time, scaler);
        state = next;
        if let Some(event) = event {
            out.push(event);
        }
    }

    if let Some(event) = state.finish() {
        out.push(event);
    }

    out
}
