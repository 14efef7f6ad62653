//! Supernova scaler payload codec
//!
//! SN data files are a plain concatenation of big-endian payloads:
//!
//! ```text
//! envelope (16 bytes)
//!   i32  length        total bytes, envelope included
//!   i32  type_id       always 16
//!   i64  utime         0.1 ns since start of year
//! record header (18 bytes)
//!   u64  dom_id        DOM mainboard ID
//!   u16  record_length 10 + number of scalers
//!   u16  magic         300
//!   [u8; 6] clock      DOM clock, 48-bit big-endian
//! scalers (record_length - 10 bytes)
//!   one hit count per 1.6384 ms slot
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const SN_TYPE_ID: i32 = 16;
pub const SN_ENVELOPE_LENGTH: usize = 16;
pub const SN_HEADER_LENGTH: usize = 18;
pub const SN_MAGIC_NUMBER: u16 = 300;

/// `record_length` counts the clock and the scalers plus these fixed bytes
const RECORD_LENGTH_OFFSET: usize = 10;

/// Most scalers a record can describe with its `u16` length
pub const SN_MAX_SCALERS: usize = u16::MAX as usize - RECORD_LENGTH_OFFSET;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Truncated payload: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Unexpected payload type {0} (expected 16)")]
    UnexpectedType(i32),

    #[error("Bad SN record magic number {0} (expected 300)")]
    BadMagic(u16),

    #[error("Record length {record} does not match {scalers} scaler bytes")]
    LengthMismatch { record: u16, scalers: usize },

    #[error("{0} scalers do not fit one SN record (at most 65525)")]
    TooManyScalers(usize),

    #[error("Payload time {0} outside the signed 64-bit wire range")]
    UtimeOutOfRange(u64),

    #[error("Negative payload time {0}")]
    NegativeUtime(i64),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PayloadError>;

/// One DOM's supernova scaler record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnPayload {
    utime: u64,
    dom_id: u64,
    clock: [u8; 6],
    scalers: Vec<u8>,
}

impl SnPayload {
    pub fn new(utime: u64, dom_id: u64, domclock: u64, scalers: Vec<u8>) -> Self {
        let bytes = domclock.to_be_bytes();
        let mut clock = [0u8; 6];
        clock.copy_from_slice(&bytes[2..]);
        Self {
            utime,
            dom_id,
            clock,
            scalers,
        }
    }

    /// Decode a payload from exactly one envelope plus record
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (length, utime) = decode_envelope(bytes)?;
        if bytes.len() < length {
            return Err(PayloadError::Truncated {
                expected: length,
                actual: bytes.len(),
            });
        }
        Self::decode_record(utime, &bytes[SN_ENVELOPE_LENGTH..length])
    }

    /// Decode the record that follows an envelope
    ///
    /// An empty record is a data-less payload: no DOM, no scalers.
    fn decode_record(utime: u64, data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::new(utime, 0, 0, Vec::new()));
        }
        if data.len() < SN_HEADER_LENGTH {
            return Err(PayloadError::Truncated {
                expected: SN_HEADER_LENGTH,
                actual: data.len(),
            });
        }

        let dom_id = u64::from_be_bytes(be_array(&data[0..8]));
        let record_length = u16::from_be_bytes(be_array(&data[8..10]));
        let magic = u16::from_be_bytes(be_array(&data[10..12]));
        if magic != SN_MAGIC_NUMBER {
            return Err(PayloadError::BadMagic(magic));
        }

        let scalers = data[SN_HEADER_LENGTH..].to_vec();
        if usize::from(record_length) != scalers.len() + RECORD_LENGTH_OFFSET {
            return Err(PayloadError::LengthMismatch {
                record: record_length,
                scalers: scalers.len(),
            });
        }

        Ok(Self {
            utime,
            dom_id,
            clock: be_array(&data[12..18]),
            scalers,
        })
    }

    /// Binary form, envelope included
    ///
    /// Fails for more than [`SN_MAX_SCALERS`] scalers or a utime past `i64::MAX`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let utime =
            i64::try_from(self.utime).map_err(|_| PayloadError::UtimeOutOfRange(self.utime))?;
        let record_length = u16::try_from(self.scalers.len() + RECORD_LENGTH_OFFSET)
            .map_err(|_| PayloadError::TooManyScalers(self.scalers.len()))?;
        let data_length = if self.has_data() {
            SN_HEADER_LENGTH + self.scalers.len()
        } else {
            0
        };
        // Bounded by the u16 record length above
        let length = (SN_ENVELOPE_LENGTH + data_length) as i32;

        let mut out = Vec::with_capacity(SN_ENVELOPE_LENGTH + data_length);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&SN_TYPE_ID.to_be_bytes());
        out.extend_from_slice(&utime.to_be_bytes());
        if self.has_data() {
            out.extend_from_slice(&self.dom_id.to_be_bytes());
            out.extend_from_slice(&record_length.to_be_bytes());
            out.extend_from_slice(&SN_MAGIC_NUMBER.to_be_bytes());
            out.extend_from_slice(&self.clock);
            out.extend_from_slice(&self.scalers);
        }
        Ok(out)
    }

    /// UTC time of the first scaler slot, 0.1 ns since start of year
    pub fn utime(&self) -> u64 {
        self.utime
    }

    pub fn dom_id(&self) -> u64 {
        self.dom_id
    }

    /// DOM clock cycles
    pub fn domclock(&self) -> u64 {
        self.clock
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
    }

    pub fn scalers(&self) -> &[u8] {
        &self.scalers
    }

    pub fn scaler_len(&self) -> usize {
        self.scalers.len()
    }

    pub fn has_data(&self) -> bool {
        !self.scalers.is_empty() || self.dom_id != 0
    }

    /// Sum of all scaler hits
    pub fn total_hits(&self) -> u64 {
        self.scalers.iter().map(|&s| u64::from(s)).sum()
    }
}

impl fmt::Display for SnPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Supernova@{}[dom {:012x} clk {:012x} scalerData*{}]",
            self.utime,
            self.dom_id,
            self.domclock(),
            self.scalers.len()
        )
    }
}

fn be_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Returns (total length, utime)
fn decode_envelope(bytes: &[u8]) -> Result<(usize, u64)> {
    if bytes.len() < SN_ENVELOPE_LENGTH {
        return Err(PayloadError::Truncated {
            expected: SN_ENVELOPE_LENGTH,
            actual: bytes.len(),
        });
    }
    let length = i32::from_be_bytes(be_array(&bytes[0..4]));
    let type_id = i32::from_be_bytes(be_array(&bytes[4..8]));
    let utime = i64::from_be_bytes(be_array(&bytes[8..16]));
    if type_id != SN_TYPE_ID {
        return Err(PayloadError::UnexpectedType(type_id));
    }
    let utime = u64::try_from(utime).map_err(|_| PayloadError::NegativeUtime(utime))?;
    // length <= envelope means an envelope without data
    let length = usize::try_from(length)
        .unwrap_or(0)
        .max(SN_ENVELOPE_LENGTH);
    Ok((length, utime))
}

/// Streaming reader over concatenated payloads
pub struct PayloadReader<R> {
    inner: R,
    num_read: usize,
    done: bool,
}

impl PayloadReader<BufReader<File>> {
    /// Open an SN data file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening SN scaler file");
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> PayloadReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            num_read: 0,
            done: false,
        }
    }

    /// Number of payloads read so far
    pub fn nrec(&self) -> usize {
        self.num_read
    }

    /// Read the next payload, `None` at a clean end of stream
    pub fn read_payload(&mut self) -> Result<Option<SnPayload>> {
        let mut envelope = [0u8; SN_ENVELOPE_LENGTH];
        let got = read_full(&mut self.inner, &mut envelope)?;
        if got == 0 {
            return Ok(None);
        }
        if got < SN_ENVELOPE_LENGTH {
            return Err(PayloadError::Truncated {
                expected: SN_ENVELOPE_LENGTH,
                actual: got,
            });
        }

        let (length, utime) = decode_envelope(&envelope)?;
        let mut data = vec![0u8; length - SN_ENVELOPE_LENGTH];
        let got = read_full(&mut self.inner, &mut data)?;
        if got < data.len() {
            return Err(PayloadError::Truncated {
                expected: data.len(),
                actual: got,
            });
        }

        let payload = SnPayload::decode_record(utime, &data)?;
        self.num_read += 1;
        Ok(Some(payload))
    }
}

impl<R: Read> Iterator for PayloadReader<R> {
    type Item = Result<SnPayload>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_payload() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Like `read_exact`, but reports how many bytes arrived before EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
