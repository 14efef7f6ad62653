#![no_main]

use libfuzzer_sys::fuzz_target;
use snrebin::rebin_scalers;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    // Anchors up to ~6.5 s apart
    let raw_utime = u64::from(u16::from_le_bytes([data[0], data[1]])) * 1_000_000;
    let payload_utime = u64::from(u16::from_le_bytes([data[2], data[3]])) * 1_000_000;
    let scalers = &data[4..];

    let out = rebin_scalers(raw_utime, payload_utime, scalers);
    assert_eq!(out.counts.len(), out.indices.len());
    assert!(out.counts.iter().all(|&c| c > 0));
    assert!(out.indices.windows(2).all(|w| w[0] <= w[1]));
    let hits: u64 = scalers.iter().map(|&s| u64::from(s)).sum();
    assert_eq!(out.total(), hits);
});
