//! Fuzz target: `ubx::next_frame` and the NAV decoders
//!
//! Scans arbitrary bytes for UBX frames and feeds every payload found to
//! the NAV-PVT and NAV-DOP decoders. Neither may panic; a frame's payload
//! must lie inside the bytes consumed for it.
//!
//! cargo fuzz run fuzz_ubx_frames

#![no_main]

use libfuzzer_sys::fuzz_target;
use trackfix::adapters::ubx::{self, NavPvt};

fuzz_target!(|data: &[u8]| {
    let mut rest = data;
    while let Some((frame, used)) = ubx::next_frame(rest) {
        assert!(used <= rest.len());
        assert!(frame.payload.len() + 8 <= used);
        let _ = NavPvt::decode(frame.payload);
        let _ = ubx::decode_hdop(frame.payload);
        rest = &rest[used..];
    }
});
