//! Fuzz target: `TextBackend::poll`
//!
//! Streams arbitrary bytes through the NMEA text backend. Polling must
//! neither panic nor spin once the link runs dry.
//!
//! cargo fuzz run fuzz_nmea_stream

#![no_main]

use libfuzzer_sys::fuzz_target;
use trackfix::gnss::text::TextPoll;
use trackfix::gnss::{SerialSource, TextBackend};

struct Feed<'a>(&'a [u8]);

impl SerialSource for Feed<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let (&b, rest) = self.0.split_first()?;
        self.0 = rest;
        Some(b)
    }
}

fuzz_target!(|data: &[u8]| {
    let mut backend = TextBackend::new(Feed(data));
    backend.begin_cycle();
    loop {
        match backend.poll() {
            TextPoll::Usable(_) | TextPoll::Pending => {}
            TextPoll::Idle => break,
        }
    }
});
