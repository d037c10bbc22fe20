//! Fuzz target: `decode_request`
//!
//! Drives arbitrary bytes into the inbound command decoder and asserts
//! that it never panics, never accepts an oversized frame and only ever
//! rejects with a decode or validation error.
//!
//! cargo fuzz run fuzz_command_decode

#![no_main]

use courttimer::app::commands::AppCommand;
use courttimer::error::CommandError;
use courttimer::rpc::protocol::{MAX_FRAME_LEN, Request, decode_request};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = core::str::from_utf8(data) else {
        return;
    };

    match decode_request(frame) {
        Ok(Request::Command(AppCommand::AddSchedule(d) | AppCommand::UpdateSchedule(d))) => {
            assert!(frame.len() <= MAX_FRAME_LEN);
            assert!(d.club_name.len() <= frame.len());
        }
        Ok(_) => assert!(frame.len() <= MAX_FRAME_LEN),
        Err(e) => assert!(matches!(
            e,
            CommandError::Malformed | CommandError::Validation(_)
        )),
    }
});
