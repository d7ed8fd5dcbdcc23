//! Fuzz target: `protocol::decode`
//!
//! Drives arbitrary text into the inbound message decoder and asserts it
//! never panics and never accepts an oversized payload.
//!
//! cargo fuzz run fuzz_message_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaynode::config::ConfigPatch;
use relaynode::error::CodecError;
use relaynode::protocol::{InboundCommand, MAX_INBOUND_LEN, decode};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    match decode(text) {
        Ok(cmd) => {
            assert!(text.len() <= MAX_INBOUND_LEN);
            if let InboundCommand::Config(data) = cmd {
                if let Ok(patch) = ConfigPatch::from_json(&data) {
                    let _ = patch.validate();
                }
            }
        }
        Err(CodecError::MessageTooLarge(len)) => assert_eq!(len, text.len()),
        Err(_) => {}
    }
});
