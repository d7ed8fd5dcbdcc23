//! Fuzz target: `ConsoleCommand::parse`
//!
//! cargo fuzz run fuzz_console_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaynode::app::commands::ConsoleCommand;
use relaynode::config::ConfigPatch;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = core::str::from_utf8(data) {
        if let ConsoleCommand::Patch(data) = ConsoleCommand::parse(line) {
            if let Ok(patch) = ConfigPatch::from_json(&data) {
                let _ = patch.validate();
            }
        }
    }
});
