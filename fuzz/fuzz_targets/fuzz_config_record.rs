//! Fuzz target: `ConfigRecord::decode`
//!
//! Whatever is left in flash, decoding either yields a config or a typed
//! error.  A decoded config must survive being encoded again.
//!
//! cargo fuzz run fuzz_config_record

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaynode::config::ConfigRecord;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = ConfigRecord::decode(data) {
        let bytes = ConfigRecord::new(config.clone())
            .encode()
            .expect("decoded config must re-encode");
        assert_eq!(ConfigRecord::decode(&bytes).ok(), Some(config));
    }
});
