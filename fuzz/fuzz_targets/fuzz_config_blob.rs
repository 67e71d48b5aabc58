//! Fuzz target: stored config blob → `NvsConfigStore::load`
//!
//! Feeds arbitrary bytes in as the persisted blob. A corrupted or
//! hand-edited blob must never panic and never yield a config that fails
//! validation.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use bpslink::adapters::nvs::NvsConfigStore;
use bpslink::app::ports::ConfigPort;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(store) = NvsConfigStore::new() else {
        return;
    };
    store.inject_raw(data);

    if let Ok(cfg) = store.load() {
        assert!(cfg.validate().is_ok());
        // Whatever loaded must save and load back unchanged.
        assert!(store.save(&cfg).is_ok());
        assert_eq!(store.load().ok(), Some(cfg));
    }
});
