//! Process-wide lazily-created channel set used by the `share=PATH`
//! directive and by the string-form `trace_set` export path.

use crate::consts::DEFAULT_SHARE_PATH;
use crate::error::ShmError;
use crate::shm::ChannelSet;
use std::sync::{Mutex, OnceLock};

static GLOBAL: OnceLock<Mutex<Option<ChannelSet>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<ChannelSet>> {
    GLOBAL.get_or_init(|| Mutex::new(None))
}

/// (Re)opens the process-wide channel set at `path`, replacing whichever
/// one was previously open. Used by the `share=PATH` configuration
/// directive.
pub fn reopen(path: &str) -> Result<(), ShmError> {
    let set = ChannelSet::create(path)?;
    let mut guard = slot().lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(set);
    Ok(())
}

/// Runs `f` against the lazily-created process-wide channel set, opened (on
/// first use) at the path named by the `RECORDER_SHARE` environment
/// variable, or `DEFAULT_SHARE_PATH` if that variable is unset.
pub fn with_global<R>(f: impl FnOnce(&ChannelSet) -> R) -> Result<R, ShmError> {
    let mut guard = slot().lock().unwrap_or_else(|e| e.into_inner());
    if guard.is_none() {
        let path = std::env::var("RECORDER_SHARE").unwrap_or_else(|_| DEFAULT_SHARE_PATH.to_string());
        *guard = Some(ChannelSet::create(&path)?);
    }
    Ok(f(guard.as_ref().expect("just initialized")))
}
