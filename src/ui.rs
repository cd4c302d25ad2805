//! Progress reporting hooks.
//!
//! The pipeline is logically single-threaded: callbacks fire inline between
//! units of work (one downloaded chunk, one archive entry), so a slow sink
//! slows the whole run and a stalled operation stops updates entirely.

/// Receives progress as the pipeline advances.
pub trait ProgressSink {
    /// Called after each downloaded chunk with cumulative/total bytes.
    fn fetched(&mut self, received: u64, total: u64);

    /// Called after each archive entry with completed/total entry counts.
    ///
    /// `completed` counts the entry just processed, so the final call of a
    /// successful walk reports `completed == total`.
    fn entry_done(&mut self, completed: usize, total: usize, name: &str);
}

/// Sink that draws nothing.
pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn fetched(&mut self, _received: u64, _total: u64) {}

    fn entry_done(&mut self, _completed: usize, _total: usize, _name: &str) {}
}
