//! # shopdl
//!
//! Shop-channel package installer.
//!
//! The shop frontend leaves a small key/value configuration blob behind;
//! this crate reads it, resolves where the payload lives (a remote URL, a
//! title staged on internal flash, or a title announced in a broadcast
//! mailbox capture), fetches or locates the ZIP, extracts it under an
//! install root with per-entry progress, reclaims the consumed source, and
//! reports a symbolic status token back to the caller.
//!
//! Every stage fails independently with its own code and aborts the
//! pipeline; nothing retries.
//!
//! ## Example
//!
//! ```no_run
//! use shopdl::{ConfigBlob, PayloadReference};
//!
//! fn main() -> shopdl::Result<()> {
//!     let blob = ConfigBlob::load(std::path::Path::new("osc.cfg"))?;
//!     match shopdl::locator::resolve_download_target(&blob)? {
//!         PayloadReference::RemoteUrl(url) => println!("would fetch {url}"),
//!         PayloadReference::StoredTitle { title, .. } => {
//!             println!("would install staged title {title}")
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod locator;
pub mod status;
pub mod title;
pub mod ui;
pub mod zip;

pub use cli::Cli;
pub use config::ConfigBlob;
pub use engine::ExtractionEngine;
pub use error::{InstallError, Result};
pub use io::{HttpFetcher, LocalFileReader, MemoryReader, ReadAt};
pub use locator::PayloadReference;
pub use status::ReturnStatus;
pub use title::{NandStore, TitleId};
pub use ui::{ProgressSink, SilentSink};
pub use zip::{Archive, ArchiveEntry};
