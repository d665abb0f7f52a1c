//! Fixed-size file splitting and verified reassembly.
//!
//! [`split::Splitter`] cuts a file into `<name>.partNNN` chunks and writes a
//! JSON [`manifest::Manifest`] beside them; [`merge::Merger`] reads the
//! manifest and concatenates the chunks back in manifest order.

pub mod cancel;
pub mod error;
pub mod fsio;
pub mod localize;
pub mod manifest;
pub mod merge;
pub mod naming;
pub mod path_safety;
pub mod progress;
pub mod size;
pub mod split;
pub mod verify;

pub use cancel::CancelToken;
pub use error::{Error, ErrorKind, Result};
pub use manifest::Manifest;
pub use merge::{MergeConfig, Merger};
pub use progress::{NoProgress, Progress, ProgressSink};
pub use split::{SplitConfig, SplitOutcome, Splitter};
pub use verify::VerifyReport;
