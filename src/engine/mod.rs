//! Audio Engine Module
//!
//! Core types shared by every stage:
//! - Mono audio buffer and level helpers
//! - Cancellation token checked between stages
//! - WAV file I/O

pub mod buffer;
pub mod cancel;
pub mod io;

pub use buffer::{db_to_linear, linear_to_db, AudioBuffer, BufferSummary};
pub use cancel::CancellationToken;
pub use io::{export_wav, import_wav, BitDepth};
