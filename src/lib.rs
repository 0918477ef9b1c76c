//! bootsim — interactive secure-boot sequence simulator for a hypothetical SoC.
//!
//! Two independent components make up the core:
//! - [`engine::BootSequenceEngine`] drives the fixed eight-stage boot flow
//!   (power-on reset through boot-complete or safe-mode halt), derives the
//!   register/memory/flag projection for the current stage, and owns the
//!   cancelable auto-advance timer.
//! - [`attest::AttestationDemo`] runs the illustrative hash → keygen → sign →
//!   verify pipeline over a firmware image and reports the outcome.
//!
//! The terminal front end (`ui` + the `bootsim` binary) is a thin host: it
//! feeds key presses into the engine, appends per-stage log batches to a
//! [`bootlog::BootLog`], and renders read-only snapshots.
//!
//! Engine operations that arm the auto-advance timer spawn onto the ambient
//! tokio runtime; construct and drive the engine from inside one.

pub mod attest;
pub mod bootlog;
pub mod engine;
pub mod hwstate;
pub mod stage;
pub mod ui;

pub use attest::{AttestError, AttestationDemo, AttestationResult};
pub use bootlog::{BootLog, LogEntry, LogLevel};
pub use engine::{BootSequenceEngine, EngineSnapshot};
pub use hwstate::{BootFlags, BootStatus, MemoryMap, Registers};
pub use stage::{stage_table, BootStage, Mode, STAGE_COUNT};
