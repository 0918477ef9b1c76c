//! bootlog.rs — hand-authored per-stage boot log batches + replay buffer
//
// Each stage contributes a fixed batch of three lines, looked up by stage
// id; stages 3–7 branch on mode. The lookup is a pure read: the same
// (stage, mode) pair always yields textually identical messages. The
// accumulating buffer is a replay trace, so revisiting a stage appends a
// fresh batch instead of deduplicating.

use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::stage::Mode;

/// Severity of a boot log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Success => write!(f, "success"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// One appended boot log line.
#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    /// Unique, monotonically increasing per [`BootLog`].
    pub id: u64,
    /// Wall-clock stamp at append time. Display only.
    pub timestamp: String,
    pub level: LogLevel,
    /// Stage id that produced the line.
    pub stage: usize,
    pub message: String,
}

use LogLevel::{Error, Info, Success, Warning};

const STAGE0: [(LogLevel, &str); 3] = [
    (Info, "⚡ Power-On Reset initiated"),
    (Success, "✓ VCC: 3.3V stable, VDDIO: 1.8V stable"),
    (Info, "Reset signal released, system clock: 24MHz"),
];

const STAGE1: [(LogLevel, &str); 3] = [
    (Info, "🔧 ROM execution started at 0x00000000"),
    (Info, "Fetching boot vector from ROM"),
    (Success, "✓ Boot ROM initialized successfully"),
];

const STAGE2: [(LogLevel, &str); 3] = [
    (Info, "🔑 Reading OTP fuses for key material"),
    (Info, "Key hash retrieved: 0x12345678ABCDEF90"),
    (Success, "✓ Public key hash loaded from eFuses"),
];

const STAGE3_NORMAL: [(LogLevel, &str); 3] = [
    (Info, "📥 Loading bootloader from flash at 0x00010000"),
    (Info, "Bootloader size: 64KB, Reading flash sectors..."),
    (Success, "✓ Bootloader loaded into SRAM"),
];

const STAGE3_TAMPERED: [(LogLevel, &str); 3] = [
    (Info, "📥 Loading bootloader from flash at 0x00010000"),
    (Info, "Bootloader size: 64KB, Reading flash sectors..."),
    (Warning, "⚠ Bootloader loaded (integrity unknown)"),
];

const STAGE4_NORMAL: [(LogLevel, &str); 3] = [
    (Info, "🔐 Starting signature verification (RSA-2048)"),
    (Info, "Computing SHA-256 hash of bootloader image..."),
    (Info, "Hash: 0x12345678... (verifying against signature)"),
];

const STAGE4_TAMPERED: [(LogLevel, &str); 3] = [
    (Info, "🔐 Starting signature verification (RSA-2048)"),
    (Info, "Computing SHA-256 hash of bootloader image..."),
    (Info, "Hash: 0xDEADBEEF... (verifying against signature)"),
];

const STAGE5_NORMAL: [(LogLevel, &str); 3] = [
    (Success, "✓ SIGNATURE VERIFICATION PASSED"),
    (Success, "Bootloader integrity confirmed"),
    (Info, "Preparing to transfer execution..."),
];

const STAGE5_TAMPERED: [(LogLevel, &str); 3] = [
    (Error, "❌ SIGNATURE VERIFICATION FAILED!"),
    (Error, "Hash mismatch detected - bootloader may be tampered"),
    (Error, "Expected: 0x12345678... Got: 0xDEADBEEF..."),
];

const STAGE6_NORMAL: [(LogLevel, &str); 3] = [
    (Success, "🚀 Transferring control to bootloader"),
    (Info, "Jumping to address: 0x00010000"),
    (Success, "✓ Bootloader executing successfully"),
];

const STAGE6_TAMPERED: [(LogLevel, &str); 3] = [
    (Warning, "🚨 Entering SAFE MODE"),
    (Warning, "Bootloader execution BLOCKED"),
    (Info, "System halted in secure state"),
];

const STAGE7_NORMAL: [(LogLevel, &str); 3] = [
    (Success, "✓ BOOT COMPLETE - System Ready"),
    (Success, "OS/Application now running"),
    (Info, "Secure boot chain verified and trusted"),
];

const STAGE7_TAMPERED: [(LogLevel, &str); 3] = [
    (Warning, "⚠ System running in SAFE MODE"),
    (Warning, "Limited functionality - firmware update required"),
    (Info, "Waiting for recovery action..."),
];

/// Fixed message batch for a stage. Empty for out-of-range ids.
pub fn stage_messages(stage: usize, mode: Mode) -> &'static [(LogLevel, &'static str)] {
    let tampered = mode == Mode::Tampered;
    match stage {
        0 => &STAGE0,
        1 => &STAGE1,
        2 => &STAGE2,
        3 => {
            if tampered {
                &STAGE3_TAMPERED
            } else {
                &STAGE3_NORMAL
            }
        }
        4 => {
            if tampered {
                &STAGE4_TAMPERED
            } else {
                &STAGE4_NORMAL
            }
        }
        5 => {
            if tampered {
                &STAGE5_TAMPERED
            } else {
                &STAGE5_NORMAL
            }
        }
        6 => {
            if tampered {
                &STAGE6_TAMPERED
            } else {
                &STAGE6_NORMAL
            }
        }
        7 => {
            if tampered {
                &STAGE7_TAMPERED
            } else {
                &STAGE7_NORMAL
            }
        }
        _ => &[],
    }
}

/// Append-only replay trace of the boot session.
#[derive(Debug, Default)]
pub struct BootLog {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl BootLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp and append the fixed batch for (stage, mode). Returns the
    /// number of lines appended.
    pub fn record(&mut self, stage: usize, mode: Mode) -> usize {
        let timestamp = Utc::now().format("%H:%M:%S%.3f").to_string();
        let batch = stage_messages(stage, mode);
        for &(level, message) in batch {
            self.entries.push(LogEntry {
                id: self.next_id,
                timestamp: timestamp.clone(),
                level,
                stage,
                message: message.to_string(),
            });
            self.next_id += 1;
        }
        batch.len()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the accumulated trace. Ids keep counting up so old and new
    /// entries can never collide.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_are_fixed_and_deterministic() {
        for mode in [Mode::Normal, Mode::Tampered] {
            for stage in 0..crate::stage::STAGE_COUNT {
                let a = stage_messages(stage, mode);
                let b = stage_messages(stage, mode);
                assert_eq!(a.len(), 3);
                assert_eq!(a, b);
            }
        }
        assert!(stage_messages(99, Mode::Normal).is_empty());
    }

    #[test]
    fn tampered_stage_five_is_all_errors() {
        let batch = stage_messages(5, Mode::Tampered);
        assert!(batch.iter().all(|(level, _)| *level == LogLevel::Error));
        assert!(batch
            .iter()
            .any(|(_, msg)| msg.contains("SIGNATURE VERIFICATION FAILED")));
    }

    #[test]
    fn early_stages_ignore_mode() {
        for stage in 0..3 {
            assert_eq!(
                stage_messages(stage, Mode::Normal),
                stage_messages(stage, Mode::Tampered)
            );
        }
    }

    #[test]
    fn log_accumulates_monotonically() {
        let mut log = BootLog::new();
        let mut expected = 0;
        for stage in 0..crate::stage::STAGE_COUNT {
            expected += log.record(stage, Mode::Normal);
            assert_eq!(log.len(), expected);
        }
        assert_eq!(log.len(), 24);

        // Revisiting a stage appends a fresh batch, never deduplicates.
        log.record(3, Mode::Normal);
        assert_eq!(log.len(), 27);

        let ids: Vec<u64> = log.entries().iter().map(|e| e.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn clear_empties_but_keeps_ids_fresh() {
        let mut log = BootLog::new();
        log.record(0, Mode::Normal);
        let last_id = log.entries().last().unwrap().id;
        log.clear();
        assert!(log.is_empty());
        log.record(1, Mode::Normal);
        assert!(log.entries()[0].id > last_id);
    }
}
