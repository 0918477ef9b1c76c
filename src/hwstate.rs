//! hwstate.rs — derived hardware-state projection (registers / memory / flags)
//
// Everything here is a pure function of (stage, mode). The projection is
// rebuilt from scratch on every call so seeking backward can never leave
// stale rows behind; calling it twice with the same inputs yields
// identical output.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::stage::{Mode, STAGE_COUNT};

/// Simulated CPU register snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Registers {
    pub pc: u32,
    pub sp: u32,
    pub r0: u32,
    pub r1: u32,
    pub cpsr: u32,
}

impl Registers {
    pub const RESET: Registers = Registers {
        pc: 0x0000_0000,
        sp: 0x2000_8000,
        r0: 0x0000_0000,
        r1: 0x0000_0000,
        cpsr: 0x0000_01D3,
    };
}

/// Address → content descriptor, ordered by address.
pub type MemoryMap = BTreeMap<u32, String>;

/// Subsystem status booleans derived from the current stage and mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BootFlags {
    pub power_good: bool,
    pub rom_active: bool,
    pub key_loaded: bool,
    pub signature_valid: bool,
    pub boot_complete: bool,
    pub tamper_detected: bool,
    pub safe_mode: bool,
}

/// Compute the full projection for a stage. Total over `0..STAGE_COUNT`.
pub fn project(stage: usize, mode: Mode) -> (Registers, MemoryMap, BootFlags) {
    let tampered = mode == Mode::Tampered;

    let registers = Registers {
        pc: (stage as u32) * 0x100,
        r0: if stage >= 2 { 0x1234_5678 } else { 0 }, // key hash loaded
        r1: if stage >= 3 { 0x0001_0000 } else { 0 }, // bootloader address
        ..Registers::RESET
    };

    let flags = BootFlags {
        power_good: true,
        rom_active: stage >= 1,
        key_loaded: stage >= 2,
        signature_valid: stage >= 5 && !tampered,
        boot_complete: stage >= 7 && !tampered,
        tamper_detected: tampered && stage >= 5,
        safe_mode: tampered && stage >= 6,
    };

    let mut memory = MemoryMap::new();
    memory.insert(0x0000_0000, "Boot ROM Code".into());
    memory.insert(
        0x0001_0000,
        if tampered { "Tampered Bootloader" } else { "Valid Bootloader" }.into(),
    );
    memory.insert(0x0002_0000, "Signature Data".into());
    if stage >= 3 {
        memory.insert(
            0x2000_0000,
            if tampered { "Tampered bootloader (blocked)" } else { "Bootloader loaded" }.into(),
        );
        memory.insert(
            0x3000_0000,
            if stage >= 7 {
                if tampered { "Safe mode handler" } else { "OS/Application" }
            } else {
                "Not loaded"
            }
            .into(),
        );
    } else {
        memory.insert(0x2000_0000, "SRAM".into());
    }

    (registers, memory, flags)
}

/// Coarse boot-status classification consumed by the view layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootStatus {
    PoweredDown,
    InProgress(usize),
    Complete,
    Failed,
}

impl BootStatus {
    /// Classify (stage, mode). Tamper detection wins over everything else.
    pub fn classify(stage: usize, mode: Mode) -> BootStatus {
        if mode == Mode::Tampered && stage >= 5 {
            BootStatus::Failed
        } else if stage == 0 {
            BootStatus::PoweredDown
        } else if stage == STAGE_COUNT - 1 && mode == Mode::Normal {
            BootStatus::Complete
        } else {
            BootStatus::InProgress(stage)
        }
    }
}

impl fmt::Display for BootStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootStatus::PoweredDown => write!(f, "powered down"),
            BootStatus::InProgress(n) => write!(f, "stage {} in progress", n),
            BootStatus::Complete => write!(f, "boot complete / secure"),
            BootStatus::Failed => write!(f, "boot failed / tampering detected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_is_deterministic() {
        for mode in [Mode::Normal, Mode::Tampered] {
            for stage in 0..STAGE_COUNT {
                assert_eq!(project(stage, mode), project(stage, mode));
            }
        }
    }

    #[test]
    fn register_thresholds() {
        let (regs, _, _) = project(0, Mode::Normal);
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.r0, 0);
        assert_eq!(regs.r1, 0);
        assert_eq!(regs.sp, 0x2000_8000);
        assert_eq!(regs.cpsr, 0x0000_01D3);

        let (regs, _, _) = project(2, Mode::Normal);
        assert_eq!(regs.pc, 0x200);
        assert_eq!(regs.r0, 0x1234_5678);
        assert_eq!(regs.r1, 0);

        let (regs, _, _) = project(3, Mode::Normal);
        assert_eq!(regs.r1, 0x0001_0000);
    }

    #[test]
    fn mode_isolation() {
        for stage in 0..STAGE_COUNT {
            let (_, _, tampered) = project(stage, Mode::Tampered);
            assert!(!tampered.signature_valid);
            assert!(!tampered.boot_complete);
            let (_, _, normal) = project(stage, Mode::Normal);
            assert!(!normal.tamper_detected);
            assert!(!normal.safe_mode);
        }
    }

    #[test]
    fn tampered_flags_at_stage_five_and_six() {
        let (_, _, flags) = project(5, Mode::Tampered);
        assert!(flags.tamper_detected);
        assert!(!flags.safe_mode);
        let (_, _, flags) = project(6, Mode::Tampered);
        assert!(flags.safe_mode);
    }

    #[test]
    fn memory_rows_follow_stage() {
        let (_, mem, _) = project(0, Mode::Normal);
        assert_eq!(mem.get(&0x2000_0000).unwrap(), "SRAM");
        assert!(!mem.contains_key(&0x3000_0000));

        let (_, mem, _) = project(3, Mode::Normal);
        assert_eq!(mem.get(&0x2000_0000).unwrap(), "Bootloader loaded");
        assert_eq!(mem.get(&0x3000_0000).unwrap(), "Not loaded");

        let (_, mem, _) = project(7, Mode::Normal);
        assert_eq!(mem.get(&0x3000_0000).unwrap(), "OS/Application");

        let (_, mem, _) = project(7, Mode::Tampered);
        assert_eq!(mem.get(&0x2000_0000).unwrap(), "Tampered bootloader (blocked)");
        assert_eq!(mem.get(&0x3000_0000).unwrap(), "Safe mode handler");
    }

    #[test]
    fn seeking_backward_drops_late_rows() {
        // Rebuilt from scratch: stage 2 after stage 7 shows no OS row.
        let (_, mem, _) = project(2, Mode::Normal);
        assert!(!mem.contains_key(&0x3000_0000));
        assert_eq!(mem.get(&0x2000_0000).unwrap(), "SRAM");
    }

    #[test]
    fn status_classification() {
        assert_eq!(BootStatus::classify(0, Mode::Normal), BootStatus::PoweredDown);
        assert_eq!(BootStatus::classify(3, Mode::Normal), BootStatus::InProgress(3));
        assert_eq!(BootStatus::classify(7, Mode::Normal), BootStatus::Complete);
        assert_eq!(BootStatus::classify(5, Mode::Tampered), BootStatus::Failed);
        assert_eq!(BootStatus::classify(7, Mode::Tampered), BootStatus::Failed);
        // Tampered mode before detection is still just in-progress.
        assert_eq!(BootStatus::classify(4, Mode::Tampered), BootStatus::InProgress(4));
        assert_eq!(BootStatus::classify(0, Mode::Tampered), BootStatus::PoweredDown);
    }

    #[test]
    fn status_display_strings() {
        assert_eq!(BootStatus::Complete.to_string(), "boot complete / secure");
        assert_eq!(BootStatus::Failed.to_string(), "boot failed / tampering detected");
        assert_eq!(BootStatus::InProgress(4).to_string(), "stage 4 in progress");
    }
}
