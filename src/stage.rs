//! stage.rs — fixed boot-stage table (normal + tampered text variants)
//
// The stage list itself never changes: eight stages, ids 0..7, dense.
// Only the display text of stages 5–7 depends on the mode, so the table
// is built as the normal-mode base with a small tampered override set
// merged in at construction time.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of stages in the boot sequence. Stage ids are `0..STAGE_COUNT`
/// and double as indices into the table returned by [`stage_table`].
pub const STAGE_COUNT: usize = 8;

/// Boot scenario selector: untampered image vs. signature-mismatch demo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Normal,
    Tampered,
}

impl Mode {
    /// Flip to the other scenario.
    pub fn toggled(self) -> Self {
        match self {
            Mode::Normal => Mode::Tampered,
            Mode::Tampered => Mode::Normal,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Normal => write!(f, "normal"),
            Mode::Tampered => write!(f, "tampered"),
        }
    }
}

/// One discrete step of the boot sequence. Static once constructed.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct BootStage {
    /// Dense 0-based id, equal to the stage's index in the table.
    pub id: usize,
    /// Short display label.
    pub name: &'static str,
    /// What happens during this stage.
    pub description: &'static str,
    /// Representative machine-instruction mnemonic. Cosmetic.
    pub instruction: Option<&'static str>,
    /// Nominal real-time length, used only for auto-advance pacing.
    pub duration: Duration,
}

impl BootStage {
    /// Auto-advance delay after applying the host's speed multiplier.
    pub fn scaled_duration(&self, speed: f64) -> Duration {
        self.duration.div_f64(speed)
    }
}

const BASE_TABLE: [BootStage; STAGE_COUNT] = [
    BootStage {
        id: 0,
        name: "Power-On Reset",
        description: "System power rails stabilize and reset is released",
        instruction: Some("Power sequencing"),
        duration: Duration::from_millis(2000),
    },
    BootStage {
        id: 1,
        name: "ROM Initialization",
        description: "Boot ROM begins execution at reset vector",
        instruction: Some("LDR PC, =0x00000000"),
        duration: Duration::from_millis(1500),
    },
    BootStage {
        id: 2,
        name: "Key Retrieval",
        description: "Reading public key hash from OTP/eFuses",
        instruction: Some("LDR R0, [OTP_BASE]"),
        duration: Duration::from_millis(2000),
    },
    BootStage {
        id: 3,
        name: "Bootloader Load",
        description: "Loading first-stage bootloader from flash memory",
        instruction: Some("BL flash_read"),
        duration: Duration::from_millis(2500),
    },
    BootStage {
        id: 4,
        name: "Signature Verification",
        description: "Cryptographic verification of bootloader signature",
        instruction: Some("BL crypto_verify"),
        duration: Duration::from_millis(3000),
    },
    BootStage {
        id: 5,
        name: "Verification Complete",
        description: "Signature verification passed",
        instruction: Some("CMP R0, #1"),
        duration: Duration::from_millis(1000),
    },
    BootStage {
        id: 6,
        name: "Execution Transfer",
        description: "Control transferred to verified bootloader",
        instruction: Some("BX R1"),
        duration: Duration::from_millis(1500),
    },
    BootStage {
        id: 7,
        name: "Boot Complete",
        description: "Secure boot completed successfully - OS/Application running",
        instruction: Some("OS_main"),
        duration: Duration::from_millis(1000),
    },
];

/// Text override for one stage under tampered mode. `name: None` keeps the
/// base label (stage 5 keeps "Verification Complete" in both modes).
struct StageOverride {
    id: usize,
    name: Option<&'static str>,
    description: &'static str,
    instruction: &'static str,
}

const TAMPERED_OVERRIDES: [StageOverride; 3] = [
    StageOverride {
        id: 5,
        name: None,
        description: "Signature verification failed",
        instruction: "B error_handler",
    },
    StageOverride {
        id: 6,
        name: Some("Safe Mode Entry"),
        description: "System enters safe mode - bootloader execution blocked",
        instruction: "B safe_mode",
    },
    StageOverride {
        id: 7,
        name: Some("Safe Mode Active"),
        description: "System running in safe mode with limited functionality",
        instruction: "WFI ; halt",
    },
];

/// Build the eight-stage table for the given mode.
pub fn stage_table(mode: Mode) -> [BootStage; STAGE_COUNT] {
    let mut stages = BASE_TABLE;
    if mode == Mode::Tampered {
        for ov in &TAMPERED_OVERRIDES {
            let stage = &mut stages[ov.id];
            if let Some(name) = ov.name {
                stage.name = name;
            }
            stage.description = ov.description;
            stage.instruction = Some(ov.instruction);
        }
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_match_index() {
        for mode in [Mode::Normal, Mode::Tampered] {
            for (i, stage) in stage_table(mode).iter().enumerate() {
                assert_eq!(stage.id, i);
            }
        }
    }

    #[test]
    fn tampered_only_rewrites_tail_stages() {
        let normal = stage_table(Mode::Normal);
        let tampered = stage_table(Mode::Tampered);
        for i in 0..5 {
            assert_eq!(normal[i].name, tampered[i].name);
            assert_eq!(normal[i].description, tampered[i].description);
            assert_eq!(normal[i].instruction, tampered[i].instruction);
        }
        for i in 5..STAGE_COUNT {
            assert_ne!(normal[i].description, tampered[i].description);
            assert_eq!(normal[i].duration, tampered[i].duration);
        }
        // Stage 5 keeps its label either way; 6 and 7 do not.
        assert_eq!(normal[5].name, tampered[5].name);
        assert_ne!(normal[6].name, tampered[6].name);
        assert_ne!(normal[7].name, tampered[7].name);
    }

    #[test]
    fn speed_scales_duration() {
        let stage = stage_table(Mode::Normal)[0];
        assert_eq!(stage.scaled_duration(2.0), Duration::from_millis(1000));
        assert_eq!(stage.scaled_duration(0.5), Duration::from_millis(4000));
    }
}
