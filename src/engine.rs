//! engine.rs — boot-stage sequencer (play/pause/seek + auto-advance timer)
//
// Owns all mutable session state behind a single lock. Registers, memory
// and flags are recomputed from (stage, mode) on every change, never
// patched in place. The auto-advance timer is a spawned task; every
// state-affecting operation aborts the pending task and bumps an epoch
// counter first, so a fire racing the abort can never act on superseded
// state.
//
// Operations are total: out-of-range seeks and non-positive speeds are
// dropped silently, keeping the machine in a valid state at all times.

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::hwstate::{project, BootFlags, BootStatus, MemoryMap, Registers};
use crate::stage::{stage_table, BootStage, Mode, STAGE_COUNT};

struct EngineState {
    stages: [BootStage; STAGE_COUNT],
    current: usize,
    playing: bool,
    mode: Mode,
    speed: f64,
    registers: Registers,
    memory: MemoryMap,
    flags: BootFlags,
    timer: Option<JoinHandle<()>>,
    epoch: u64,
}

impl EngineState {
    /// Abort any pending auto-advance and invalidate its epoch.
    fn invalidate_timer(&mut self) {
        self.epoch += 1;
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    fn reproject(&mut self) {
        let (registers, memory, flags) = project(self.current, self.mode);
        self.registers = registers;
        self.memory = memory;
        self.flags = flags;
    }
}

/// Read-only view handed to the host/view layer.
#[derive(Clone, Debug, Serialize)]
pub struct EngineSnapshot {
    pub current_stage: usize,
    /// The active stage's table entry.
    pub stage: BootStage,
    pub stages: Vec<BootStage>,
    pub total_stages: usize,
    pub is_playing: bool,
    pub mode: Mode,
    pub speed: f64,
    pub registers: Registers,
    pub memory: MemoryMap,
    pub flags: BootFlags,
    pub status: BootStatus,
}

/// Driver for the eight-stage secure-boot flow. Cloneable handle; clones
/// share one state. Arming the auto-advance timer spawns onto the ambient
/// tokio runtime, so drive the engine from inside one.
#[derive(Clone)]
pub struct BootSequenceEngine {
    shared: Arc<Mutex<EngineState>>,
}

impl BootSequenceEngine {
    pub fn new(mode: Mode, speed: f64) -> Self {
        let mut state = EngineState {
            stages: stage_table(mode),
            current: 0,
            playing: false,
            mode,
            speed: if speed > 0.0 { speed } else { 1.0 },
            registers: Registers::RESET,
            memory: MemoryMap::new(),
            flags: BootFlags::default(),
            timer: None,
            epoch: 0,
        };
        state.reproject();
        BootSequenceEngine {
            shared: Arc::new(Mutex::new(state)),
        }
    }

    /// Start auto-advance. No effect if already playing.
    pub fn play(&self) {
        {
            let mut st = self.shared.lock().unwrap();
            if st.playing {
                return;
            }
            st.invalidate_timer();
            st.playing = true;
            log::debug!(target: "engine", "play at stage {}", st.current);
        }
        arm_timer(&self.shared);
    }

    /// Stop auto-advance and cancel the pending timer.
    pub fn pause(&self) {
        let mut st = self.shared.lock().unwrap();
        st.invalidate_timer();
        st.playing = false;
        log::debug!(target: "engine", "paused at stage {}", st.current);
    }

    pub fn toggle_play(&self) {
        let playing = self.shared.lock().unwrap().playing;
        if playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Advance one stage. No-op at the last stage.
    pub fn next_stage(&self) {
        {
            let mut st = self.shared.lock().unwrap();
            if st.current + 1 >= STAGE_COUNT {
                return;
            }
            st.invalidate_timer();
            st.current += 1;
            st.reproject();
        }
        arm_timer(&self.shared);
    }

    /// Step back one stage. No-op at stage 0.
    pub fn prev_stage(&self) {
        {
            let mut st = self.shared.lock().unwrap();
            if st.current == 0 {
                return;
            }
            st.invalidate_timer();
            st.current -= 1;
            st.reproject();
        }
        arm_timer(&self.shared);
    }

    /// Jump straight to stage `n`. Out-of-range requests are dropped.
    pub fn go_to_stage(&self, n: usize) {
        {
            let mut st = self.shared.lock().unwrap();
            if n >= STAGE_COUNT {
                return;
            }
            st.invalidate_timer();
            st.current = n;
            st.reproject();
        }
        arm_timer(&self.shared);
    }

    /// Back to stage 0, paused.
    pub fn reset(&self) {
        let mut st = self.shared.lock().unwrap();
        st.invalidate_timer();
        st.playing = false;
        st.current = 0;
        st.reproject();
        log::debug!(target: "engine", "reset");
    }

    /// Switch scenario. Stage position is preserved; stage text and the
    /// projection reflect the new mode immediately.
    pub fn set_mode(&self, mode: Mode) {
        {
            let mut st = self.shared.lock().unwrap();
            if st.mode == mode {
                return;
            }
            st.invalidate_timer();
            st.mode = mode;
            st.stages = stage_table(mode);
            st.reproject();
            log::info!(target: "engine", "mode switched to {}", mode);
        }
        arm_timer(&self.shared);
    }

    /// Change the speed multiplier. Non-positive values are dropped. A
    /// pending auto-advance is re-armed at the new pace.
    pub fn set_speed(&self, speed: f64) {
        {
            let mut st = self.shared.lock().unwrap();
            if !(speed > 0.0) {
                return;
            }
            st.invalidate_timer();
            st.speed = speed;
        }
        arm_timer(&self.shared);
    }

    /// Clone out the current state for rendering or serialization.
    pub fn snapshot(&self) -> EngineSnapshot {
        let st = self.shared.lock().unwrap();
        EngineSnapshot {
            current_stage: st.current,
            stage: st.stages[st.current],
            stages: st.stages.to_vec(),
            total_stages: STAGE_COUNT,
            is_playing: st.playing,
            mode: st.mode,
            speed: st.speed,
            registers: st.registers,
            memory: st.memory.clone(),
            flags: st.flags,
            status: BootStatus::classify(st.current, st.mode),
        }
    }
}

/// Arm the auto-advance timer for the current stage, if playing. The task
/// only acts if its epoch is still current when it wakes; reaching the
/// last stage clears `playing` instead of re-arming.
fn arm_timer(shared: &Arc<Mutex<EngineState>>) {
    let mut st = shared.lock().unwrap();
    if !st.playing {
        return;
    }
    let delay = st.stages[st.current].scaled_duration(st.speed);
    let epoch = st.epoch;
    let weak: Weak<Mutex<EngineState>> = Arc::downgrade(shared);
    st.timer = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        {
            let mut st = shared.lock().unwrap();
            if st.epoch != epoch || !st.playing {
                return;
            }
            // This task is the stored timer; drop the handle instead of
            // aborting ourselves, then supersede the epoch.
            st.timer = None;
            st.epoch += 1;
            if st.current + 1 < STAGE_COUNT {
                st.current += 1;
                st.reproject();
                log::debug!(target: "engine", "auto-advance to stage {}", st.current);
            } else {
                st.playing = false;
                log::debug!(target: "engine", "auto-advance finished");
                return;
            }
        }
        arm_timer(&shared);
    }));
}
