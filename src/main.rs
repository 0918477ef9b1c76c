// main.rs — bootsim terminal host
//
// Thin wiring layer: key presses go into the engine, stage changes are
// mirrored into the boot log, attestation runs on a spawned task whose
// narration is polled every frame. All simulation logic lives in the
// library modules.

use std::error::Error;
use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use simplelog::{Config, LevelFilter, WriteLogger};

use bootsim::{
    ui, AttestError, AttestationDemo, AttestationResult, BootLog, BootSequenceEngine, Mode,
};

/// Firmware image the attestation demo hashes and signs. Sample data; the
/// demo illustrates the pipeline, it does not protect anything.
const DEMO_FIRMWARE: &[u8] = b"DemoFirmwareImage-v1.0-ThisIsSampleData";

const MIN_SPEED: f64 = 0.5;
const MAX_SPEED: f64 = 3.0;
const SPEED_STEP: f64 = 0.5;

#[derive(Serialize)]
struct SessionDump<'a> {
    snapshot: bootsim::EngineSnapshot,
    boot_log: &'a [bootsim::LogEntry],
    attestation: Option<&'a AttestationResult>,
}

struct AttestState {
    demo: AttestationDemo,
    /// Filled by the spawned run when it finishes.
    slot: Arc<Mutex<Option<Result<AttestationResult, AttestError>>>>,
    running: bool,
    result: Option<AttestationResult>,
    error: Option<String>,
}

impl AttestState {
    fn new() -> Self {
        AttestState {
            demo: AttestationDemo::new(),
            slot: Arc::new(Mutex::new(None)),
            running: false,
            result: None,
            error: None,
        }
    }

    /// Kick off a run unless one is already in flight (one at a time).
    fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.result = None;
        self.error = None;
        let demo = self.demo.clone();
        let slot = self.slot.clone();
        tokio::spawn(async move {
            let outcome = demo.run(DEMO_FIRMWARE).await;
            *slot.lock().unwrap() = Some(outcome);
        });
    }

    /// Harvest a finished run, if any.
    fn poll(&mut self) {
        let Some(outcome) = self.slot.lock().unwrap().take() else {
            return;
        };
        self.running = false;
        match outcome {
            Ok(result) => self.result = Some(result),
            Err(e) => self.error = Some(e.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = WriteLogger::init(
        LevelFilter::Info,
        Config::default(),
        File::create("bootsim.log")?,
    );
    log::info!(target: "host", "bootsim starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<(), Box<dyn Error>> {
    let engine = BootSequenceEngine::new(Mode::Normal, 1.0);
    let mut boot_log = BootLog::new();
    let mut attest = AttestState::new();

    // The initial stage contributes its batch before any input arrives.
    let mut last_logged = (0usize, Mode::Normal);
    boot_log.record(last_logged.0, last_logged.1);

    loop {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                let snap = engine.snapshot();
                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Char(' ') => engine.toggle_play(),
                    KeyCode::Char('n') | KeyCode::Right => engine.next_stage(),
                    KeyCode::Char('b') | KeyCode::Left => engine.prev_stage(),
                    KeyCode::Char('r') => engine.reset(),
                    KeyCode::Char('t') => engine.set_mode(snap.mode.toggled()),
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        engine.set_speed((snap.speed + SPEED_STEP).min(MAX_SPEED));
                    }
                    KeyCode::Char('-') => {
                        engine.set_speed((snap.speed - SPEED_STEP).max(MIN_SPEED));
                    }
                    KeyCode::Char('a') => attest.start(),
                    KeyCode::Char('c') => {
                        boot_log.clear();
                        attest.demo.reset();
                        attest.result = None;
                        attest.error = None;
                    }
                    KeyCode::Char('d') => {
                        if let Err(e) = dump_session(&engine, &boot_log, attest.result.as_ref()) {
                            log::warn!(target: "host", "state dump failed: {}", e);
                        }
                    }
                    KeyCode::Char(c @ '0'..='7') => {
                        engine.go_to_stage(c as usize - '0' as usize);
                    }
                    _ => {}
                }
            }
        }

        attest.poll();

        let snap = engine.snapshot();
        // Mirror stage/mode transitions (manual or auto-advance) into the
        // replay log. Mode flips re-log the current stage under new text.
        if (snap.current_stage, snap.mode) != last_logged {
            last_logged = (snap.current_stage, snap.mode);
            boot_log.record(last_logged.0, last_logged.1);
        }

        let narration = attest.demo.narration();
        let view = ui::ViewState {
            snap: &snap,
            log: boot_log.entries(),
            narration: &narration,
            attest_progress: attest.demo.progress(),
            attest_running: attest.running,
            attest: attest.result.as_ref(),
            attest_error: attest.error.as_deref(),
        };
        terminal.draw(|f| ui::render_main_ui(f, &view))?;
    }

    log::info!(target: "host", "bootsim exiting");
    Ok(())
}

fn dump_session(
    engine: &BootSequenceEngine,
    boot_log: &BootLog,
    attestation: Option<&AttestationResult>,
) -> Result<(), Box<dyn Error>> {
    let dump = SessionDump {
        snapshot: engine.snapshot(),
        boot_log: boot_log.entries(),
        attestation,
    };
    let path = format!("bootsim-state-{}.json", Utc::now().format("%Y%m%d-%H%M%S"));
    std::fs::write(&path, serde_json::to_string_pretty(&dump)?)?;
    log::info!(target: "host", "session state dumped to {}", path);
    Ok(())
}
