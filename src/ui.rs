//! ui.rs — terminal rendering of the boot session (stage timeline, hardware
//! panels, boot log, attestation feed)

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::attest::AttestationResult;
use crate::bootlog::{LogEntry, LogLevel};
use crate::engine::EngineSnapshot;
use crate::hwstate::BootStatus;
use crate::stage::Mode;

/// Everything one frame needs, borrowed from the host.
pub struct ViewState<'a> {
    pub snap: &'a EngineSnapshot,
    pub log: &'a [LogEntry],
    pub narration: &'a [String],
    pub attest_progress: u16,
    pub attest_running: bool,
    pub attest: Option<&'a AttestationResult>,
    pub attest_error: Option<&'a str>,
}

pub fn render_main_ui(f: &mut Frame, view: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(5),  // Header
            Constraint::Length(3),  // Timeline
            Constraint::Min(12),    // Hardware + log panels
            Constraint::Length(7),  // Attestation
            Constraint::Length(2),  // Footer
        ])
        .split(f.size());

    render_header(f, chunks[0], view.snap);
    render_timeline(f, chunks[1], view.snap);
    render_panels(f, chunks[2], view);
    render_attestation(f, chunks[3], view);
    render_footer(f, chunks[4]);
}

fn status_color(status: BootStatus) -> Color {
    match status {
        BootStatus::PoweredDown => Color::DarkGray,
        BootStatus::InProgress(_) => Color::Yellow,
        BootStatus::Complete => Color::Green,
        BootStatus::Failed => Color::Red,
    }
}

fn render_header(f: &mut Frame, area: Rect, snap: &EngineSnapshot) {
    let mode_style = match snap.mode {
        Mode::Normal => Style::default().fg(Color::Green),
        Mode::Tampered => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    };
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            "  bootsim :: Secure Boot Sequence Simulator",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw("  image: "),
            Span::styled(snap.mode.to_string(), mode_style),
            Span::raw(format!("  ·  speed: {:.1}x  ·  status: ", snap.speed)),
            Span::styled(
                snap.status.to_string(),
                Style::default().fg(status_color(snap.status)),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "  stage {}/{} — {}: {}",
                snap.current_stage,
                snap.total_stages - 1,
                snap.stage.name,
                snap.stage.description
            ),
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Secure Boot "))
    .wrap(Wrap { trim: true });

    f.render_widget(header, area);
}

fn render_timeline(f: &mut Frame, area: Rect, snap: &EngineSnapshot) {
    let mut spans: Vec<Span> = Vec::with_capacity(snap.total_stages * 2);
    for stage in &snap.stages {
        let failed = snap.mode == Mode::Tampered && stage.id >= 5 && stage.id <= snap.current_stage;
        let (glyph, style) = if stage.id == snap.current_stage {
            let color = if failed { Color::Red } else { Color::Yellow };
            ("▶", Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD))
        } else if stage.id < snap.current_stage {
            let color = if failed { Color::Red } else { Color::Green };
            ("✓", Style::default().fg(color))
        } else {
            ("·", Style::default().fg(Color::DarkGray))
        };
        spans.push(Span::styled(format!(" {}{} ", glyph, stage.id), style));
        if stage.id + 1 < snap.total_stages {
            spans.push(Span::styled("─", Style::default().fg(Color::DarkGray)));
        }
    }
    let playing = if snap.is_playing { " playing " } else { " paused " };
    let timeline = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(format!(" Timeline ·{}", playing)));
    f.render_widget(timeline, area);
}

fn render_panels(f: &mut Frame, area: Rect, view: &ViewState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(22),
            Constraint::Length(26),
            Constraint::Length(40),
            Constraint::Min(30),
        ])
        .split(area);

    render_registers(f, cols[0], view.snap);
    render_flags(f, cols[1], view.snap);
    render_memory(f, cols[2], view.snap);
    render_bootlog(f, cols[3], view.log);
}

fn render_registers(f: &mut Frame, area: Rect, snap: &EngineSnapshot) {
    let regs = snap.registers;
    let rows = vec![
        Row::new(vec!["PC".to_string(), format!("0x{:08X}", regs.pc)]),
        Row::new(vec!["SP".to_string(), format!("0x{:08X}", regs.sp)]),
        Row::new(vec!["R0".to_string(), format!("0x{:08X}", regs.r0)]),
        Row::new(vec!["R1".to_string(), format!("0x{:08X}", regs.r1)]),
        Row::new(vec!["CPSR".to_string(), format!("0x{:08X}", regs.cpsr)]),
    ];
    let table = Table::new(rows, [Constraint::Length(6), Constraint::Length(12)])
        .block(Block::default().borders(Borders::ALL).title(" Registers "));
    f.render_widget(table, area);
}

fn render_flags(f: &mut Frame, area: Rect, snap: &EngineSnapshot) {
    let flags = snap.flags;
    let entries = [
        ("power_good", flags.power_good, Color::Green),
        ("rom_active", flags.rom_active, Color::Green),
        ("key_loaded", flags.key_loaded, Color::Green),
        ("signature_valid", flags.signature_valid, Color::Green),
        ("boot_complete", flags.boot_complete, Color::Green),
        ("tamper_detected", flags.tamper_detected, Color::Red),
        ("safe_mode", flags.safe_mode, Color::Red),
    ];
    let items: Vec<ListItem> = entries
        .iter()
        .map(|&(name, set, color)| {
            let style = if set {
                Style::default().fg(color)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let glyph = if set { "■" } else { "□" };
            ListItem::new(Line::from(Span::styled(format!("{} {}", glyph, name), style)))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Flags "));
    f.render_widget(list, area);
}

fn render_memory(f: &mut Frame, area: Rect, snap: &EngineSnapshot) {
    let rows: Vec<Row> = snap
        .memory
        .iter()
        .map(|(addr, content)| Row::new(vec![format!("0x{:08X}", addr), content.clone()]))
        .collect();
    let table = Table::new(rows, [Constraint::Length(12), Constraint::Min(20)])
        .block(Block::default().borders(Borders::ALL).title(" Memory Map "));
    f.render_widget(table, area);
}

fn level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Info => Style::default().fg(Color::Gray),
        LogLevel::Success => Style::default().fg(Color::Green),
        LogLevel::Warning => Style::default().fg(Color::Yellow),
        LogLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn render_bootlog(f: &mut Frame, area: Rect, log: &[LogEntry]) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = log.len().saturating_sub(visible);
    let items: Vec<ListItem> = log[skip..]
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", entry.timestamp), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("[{}] ", entry.stage), Style::default().fg(Color::Cyan)),
                Span::styled(entry.message.clone(), level_style(entry.level)),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Boot Log ({} lines) ", log.len())),
    );
    f.render_widget(list, area);
}

fn render_attestation(f: &mut Frame, area: Rect, view: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title(" Attestation Demo ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let label = if view.attest_running {
        "hashing firmware".to_string()
    } else {
        format!("{}%", view.attest_progress)
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .percent(view.attest_progress.min(100))
        .label(label);
    f.render_widget(gauge, parts[0]);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(err) = view.attest_error {
        lines.push(Line::from(Span::styled(
            format!("setup error: {}", err),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    } else if let Some(result) = view.attest {
        let (verdict, style) = if result.verified {
            ("Verified ✓", Style::default().fg(Color::Green))
        } else {
            ("Failed ✗", Style::default().fg(Color::Red))
        };
        lines.push(Line::from(vec![
            Span::raw("digest: "),
            Span::styled(result.digest_hex.clone(), Style::default().fg(Color::Cyan)),
            Span::raw("  ·  "),
            Span::styled(verdict, style),
        ]));
    } else if !view.attest_running {
        lines.push(Line::from(Span::styled(
            "press 'a' to run the hash/sign/verify demo",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let tail = parts[1].height.saturating_sub(lines.len() as u16) as usize;
    let skip = view.narration.len().saturating_sub(tail);
    for line in &view.narration[skip..] {
        lines.push(Line::from(Span::styled(
            line.clone(),
            Style::default().fg(Color::Gray),
        )));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), parts[1]);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        "space play/pause · n/→ next · b/← prev · 0-7 seek · r reset · t tamper toggle · +/- speed · a attest · c clear log · d dump json · q quit",
        Style::default().fg(Color::DarkGray),
    )))
    .block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}
