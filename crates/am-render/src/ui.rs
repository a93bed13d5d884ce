use am_core::config::EditorSettings;
use am_core::frame::AsciiFrame;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};

use crate::canvas;
use crate::fps::RenderStats;

/// Application state enum (mirrored for rendering decisions).
///
/// # Example
/// ```
/// use am_render::ui::RenderState;
/// let state = RenderState::Running;
/// assert_ne!(state, RenderState::Paused);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    /// Lecture en cours.
    Running,
    /// En pause.
    Paused,
    /// Collecte / encodage d'un export en cours.
    Exporting,
}

/// Tout ce que l'UI affiche pour une frame.
pub struct UiView<'a> {
    /// Dernière frame ASCII, `None` avant la première.
    pub ascii: Option<&'a AsciiFrame>,
    /// Instantané des réglages du tick.
    pub settings: &'a EditorSettings,
    pub stats: RenderStats,
    pub state: RenderState,
    /// Position et durée de lecture (secondes, durée 0 = image fixe).
    pub position: f64,
    pub duration: f64,
    /// Nom de la source affichée dans la barre d'état.
    pub source_label: &'a str,
    /// Message ponctuel (erreur de chargement, export terminé…).
    pub status: Option<&'a str>,
    /// Progression d'export dans [0, 1].
    pub export_progress: Option<f32>,
    pub show_help: bool,
}

/// Largeur de la barre latérale.
const SIDEBAR_WIDTH: u16 = 24;

/// Draw the full UI: canvas + sidebar + status line (+ export gauge, help).
pub fn draw(frame: &mut Frame, view: &UiView<'_>) {
    let area = frame.area();

    let h_chunks = Layout::horizontal([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
        .split(area);
    let bottom_height = if view.export_progress.is_some() { 3 } else { 1 };
    let v_chunks =
        Layout::vertical([Constraint::Min(3), Constraint::Length(bottom_height)]).split(h_chunks[0]);

    // === Canvas ===
    let canvas_area = v_chunks[0];
    if let Some(ascii) = view.ascii {
        canvas::render_frame(
            frame.buffer_mut(),
            canvas_area,
            ascii,
            view.settings.color_enabled,
        );
        draw_hud(frame, canvas_area, &view.stats);
    }

    // === Status / export ===
    match view.export_progress {
        Some(progress) => draw_export_gauge(frame, v_chunks[1], progress),
        None => draw_status(frame, v_chunks[1], view),
    }

    // === Sidebar ===
    draw_sidebar(frame, h_chunks[1], view);

    // === Help overlay ===
    if view.show_help {
        draw_help_overlay(frame, area);
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "ON" } else { "OFF" }
}

/// Format `mm:ss`.
///
/// # Example
/// ```
/// use am_render::ui::format_time;
/// assert_eq!(format_time(75.4), "01:15");
/// ```
#[must_use]
pub fn format_time(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Stats en surimpression, coin bas-droit du canvas.
fn draw_hud(frame: &mut Frame, area: Rect, stats: &RenderStats) {
    if stats.source_width == 0 || area.height < 2 {
        return;
    }
    let lines = vec![
        Line::from(format!(
            "{}×{} → {}×{}",
            stats.source_width, stats.source_height, stats.cols, stats.rows
        )),
        Line::from(format!("{:.0} fps · {:.1}ms", stats.fps, stats.render_ms)),
    ];
    let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16;
    let width = width.min(area.width);
    let hud_area = Rect::new(
        area.right().saturating_sub(width),
        area.bottom().saturating_sub(2),
        width,
        2,
    );
    let hud = Paragraph::new(lines)
        .style(Style::default().fg(Color::DarkGray))
        .right_aligned();
    frame.render_widget(hud, hud_area);
}

fn draw_status(frame: &mut Frame, area: Rect, view: &UiView<'_>) {
    let state = match view.state {
        RenderState::Running => "▶",
        RenderState::Paused => "⏸",
        RenderState::Exporting => "⏺",
    };
    let mut spans = vec![
        Span::styled(format!(" {state} "), Style::default().fg(Color::Green)),
        Span::raw(view.source_label.to_string()),
    ];
    if view.duration > 0.0 {
        spans.push(Span::raw(format!(
            "  {} / {}",
            format_time(view.position),
            format_time(view.duration)
        )));
    }
    if let Some(msg) = view.status {
        spans.push(Span::styled(
            format!("  {msg}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_export_gauge(frame: &mut Frame, area: Rect, progress: f32) {
    let ratio = f64::from(progress.clamp(0.0, 1.0));
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::TOP).title(" Export "))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(format!("{:.0}%", ratio * 100.0));
    frame.render_widget(gauge, area);
}

/// Draw the parameter sidebar with all live values.
fn draw_sidebar(frame: &mut Frame, area: Rect, view: &UiView<'_>) {
    let s = view.settings;
    let header = |t: &'static str| Line::from(Span::styled(t, Style::default().fg(Color::Yellow)));

    let palette = if s.palette_mode {
        format!("{} cols", s.palette_size)
    } else {
        "OFF".to_string()
    };
    let duration = if s.export_duration > 0.0 {
        format!("{:.0}s", s.export_duration)
    } else {
        "full".to_string()
    };

    let lines = vec![
        header("─ Geometry ──"),
        Line::from(format!(" Cols: {}", s.cols)),
        Line::from(format!(" FPS cap: {}", s.fps_cap)),
        Line::from(""),
        header("─ Style ─────"),
        Line::from(format!(" Chars: {}", s.charset_id)),
        Line::from(format!(" Bright: {:+.0}", s.brightness)),
        Line::from(format!(" Contr: {:+.0}", s.contrast)),
        Line::from(format!(" Gamma: {:.2}", s.gamma)),
        Line::from(format!(" Invert: {}", on_off(s.invert))),
        Line::from(format!(" Blur: {:.1}", s.blur)),
        Line::from(""),
        header("─ Edges ─────"),
        Line::from(format!(" Mode: {}", s.edge_mode)),
        Line::from(format!(" Strength: {:.0}", s.edge_strength)),
        Line::from(format!(" Thresh: {:.0}", s.edge_threshold)),
        Line::from(format!(" Blend: {:.0}%", s.edge_blend)),
        Line::from(""),
        header("─ Dither/Color "),
        Line::from(format!(" Dither: {}", s.dither)),
        Line::from(format!(" Color: {}", on_off(s.color_enabled))),
        Line::from(format!(" Palette: {palette}")),
        Line::from(""),
        header("─ Export ────"),
        Line::from(format!(" FPS: {}", s.export_fps)),
        Line::from(format!(" Duration: {duration}")),
        Line::from(format!(
            " Preset: {}",
            s.active_preset.as_deref().unwrap_or("-")
        )),
        Line::from(""),
        Line::from(Span::styled(" ? = help", Style::default().fg(Color::DarkGray))),
    ];

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT)
            .title(" Params "),
    );
    frame.render_widget(sidebar, area);
}

/// Draw the help overlay with all keybindings.
fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            " ascii-mation : Controls ",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(" q/Esc    Quit"),
        Line::from(" Space    Play/Pause"),
        Line::from(" ←/→      Seek ∓5s"),
        Line::from(" +/-      Cols ±10"),
        Line::from(" s        Cycle charset"),
        Line::from(" {/}      Brightness ±5"),
        Line::from(" [/]      Contrast ±5"),
        Line::from(" g/G      Gamma ±0.1"),
        Line::from(" i        Toggle invert"),
        Line::from(" b/B      Blur ±0.5"),
        Line::from(" e        Cycle edge mode"),
        Line::from(" t/T      Edge threshold ±5"),
        Line::from(" d        Cycle dither"),
        Line::from(" c        Toggle color"),
        Line::from(" p        Toggle palette"),
        Line::from(" 1-6      Presets"),
        Line::from(" r        Random preset"),
        Line::from(" x/w/m/h  Export GIF/WebM/MP4/HTML"),
        Line::from(" ?        Toggle help"),
        Line::from(""),
        Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_width = 40u16.min(area.width);
    let help_height = (help_text.len() as u16 + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(help_width) / 2;
    let y = area.y + area.height.saturating_sub(help_height) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}
