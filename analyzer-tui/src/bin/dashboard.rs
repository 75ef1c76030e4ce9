/// Analyzer Dashboard
///
/// Terminal dashboard for the stock-analyzer backend: crude-oil
/// indicators, equity analysis, BTST signals, and data operations.
/// Every keystroke routes through the shared dispatch table; the
/// stats and system-status panels also refresh on fixed timers.
use std::{
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use analyzer_client::ApiClient;
use analyzer_tui::{
    Action, ActionInput, DashboardState, Dispatcher, PanelId, ServiceStatus, ToastKind,
    WidgetPhase, WidgetState, abbreviate_large, relative_time, spawn_pollers,
};
use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Sparkline, Wrap},
};
use tracing::info;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const KEY_HELP: &str =
    "q quit | r stats | s status | c crude | e equity | v latest | b/B btst | t technical | \
     l load | i calc | d/x/u download | f live | h bhavcopy | a reauth";

/// Initialize logging to a file; the terminal belongs to the UI.
fn init_logging() -> Result<(), Box<dyn Error>> {
    let log_path =
        std::env::var("ANALYZER_LOG_FILE").unwrap_or_else(|_| "analyzer-dashboard.log".to_string());
    let file = std::fs::File::create(log_path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .compact()
        .init();
    Ok(())
}

fn key_action(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('r') => Some(Action::RefreshStats),
        KeyCode::Char('s') => Some(Action::CheckSystemStatus),
        KeyCode::Char('c') => Some(Action::LoadCrudeCharts),
        KeyCode::Char('e') => Some(Action::LoadEquityCharts),
        KeyCode::Char('l') => Some(Action::LoadCrudeData),
        KeyCode::Char('i') => Some(Action::CalculateCrudeIndicators),
        KeyCode::Char('v') => Some(Action::ViewCrudeLatest),
        KeyCode::Char('b') => Some(Action::FetchBtstRecommendations),
        KeyCode::Char('B') => Some(Action::RunBtstAnalysis),
        KeyCode::Char('t') => Some(Action::CalculateStockIndicators),
        KeyCode::Char('d') => Some(Action::DownloadIndicators),
        KeyCode::Char('x') => Some(Action::DownloadAllIndicators),
        KeyCode::Char('u') => Some(Action::BulkDownload),
        KeyCode::Char('f') => Some(Action::FetchLiveData),
        KeyCode::Char('h') => Some(Action::DownloadBhavcopy),
        KeyCode::Char('a') => Some(Action::Reauthenticate),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let client = Arc::new(ApiClient::from_env());
    info!(base_url = client.base_url(), "dashboard starting");

    let state = DashboardState::shared();
    let dispatcher = Dispatcher::new(Arc::clone(&client), Arc::clone(&state), ActionInput::default());

    // Stats every 30s, system status every 60s, for the process lifetime
    let _pollers = spawn_pollers(dispatcher.clone());

    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut frame: usize = 0;

    loop {
        if last_tick.elapsed() >= tick_rate {
            frame = frame.wrapping_add(1);
            {
                let mut guard = state.lock().await;
                draw(&mut terminal, &mut guard, frame)?;
            }
            last_tick = Instant::now();
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    code => {
                        if let Some(action) = key_action(code) {
                            let trigger_allowed = {
                                let guard = state.lock().await;
                                guard.widget(action.panel()).can_trigger()
                            };
                            if trigger_allowed {
                                dispatcher.trigger(action).await;
                            }
                        }
                    }
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut DashboardState,
    frame: usize,
) -> io::Result<()> {
    terminal.draw(|f| render_ui(f, state, frame))?;
    Ok(())
}

fn render_ui(f: &mut Frame, state: &mut DashboardState, frame: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_status_bar(f, chunks[0], state);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Min(0),
            Constraint::Length(8),
        ])
        .split(columns[1]);

    render_chart_panel(f, left[0], &state.crude_charts, PanelId::CrudeCharts, frame);
    render_chart_panel(f, left[1], &state.equity_charts, PanelId::EquityCharts, frame);
    render_text_panel(f, right[0], &state.stats, PanelId::Stats, frame);
    render_text_panel(f, right[1], &state.system, PanelId::System, frame);
    render_text_panel(f, right[2], &state.btst, PanelId::Btst, frame);
    render_text_panel(f, right[3], &state.operations, PanelId::Operations, frame);

    render_footer(f, chunks[2], state);
}

fn render_status_bar(f: &mut Frame, area: Rect, state: &DashboardState) {
    let (api_symbol, api_color) = service_badge(state.health.api);
    let (crude_symbol, crude_color) = service_badge(state.health.crude);

    let updated = state
        .last_update
        .map(|at| relative_time(at, Utc::now()))
        .unwrap_or_else(|| "never".to_string());

    let title_color = if state.health.any_online() {
        Color::Rgb(100, 149, 237)
    } else {
        Color::DarkGray
    };

    let mut spans = vec![
        Span::styled(
            " ANALYZER DASHBOARD ",
            Style::default().fg(title_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" API "),
        Span::styled(api_symbol, Style::default().fg(api_color)),
        Span::raw("  Crude "),
        Span::styled(crude_symbol, Style::default().fg(crude_color)),
    ];

    if let Some(stats) = &state.stats_summary {
        spans.push(Span::raw("  Records: "));
        spans.push(Span::styled(
            abbreviate_large(Some(stats.total_records() as f64)),
            Style::default().fg(Color::Gray),
        ));
        let (readiness, readiness_color) = if stats.ready_for_calculation {
            (" ready", Color::Rgb(0, 255, 127))
        } else {
            (" insufficient", Color::Rgb(255, 215, 0))
        };
        spans.push(Span::styled(
            readiness,
            Style::default().fg(readiness_color),
        ));
    }

    spans.push(Span::raw("  Updated: "));
    spans.push(Span::styled(updated, Style::default().fg(Color::Gray)));
    let line = Line::from(spans);

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(paragraph, area);
}

fn service_badge(status: ServiceStatus) -> (&'static str, Color) {
    match status {
        ServiceStatus::Online => ("● Online", Color::Rgb(0, 255, 127)),
        ServiceStatus::Offline => ("○ Offline", Color::Rgb(255, 69, 58)),
        ServiceStatus::Unknown => ("◌ ...", Color::DarkGray),
    }
}

fn panel_title(panel: PanelId, widget: &WidgetState, frame: usize) -> String {
    if widget.is_loading() {
        let spinner = SPINNER_FRAMES[frame % SPINNER_FRAMES.len()];
        format!(" {} {} ", panel.title(), spinner)
    } else {
        format!(" {} ", panel.title())
    }
}

fn widget_lines(widget: &WidgetState) -> Vec<Line<'_>> {
    let mut lines = Vec::new();

    if let Some(error) = &widget.error {
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Rgb(255, 69, 58)),
        )));
    }

    if widget.lines.is_empty() && widget.error.is_none() {
        lines.push(Line::from(Span::styled(
            if widget.phase == WidgetPhase::Idle {
                "Waiting for data..."
            } else {
                "Loading..."
            },
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for text in &widget.lines {
            lines.push(Line::from(Span::raw(text.as_str())));
        }
    }

    lines
}

fn border_style(widget: &WidgetState) -> Style {
    match widget.phase {
        WidgetPhase::Failed => Style::default().fg(Color::Rgb(255, 69, 58)),
        WidgetPhase::Loading => Style::default().fg(Color::Rgb(255, 215, 0)),
        _ => Style::default().fg(Color::White),
    }
}

fn render_text_panel(f: &mut Frame, area: Rect, widget: &WidgetState, panel: PanelId, frame: usize) {
    let block = Block::default()
        .title(panel_title(panel, widget, frame))
        .borders(Borders::ALL)
        .border_style(border_style(widget));

    let paragraph = Paragraph::new(widget_lines(widget))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

/// A chart panel: summary lines on top, one sparkline per bound series
/// below them.
fn render_chart_panel(
    f: &mut Frame,
    area: Rect,
    widget: &WidgetState,
    panel: PanelId,
    frame: usize,
) {
    let block = Block::default()
        .title(panel_title(panel, widget, frame))
        .borders(Borders::ALL)
        .border_style(border_style(widget));
    let inner = block.inner(area);

    let paragraph = Paragraph::new(widget_lines(widget)).block(block);
    f.render_widget(paragraph, area);

    let text_height = widget.lines.len() as u16 + u16::from(widget.error.is_some());
    let mut y = inner.y + text_height + 1;

    for series in widget.chart.series() {
        let data = series.sparkline_data();
        if data.is_empty() || y + 1 >= inner.y + inner.height {
            continue;
        }

        let label_area = Rect {
            x: inner.x + 1,
            y,
            width: inner.width.saturating_sub(2),
            height: 1,
        };
        let label = Paragraph::new(Span::styled(
            series.metric.as_str(),
            Style::default().fg(Color::Gray),
        ))
        .alignment(Alignment::Left);
        f.render_widget(label, label_area);
        y += 1;

        if y >= inner.y + inner.height {
            break;
        }
        let sparkline_area = Rect {
            x: inner.x + 1,
            y,
            width: inner.width.saturating_sub(2),
            height: 1,
        };
        let sparkline = Sparkline::default()
            .data(&data)
            .style(Style::default().fg(Color::Rgb(100, 149, 237)))
            .max(100);
        f.render_widget(sparkline, sparkline_area);
        y += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_client::StatsSummary;
    use ratatui::backend::TestBackend;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn draw_state(state: &mut DashboardState) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render_ui(f, state, 0)).unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn test_system_panel_shows_inline_health_error() {
        let mut state = DashboardState::default();
        state.system.begin_load();
        state.system.fail("HTTP 500: internal error");

        let text = draw_state(&mut state);
        assert!(text.contains("SYSTEM STATUS"));
        assert!(text.contains("500"));
        assert!(text.contains("internal"));
    }

    #[test]
    fn test_status_bar_renders_stats_snapshot() {
        let mut state = DashboardState::default();
        let mut stats = StatsSummary::default();
        stats.counts.insert("4H".to_string(), 2500);
        stats.ready_for_calculation = true;
        state.stats_summary = Some(stats);

        let text = draw_state(&mut state);
        assert!(text.contains("Records:"));
        assert!(text.contains("2.5K"));
        assert!(text.contains("ready"));
    }

    #[test]
    fn test_idle_panels_show_waiting_placeholder() {
        let mut state = DashboardState::default();
        let text = draw_state(&mut state);
        assert!(text.contains("Waiting for data..."));
    }
}

fn render_footer(f: &mut Frame, area: Rect, state: &mut DashboardState) {
    let toasts = state.toasts.active(Utc::now());
    let line = if let Some(toast) = toasts.back() {
        let color = match toast.kind {
            ToastKind::Success => Color::Rgb(0, 255, 127),
            ToastKind::Error => Color::Rgb(255, 69, 58),
            ToastKind::Warning => Color::Rgb(255, 215, 0),
            ToastKind::Info => Color::Rgb(100, 149, 237),
        };
        Line::from(Span::styled(toast.message.clone(), Style::default().fg(color)))
    } else {
        Line::from(Span::styled(KEY_HELP, Style::default().fg(Color::DarkGray)))
    };

    f.render_widget(Paragraph::new(line), area);
}
