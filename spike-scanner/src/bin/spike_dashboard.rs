/// Spike Dashboard TUI
///
/// Live, filterable table of volume spikes with stacked toasts and desktop alerts for
/// newly detected spikes. The table follows the selected page and sort order while a
/// background watcher always polls the freshest page for alerts.
use std::{
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Local;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use itertools::Itertools;
use parking_lot::Mutex as SyncMutex;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame, Terminal,
};
use spike_data::{SpikeApiClient, SpikeSource};
use spike_scanner::{
    format_clock, format_price, format_trade_value, format_volume, init_file_logging,
    shared::config::parse_symbols, spawn_watcher, AlertSink, DashboardState, DesktopSink,
    ScannerConfig, SpikeNotifier, ToastQueue, ToastSink, VolumeTier, WatchUpdate, WatcherConfig,
    WatcherHandle,
};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

const TOAST_WIDTH: u16 = 48;
const TOAST_HEIGHT: u16 = 3;
const MAX_VISIBLE_TOASTS: usize = 4;
const KEY_HELP: &str = "q quit  ←/→ page  t threshold  d date  o sort  r order  \
    / symbols  s search  c clear  x dismiss  v view";

/// Text entry state of the footer prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    /// Comma separated symbol allow-list
    Symbols(String),
    /// Local symbol search
    Search(String),
}

/// Status of the background watcher, shown in the footer
#[derive(Debug, Clone, Default)]
struct WatchStatus {
    last_error: Option<String>,
    alerted_total: usize,
}

/// State touched by the render loop only
struct App {
    input: InputMode,
    notice: Option<String>,
}

fn log_file_path() -> String {
    std::env::var("SPIKE_LOG_FILE").unwrap_or_else(|_| "spike-dashboard.log".to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_file_logging(log_file_path())?;

    let config = ScannerConfig::from_env();
    info!(api_url = %config.api_url, segment = %config.filters.segment, "Starting spike-dashboard");

    let client = Arc::new(SpikeApiClient::new(config.api_config())?);
    let state = Arc::new(Mutex::new(DashboardState::new(
        config.filters.clone(),
        config.page_limit,
    )));
    let toasts = Arc::new(SyncMutex::new(ToastQueue::new(config.toast_duration)));
    let watch_status = Arc::new(SyncMutex::new(WatchStatus::default()));
    let refresh = Arc::new(Notify::new());

    // Alerts go to the toast stack and the desktop
    let notifier = SpikeNotifier::new(config.max_alerts_per_cycle)
        .with_sink(Arc::new(ToastSink::new(Arc::clone(&toasts))) as Arc<dyn AlertSink>)
        .with_sink(Arc::new(
            DesktopSink::new(config.notify_command.clone()).with_enabled(config.desktop_notify),
        ) as Arc<dyn AlertSink>);

    let (watcher, mut updates) = spawn_watcher(
        Arc::clone(&client),
        notifier,
        config.filters.clone(),
        WatcherConfig::from(&config),
    );

    // Known symbols for allow-list validation
    {
        let client = Arc::clone(&client);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            match client.fetch_symbols_with_retry(2).await {
                Ok(symbols) => {
                    info!(count = symbols.len(), "Loaded symbol list");
                    state.lock().await.known_symbols = symbols;
                }
                Err(error) => warn!(%error, "Failed to load symbol list"),
            }
        });
    }

    // Table loader: refreshes the displayed page on demand and on the poll interval
    {
        let client = Arc::clone(&client);
        let state = Arc::clone(&state);
        let refresh = Arc::clone(&refresh);
        let poll_interval = config.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = refresh.notified() => {}
                    _ = ticker.tick() => {}
                }

                let (generation, query) = state.lock().await.page_query(&Local::now());
                let result = client.fetch_spikes(&query).await;

                let mut guard = state.lock().await;
                let applied = match result {
                    Ok(page) => guard.apply_page(generation, page, chrono::Utc::now()),
                    Err(error) => {
                        warn!(%error, page = query.page, "Table fetch failed");
                        guard.apply_error(generation, error)
                    }
                };
                if !applied {
                    debug!(generation, "Discarded stale table response");
                }
            }
        });
    }

    // Watcher updates
    {
        let watch_status = Arc::clone(&watch_status);
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                let mut status = watch_status.lock();
                match update {
                    WatchUpdate::Cycle { report, .. } => {
                        status.last_error = None;
                        status.alerted_total += report.alerted.len();
                    }
                    WatchUpdate::PollFailed { error, .. } => {
                        status.last_error = Some(error.to_string());
                    }
                }
            }
        });
    }

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

    let mut app = App {
        input: InputMode::Normal,
        notice: None,
    };
    let tick_rate = Duration::from_millis(250);

    loop {
        toasts.lock().expire(Instant::now());
        {
            let guard = state.lock().await;
            let toasts = toasts.lock();
            let status = watch_status.lock().clone();
            terminal.draw(|f| render_ui(f, &guard, &toasts, &status, &app))?;
        }

        if !event::poll(tick_rate)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let quit = handle_key(key, &mut app, &state, &toasts, &watcher, &refresh).await;
        if quit {
            break;
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    watcher.shutdown().await;
    info!("Spike dashboard closed");
    Ok(())
}

/// Apply a key press. Returns true when the dashboard should exit.
async fn handle_key(
    key: KeyEvent,
    app: &mut App,
    state: &Mutex<DashboardState>,
    toasts: &SyncMutex<ToastQueue>,
    watcher: &WatcherHandle,
    refresh: &Notify,
) -> bool {
    let mut guard = state.lock().await;

    match &mut app.input {
        InputMode::Symbols(buffer) => {
            match key.code {
                KeyCode::Enter => {
                    let mut symbols = parse_symbols(buffer);
                    let unknown: Vec<_> = guard
                        .unknown_symbols(&symbols)
                        .into_iter()
                        .cloned()
                        .collect();
                    if !unknown.is_empty() {
                        app.notice = Some(format!(
                            "Unknown symbols ignored: {}",
                            unknown.iter().join(", ")
                        ));
                        symbols.retain(|symbol| !unknown.contains(symbol));
                    } else {
                        app.notice = None;
                    }
                    app.input = InputMode::Normal;
                    if guard.set_symbols(symbols) {
                        propagate_filters(&guard, watcher, refresh).await;
                    }
                }
                KeyCode::Esc => app.input = InputMode::Normal,
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            return false;
        }
        InputMode::Search(buffer) => {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => app.input = InputMode::Normal,
                KeyCode::Backspace => {
                    buffer.pop();
                    guard.search = buffer.clone();
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    guard.search = buffer.clone();
                }
                _ => {}
            }
            return false;
        }
        InputMode::Normal => {}
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    let filters_changed = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Right => {
            if guard.next_page() {
                refresh.notify_one();
            }
            false
        }
        KeyCode::Left => {
            if guard.prev_page() {
                refresh.notify_one();
            }
            false
        }
        KeyCode::Char('t') => guard.cycle_threshold(),
        KeyCode::Char('d') => guard.toggle_date(),
        KeyCode::Char('o') => guard.toggle_sort_by(),
        KeyCode::Char('r') => guard.toggle_sort_order(),
        KeyCode::Char('c') => guard.clear_symbols(),
        KeyCode::Char('/') => {
            app.input = InputMode::Symbols(guard.filters().symbols.iter().join(","));
            false
        }
        KeyCode::Char('s') => {
            app.input = InputMode::Search(guard.search.clone());
            false
        }
        KeyCode::Char('x') => {
            let mut toasts = toasts.lock();
            if let Some(id) = toasts.latest().map(|toast| toast.id) {
                toasts.dismiss(id);
            }
            false
        }
        KeyCode::Char('v') => {
            let viewed = {
                let mut toasts = toasts.lock();
                let id = toasts.latest().map(|toast| toast.id);
                id.and_then(|id| toasts.dismiss(id))
            };
            match viewed {
                Some(toast) if guard.add_symbol(&toast.symbol) => true,
                Some(_) => {
                    // Already filtered on this symbol
                    if guard.first_page() {
                        refresh.notify_one();
                    }
                    false
                }
                None => false,
            }
        }
        _ => false,
    };

    if filters_changed {
        propagate_filters(&guard, watcher, refresh).await;
    }
    false
}

/// Push the current filters to the watcher and reload the table.
async fn propagate_filters(state: &DashboardState, watcher: &WatcherHandle, refresh: &Notify) {
    debug!(filters = ?state.filters(), "Filters changed");
    if !watcher.update_filters(state.filters().clone()).await {
        warn!("Spike watcher is not running, filter update dropped");
    }
    refresh.notify_one();
}

fn render_ui(
    f: &mut Frame,
    state: &DashboardState,
    toasts: &ToastQueue,
    status: &WatchStatus,
    app: &App,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(f.area());

    render_filters(f, state, chunks[0]);
    render_table(f, state, chunks[1]);
    render_footer(f, state, status, app, chunks[2]);
    render_toasts(f, toasts, chunks[1]);
}

fn render_filters(f: &mut Frame, state: &DashboardState, area: Rect) {
    let filters = state.filters();
    let label = Style::default().fg(Color::Gray);
    let value = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let symbols = if filters.symbols.is_empty() {
        "all".to_string()
    } else {
        filters.symbols.iter().join(", ")
    };

    let line = Line::from(vec![
        Span::styled("Segment: ", label),
        Span::styled(filters.segment.to_string(), value),
        Span::raw("  "),
        Span::styled("Volume ≥ ", label),
        Span::styled(format_volume(filters.volume_threshold as f64), value),
        Span::raw("  "),
        Span::styled("Date: ", label),
        Span::styled(filters.date.to_string(), value),
        Span::raw("  "),
        Span::styled("Sort: ", label),
        Span::styled(format!("{} {}", filters.sort_by, filters.sort_order), value),
        Span::raw("  "),
        Span::styled("Symbols: ", label),
        Span::styled(symbols, value),
    ]);

    let block = Block::default()
        .title(" VOLUME SPIKES ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn tier_style(volume_delta: f64) -> Style {
    match VolumeTier::classify(volume_delta) {
        VolumeTier::High => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        VolumeTier::Elevated => Style::default().fg(Color::Yellow),
        VolumeTier::Normal => Style::default().fg(Color::Green),
        VolumeTier::None => Style::default().fg(Color::DarkGray),
    }
}

fn render_table(f: &mut Frame, state: &DashboardState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    if state.loading {
        let loading = Paragraph::new(Line::from(Span::styled(
            "Loading spikes...",
            Style::default().fg(Color::Yellow),
        )))
        .block(block);
        f.render_widget(loading, area);
        return;
    }

    let header = Row::new(vec![
        "Symbol",
        "LTP",
        "Volume Delta",
        "Time",
        "Trade Value",
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = state
        .visible_rows()
        .map(|spike| {
            Row::new(vec![
                Cell::from(spike.symbol.to_string()).style(Style::default().fg(Color::Cyan)),
                Cell::from(format_price(spike.ltp)),
                Cell::from(format_volume(spike.volume_delta)).style(tier_style(spike.volume_delta)),
                Cell::from(format_clock(&spike.timestamp, &Local)),
                Cell::from(format_trade_value(spike.trade_value())),
            ])
        })
        .collect();

    if rows.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No spikes match the current filters",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let widths = [
        Constraint::Length(18),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(10),
        Constraint::Min(18),
    ];
    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

fn render_footer(
    f: &mut Frame,
    state: &DashboardState,
    status: &WatchStatus,
    app: &App,
    area: Rect,
) {
    let dim = Style::default().fg(Color::Gray);
    let enabled = |on: bool| {
        if on {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let last_updated = state
        .last_updated
        .map(|time| format_clock(&time, &Local))
        .unwrap_or_else(|| "--:--:--".to_string());

    let mut first = vec![
        Span::styled("◀ prev", enabled(state.has_prev())),
        Span::styled(
            format!("  Page {}/{}  ", state.page(), state.page_count()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled("next ▶", enabled(state.has_next())),
        Span::styled(format!("   {} spikes", state.total), dim),
        Span::styled(format!("   Last updated {}", last_updated), dim),
        Span::styled(format!("   Alerts {}", status.alerted_total), dim),
    ];
    if let Some(error) = state.last_error.as_ref().or(status.last_error.as_ref()) {
        first.push(Span::styled(
            format!("   ⚠ {}", error),
            Style::default().fg(Color::Red),
        ));
    }

    let second = match &app.input {
        InputMode::Symbols(buffer) => Line::from(vec![
            Span::styled("Symbols (comma separated): ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}_", buffer)),
        ]),
        InputMode::Search(buffer) => Line::from(vec![
            Span::styled("Search: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}_", buffer)),
        ]),
        InputMode::Normal => match &app.notice {
            Some(notice) => Line::from(Span::styled(
                notice.clone(),
                Style::default().fg(Color::Yellow),
            )),
            None => Line::from(Span::styled(
                KEY_HELP,
                dim,
            )),
        },
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));
    f.render_widget(
        Paragraph::new(vec![Line::from(first), second]).block(block),
        area,
    );
}

/// Stack live toasts in the bottom-left corner of `area`, newest at the bottom.
fn render_toasts(f: &mut Frame, toasts: &ToastQueue, area: Rect) {
    let width = TOAST_WIDTH.min(area.width.saturating_sub(2));
    let visible: Vec<_> = toasts.iter().rev().take(MAX_VISIBLE_TOASTS).collect();

    for (index, toast) in visible.into_iter().enumerate() {
        let offset = TOAST_HEIGHT * (index as u16 + 1);
        if offset + 1 > area.height {
            break;
        }
        let rect = Rect::new(area.x + 1, area.y + area.height - 1 - offset, width, TOAST_HEIGHT);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta));
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                toast.text.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )))
            .block(block),
            rect,
        );
    }
}
