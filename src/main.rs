use std::env;
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use spomap_terminal::api_fetch::DEFAULT_TOP_N;
use spomap_terminal::scale::{self, RADIUS_BASE, RADIUS_SPAN};
use spomap_terminal::state::{apply_delta, AppState, ProviderCommand, Region};
use spomap_terminal::{fake_feed, feed, state};

struct Marker {
    x: u16,
    y: u16,
    region_id: String,
}

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    last_requested_sport: Option<String>,
    top_n: usize,
    map_inner: Rect,
    rank_inner: Rect,
    rank_view_start: usize,
    markers: Vec<Marker>,
}

impl App {
    fn new(cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        let top_n = env::var("SPOMAP_RANK_TOP_N")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_N)
            .max(1);
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
            last_requested_sport: None,
            top_n,
            map_inner: Rect::default(),
            rank_inner: Rect::default(),
            rank_view_start: 0,
            markers: Vec::new(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => {
                if self.state.help_overlay {
                    self.state.help_overlay = false;
                } else if self.state.notice.is_some() {
                    self.state.notice = None;
                }
            }
            KeyCode::Enter => {
                if self.state.notice.take().is_none() {
                    self.state.select_rank_current();
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_rank_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_rank_prev(),
            KeyCode::Char('c') => self.state.clear_region(),
            KeyCode::Char('s') => self.state.cycle_sport_next(),
            KeyCode::Char('S') => self.state.cycle_sport_prev(),
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let (col, row) = (mouse.column, mouse.row);
        if rect_contains(self.rank_inner, col, row) {
            let idx = self.rank_view_start + (row - self.rank_inner.y) as usize;
            if idx < self.state.rank_list.len() {
                self.state.rank_selected = idx;
                self.state.select_rank_current();
            }
            return;
        }
        if rect_contains(self.map_inner, col, row) {
            // Nearest marker within a small radius, so a click next to a
            // single-cell marker still lands.
            let hit = self
                .markers
                .iter()
                .map(|m| {
                    let dist = m.x.abs_diff(col).max(m.y.abs_diff(row));
                    (dist, m)
                })
                .filter(|(dist, _)| *dist <= 2)
                .min_by_key(|(dist, _)| *dist)
                .map(|(_, m)| m.region_id.clone());
            if let Some(id) = hit {
                self.state.select_region(id);
            }
        }
    }

    fn request_initial(&mut self) {
        let Some(tx) = &self.cmd_tx else {
            return;
        };
        if tx.send(ProviderCommand::FetchInitial).is_ok() {
            self.state.loading = true;
            self.state.push_log("[INFO] Loading sports and regions");
        } else {
            self.state.push_log("[WARN] Initial load request failed");
        }
    }

    /// Phase B trigger: fires whenever the selected sport differs from the
    /// last one requested, which covers both the auto-selection after the
    /// initial load and user cycling. Overlapping requests are allowed; the
    /// stale one is dropped when its delta arrives.
    fn maybe_request_sport_data(&mut self) {
        let Some(sport) = self.state.selected_sport.clone() else {
            return;
        };
        if self.last_requested_sport.as_deref() == Some(sport.as_str()) {
            return;
        }
        let Some(tx) = &self.cmd_tx else {
            return;
        };
        if tx
            .send(ProviderCommand::FetchSportData {
                sport: sport.clone(),
                top_n: self.top_n,
            })
            .is_ok()
        {
            self.state.loading = true;
            self.state.push_log(format!("[INFO] Loading metrics for {sport}"));
            self.last_requested_sport = Some(sport);
        } else {
            self.state.push_log("[WARN] Metrics request failed");
        }
    }

    fn refresh(&mut self) {
        if self.state.startup_failed || self.state.regions.is_empty() {
            self.request_initial();
            return;
        }
        // Force a re-request of the current sport.
        self.last_requested_sport = None;
    }
}

fn rect_contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let feed_mode = env::var("SPOMAP_FEED").unwrap_or_default().to_lowercase();
    if feed_mode == "demo" {
        fake_feed::spawn_fake_provider(tx, cmd_rx);
    } else {
        feed::spawn_provider(tx, cmd_rx);
    }

    let mut app = App::new(Some(cmd_tx));
    app.request_initial();
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.maybe_request_sport_data();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(1)])
        .split(chunks[1]);

    render_sidebar(frame, body[0], app);
    render_map(frame, body[1], app);

    let footer = Paragraph::new(
        "j/k Move | Enter/Click Select | c Clear | s/S Sport | r Refresh | ? Help | q Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);

    if app.state.loading {
        render_loading_overlay(frame, frame.size());
    }
    if let Some(notice) = app.state.notice.clone() {
        render_notice_overlay(frame, frame.size(), &notice);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let sport = state.selected_sport_label().unwrap_or("-");
    let updated = state
        .data_updated_at
        .map(|t| {
            let local: chrono::DateTime<chrono::Local> = t.into();
            local.format("%H:%M:%S").to_string()
        })
        .unwrap_or_else(|| "-".to_string());
    format!("SPOMAP | exercise deprivation map | Sport: {sport} | Updated: {updated}")
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &mut App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(3),
        ])
        .split(area);

    let sport_line = match app.state.selected_sport_label() {
        Some(label) => format!("{label}  (s/S to switch)"),
        None => "no sports loaded".to_string(),
    };
    let sport = Paragraph::new(sport_line)
        .block(Block::default().borders(Borders::ALL).title("Sport"));
    frame.render_widget(sport, sections[0]);

    render_summary(frame, sections[1], &app.state);
    render_rank_list(frame, sections[2], app);
}

fn render_summary(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Selected region");
    let text = match state.active_detail() {
        Some(detail) => vec![
            Line::from(Span::styled(
                detail.region.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Demand: {:>6.1}", detail.metric.demand_score)),
            Line::from(format!("Supply: {:>6.1}", detail.metric.supply_score)),
            Line::from(vec![
                Span::raw("EDI:    "),
                Span::styled(
                    format!("{:>6.1}", detail.metric.edi),
                    Style::default().fg(scale::NEUTRAL_COLOR),
                ),
            ]),
            Line::from(Span::styled(
                "EDI = demand - supply; higher is",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "more underserved.",
                Style::default().fg(Color::DarkGray),
            )),
        ],
        None => vec![
            Line::from("No region selected."),
            Line::from(Span::styled(
                "Click the map or pick a row below.",
                Style::default().fg(Color::DarkGray),
            )),
        ],
    };
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_rank_list(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Most deprived regions");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.rank_inner = inner;

    if app.state.rank_list.is_empty() {
        let empty = Paragraph::new("No ranking for this sport")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        app.rank_view_start = 0;
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(app.state.rank_selected, app.state.rank_list.len(), visible);
    app.rank_view_start = start;

    let mut lines = Vec::with_capacity(end - start);
    for (pos, entry) in app.state.rank_list[start..end].iter().enumerate() {
        let idx = start + pos;
        let is_cursor = idx == app.state.rank_selected;
        let is_active = app.state.active_region_id.as_deref() == Some(entry.region_id.as_str());
        let mut style = Style::default();
        if is_active {
            style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
        }
        if is_cursor {
            style = style.bg(Color::DarkGray);
        }
        let text = format!(
            "{:>2}. {:<18} EDI {:>6.1}",
            idx + 1,
            truncate(&entry.region_name, 18),
            entry.edi
        );
        lines.push(Line::from(Span::styled(text, style)));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_map(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default().borders(Borders::ALL).title("Map");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.map_inner = inner;
    app.markers.clear();

    if inner.width < 4 || inner.height < 3 {
        return;
    }
    if app.state.regions.is_empty() {
        let hint = if app.state.startup_failed {
            "Backend unreachable. Press r to retry."
        } else {
            "Waiting for region data..."
        };
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    // Bottom line of the panel is the legend, the rest is the canvas.
    let canvas = Rect {
        height: inner.height - 1,
        ..inner
    };
    let legend_area = Rect {
        y: inner.y + inner.height - 1,
        height: 1,
        ..inner
    };
    let legend = Paragraph::new(Line::from(vec![
        Span::raw("EDI  "),
        Span::styled("low", Style::default().fg(Color::Rgb(0, 120, 255))),
        Span::raw(" -> "),
        Span::styled("high", Style::default().fg(Color::Rgb(255, 0, 0))),
        Span::raw("   size = EDI   "),
        Span::styled("@ active", Style::default().fg(Color::Yellow)),
    ]));
    frame.render_widget(legend, legend_area);

    let range = scale::compute_range(app.state.metric_map.values().map(|m| m.edi));
    let bounds = geo_bounds(&app.state.regions);

    // Active marker drawn last so it stays on top of overlaps.
    let mut active_marker: Option<(u16, u16, String)> = None;
    let buf = frame.buffer_mut();
    for region in &app.state.regions {
        let Some(metric) = app.state.metric_map.get(&region.id) else {
            continue;
        };
        let (x, y) = project(region, bounds, canvas);
        app.markers.push(Marker {
            x,
            y,
            region_id: region.id.clone(),
        });
        let is_active = app.state.active_region_id.as_deref() == Some(region.id.as_str());
        if is_active {
            active_marker = Some((x, y, region.name.clone()));
            continue;
        }
        let glyph = marker_glyph(scale::radius_for(metric.edi, range));
        let style = Style::default().fg(scale::color_for(metric.edi, range));
        buf.set_string(x, y, glyph, style);
    }
    if let Some((x, y, name)) = active_marker {
        let style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        buf.set_string(x, y, "@", style);
        let label_x = x + 2;
        let room = (canvas.x + canvas.width).saturating_sub(label_x) as usize;
        if room > 0 {
            buf.set_string(x + 2, y, truncate(&name, room), style);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GeoBounds {
    lat_min: f64,
    lat_max: f64,
    lng_min: f64,
    lng_max: f64,
}

fn geo_bounds(regions: &[Region]) -> GeoBounds {
    let lat = scale::compute_range(regions.iter().map(|r| r.lat));
    let lng = scale::compute_range(regions.iter().map(|r| r.lng));
    // Pad so edge markers don't sit on the border.
    let lat_pad = ((lat.max - lat.min) * 0.05).max(0.01);
    let lng_pad = ((lng.max - lng.min) * 0.05).max(0.01);
    GeoBounds {
        lat_min: lat.min - lat_pad,
        lat_max: lat.max + lat_pad,
        lng_min: lng.min - lng_pad,
        lng_max: lng.max + lng_pad,
    }
}

fn project(region: &Region, bounds: GeoBounds, canvas: Rect) -> (u16, u16) {
    let tx = (region.lng - bounds.lng_min) / (bounds.lng_max - bounds.lng_min);
    let ty = 1.0 - (region.lat - bounds.lat_min) / (bounds.lat_max - bounds.lat_min);
    let x = canvas.x + (tx * (canvas.width.saturating_sub(1)) as f64).round() as u16;
    let y = canvas.y + (ty * (canvas.height.saturating_sub(1)) as f64).round() as u16;
    (
        x.min(canvas.x + canvas.width - 1),
        y.min(canvas.y + canvas.height - 1),
    )
}

/// One cell per marker, so the visual radius maps to glyph weight.
fn marker_glyph(radius: f64) -> &'static str {
    let t = ((radius - RADIUS_BASE) / RADIUS_SPAN).clamp(0.0, 1.0);
    if t < 0.25 {
        "."
    } else if t < 0.5 {
        "o"
    } else if t < 0.75 {
        "O"
    } else {
        "0"
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if visible == 0 || total <= visible {
        return (0, total);
    }
    let start = selected
        .saturating_sub(visible / 2)
        .min(total - visible);
    (start, start + visible)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max.saturating_sub(1)).collect::<String>() + "…"
    }
}

fn render_loading_overlay(frame: &mut Frame, area: Rect) {
    let rect = centered_rect(26, 3, area);
    frame.render_widget(Clear, rect);
    let overlay = Paragraph::new("Loading data...")
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(overlay, rect);
}

fn render_notice_overlay(frame: &mut Frame, area: Rect, notice: &str) {
    let rect = centered_rect(50.min(area.width), 5, area);
    frame.render_widget(Clear, rect);
    let overlay = Paragraph::new(vec![
        Line::from(notice.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Esc to dismiss, r to retry",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Error")
            .style(Style::default().fg(Color::Red)),
    );
    frame.render_widget(overlay, rect);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let rect = centered_rect(44.min(area.width), 12, area);
    frame.render_widget(Clear, rect);
    let lines = vec![
        Line::from("j / k / arrows   move rank cursor"),
        Line::from("Enter / click    select region"),
        Line::from("c                clear selection"),
        Line::from("s / S            next / previous sport"),
        Line::from("r                refresh"),
        Line::from("?                toggle this help"),
        Line::from("q                quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Markers: color blue->red and size . o O 0",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "scale with EDI for the current sport.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let overlay =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(overlay, rect);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
