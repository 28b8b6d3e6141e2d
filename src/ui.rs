use crate::client::{AppSnapshot, Screen};
use color_eyre::eyre::{Result, eyre};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use gamble_sui::admin::RowStatus;
use gamble_sui::format;
use gamble_sui::pools::{Pool, PoolField};
use gamble_sui::tickets::TicketStatus;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::{Stdout, stdout};
use tokio::sync::mpsc;

const MAX_INPUT: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Hint(&'static str),
    SwitchScreen,
    NextPool,
    PrevPool,
    CycleFilter,
    Refresh,
    ResetDemo,
    ConfirmBuy { quote: String, quantity: String },
    ConfirmStart { price: String },
    ConfirmStop { pool_id: String },
    ConfigureOracle { oracle_id: String },
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    screen: Screen,
    demo: bool,
    has_selection: bool,
    admin_cursor: usize,
    admin_rows: Vec<AdminRowKey>,
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AdminRowKey {
    id: String,
    name: String,
    status: RowStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    BuyModal(BuyForm),
    StartModal(TextInput),
    StopConfirm { pool_id: String, name: String },
    OracleModal(TextInput),
    QuitModal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct TextInput { value: String }

impl TextInput {
    /// Returns `true` when the key changed the value.
    fn edit(&mut self, code: KeyCode, accept: fn(char) -> bool) -> bool {
        match code {
            KeyCode::Backspace => self.value.pop().is_some(),
            KeyCode::Char(c) if accept(c) && self.value.chars().count() < MAX_INPUT => {
                self.value.push(c);
                true
            }
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum BuyField {
    #[default]
    Quote,
    Quantity,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct BuyForm {
    quote: TextInput,
    quantity: TextInput,
    focus: BuyField,
}

impl Default for BuyForm {
    fn default() -> Self {
        Self {
            quote: TextInput::default(),
            quantity: TextInput { value: "1".to_string() },
            focus: BuyField::Quote,
        }
    }
}

impl BuyForm {
    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            BuyField::Quote => BuyField::Quantity,
            BuyField::Quantity => BuyField::Quote,
        };
    }

    fn edit(&mut self, code: KeyCode) -> bool {
        match self.focus {
            BuyField::Quote => self.quote.edit(code, is_quote_char),
            BuyField::Quantity => self.quantity.edit(code, is_quantity_char),
        }
    }

    /// Tickets the typed quantity asks for; unparsable input counts as zero.
    fn quantity(&self) -> u64 {
        self.quantity.value.trim().parse().unwrap_or(0)
    }
}

fn is_quote_char(c: char) -> bool { c.is_ascii_digit() || c == '.' || c == '$' }

fn is_quantity_char(c: char) -> bool { c.is_ascii_digit() }

fn is_amount_char(c: char) -> bool { c.is_ascii_digit() || c == '.' }

fn is_oracle_char(c: char) -> bool { !c.is_control() }

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

/// Blocking crossterm reads on a dedicated thread, forwarded to the async loop.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        let ev = event::read();
        let failed = ev.is_err();
        if tx.send(ev).is_err() || failed {
            break;
        }
    });
    rx
}

pub async fn next_raw_event(rx: &mut InputEventReceiver) -> Result<Event> {
    match rx.recv().await {
        Some(ev) => Ok(ev?),
        None => Err(eyre!("input thread stopped")),
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // One persistent Terminal so buffers survive across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    // cache what key handling needs between draws
    state.screen = snap.screen;
    state.demo = snap.demo;
    state.has_selection = snap.selected_pool.is_some();
    state.admin_rows = snap
        .admin_rows
        .iter()
        .map(|row| AdminRowKey { id: row.pool.id.clone(), name: row.pool.name.clone(), status: row.status })
        .collect();
    state.admin_cursor = state.admin_cursor.min(state.admin_rows.len().saturating_sub(1));
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to an app action, updating modal state on the way.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) => k,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if k.kind != KeyEventKind::Press { return None; }
    // raw mode swallows SIGINT
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    match &mut state.mode {
        Mode::BuyModal(form) => {
            return match k.code {
                KeyCode::Esc => { state.mode = Mode::Normal; Some(UserEvent::Redraw) }
                KeyCode::Tab | KeyCode::Up | KeyCode::Down => { form.toggle_focus(); Some(UserEvent::Redraw) }
                KeyCode::Enter => {
                    let quote = form.quote.value.clone();
                    let quantity = form.quantity.value.clone();
                    state.mode = Mode::Normal;
                    Some(UserEvent::ConfirmBuy { quote, quantity })
                }
                code => form.edit(code).then_some(UserEvent::Redraw),
            };
        }
        Mode::StartModal(input) => {
            return match k.code {
                KeyCode::Esc => { state.mode = Mode::Normal; Some(UserEvent::Redraw) }
                KeyCode::Enter => { let price = input.value.clone(); state.mode = Mode::Normal; Some(UserEvent::ConfirmStart { price }) }
                code => input.edit(code, is_amount_char).then_some(UserEvent::Redraw),
            };
        }
        Mode::OracleModal(input) => {
            return match k.code {
                KeyCode::Esc => { state.mode = Mode::Normal; Some(UserEvent::Redraw) }
                KeyCode::Enter => { let oracle_id = input.value.clone(); state.mode = Mode::Normal; Some(UserEvent::ConfigureOracle { oracle_id }) }
                code => input.edit(code, is_oracle_char).then_some(UserEvent::Redraw),
            };
        }
        Mode::StopConfirm { pool_id, .. } => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    let pool_id = pool_id.clone();
                    state.mode = Mode::Normal;
                    Some(UserEvent::ConfirmStop { pool_id })
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => { state.mode = Mode::Normal; Some(UserEvent::Redraw) }
                _ => None,
            };
        }
        Mode::QuitModal => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => { state.mode = Mode::Normal; Some(UserEvent::Redraw) }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    match (k.code, state.screen) {
        (KeyCode::Char('q') | KeyCode::Esc, _) => { state.mode = Mode::QuitModal; Some(UserEvent::Redraw) }
        (KeyCode::Tab, _) => Some(UserEvent::SwitchScreen),
        (KeyCode::Char('r'), _) => Some(UserEvent::Refresh),
        (KeyCode::Char('d'), _) if state.demo => Some(UserEvent::ResetDemo),
        (KeyCode::Down | KeyCode::Char('j'), Screen::Tickets) => Some(UserEvent::NextPool),
        (KeyCode::Up | KeyCode::Char('k'), Screen::Tickets) => Some(UserEvent::PrevPool),
        (KeyCode::Char('f'), Screen::Tickets) => Some(UserEvent::CycleFilter),
        (KeyCode::Char('b') | KeyCode::Enter, Screen::Tickets) => {
            if !state.has_selection { return Some(UserEvent::Hint("Select an open round first (↑/↓)")); }
            state.mode = Mode::BuyModal(BuyForm::default());
            Some(UserEvent::Redraw)
        }
        (KeyCode::Down | KeyCode::Char('j'), Screen::Admin) => {
            state.admin_cursor = (state.admin_cursor + 1).min(state.admin_rows.len().saturating_sub(1));
            Some(UserEvent::Redraw)
        }
        (KeyCode::Up | KeyCode::Char('k'), Screen::Admin) => {
            state.admin_cursor = state.admin_cursor.saturating_sub(1);
            Some(UserEvent::Redraw)
        }
        (KeyCode::Char('n'), Screen::Admin) => { state.mode = Mode::StartModal(TextInput::default()); Some(UserEvent::Redraw) }
        (KeyCode::Char('o'), Screen::Admin) => { state.mode = Mode::OracleModal(TextInput::default()); Some(UserEvent::Redraw) }
        (KeyCode::Char('s'), Screen::Admin) => match state.admin_rows.get(state.admin_cursor) {
            Some(row) if row.status == RowStatus::Active => {
                state.mode = Mode::StopConfirm { pool_id: row.id.clone(), name: row.name.clone() };
                Some(UserEvent::Redraw)
            }
            Some(_) => Some(UserEvent::Hint("Only active pools can be stopped")),
            None => Some(UserEvent::Hint("No pool to stop")),
        },
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    // Clear the whole frame to avoid leftover fragments
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(12),   // screen body
            Constraint::Length(7), // status + errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], snap);
    match snap.screen {
        Screen::Tickets => draw_tickets_screen(f, chunks[1], snap),
        Screen::Admin => draw_admin_screen(f, state, chunks[1], snap),
    }
    draw_status(f, chunks[2], snap);
    draw_help(f, chunks[3], snap);
    draw_modals(f, state, snap);
}

fn bold() -> Style { Style::default().add_modifier(Modifier::BOLD) }

fn draw_header(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let account = match (snap.demo, snap.account) {
        (true, _) => "demo".to_string(),
        (false, Some(address)) => format::short_address(&address.to_string()),
        (false, None) => "not connected".to_string(),
    };
    let screen = match snap.screen { Screen::Tickets => "Tickets", Screen::Admin => "Admin" };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("gamble-sui", bold()),
        Span::raw(format!(" | {} | Account: {} | {}", snap.network, account, screen)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Network"));
    f.render_widget(header, area);
}

fn draw_tickets_screen(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[0]);
    draw_tickets(f, top[0], snap);
    draw_selected_pool(f, top[1], snap);
    draw_pools(f, rows[1], snap);
}

fn ticket_color(status: TicketStatus) -> Color {
    match status {
        TicketStatus::Active => Color::Cyan,
        TicketStatus::Won => Color::Green,
        TicketStatus::Lost => Color::Red,
        TicketStatus::Settled => Color::DarkGray,
    }
}

fn draw_tickets(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let stats = &snap.ticket_stats;
    let title = format!(
        "My Tickets [{}] total {} | active {} | stake {} | shown {}",
        snap.ticket_filter,
        stats.total,
        stats.active,
        format::format_sui(stats.total_stake_mist),
        stats.filtered
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    if snap.tickets.is_empty() {
        f.render_widget(Paragraph::new("No tickets match this filter").block(block), area);
        return;
    }
    let header = Row::new(vec!["Ticket", "Round", "Quote", "Stake", "Status", "Placed"]).style(bold());
    let rows: Vec<Row> = snap
        .tickets
        .iter()
        .map(|t| {
            // * marks purchases not yet seen on chain
            let id = if t.provisional { format!("{}*", t.id) } else { t.id.clone() };
            Row::new(vec![
                Cell::from(id),
                Cell::from(format::fit_width(&t.round, 14)),
                Cell::from(format::format_quote(t.quote)),
                Cell::from(format::format_sui(t.stake_mist)),
                Cell::from(t.status.label()).style(Style::default().fg(ticket_color(t.status))),
                Cell::from(format::format_time(t.placed_at)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(9),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(19),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, area);
}

fn draw_selected_pool(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Selected Round");
    let Some(pool) = &snap.selected_pool else {
        f.render_widget(Paragraph::new("No round selected\n↑/↓ to pick an open round").block(block), area);
        return;
    };
    let inner = block.inner(area);
    f.render_widget(block, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);
    let lines = vec![
        Line::from(Span::styled(pool.name.clone(), bold())),
        Line::from(format!("Id: {}", format::short_address(&pool.id))),
        match snap.pot_delta {
            Some(delta) => Line::from(vec![
                Span::raw(format!("Pot: {} ", format::format_sui(pool.pot_mist))),
                Span::styled(format!("+{}", format::format_sui(delta)), Style::default().fg(Color::Green)),
            ]),
            None => Line::from(format!("Pot: {}", format::format_sui(pool.pot_mist))),
        },
        Line::from(format!("Ticket: {}", format::format_sui(pool.ticket_price_mist))),
        Line::from(format!("Opened: {}", format::format_time(pool.created_at))),
        Line::from(format!("Expires: {}", format::format_time(pool.expires_at))),
        Line::from(format!("Time left: {}", format::format_duration(pool.time_left(snap.now)))),
    ];
    f.render_widget(Paragraph::new(lines), parts[0]);
    let progress = pool.progress(snap.now);
    let ratio = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(format!("{:.0}% elapsed", ratio * 100.0));
    f.render_widget(gauge, parts[1]);
}

/// Trailing `?` marks a value that could not be decoded and was shown as zero.
fn defaulted_mark(pool: &Pool, field: PoolField) -> &'static str {
    if pool.is_defaulted(field) { "?" } else { "" }
}

fn list_block(title: String, loading: bool, error: Option<&String>) -> Block<'static> {
    let title = if loading { format!("{title} (loading...)") } else { title };
    let mut block = Block::default().borders(Borders::ALL).title(title);
    if let Some(err) = error {
        block = block.title_bottom(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    block
}

fn draw_pools(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let block = list_block(format!("Rounds ({})", snap.pools.len()), snap.pools_loading, snap.pools_error.as_ref());
    let selected = snap.selected_pool.as_ref().map(|p| p.id.as_str());
    let header = Row::new(vec!["", "Round", "Expires", "Time left", "Pot (SUI)", "Ticket (SUI)"]).style(bold());
    let rows: Vec<Row> = snap
        .pools
        .iter()
        .map(|pool| {
            let is_selected = selected == Some(pool.id.as_str());
            let style = if pool.is_expired(snap.now) {
                Style::default().fg(Color::DarkGray)
            } else if is_selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                if is_selected { ">".to_string() } else { String::new() },
                format::fit_width(&pool.name, 18),
                format::format_time(pool.expires_at),
                format::format_duration(pool.time_left(snap.now)),
                format!("{}{}", format::format_pot(pool.pot_mist), defaulted_mark(pool, PoolField::Balance)),
                format!("{}{}", format::format_pot(pool.ticket_price_mist), defaulted_mark(pool, PoolField::TicketPrice)),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(12),
            Constraint::Length(19),
            Constraint::Length(11),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, area);
}

fn row_color(status: RowStatus) -> Color {
    match status {
        RowStatus::Active => Color::Green,
        RowStatus::Expired => Color::DarkGray,
        RowStatus::StopPending => Color::Yellow,
        RowStatus::Stopped => Color::Red,
    }
}

fn draw_admin_screen(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);
    let stats = &snap.admin_stats;
    let summary = Paragraph::new(format!(
        "Pools: {} | Active: {} | Stopped: {} | Total pot: {}",
        stats.total_pools,
        stats.active_pools,
        stats.stopped_pools,
        format::format_sui(stats.total_pot_mist)
    ))
    .block(Block::default().borders(Borders::ALL).title("Overview"));
    f.render_widget(summary, chunks[0]);

    let block = list_block("Pools".to_string(), snap.admin_loading, snap.admin_error.as_ref());
    let header = Row::new(vec!["", "Pool", "Creator", "Balance", "Ticket", "Ends", "Status"]).style(bold());
    let rows: Vec<Row> = snap
        .admin_rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let pool = &row.pool;
            let creator = pool
                .creator
                .map(|c| format::short_address(&c.to_string()))
                .unwrap_or_else(|| "unknown".to_string());
            let cursor = i == state.admin_cursor;
            Row::new(vec![
                Cell::from(if cursor { ">" } else { "" }),
                Cell::from(format::short_address(&pool.id)),
                Cell::from(creator),
                Cell::from(format::format_sui(pool.pot_mist)),
                Cell::from(format::format_sui(pool.ticket_price_mist)),
                Cell::from(format::format_time(pool.expires_at)),
                Cell::from(row.status.label()).style(Style::default().fg(row_color(row.status))),
            ])
            .style(if cursor { bold() } else { Style::default() })
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Length(13),
            Constraint::Length(13),
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(19),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, chunks[1]);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = vec![Line::from(Span::styled(snap.status.clone(), Style::default().fg(Color::Green)))];
    // newest errors first
    let room = usize::from(area.height.saturating_sub(3));
    for e in snap.errors.iter().rev().take(room) {
        lines.push(Line::from(Span::styled(e.clone(), Style::default().fg(Color::Red))));
    }
    let title = if snap.errors.is_empty() { "Status".to_string() } else { format!("Status | {} errors", snap.errors.len()) };
    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(status, area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut text = match snap.screen {
        Screen::Tickets => "↑/↓ select round | b buy | f filter | r refresh | Tab admin | q/Esc quit".to_string(),
        Screen::Admin => "↑/↓ move | n new round | s stop | o oracle | r refresh | Tab tickets | q/Esc quit".to_string(),
    };
    if snap.demo {
        text.push_str(" | d reset demo");
    }
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn render_modal(f: &mut Frame, title: &str, lines: Vec<Line>, w_percent: u16, h_percent: u16) {
    let area = centered_rect(w_percent, h_percent, f.area());
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), block.inner(area));
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::BuyModal(form) => {
            let field = |label: &str, input: &TextInput, focus: BuyField| {
                let (marker, cursor) = if form.focus == focus { ("> ", "_") } else { ("  ", "") };
                Line::from(format!("{marker}{label}: {}{cursor}", input.value))
            };
            let lines = match &snap.selected_pool {
                Some(pool) => vec![
                    Line::from(Span::styled(pool.name.clone(), bold())),
                    Line::from(format!("Time left: {}", format::format_duration(pool.time_left(snap.now)))),
                    Line::from(""),
                    field("Price guess (USD)", &form.quote, BuyField::Quote),
                    field("Quantity", &form.quantity, BuyField::Quantity),
                    Line::from(format!(
                        "Estimated cost: {} ({} x {})",
                        format::format_sui(pool.ticket_price_mist.saturating_mul(form.quantity())),
                        form.quantity(),
                        format::format_sui(pool.ticket_price_mist)
                    )),
                    Line::from(""),
                    Line::from("Enter=buy Tab=next field Esc=cancel"),
                ],
                None => vec![Line::from("The round is no longer open"), Line::from("Esc=close")],
            };
            render_modal(f, "Buy Tickets", lines, 50, 40);
        }
        Mode::StartModal(input) => {
            let lines = vec![
                Line::from(format!("Ticket price (SUI): {}_", input.value)),
                Line::from(""),
                Line::from("Enter=start Esc=cancel"),
            ];
            render_modal(f, "Start New Round", lines, 45, 25);
        }
        Mode::StopConfirm { pool_id, name } => {
            let lines = vec![
                Line::from(format!("Stop {} ({})?", name, format::short_address(pool_id))),
                Line::from("Ticket sales close and the round settles. (Y/N)"),
            ];
            render_modal(f, "Stop Pool", lines, 50, 20);
        }
        Mode::OracleModal(input) => {
            let lines = vec![
                Line::from("Oracle id as text, or 0x-prefixed hex"),
                Line::from(format!("> {}_", input.value)),
                Line::from(""),
                Line::from("Enter=create Esc=cancel"),
            ];
            render_modal(f, "Oracle Setting", lines, 50, 25);
        }
        Mode::QuitModal => render_modal(f, "Confirm Quit", vec![Line::from("Quit gamble-sui? (Y/N)")], 40, 20),
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    horizontal[1]
}
