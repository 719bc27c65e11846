use crate::{
    admin::AdminActionKind,
    animals::{
        ANIMALS,
        NUMBERS_PER_ANIMAL,
    },
    client::{
        AppView,
        CursorMove,
        TxIntent,
    },
    i18n::{
        Language,
        Text,
        tr,
    },
    leaderboard::LeaderboardSource,
    notify::Severity,
    snapshot::DrawView,
    units::{
        format_address,
        format_mon,
        short_address,
    },
};
use chrono::DateTime;
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

pub type InputEventReceiver = EventStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Cursor(CursorMove),
    ToggleNumber,
    ToggleAnimal,
    ClearSlip,
    PlaceBet,
    Withdraw,
    OpenAdmin,
    AdminSubmit { kind: AdminActionKind, input: String },
    Transfer { to: String, amount: String },
    Confirm(bool),
    Refresh,
    ToggleLanguage,
    Logout,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Game,
    History,
    Leaderboard,
    Rules,
}

impl View {
    fn next(self) -> View {
        match self {
            View::Game => View::History,
            View::History => View::Leaderboard,
            View::Leaderboard => View::Rules,
            View::Rules => View::Game,
        }
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    view: View,
    history_offset: usize,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    Confirm,
    AdminMenu(AdminMenuState),
    AdminInput(AdminInputState),
    Profile(ProfileState),
    QuitModal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct AdminMenuState {
    idx: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AdminInputState {
    idx: usize,
    buffer: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ProfileField {
    #[default]
    Destination,
    Amount,
}

/// Send-MON form inside the profile modal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ProfileState {
    field: ProfileField,
    destination: String,
    amount: String,
}

impl ProfileState {
    fn active(&mut self) -> &mut String {
        match self.field {
            ProfileField::Destination => &mut self.destination,
            ProfileField::Amount => &mut self.amount,
        }
    }
}

impl UiState {
    pub fn view(&self) -> View {
        self.view
    }

    pub fn open_confirm(&mut self) {
        self.mode = Mode::Confirm;
    }

    pub fn open_admin_menu(&mut self) {
        self.mode = Mode::AdminMenu(AdminMenuState::default());
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
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

pub fn draw(state: &mut UiState, view: &AppView<'_>) -> Result<()> {
    // the confirmation may have been consumed by the controller
    if state.mode == Mode::Confirm && view.confirmation.is_none() {
        state.mode = Mode::Normal;
    }
    state.history_offset = state
        .history_offset
        .min(view.snapshot.history.len().saturating_sub(1));
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, view))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

/// Next terminal event, or `None` once the input stream has ended.
pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Option<Event>> {
    match events.next().await {
        Some(event) => Ok(Some(event?)),
        None => Ok(None),
    }
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => k,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };

    match &mut state.mode {
        Mode::Confirm => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Confirm(true))
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Confirm(false))
                }
                _ => None,
            };
        }
        Mode::AdminMenu(menu) => {
            return match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    menu.idx = menu.idx.saturating_sub(1);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    menu.idx = (menu.idx + 1).min(AdminActionKind::ALL.len() - 1);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let idx = menu.idx;
                    let kind = AdminActionKind::ALL[idx];
                    if kind.needs_input() {
                        state.mode = Mode::AdminInput(AdminInputState {
                            idx,
                            buffer: String::new(),
                        });
                        Some(UserEvent::Redraw)
                    } else {
                        state.mode = Mode::Normal;
                        Some(UserEvent::AdminSubmit {
                            kind,
                            input: String::new(),
                        })
                    }
                }
                _ => None,
            };
        }
        Mode::AdminInput(input) => {
            return match k.code {
                KeyCode::Esc => {
                    let idx = input.idx;
                    state.mode = Mode::AdminMenu(AdminMenuState { idx });
                    Some(UserEvent::Redraw)
                }
                KeyCode::Backspace => {
                    input.buffer.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if !c.is_control() => {
                    input.buffer.push(c);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let kind = AdminActionKind::ALL[input.idx];
                    let text = std::mem::take(&mut input.buffer);
                    state.mode = Mode::Normal;
                    Some(UserEvent::AdminSubmit { kind, input: text })
                }
                _ => None,
            };
        }
        Mode::Profile(form) => {
            return match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Tab | KeyCode::BackTab => {
                    form.field = match form.field {
                        ProfileField::Destination => ProfileField::Amount,
                        ProfileField::Amount => ProfileField::Destination,
                    };
                    Some(UserEvent::Redraw)
                }
                KeyCode::Backspace => {
                    form.active().pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if !c.is_control() => {
                    form.active().push(c);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let to = std::mem::take(&mut form.destination);
                    let amount = std::mem::take(&mut form.amount);
                    state.mode = Mode::Normal;
                    Some(UserEvent::Transfer { to, amount })
                }
                _ => None,
            };
        }
        Mode::QuitModal => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }

    let global = match k.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Tab => {
            state.view = state.view.next();
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('r') => Some(UserEvent::Refresh),
        KeyCode::Char('L') => Some(UserEvent::ToggleLanguage),
        KeyCode::Char('o') => Some(UserEvent::Logout),
        KeyCode::Char('A') => Some(UserEvent::OpenAdmin),
        KeyCode::Char('w') => Some(UserEvent::Withdraw),
        KeyCode::Char('p') => {
            state.mode = Mode::Profile(ProfileState::default());
            Some(UserEvent::Redraw)
        }
        _ => None,
    };
    if global.is_some() {
        return global;
    }

    match state.view {
        View::Game => match k.code {
            KeyCode::Up | KeyCode::Char('k') => Some(UserEvent::Cursor(CursorMove::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(UserEvent::Cursor(CursorMove::Down)),
            KeyCode::Left | KeyCode::Char('h') => Some(UserEvent::Cursor(CursorMove::Left)),
            KeyCode::Right | KeyCode::Char('l') => Some(UserEvent::Cursor(CursorMove::Right)),
            KeyCode::Char(' ') => Some(UserEvent::ToggleNumber),
            KeyCode::Char('a') => Some(UserEvent::ToggleAnimal),
            KeyCode::Char('c') => Some(UserEvent::ClearSlip),
            KeyCode::Enter => Some(UserEvent::PlaceBet),
            _ => None,
        },
        View::History => match k.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.history_offset = state.history_offset.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.history_offset += 1;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        View::Leaderboard | View::Rules => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, view: &AppView<'_>) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // round + account
            Constraint::Min(18),   // active view
            Constraint::Length(4), // status + help
        ])
        .split(f.area());

    draw_header(f, chunks[0], view);
    match (&view.snapshot.page_error, view.snapshot.public.is_some()) {
        _ if state.view == View::Rules => draw_rules(f, chunks[1], view),
        (Some(error), false) => draw_page_error(f, chunks[1], error, view.language),
        (None, false) => {
            let loading = Paragraph::new(tr(view.language, Text::Loading))
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(loading, chunks[1]);
        }
        _ => match state.view {
            View::Game => draw_game(f, chunks[1], view),
            View::History => draw_history(f, chunks[1], state, view),
            View::Leaderboard => draw_leaderboard(f, chunks[1], view),
            View::Rules => draw_rules(f, chunks[1], view),
        },
    }
    draw_bottom(f, chunks[2], state, view);
    draw_notifications(f, chunks[1], view);
    draw_modals(f, state, view);
}

fn draw_header(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let lang = view.language;
    let mut lines = Vec::new();
    match view.snapshot.status() {
        Some(status) => {
            let (label, color) = if status.paused {
                (tr(lang, Text::Paused), Color::Red)
            } else if status.draw_in_progress {
                (tr(lang, Text::DrawInProgress), Color::Magenta)
            } else {
                (tr(lang, Text::Open), Color::Green)
            };
            lines.push(Line::from(vec![
                Span::raw(format!(
                    "{} #{} | {}: {} | {}: {} | {}: {} | ",
                    tr(lang, Text::Round),
                    status.round_id,
                    tr(lang, Text::Pot),
                    format_mon(status.current_pot),
                    tr(lang, Text::BonusPot),
                    format_mon(status.bonus_pot),
                    tr(lang, Text::BetPrice),
                    format_mon(status.bet_price),
                )),
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            ]));
            let numbers = tr(lang, Text::Numbers).to_lowercase();
            let animals = tr(lang, Text::Animals).to_lowercase();
            lines.push(Line::from(format!(
                "{} {}% {numbers} / {}% {animals} | {}: {} {numbers}, {} {animals}",
                tr(lang, Text::Payout),
                status.number_percentage,
                status.animal_percentage,
                tr(lang, Text::MaxPerRound),
                cap_label(status.max_number_bets),
                cap_label(status.max_animal_bets)
            )));
        }
        None => lines.push(Line::styled(
            tr(lang, Text::Loading),
            Style::default().fg(Color::DarkGray),
        )),
    }

    match (view.account, view.snapshot.player.as_ref()) {
        (Some(address), Some(player)) => {
            let mut spans = vec![Span::raw(format!(
                "{} ({}) | {}: {}",
                short_address(&address),
                view.provider.as_deref().unwrap_or(tr(lang, Text::Wallet)),
                tr(lang, Text::Balance),
                format_mon(player.balance),
            ))];
            if !player.pending_withdrawal.is_zero() {
                spans.push(Span::styled(
                    format!(
                        " | {}: {} {}",
                        tr(lang, Text::PendingPrize),
                        format_mon(player.pending_withdrawal),
                        tr(lang, Text::Withdraw)
                    ),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ));
            }
            if player.is_admin {
                spans.push(Span::styled(
                    format!(" | {}", tr(lang, Text::Admin)),
                    Style::default().fg(Color::Cyan),
                ));
            }
            lines.push(Line::from(spans));
        }
        (Some(address), None) => lines.push(Line::from(format!(
            "{} ({})",
            short_address(&address),
            view.provider.as_deref().unwrap_or(tr(lang, Text::Wallet))
        ))),
        (None, _) => lines.push(Line::styled(
            tr(lang, Text::ReadOnly),
            Style::default().fg(Color::DarkGray),
        )),
    }

    let title = format!("{} [{}]", tr(lang, Text::Title), lang.code());
    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_page_error(f: &mut Frame, area: Rect, error: &str, lang: Language) {
    let widget = Paragraph::new(vec![
        Line::from(error.to_string()),
        Line::from(""),
        Line::from(tr(lang, Text::RetryHint)),
    ])
    .wrap(Wrap { trim: false })
    .style(Style::default().fg(Color::Red))
    .block(Block::default().borders(Borders::ALL).title(tr(lang, Text::ErrorTitle)));
    f.render_widget(widget, area);
}

fn draw_game(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    draw_grid(f, columns[0], view);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(4),
            Constraint::Length(7),
        ])
        .split(columns[1]);
    draw_selection(f, side[0], view);
    draw_my_bets(f, side[1], view);
    draw_last_draw(f, side[2], view);
}

fn draw_grid(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let name_width = ANIMALS
        .iter()
        .map(|name| UnicodeWidthStr::width(*name))
        .max()
        .unwrap_or(0);
    let placed = view.snapshot.player.as_ref().map(|player| &player.bets);
    let last_winner = view
        .snapshot
        .last_draw()
        .map(|draw| draw.record.winning_number);
    let cursor_row = usize::from(view.cursor / NUMBERS_PER_ANIMAL);

    let mut lines = Vec::with_capacity(ANIMALS.len());
    for (row, name) in ANIMALS.iter().enumerate() {
        let animal_selected = view.slip.has_animal(row);
        let animal_placed = placed.is_some_and(|bets| bets.animals.iter().any(|a| a.as_str() == *name));
        let mut name_style = Style::default();
        if animal_placed {
            name_style = name_style.fg(Color::Cyan);
        }
        if animal_selected {
            name_style = name_style.fg(Color::Green).add_modifier(Modifier::BOLD);
        }
        if row == cursor_row {
            name_style = name_style.add_modifier(Modifier::UNDERLINED);
        }
        let padding = " ".repeat(name_width.saturating_sub(UnicodeWidthStr::width(*name)) + 1);
        let mut spans = vec![
            Span::styled(if animal_selected { "*" } else { " " }, name_style),
            Span::styled(name.to_string(), name_style),
            Span::raw(padding),
        ];

        let first = row as u8 * NUMBERS_PER_ANIMAL;
        for number in first..first + NUMBERS_PER_ANIMAL {
            let mut style = Style::default();
            if placed.is_some_and(|bets| bets.numbers.contains(&number)) {
                style = style.fg(Color::Cyan);
            }
            if last_winner == Some(number) {
                style = style.fg(Color::Magenta);
            }
            if view.slip.has_number(number) {
                style = style.fg(Color::Black).bg(Color::Green);
            }
            if number == view.cursor {
                style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{number:02}"), style));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    let title = format!(
        "{} / {} (00-95)",
        tr(view.language, Text::Numbers),
        tr(view.language, Text::Animals)
    );
    let grid = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(grid, area);
}

fn draw_selection(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let lang = view.language;
    let slip = view.slip;
    let mut lines = Vec::new();
    if slip.is_empty() {
        lines.push(Line::styled("-", Style::default().fg(Color::DarkGray)));
    } else {
        let numbers: Vec<String> = slip.numbers().iter().map(|n| format!("{n:02}")).collect();
        lines.push(Line::from(format!(
            "{}: {}",
            tr(lang, Text::Numbers),
            numbers.join(" ")
        )));
        lines.push(Line::from(format!(
            "{}: {}",
            tr(lang, Text::Animals),
            slip.animal_names().join(", ")
        )));
    }
    if let Some(status) = view.snapshot.status() {
        let cost = slip
            .cost(status.bet_price)
            .map(format_mon)
            .unwrap_or_else(|| tr(lang, Text::Overflow).to_string());
        lines.push(Line::from(format!(
            "{}: {} ({} x {})",
            tr(lang, Text::Cost),
            cost,
            slip.count(),
            format_mon(status.bet_price)
        )));
        if let Some(player) = view.snapshot.player.as_ref() {
            lines.push(Line::from(format!(
                "{}: {}/{} {}, {}/{} {}",
                tr(lang, Text::RoundUse),
                player.numbers_this_round + slip.number_count(),
                cap_label(status.max_number_bets),
                tr(lang, Text::Numbers).to_lowercase(),
                player.animals_this_round + slip.animal_count(),
                cap_label(status.max_animal_bets),
                tr(lang, Text::Animals).to_lowercase()
            )));
        }
    }
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(tr(lang, Text::Selection)));
    f.render_widget(widget, area);
}

fn cap_label(max: u64) -> String {
    if max == 0 {
        "-".to_string()
    } else {
        max.to_string()
    }
}

fn draw_my_bets(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let lang = view.language;
    let mut lines = Vec::new();
    match view.snapshot.player.as_ref() {
        None => lines.push(Line::styled(
            tr(lang, Text::ReadOnly),
            Style::default().fg(Color::DarkGray),
        )),
        Some(player) if player.bets.is_empty() => {
            lines.push(Line::from(tr(lang, Text::NoBets)));
        }
        Some(player) => {
            if !player.bets.numbers.is_empty() {
                let numbers: Vec<String> =
                    player.bets.numbers.iter().map(|n| format!("{n:02}")).collect();
                lines.push(Line::from(format!(
                    "{}: {}",
                    tr(lang, Text::Numbers),
                    numbers.join(" ")
                )));
            }
            if !player.bets.animals.is_empty() {
                lines.push(Line::from(format!(
                    "{}: {}",
                    tr(lang, Text::Animals),
                    player.bets.animals.join(", ")
                )));
            }
        }
    }
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(tr(lang, Text::MyBets)));
    f.render_widget(widget, area);
}

fn draw_last_draw(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let lang = view.language;
    let lines = match view.snapshot.last_draw() {
        Some(draw) => draw_summary(draw, lang),
        None => vec![Line::from(tr(lang, Text::NoDraws))],
    };
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(tr(lang, Text::LastDraw)));
    f.render_widget(widget, area);
}

fn audit_span(draw: &DrawView, lang: Language) -> Span<'static> {
    if draw.audit.verified() {
        Span::styled(
            format!("[{}]", tr(lang, Text::Verified)),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled(
            format!(
                "[{}: {} {:02} {}]",
                tr(lang, Text::Mismatch),
                tr(lang, Text::Computed),
                draw.audit.computed_number,
                draw.audit.computed_animal.unwrap_or("?")
            ),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    }
}

fn draw_summary(draw: &DrawView, lang: Language) -> Vec<Line<'static>> {
    let record = &draw.record;
    let when = DateTime::from_timestamp(record.timestamp as i64, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| record.timestamp.to_string());
    vec![
        Line::from(vec![
            Span::styled(
                format!("#{} {:02} {} ", record.id, record.winning_number, record.winning_animal),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            audit_span(draw, lang),
        ]),
        Line::from(format!("{when} | {}: {}", tr(lang, Text::Pot), format_mon(record.total_pot))),
        Line::from(format!(
            "{}: {} {}, {} {}",
            tr(lang, Text::Winners),
            record.number_winners.len(),
            tr(lang, Text::ByNumber),
            record.animal_winners.len(),
            tr(lang, Text::ByAnimal)
        )),
        Line::styled(
            format!("{} {:?}", tr(lang, Text::OracleValue), record.random_value),
            Style::default().fg(Color::DarkGray),
        ),
    ]
}

fn draw_history(f: &mut Frame, area: Rect, state: &UiState, view: &AppView<'_>) {
    let lang = view.language;
    let mut lines = Vec::new();
    if view.snapshot.history.is_empty() {
        lines.push(Line::from(tr(lang, Text::NoDraws)));
    }
    for draw in view.snapshot.history.iter().skip(state.history_offset) {
        lines.extend(draw_summary(draw, lang));
        for bet in &draw.record.bets {
            let mut items: Vec<String> = bet.numbers.iter().map(|n| format!("{n:02}")).collect();
            items.extend(bet.animals.iter().cloned());
            lines.push(Line::from(format!(
                "  {} {}",
                short_address(&bet.player),
                items.join(" ")
            )));
        }
        lines.push(Line::from(""));
    }
    let title = format!(
        "{} ({}/{})",
        tr(lang, Text::History),
        (state.history_offset + 1).min(view.snapshot.history.len()),
        view.snapshot.history.len()
    );
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_leaderboard(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let lang = view.language;
    let mut lines = Vec::new();
    match view.snapshot.leaderboard.as_ref() {
        Some(board) if !board.rows.is_empty() => {
            lines.push(Line::styled(
                format!(
                    "{:>3}  {:<24} {:>8} {:>14}",
                    "#",
                    tr(lang, Text::Player),
                    tr(lang, Text::Transactions),
                    tr(lang, Text::Score)
                ),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            for (rank, row) in board.rows.iter().enumerate() {
                let mine = view.account == Some(row.address);
                let style = if mine {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::styled(
                    format!(
                        "{:>3}  {:<24} {:>8} {:>14}",
                        rank + 1,
                        row.name,
                        row.transactions,
                        row.score
                    ),
                    style,
                ));
            }
            if board.source == LeaderboardSource::Chain {
                lines.push(Line::from(""));
                lines.push(Line::styled(
                    tr(lang, Text::ChainFallback),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        _ => lines.push(Line::from(tr(lang, Text::NoLeaderboard))),
    }
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(tr(lang, Text::Leaderboard)));
    f.render_widget(widget, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, state: &UiState, view: &AppView<'_>) {
    let lang = view.language;
    let status = match view.pending {
        Some(pending) => Line::styled(
            format!(
                "{} {} ({}s)",
                tr(lang, Text::Waiting),
                pending.intent.describe(),
                pending.started.elapsed().as_secs()
            ),
            Style::default().fg(Color::Yellow),
        ),
        None => Line::styled(view.status.to_string(), Style::default().fg(Color::Green)),
    };
    let mut help = match state.view {
        View::Game => tr(lang, Text::HelpGame).to_string(),
        View::History | View::Leaderboard | View::Rules => {
            tr(lang, Text::HelpHistory).to_string()
        }
    };
    if view.snapshot.is_admin() {
        help.push_str("  ");
        help.push_str(tr(lang, Text::AdminHint));
    }
    let widget = Paragraph::new(vec![status, Line::from(help)])
        .block(Block::default().borders(Borders::ALL).title(tr(lang, Text::StatusTitle)));
    f.render_widget(widget, area);
}

fn draw_notifications(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let items: Vec<_> = view.notifications.active().collect();
    if items.is_empty() {
        return;
    }
    let width = (area.width / 2).max(30).min(area.width);
    let height = (items.len() as u16 + 2).min(area.height);
    let rect = Rect::new(area.x + area.width - width, area.y, width, height);
    let lines: Vec<Line> = items
        .iter()
        .map(|item| {
            let color = match item.severity {
                Severity::Info => Color::White,
                Severity::Success => Color::Green,
                Severity::Error => Color::Red,
                Severity::Bet => Color::Magenta,
            };
            Line::styled(item.message.clone(), Style::default().fg(color))
        })
        .collect();
    f.render_widget(Clear, rect);
    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, rect);
}

fn draw_modals(f: &mut Frame, state: &UiState, view: &AppView<'_>) {
    let lang = view.language;
    match &state.mode {
        Mode::Normal => {}
        Mode::Confirm => {
            let Some(intent) = view.confirmation else {
                return;
            };
            let area = centered_rect(60, 30, f.area());
            let prompt = match intent {
                TxIntent::Bet(_) => tr(lang, Text::ConfirmBet),
                _ => tr(lang, Text::ConfirmTx),
            };
            let mut lines = vec![Line::from(prompt), Line::from(""), Line::from(intent.describe())];
            if intent.is_destructive() {
                lines.push(Line::styled(
                    tr(lang, Text::DestructiveWarning),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "{}   {}",
                tr(lang, Text::Yes),
                tr(lang, Text::No)
            )));
            let block = Block::default()
                .borders(Borders::ALL)
                .title(tr(lang, Text::ConfirmTitle));
            let p = Paragraph::new(lines).wrap(Wrap { trim: true });
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::AdminMenu(menu) => {
            let area = centered_rect(50, 60, f.area());
            let block = Block::default().borders(Borders::ALL).title(tr(lang, Text::Admin));
            let mut lines: Vec<Line> = AdminActionKind::ALL
                .iter()
                .enumerate()
                .map(|(i, kind)| {
                    if i == menu.idx {
                        Line::styled(
                            format!("> {}", kind.label()),
                            Style::default()
                                .fg(Color::Yellow)
                                .add_modifier(Modifier::BOLD),
                        )
                    } else {
                        Line::from(format!("  {}", kind.label()))
                    }
                })
                .collect();
            lines.push(Line::from(""));
            lines.push(Line::from(tr(lang, Text::MenuHint)));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::AdminInput(input) => {
            let area = centered_rect(50, 25, f.area());
            let kind = AdminActionKind::ALL[input.idx];
            let block = Block::default().borders(Borders::ALL).title(kind.label());
            let p = Paragraph::new(vec![
                Line::from(format!("> {}_", input.buffer)),
                Line::from(""),
                Line::from(tr(lang, Text::InputHint)),
            ]);
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Profile(form) => draw_profile(f, form, view),
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title(tr(lang, Text::QuitTitle));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(tr(lang, Text::QuitPrompt)), block.inner(area));
        }
    }
}

fn draw_profile(f: &mut Frame, form: &ProfileState, view: &AppView<'_>) {
    let lang = view.language;
    let area = centered_rect(70, 50, f.area());
    let block = Block::default().borders(Borders::ALL).title(tr(lang, Text::Profile));
    let mut lines = Vec::new();
    match view.account {
        None => lines.push(Line::styled(
            tr(lang, Text::ReadOnly),
            Style::default().fg(Color::DarkGray),
        )),
        Some(address) => {
            lines.push(Line::from(format!("{}:", tr(lang, Text::DepositAddress))));
            lines.push(Line::styled(
                format_address(&address),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
            if let Some(player) = view.snapshot.player.as_ref() {
                lines.push(Line::from(format!(
                    "{}: {}",
                    tr(lang, Text::Balance),
                    format_mon(player.balance)
                )));
            }
            lines.push(Line::from(tr(lang, Text::DepositHint)));
            lines.push(Line::from(""));
            lines.push(Line::styled(
                tr(lang, Text::SendMon),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            let field = |label: Text, value: &str, active: bool| {
                let style = if active {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                let cursor = if active { "_" } else { "" };
                Line::styled(format!("{}: {value}{cursor}", tr(lang, label)), style)
            };
            lines.push(field(
                Text::Destination,
                &form.destination,
                form.field == ProfileField::Destination,
            ));
            lines.push(field(
                Text::Amount,
                &form.amount,
                form.field == ProfileField::Amount,
            ));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(tr(lang, Text::ProfileHint)));
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), block.inner(area));
}

/// Static rules text plus the number range of every animal.
fn rules_lines(lang: Language) -> Vec<String> {
    let mut lines: Vec<String> = [
        Text::RulesBetting,
        Text::RulesDraw,
        Text::RulesFormula,
        Text::RulesVerify,
        Text::RulesPrizes,
    ]
    .iter()
    .map(|text| tr(lang, *text).to_string())
    .collect();
    lines.push(String::new());
    lines.push(format!("{}:", tr(lang, Text::RulesAnimals)));
    let ranges: Vec<String> = ANIMALS
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let first = idx as u8 * NUMBERS_PER_ANIMAL;
            format!("{name} {first:02}-{:02}", first + NUMBERS_PER_ANIMAL - 1)
        })
        .collect();
    lines.extend(ranges.chunks(4).map(|row| row.join("  ")));
    lines
}

fn draw_rules(f: &mut Frame, area: Rect, view: &AppView<'_>) {
    let lang = view.language;
    let mut lines: Vec<Line> = rules_lines(lang).into_iter().map(Line::from).collect();
    if let Some(status) = view.snapshot.status() {
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "{} {}% {} / {}% {}",
            tr(lang, Text::Payout),
            status.number_percentage,
            tr(lang, Text::Numbers).to_lowercase(),
            status.animal_percentage,
            tr(lang, Text::Animals).to_lowercase()
        )));
    }
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(tr(lang, Text::HowItWorks)));
    f.render_widget(widget, area);
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

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crossterm::event::{
        KeyEvent,
        KeyModifiers,
    };

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn interpret_event__quit_needs_confirmation() {
        let mut state = UiState::default();
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('q'))),
            Some(UserEvent::Redraw)
        );
        assert_eq!(state.mode, Mode::QuitModal);
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('y'))),
            Some(UserEvent::Quit)
        );
    }

    #[test]
    fn interpret_event__admin_input_collects_text() {
        // given
        let mut state = UiState::default();
        state.open_admin_menu();
        interpret_event(&mut state, key(KeyCode::Enter));

        // when
        for c in "0.05".chars() {
            interpret_event(&mut state, key(KeyCode::Char(c)));
        }
        let event = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(
            event,
            Some(UserEvent::AdminSubmit {
                kind: AdminActionKind::SetBetPrice,
                input: "0.05".to_string()
            })
        );
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__declining_confirmation_is_reported() {
        let mut state = UiState::default();
        state.open_confirm();
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Esc)),
            Some(UserEvent::Confirm(false))
        );
    }

    #[test]
    fn interpret_event__grid_keys_only_apply_to_game_view() {
        let mut state = UiState::default();
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char(' '))),
            Some(UserEvent::ToggleNumber)
        );
        interpret_event(&mut state, key(KeyCode::Tab));
        assert_eq!(state.view(), View::History);
        assert_eq!(interpret_event(&mut state, key(KeyCode::Char(' '))), None);
    }

    #[test]
    fn interpret_event__profile_form_submits_transfer() {
        // given
        let mut state = UiState::default();
        interpret_event(&mut state, key(KeyCode::Char('p')));

        // when
        for c in "0x22".chars() {
            interpret_event(&mut state, key(KeyCode::Char(c)));
        }
        interpret_event(&mut state, key(KeyCode::Tab));
        for c in "0.5".chars() {
            interpret_event(&mut state, key(KeyCode::Char(c)));
        }
        let event = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(
            event,
            Some(UserEvent::Transfer {
                to: "0x22".to_string(),
                amount: "0.5".to_string()
            })
        );
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__profile_typing_does_not_trigger_shortcuts() {
        let mut state = UiState::default();
        interpret_event(&mut state, key(KeyCode::Char('p')));
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('q'))),
            Some(UserEvent::Redraw)
        );
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Esc)),
            Some(UserEvent::Redraw)
        );
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__tab_reaches_rules_and_wraps_to_game() {
        let mut state = UiState::default();
        for _ in 0..3 {
            interpret_event(&mut state, key(KeyCode::Tab));
        }
        assert_eq!(state.view(), View::Rules);
        interpret_event(&mut state, key(KeyCode::Tab));
        assert_eq!(state.view(), View::Game);
    }

    #[test]
    fn rules_lines__lists_formula_and_every_animal_range() {
        let lines = rules_lines(Language::En).join("\n");
        assert!(lines.contains("oracle value % 96"));
        assert!(lines.contains("Monlandak 00-05"));
        assert!(lines.contains("MonCoringa 90-95"));
        assert!(rules_lines(Language::Pt).join("\n").contains("valor do oraculo % 96"));
    }
}
