use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::api::{AuthClient, NoteClient};
use crate::config::AppConfig;
use crate::session::SessionStore;
use crate::ui;

mod actions;
pub mod controller;
pub mod state;
pub mod validation;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::ActionDispatcher;
pub use controller::{AuthFields, Controller};
pub use state::{AppState, Effect, FormState, Outcome, Request, Screen};
pub use validation::{AuthMode, Field, ValidationErrors};
pub use worker::RequestWorker;

/// Which input receives keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Name,
    Email,
    Password,
    Title,
    Content,
    Notes,
    Search,
}

impl Focus {
    pub fn field(self) -> Option<Field> {
        match self {
            Focus::Name => Some(Field::Name),
            Focus::Email => Some(Field::Email),
            Focus::Password => Some(Field::Password),
            Focus::Title => Some(Field::Title),
            Focus::Content => Some(Field::Content),
            Focus::Notes | Focus::Search => None,
        }
    }

    fn cycle(self, state: &AppState, forward: bool) -> Focus {
        let order: &[Focus] = match state.screen() {
            Screen::Auth if state.auth_mode.is_signup() => {
                &[Focus::Name, Focus::Email, Focus::Password]
            }
            Screen::Auth => &[Focus::Email, Focus::Password],
            Screen::Notes => &[Focus::Title, Focus::Content, Focus::Notes, Focus::Search],
        };
        let Some(pos) = order.iter().position(|f| *f == self) else {
            return order[0];
        };
        let next = if forward {
            (pos + 1) % order.len()
        } else {
            (pos + order.len() - 1) % order.len()
        };
        order[next]
    }

    fn belongs_to(self, screen: Screen) -> bool {
        match self {
            Focus::Name | Focus::Email | Focus::Password => screen == Screen::Auth,
            Focus::Title | Focus::Content | Focus::Notes | Focus::Search => {
                screen == Screen::Notes
            }
        }
    }
}

pub struct App {
    pub config: Arc<AppConfig>,
    store: SessionStore,
    state: AppState,
    worker: RequestWorker,
    focus: Focus,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new<C>(config: Arc<AppConfig>, store: SessionStore, client: C) -> Result<Self>
    where
        C: AuthClient + NoteClient + Send + 'static,
    {
        let worker = RequestWorker::spawn(client).context("starting request worker")?;
        let tick_rate = config.ui.tick_rate();
        Ok(Self {
            config,
            store,
            state: AppState::new(),
            worker,
            focus: Focus::Email,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::error!(?err, "failed to read stored session");
                None
            }
        };
        let effects = self.state.restore_session(stored);
        self.run_effects(effects);
        self.sync_focus();

        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    if self.state.visible_notes().is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.state.selected));
                    }
                    let view = ui::ViewContext {
                        focus: self.focus,
                        preview_lines: self.config.ui.preview_lines as usize,
                    };
                    ui::draw_app(frame, &self.state, &view, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {
                        // no-op: next draw will naturally adapt to the new size
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        for outcome in self.worker.drain() {
            let effects = self.state.apply(outcome);
            self.run_effects(effects);
        }
        self.sync_focus();
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(request) => {
                    if let Err(err) = self.worker.submit(request) {
                        tracing::error!(?err, "failed to queue request");
                        self.state.set_status_message(Some(
                            "Request could not be queued; restart the client",
                        ));
                    }
                }
                Effect::Persist(session) => {
                    if let Err(err) = self.store.save(&session) {
                        tracing::error!(?err, "failed to persist session");
                        self.state.set_status_message(Some(
                            "Signed in, but the session could not be saved for next time",
                        ));
                    }
                }
                Effect::ClearSession => {
                    if let Err(err) = self.store.clear() {
                        tracing::error!(?err, "failed to clear stored session");
                        self.state.set_status_message(Some(
                            "Logged out, but the saved session could not be removed",
                        ));
                    }
                }
            }
        }
    }

    fn sync_focus(&mut self) {
        let screen = self.state.screen();
        let valid = self.focus.belongs_to(screen)
            && !(self.focus == Focus::Name && !self.state.auth_mode.is_signup());
        if !valid {
            self.focus = match screen {
                Screen::Auth => Focus::Email,
                Screen::Notes => Focus::Title,
            };
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.state.set_status_message(None::<String>);
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.state.pending_delete().is_some() {
            self.handle_confirm_key(key);
            return;
        }
        match self.state.screen() {
            Screen::Auth => self.handle_auth_key(key),
            Screen::Notes => self.handle_notes_key(key),
        }
        self.sync_focus();
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let answer = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        let effects = self.state.resolve_delete(answer);
        if !answer {
            self.state.set_status_message(Some("Delete canceled"));
        }
        self.run_effects(effects);
    }

    fn handle_auth_key(&mut self, key: KeyEvent) {
        let plain = !key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SUPER);
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('t') {
                self.state.toggle_auth_mode();
            }
            return;
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.cycle(&self.state, true),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.cycle(&self.state, false),
            KeyCode::Enter => {
                if self.state.is_loading() {
                    return;
                }
                let effects = self.state.submit_auth();
                self.run_effects(effects);
            }
            KeyCode::Backspace => {
                if let Some(field) = self.focus.field() {
                    self.state.pop_char(field);
                }
            }
            KeyCode::Char(ch) if plain => {
                if let Some(field) = self.focus.field() {
                    self.state.push_char(field, ch);
                }
            }
            _ => {}
        }
    }

    fn handle_notes_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => self.submit_note(),
                KeyCode::Char('l') => {
                    let effects = self.state.logout();
                    self.run_effects(effects);
                }
                KeyCode::Char('r') => {
                    if !self.state.is_loading() {
                        let effects = self.state.load_notes().into_iter().collect();
                        self.run_effects(effects);
                    }
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.cycle(&self.state, true);
                return;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.cycle(&self.state, false);
                return;
            }
            KeyCode::Esc => {
                if self.state.is_editing() {
                    self.state.cancel_edit();
                    self.state.set_status_message(Some("Edit canceled"));
                } else if self.focus == Focus::Search {
                    self.focus = Focus::Notes;
                }
                return;
            }
            _ => {}
        }
        let plain = !key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SUPER);
        match self.focus {
            Focus::Title | Focus::Content => {
                let Some(field) = self.focus.field() else {
                    return;
                };
                match key.code {
                    KeyCode::Enter if self.focus == Focus::Title => self.focus = Focus::Content,
                    KeyCode::Enter => self.state.push_char(field, '\n'),
                    KeyCode::Backspace => self.state.pop_char(field),
                    KeyCode::Char(ch) if plain => self.state.push_char(field, ch),
                    _ => {}
                }
            }
            Focus::Search => match key.code {
                KeyCode::Enter | KeyCode::Down => self.focus = Focus::Notes,
                KeyCode::Backspace => self.state.pop_search_char(),
                KeyCode::Char(ch) if plain => self.state.push_search_char(ch),
                _ => {}
            },
            Focus::Notes => match key.code {
                KeyCode::Char('j') | KeyCode::Down => self.state.move_selection(1),
                KeyCode::Char('k') | KeyCode::Up => self.state.move_selection(-1),
                KeyCode::Char('e') | KeyCode::Enter => self.handle_begin_edit(),
                KeyCode::Char('d') | KeyCode::Delete => self.handle_delete(),
                KeyCode::Char('n') => {
                    self.state.cancel_edit();
                    self.focus = Focus::Title;
                }
                KeyCode::Char('/') => self.focus = Focus::Search,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            Focus::Name | Focus::Email | Focus::Password => {}
        }
    }

    fn submit_note(&mut self) {
        if self.state.is_loading() {
            return;
        }
        let effects = self.state.submit_note();
        self.run_effects(effects);
    }

    fn handle_begin_edit(&mut self) {
        if self.state.is_loading() {
            return;
        }
        let Some(id) = self.state.selected_note().map(|note| note.id.clone()) else {
            self.state.set_status_message(Some("No note selected"));
            return;
        };
        if self.state.begin_edit(&id) {
            self.focus = Focus::Title;
            self.state
                .set_status_message(Some("Editing note: Ctrl-s update • Esc cancel"));
        }
    }

    fn handle_delete(&mut self) {
        if self.state.is_loading() {
            return;
        }
        let Some(id) = self.state.selected_note().map(|note| note.id.clone()) else {
            self.state.set_status_message(Some("No note selected"));
            return;
        };
        self.state.request_delete(&id);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
