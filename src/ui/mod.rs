use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::{macros::format_description, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, Screen};
use crate::app::validation::{Field, ValidationErrors};
use crate::app::Focus;
use crate::highlight::build_highlight_regex;

/// Per-frame view settings that live outside [`AppState`].
#[derive(Debug, Clone, Copy)]
pub struct ViewContext {
    pub focus: Focus,
    pub preview_lines: usize,
}

const MAX_TITLE_WIDTH: usize = 60;

pub fn draw_app(
    frame: &mut Frame,
    state: &AppState,
    view: &ViewContext,
    list_state: &mut ListState,
) {
    match state.screen() {
        Screen::Auth => draw_auth(frame, state, view),
        Screen::Notes => draw_notes(frame, state, view, list_state),
    }
    if state.pending_delete().is_some() {
        draw_confirm_delete(frame, state);
    }
}

fn draw_auth(frame: &mut Frame, state: &AppState, view: &ViewContext) {
    let area = centered_rect(60, 70, frame.size());
    let signup = state.auth_mode.is_signup();
    let heading = if signup { "Create Account" } else { "Welcome Back" };

    let mut lines = vec![
        Line::from(Span::styled(
            heading,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(general) = state.errors.general() {
        lines.push(error_line(general));
        lines.push(Line::from(""));
    }
    if signup {
        push_input(&mut lines, state, view, Field::Name, "Full Name");
    }
    push_input(&mut lines, state, view, Field::Email, "Email Address");
    push_input(&mut lines, state, view, Field::Password, "Password");

    let button = if state.is_loading() {
        "[ … ]"
    } else if signup {
        "[ Sign Up ]"
    } else {
        "[ Login ]"
    };
    lines.push(Line::from(Span::styled(
        button,
        Style::default()
            .fg(Color::Black)
            .bg(if state.is_loading() { Color::Gray } else { Color::Cyan })
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    let toggle = if signup {
        "Already have an account? Ctrl-t: Login"
    } else {
        "Don't have an account? Ctrl-t: Sign Up"
    };
    lines.push(Line::from(Span::styled(
        toggle,
        Style::default().fg(Color::Gray),
    )));
    lines.push(Line::from(Span::styled(
        "Tab next field • Enter submit • Esc quit",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title("Notes")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_notes(
    frame: &mut Frame,
    state: &AppState,
    view: &ViewContext,
    list_state: &mut ListState,
) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.size());

    draw_header(frame, state, view, vertical[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(vertical[1]);
    draw_note_form(frame, state, view, columns[0]);
    draw_note_list(frame, state, view, columns[1], list_state);

    let status = Paragraph::new(build_status_line(state))
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, vertical[2]);
}

fn draw_header(frame: &mut Frame, state: &AppState, view: &ViewContext, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let name = state.session().map(|s| s.name.as_str()).unwrap_or_default();
    let avatar = name
        .graphemes(true)
        .next()
        .map(str::to_uppercase)
        .unwrap_or_else(|| "?".to_string());
    let greeting = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!(" {avatar} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(
                format!("Hello, {name}!"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!("You have {}", pluralize(state.notes.len(), "note")),
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(greeting, columns[0]);

    let search_style = focus_style(view.focus == Focus::Search);
    let search_text = if state.search_term.is_empty() && view.focus != Focus::Search {
        Line::from(Span::styled(
            "Search notes... (/)",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(format!(
            "{}{}",
            state.search_term,
            cursor(view.focus == Focus::Search)
        ))
    };
    let hint = Line::from(Span::styled(
        "Ctrl-l logout • Ctrl-r refresh",
        Style::default().fg(Color::DarkGray),
    ));
    let search = Paragraph::new(vec![search_text, hint]).block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(search_style),
    );
    frame.render_widget(search, columns[1]);
}

fn draw_note_form(frame: &mut Frame, state: &AppState, view: &ViewContext, area: Rect) {
    let editing = state.is_editing();
    let mut lines = Vec::new();
    if let Some(general) = state.errors.general() {
        lines.push(error_line(general));
        lines.push(Line::from(""));
    }
    push_input(&mut lines, state, view, Field::Title, "Note Title");
    push_input(&mut lines, state, view, Field::Content, "Note Content");

    let mut buttons = Vec::new();
    let label = if state.is_loading() {
        "[ … ]"
    } else if editing {
        "[ Update Note: Ctrl-s ]"
    } else {
        "[ Add Note: Ctrl-s ]"
    };
    buttons.push(Span::styled(
        label,
        Style::default()
            .fg(Color::Black)
            .bg(if state.is_loading() { Color::Gray } else { Color::Cyan })
            .add_modifier(Modifier::BOLD),
    ));
    if editing {
        buttons.push(Span::raw(" "));
        buttons.push(Span::styled(
            "[ Cancel: Esc ]",
            Style::default().fg(Color::Gray),
        ));
    }
    lines.push(Line::from(buttons));

    // the edit target can vanish from the list after a refresh
    let title = match (editing, state.editing_note()) {
        (true, Some(note)) => format!("Edit Note · {}", truncate_to_width(&note.title, 30)),
        (true, None) => "Edit Note".to_string(),
        (false, _) => "Create New Note".to_string(),
    };
    let focused = matches!(view.focus, Focus::Title | Focus::Content);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(focused)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_note_list(
    frame: &mut Frame,
    state: &AppState,
    view: &ViewContext,
    area: Rect,
    list_state: &mut ListState,
) {
    let visible = state.visible_notes();
    let block = Block::default()
        .title(format!("Your Notes · {} found", pluralize(visible.len(), "note")))
        .borders(Borders::ALL)
        .border_style(focus_style(view.focus == Focus::Notes));

    if state.is_loading() {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Loading your notes...",
                Style::default().fg(Color::Cyan),
            )),
        ])
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    if visible.is_empty() {
        let hint = if state.search_term.is_empty() {
            "Create your first note to get started"
        } else {
            "Try a different search term"
        };
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No notes found",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
        ])
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let highlight_regex = build_highlight_regex(&state.search_term);
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let editing_id = state.editing_id();

    let items: Vec<ListItem> = visible
        .iter()
        .map(|note| {
            let mut title_spans = Vec::new();
            if editing_id == Some(note.id.as_str()) {
                title_spans.push(Span::styled(
                    "✎ ",
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            title_spans.extend(highlight_line(
                &truncate_to_width(&note.title, MAX_TITLE_WIDTH),
                highlight_regex.as_ref(),
                highlight_style,
                Style::default().add_modifier(Modifier::BOLD),
            ));
            let mut lines = vec![Line::from(title_spans)];
            for line in note.content.lines().take(view.preview_lines) {
                lines.push(Line::from(highlight_line(
                    line,
                    highlight_regex.as_ref(),
                    highlight_style,
                    Style::default(),
                )));
            }
            let date = note
                .updated_at
                .as_deref()
                .map(format_note_date)
                .unwrap_or_default();
            lines.push(Line::from(Span::styled(
                date,
                Style::default().fg(Color::Gray),
            )));
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_confirm_delete(frame: &mut Frame, state: &AppState) {
    let Some(note) = state.pending_delete() else {
        return;
    };
    let area = centered_rect(60, 30, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            "Are you sure you want to delete this note?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(truncate_to_width(&note.title, MAX_TITLE_WIDTH)),
        Line::from(""),
        Line::from(Span::styled(
            "y/Enter to delete • n/Esc to cancel",
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(
        Block::default()
            .title("Delete Note")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn build_status_line(state: &AppState) -> Text<'static> {
    if let Some(message) = &state.status_message {
        return Text::from(message.clone());
    }
    if state.is_loading() {
        return Text::from("Working…");
    }
    Text::from(Span::styled(
        "Tab switch pane • j/k move • e edit • d delete • n new • / search • q quit",
        Style::default().fg(Color::Gray),
    ))
}

fn push_input(
    lines: &mut Vec<Line<'static>>,
    state: &AppState,
    view: &ViewContext,
    field: Field,
    label: &'static str,
) {
    let focused = view.focus.field() == Some(field);
    let marker = if focused { "▸ " } else { "  " };
    lines.push(Line::from(Span::styled(
        format!("{marker}{label}"),
        focus_style(focused).add_modifier(Modifier::BOLD),
    )));
    let raw = state.form.value(field);
    let shown = if field == Field::Password {
        "•".repeat(raw.chars().count())
    } else {
        raw.to_string()
    };
    let input_style = if state.errors.contains(field) {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let mut value_lines: Vec<&str> = shown.split('\n').collect();
    if value_lines.is_empty() {
        value_lines.push("");
    }
    let last = value_lines.len() - 1;
    for (idx, line) in value_lines.iter().enumerate() {
        let text = if idx == last {
            format!("  {line}{}", cursor(focused))
        } else {
            format!("  {line}")
        };
        lines.push(Line::from(Span::styled(text, input_style)));
    }
    if let Some(message) = field_error(&state.errors, field) {
        lines.push(error_line(message));
    }
    lines.push(Line::from(""));
}

fn field_error(errors: &ValidationErrors, field: Field) -> Option<&str> {
    errors.get(field).filter(|message| !message.is_empty())
}

fn error_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::Red),
    ))
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn cursor(focused: bool) -> &'static str {
    if focused {
        "▏"
    } else {
        ""
    }
}

pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// `2024-03-05T10:00:00.000Z` → `Mar 5, 2024`; unparseable input is shown as-is.
pub fn format_note_date(raw: &str) -> String {
    let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) else {
        return raw.to_string();
    };
    parsed
        .format(format_description!(
            "[month repr:short] [day padding:none], [year]"
        ))
        .unwrap_or_else(|_| raw.to_string())
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if width + w + 1 > max_width {
            break;
        }
        out.push_str(grapheme);
        width += w;
    }
    out.push('…');
    out
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    if let Some(re) = regex {
        let mut spans = Vec::new();
        let mut last = 0;
        for mat in re.find_iter(text) {
            if mat.start() > last {
                spans.push(Span::styled(
                    text[last..mat.start()].to_string(),
                    base_style,
                ));
            }
            spans.push(Span::styled(mat.as_str().to_string(), highlight_style));
            last = mat.end();
        }
        if last < text.len() {
            spans.push(Span::styled(text[last..].to_string(), base_style));
        }
        if spans.is_empty() {
            spans.push(Span::styled(text.to_string(), base_style));
        }
        spans
    } else {
        vec![Span::styled(text.to_string(), base_style)]
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Note;
    use crate::app::state::Outcome;
    use crate::app::testing::{auth, note};
    use crate::app::validation::Field;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(state: &AppState, focus: Focus) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).expect("test terminal");
        let mut list_state = ListState::default();
        let view = ViewContext {
            focus,
            preview_lines: 2,
        };
        terminal
            .draw(|frame| draw_app(frame, state, &view, &mut list_state))
            .expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn auth_screen_shows_mode_and_errors() {
        let mut state = AppState::new();
        state.set_field(Field::Email, "bad");
        state.submit_auth();
        let screen = render(&state, Focus::Email);
        assert!(screen.contains("Welcome Back"));
        assert!(screen.contains("Email is invalid"));
        assert!(screen.contains("Password is required"));
        assert!(!screen.contains("Full Name"));

        state.toggle_auth_mode();
        let screen = render(&state, Focus::Name);
        assert!(screen.contains("Create Account"));
        assert!(screen.contains("Full Name"));
    }

    fn signed_in(notes: Option<Vec<Note>>) -> AppState {
        let mut state = AppState::new();
        state.apply(Outcome::Authenticated(Ok(auth("t1", "u1", "Ann"))));
        if let Some(notes) = notes {
            state.apply(Outcome::NotesLoaded {
                token: "t1".into(),
                result: Ok(notes),
            });
        }
        state
    }

    #[test]
    fn loading_state_shows_busy_indicators() {
        let state = signed_in(None);
        assert!(state.is_loading());
        let screen = render(&state, Focus::Notes);
        assert!(screen.contains("Loading your notes..."));
        assert!(screen.contains("[ … ]"));
        assert!(!screen.contains("Add Note"));

        let state = signed_in(Some(vec![note("n1", "Groceries", "milk")]));
        let screen = render(&state, Focus::Notes);
        assert!(!screen.contains("Loading your notes..."));
        assert!(screen.contains("Groceries"));
        assert!(screen.contains("Add Note"));
        assert!(screen.contains("Hello, Ann!"));
    }

    #[test]
    fn empty_list_hints_at_next_step() {
        let mut state = signed_in(Some(Vec::new()));
        assert!(render(&state, Focus::Notes).contains("Create your first note to get started"));
        state.set_search("zzz");
        assert!(render(&state, Focus::Notes).contains("Try a different search term"));
    }

    #[test]
    fn edit_panel_stays_in_edit_mode_when_target_leaves_list() {
        let mut state = signed_in(Some(vec![note("n1", "Groceries", "milk")]));
        assert!(state.begin_edit("n1"));
        assert!(render(&state, Focus::Title).contains("Edit Note · Groceries"));

        state.load_notes();
        state.apply(Outcome::NotesLoaded {
            token: "t1".into(),
            result: Ok(Vec::new()),
        });
        let screen = render(&state, Focus::Title);
        assert!(state.is_editing());
        assert!(screen.contains("Edit Note"));
        assert!(screen.contains("Update Note"));
        assert!(!screen.contains("Create New Note"));
    }

    #[test]
    fn delete_overlay_names_the_note() {
        let mut state = signed_in(Some(vec![note("n1", "Groceries", "milk")]));
        state.request_delete("n1");
        let screen = render(&state, Focus::Notes);
        assert!(screen.contains("Are you sure you want to delete this note?"));
        assert!(screen.contains("y/Enter to delete"));
    }

    #[test]
    fn password_is_masked() {
        let mut state = AppState::new();
        state.set_field(Field::Password, "secret1");
        let screen = render(&state, Focus::Email);
        assert!(!screen.contains("secret1"));
        assert!(screen.contains("•••••••"));
    }

    #[test]
    fn pluralizes_counts() {
        assert_eq!(pluralize(0, "note"), "0 notes");
        assert_eq!(pluralize(1, "note"), "1 note");
        assert_eq!(pluralize(2, "note"), "2 notes");
    }

    #[test]
    fn formats_server_timestamps_as_short_dates() {
        assert_eq!(format_note_date("2024-03-05T10:00:00.000Z"), "Mar 5, 2024");
        assert_eq!(format_note_date("2023-12-31T23:59:59Z"), "Dec 31, 2023");
        assert_eq!(format_note_date("yesterday"), "yesterday");
    }

    #[test]
    fn truncates_wide_titles_on_grapheme_boundaries() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        assert_eq!(truncate_to_width("日本語のノート", 7), "日本語…");
    }

    #[test]
    fn highlight_splits_matching_segments() {
        let regex = build_highlight_regex("note");
        let spans = highlight_line(
            "Notes and notebooks",
            regex.as_ref(),
            Style::default().fg(Color::Yellow),
            Style::default(),
        );
        let parts: Vec<_> = spans.iter().map(|span| span.content.to_string()).collect();
        assert_eq!(parts, vec!["Note", "s and ", "note", "books"]);
    }
}
