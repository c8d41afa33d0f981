use std::fmt::Write as _;
use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use clap::Args;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::api::{AuthClient, Note, NoteClient, NoteDraft};
use crate::app::{App, AppState, AuthFields, AuthMode, Controller};
use crate::session::SessionStore;
use crate::ui::{format_note_date, pluralize};

const PREVIEW_LINES: usize = 2;

#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Display name (signup only; prompted if omitted)
    #[arg(long)]
    pub name: Option<String>,
    /// Account email (prompted if omitted)
    #[arg(long)]
    pub email: Option<String>,
    /// Account password (prompted if omitted)
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only show notes whose title or content contains this text
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    /// Title for the note (prompted if omitted)
    #[arg(long)]
    pub title: Option<String>,
    /// Provide the note body inline. If omitted, reads from stdin.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Note identifier as shown by `list`
    pub id: String,
    /// New title (keeps the current one if omitted)
    #[arg(long)]
    pub title: Option<String>,
    /// New content (keeps the current one if omitted)
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeleteArgs {
    /// Note identifier as shown by `list`
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn login<C>(client: C, store: SessionStore, args: AuthArgs) -> Result<()>
where
    C: AuthClient + NoteClient,
{
    authenticate(client, store, AuthMode::Login, args, &mut io::stdout())
}

pub fn signup<C>(client: C, store: SessionStore, args: AuthArgs) -> Result<()>
where
    C: AuthClient + NoteClient,
{
    authenticate(client, store, AuthMode::Signup, args, &mut io::stdout())
}

pub fn logout<C>(client: C, store: SessionStore) -> Result<()>
where
    C: AuthClient + NoteClient,
{
    let mut ctl = Controller::new(client, store);
    ctl.logout()?;
    println!("Logged out.");
    Ok(())
}

pub fn whoami(store: &SessionStore) -> Result<()> {
    match store.load()? {
        Some(session) => println!("{} ({})", session.name, session.user_id),
        None => println!("Not logged in."),
    }
    Ok(())
}

pub fn list_notes<C>(client: C, store: SessionStore, args: ListArgs) -> Result<()>
where
    C: AuthClient + NoteClient,
{
    let ctl = resume(client, store)?;
    let term = args.search.unwrap_or_default();
    print!("{}", format_note_list(&ctl.search(&term), !term.is_empty()));
    Ok(())
}

pub fn new_note<C>(client: C, store: SessionStore, args: NewArgs) -> Result<()>
where
    C: AuthClient + NoteClient,
{
    let title = match args.title {
        Some(title) => title,
        None => prompt("Title")?,
    };
    let content = match args.content {
        Some(content) => content,
        None => match read_stdin()? {
            Some(content) => content,
            None => prompt("Content")?,
        },
    };
    let mut ctl = resume(client, store)?;
    create(&mut ctl, NoteDraft { title, content }, &mut io::stdout())
}

pub fn edit_note<C>(client: C, store: SessionStore, args: EditArgs) -> Result<()>
where
    C: AuthClient + NoteClient,
{
    let mut ctl = resume(client, store)?;
    update(&mut ctl, args, &mut io::stdout())
}

pub fn delete_note<C>(client: C, store: SessionStore, args: DeleteArgs) -> Result<()>
where
    C: AuthClient + NoteClient,
{
    let mut ctl = resume(client, store)?;
    let yes = args.yes;
    remove(
        &mut ctl,
        &args.id,
        |note| yes || confirm_delete(note),
        &mut io::stdout(),
    )
}

fn authenticate<C, W>(
    client: C,
    store: SessionStore,
    mode: AuthMode,
    args: AuthArgs,
    out: &mut W,
) -> Result<()>
where
    C: AuthClient + NoteClient,
    W: Write,
{
    let name = match (mode, args.name) {
        (AuthMode::Signup, None) => prompt("Full name")?,
        (_, name) => name.unwrap_or_default(),
    };
    let email = match args.email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt_secret("Password")?,
    };

    let mut ctl = Controller::new(client, store);
    ctl.submit_auth(
        mode,
        AuthFields {
            name,
            email,
            password,
        },
    )?;
    ensure_no_errors(ctl.state())?;
    let Some(session) = ctl.state().session() else {
        bail!("{mode} did not return a session");
    };
    writeln!(out, "Logged in as {}.", session.name)?;
    if let Some(err) = ctl.fetch_error() {
        tracing::warn!(%err, "notes could not be loaded after {mode}");
    } else {
        writeln!(out, "You have {}.", pluralize(ctl.state().notes.len(), "note"))?;
    }
    Ok(())
}

fn create<C, W>(ctl: &mut Controller<C>, draft: NoteDraft, out: &mut W) -> Result<()>
where
    C: AuthClient + NoteClient,
    W: Write,
{
    ctl.submit_note(draft, None)?;
    ensure_no_errors(ctl.state())?;
    if let Some(note) = ctl.state().notes.first() {
        writeln!(out, "Created note {}.", note.id)?;
    }
    Ok(())
}

fn update<C, W>(ctl: &mut Controller<C>, args: EditArgs, out: &mut W) -> Result<()>
where
    C: AuthClient + NoteClient,
    W: Write,
{
    if args.title.is_none() && args.content.is_none() {
        bail!("nothing to change; pass --title and/or --content");
    }
    let Some(current) = ctl.state().notes.iter().find(|note| note.id == args.id) else {
        bail!("no note with id {}", args.id);
    };
    let draft = NoteDraft {
        title: args.title.unwrap_or_else(|| current.title.clone()),
        content: args.content.unwrap_or_else(|| current.content.clone()),
    };
    ctl.submit_note(draft, Some(&args.id))?;
    ensure_no_errors(ctl.state())?;
    writeln!(out, "Updated note {}.", args.id)?;
    Ok(())
}

fn remove<C, F, W>(ctl: &mut Controller<C>, id: &str, confirm: F, out: &mut W) -> Result<()>
where
    C: AuthClient + NoteClient,
    F: FnOnce(&Note) -> bool,
    W: Write,
{
    if !ctl.delete_note(id, confirm)? {
        writeln!(out, "Cancelled.")?;
        return Ok(());
    }
    ensure_no_errors(ctl.state())?;
    writeln!(out, "Deleted note {id}.")?;
    Ok(())
}

/// Adopts the saved session and loads its notes, failing when either is missing.
fn resume<C>(client: C, store: SessionStore) -> Result<Controller<C>>
where
    C: AuthClient + NoteClient,
{
    let mut ctl = Controller::new(client, store);
    ctl.restore_session()?;
    if !ctl.state().is_authenticated() {
        bail!("not logged in; run `notes-remote login` first");
    }
    if let Some(err) = ctl.fetch_error() {
        bail!("could not load notes: {}", err.user_message());
    }
    Ok(ctl)
}

fn ensure_no_errors(state: &AppState) -> Result<()> {
    if state.errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<&str> = state.errors.iter().map(|(_, message)| message).collect();
    bail!("{}", messages.join("; "))
}

fn format_note_list(notes: &[&Note], searching: bool) -> String {
    if notes.is_empty() {
        return if searching {
            "No notes found. Try a different search term.\n".to_string()
        } else {
            "No notes found. Create your first note to get started.\n".to_string()
        };
    }
    let mut out = String::new();
    let _ = writeln!(&mut out, "{} found", pluralize(notes.len(), "note"));
    for note in notes {
        out.push('\n');
        let _ = writeln!(&mut out, "{}  {}", note.id, note.title);
        if let Some(updated) = note.updated_at.as_deref() {
            let _ = writeln!(&mut out, "    updated {}", format_note_date(updated));
        }
        for line in note
            .content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(PREVIEW_LINES)
        {
            let _ = writeln!(&mut out, "    {line}");
        }
    }
    out
}

fn confirm_delete(note: &Note) -> bool {
    match prompt(&format!("Delete \"{}\"? [y/N]", note.title)) {
        Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(err) => {
            tracing::warn!(?err, "could not read confirmation");
            false
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

/// Reads a line without echoing it when stdin is a terminal.
fn prompt_secret(label: &str) -> Result<String> {
    if !atty::is(atty::Stream::Stdin) {
        return prompt(label);
    }
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    terminal::enable_raw_mode().context("enabling raw mode for password entry")?;
    let secret = collect_secret(std::iter::repeat_with(event::read));
    terminal::disable_raw_mode().context("restoring terminal after password entry")?;
    writeln!(stdout)?;
    secret
}

fn collect_secret<I>(events: I) -> Result<String>
where
    I: IntoIterator<Item = io::Result<Event>>,
{
    let mut secret = String::new();
    for event in events {
        let Event::Key(key) = event.context("reading password input")? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Esc => bail!("password entry cancelled"),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("password entry cancelled")
            }
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char(ch) => secret.push(ch),
            _ => {}
        }
    }
    bail!("input closed before the password was entered")
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::app::testing::{auth, note, FakeClient};
    use crate::session::Session;
    use crossterm::event::KeyEvent;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn store_in(temp: &TempDir) -> SessionStore {
        SessionStore::new(temp.path().join("session.json"))
    }

    fn saved_session(temp: &TempDir) -> TestResult<SessionStore> {
        let store = store_in(temp);
        store.save(&Session {
            user_id: "u1".into(),
            name: "Ann".into(),
            token: "t1".into(),
        })?;
        Ok(store)
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn cli_login_persists_session_and_reports_count() -> TestResult {
        let temp = TempDir::new()?;
        let client = FakeClient::new();
        client
            .push_auth(Ok(auth("t1", "u1", "Ann")))
            .push_list(Ok(vec![note("n1", "Groceries", "milk")]));
        let mut out = Vec::new();
        authenticate(
            client.clone(),
            store_in(&temp),
            AuthMode::Login,
            AuthArgs {
                name: None,
                email: Some("a@b.com".into()),
                password: Some("secret1".into()),
            },
            &mut out,
        )?;
        assert_eq!(output(out), "Logged in as Ann.\nYou have 1 note.\n");
        assert_eq!(store_in(&temp).load()?.map(|s| s.token), Some("t1".into()));
        Ok(())
    }

    #[test]
    fn cli_login_surfaces_validation_and_server_errors() -> TestResult {
        let temp = TempDir::new()?;
        let client = FakeClient::new();
        let err = authenticate(
            client.clone(),
            store_in(&temp),
            AuthMode::Signup,
            AuthArgs {
                name: Some("Bo".into()),
                email: Some("bo@example.com".into()),
                password: Some("abc".into()),
            },
            &mut Vec::new(),
        )
        .expect_err("short password");
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
        assert!(client.calls().is_empty());

        client.push_auth(Err(ApiError::Rejected {
            status: 400,
            message: Some("Invalid credentials".into()),
        }));
        let err = authenticate(
            client.clone(),
            store_in(&temp),
            AuthMode::Login,
            AuthArgs {
                name: None,
                email: Some("a@b.com".into()),
                password: Some("wrongpw".into()),
            },
            &mut Vec::new(),
        )
        .expect_err("rejected");
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(store_in(&temp).load()?, None);
        Ok(())
    }

    #[test]
    fn cli_commands_require_a_saved_session() -> TestResult {
        let temp = TempDir::new()?;
        let err = resume(FakeClient::new(), store_in(&temp))
            .err()
            .expect("no session");
        assert!(err.to_string().contains("not logged in"));
        Ok(())
    }

    #[test]
    fn cli_resume_reports_fetch_failures() -> TestResult {
        let temp = TempDir::new()?;
        let client = FakeClient::new();
        client.push_list(Err(ApiError::Transport("refused".into())));
        let err = resume(client, saved_session(&temp)?)
            .err()
            .expect("fetch failed");
        assert_eq!(err.to_string(), "could not load notes: Network error");
        Ok(())
    }

    #[test]
    fn cli_create_edit_delete_round() -> TestResult {
        let temp = TempDir::new()?;
        let client = FakeClient::new();
        client
            .push_list(Ok(vec![note("n1", "Groceries", "milk")]))
            .push_save(Ok(note("n2", "Meeting notes", "agenda")))
            .push_save(Ok(note("n1", "Groceries", "milk, eggs")));
        let mut ctl = resume(client.clone(), saved_session(&temp)?)?;
        let mut out = Vec::new();

        create(
            &mut ctl,
            NoteDraft {
                title: "Meeting notes".into(),
                content: "agenda".into(),
            },
            &mut out,
        )?;
        update(
            &mut ctl,
            EditArgs {
                id: "n1".into(),
                title: None,
                content: Some("milk, eggs".into()),
            },
            &mut out,
        )?;
        remove(&mut ctl, "n2", |_| false, &mut out)?;
        remove(&mut ctl, "n2", |_| true, &mut out)?;

        assert_eq!(
            output(out),
            "Created note n2.\nUpdated note n1.\nCancelled.\nDeleted note n2.\n"
        );
        assert_eq!(
            client.calls(),
            vec![
                "list Bearer t1",
                "create Bearer t1 Meeting notes",
                "update Bearer t1 n1 Groceries",
                "delete Bearer t1 n2",
            ]
        );
        Ok(())
    }

    #[test]
    fn cli_edit_needs_a_change_and_a_known_id() -> TestResult {
        let temp = TempDir::new()?;
        let client = FakeClient::new();
        client.push_list(Ok(vec![note("n1", "Groceries", "milk")]));
        let mut ctl = resume(client, saved_session(&temp)?)?;

        let err = update(
            &mut ctl,
            EditArgs {
                id: "n1".into(),
                ..EditArgs::default()
            },
            &mut Vec::new(),
        )
        .expect_err("no change");
        assert!(err.to_string().contains("nothing to change"));

        let err = update(
            &mut ctl,
            EditArgs {
                id: "zzz".into(),
                title: Some("x".into()),
                content: None,
            },
            &mut Vec::new(),
        )
        .expect_err("unknown id");
        assert_eq!(err.to_string(), "no note with id zzz");
        Ok(())
    }

    #[test]
    fn cli_create_rejects_blank_fields() -> TestResult {
        let temp = TempDir::new()?;
        let client = FakeClient::new();
        let mut ctl = resume(client.clone(), saved_session(&temp)?)?;
        let err = create(
            &mut ctl,
            NoteDraft {
                title: "  ".into(),
                content: String::new(),
            },
            &mut Vec::new(),
        )
        .expect_err("blank");
        assert_eq!(err.to_string(), "Title is required; Content is required");
        assert_eq!(client.calls(), vec!["list Bearer t1"]);
        Ok(())
    }

    fn key(code: KeyCode) -> io::Result<Event> {
        Ok(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    #[test]
    fn secret_input_is_collected_until_enter() -> TestResult {
        let events = vec![
            key(KeyCode::Char('p')),
            key(KeyCode::Char('a')),
            key(KeyCode::Char('z')),
            key(KeyCode::Backspace),
            Ok(Event::Key(KeyEvent::new_with_kind(
                KeyCode::Char('q'),
                KeyModifiers::NONE,
                KeyEventKind::Release,
            ))),
            Ok(Event::FocusGained),
            key(KeyCode::Char('s')),
            key(KeyCode::Char('s')),
            key(KeyCode::Enter),
            key(KeyCode::Char('x')),
        ];
        assert_eq!(collect_secret(events)?, "pass");
        Ok(())
    }

    #[test]
    fn secret_input_can_be_cancelled() {
        let ctrl_c = Ok(Event::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        let err = collect_secret(vec![key(KeyCode::Char('a')), ctrl_c]).expect_err("cancelled");
        assert_eq!(err.to_string(), "password entry cancelled");

        let err = collect_secret(vec![key(KeyCode::Esc)]).expect_err("cancelled");
        assert_eq!(err.to_string(), "password entry cancelled");

        let err = collect_secret(vec![key(KeyCode::Char('a'))]).expect_err("closed");
        assert!(err.to_string().contains("input closed"));
    }

    #[test]
    fn note_list_output() {
        let meeting = note("n2", "Meeting notes", "agenda\n\n  - budget\n  - hiring\n");
        let groceries = note("n1", "Groceries", "milk, eggs");
        let output = format_note_list(&[&meeting, &groceries], false);
        insta::assert_snapshot!(output, @r###"
        2 notes found

        n2  Meeting notes
            updated Mar 5, 2024
            agenda
            - budget

        n1  Groceries
            updated Mar 5, 2024
            milk, eggs
        "###);
    }

    #[test]
    fn empty_note_list_hints_depend_on_search() {
        assert_eq!(
            format_note_list(&[], true),
            "No notes found. Try a different search term.\n"
        );
        assert!(format_note_list(&[], false).contains("Create your first note"));
    }
}
