use crate::events::{EventsService, UiEvent};
use crate::shell::{ChatShell, Flow, ShellCommand};
use crate::ui::{self, Screen};
use anyhow::Result;
use crossterm::cursor;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use parley_core::TranscriptController;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::time;
use tui_textarea::{CursorMove, Input, TextArea};

const TICK: Duration = Duration::from_millis(250);
const REDRAW: Duration = Duration::from_millis(100);
const PAGE: u16 = 10;

/// Screen state that is not part of the transcript: the draft box,
/// the notice pane and the scroll position.
pub struct ChatView {
    title: String,
    show_templates: bool,
    placeholder: &'static str,
    input: TextArea<'static>,
    notice: Vec<String>,
    scroll_back: u16,
}

fn draft_input(draft: &str, placeholder: &str) -> TextArea<'static> {
    let mut input = TextArea::new(draft.split('\n').map(str::to_string).collect());
    input.set_block(ui::input_block(placeholder));
    input.move_cursor(CursorMove::Bottom);
    input.move_cursor(CursorMove::End);
    input
}

impl ChatView {
    pub fn new(shell: &ChatShell) -> Self {
        let chat = shell.controller();
        Self {
            title: shell.title(),
            show_templates: shell.settings().show_templates_on_start,
            placeholder: chat.placeholder(),
            input: draft_input(&chat.draft(), chat.placeholder()),
            notice: Vec::new(),
            scroll_back: 0,
        }
    }

    pub fn input_text(&self) -> String {
        self.input.lines().join("\n")
    }

    pub fn notice(&self) -> &[String] {
        &self.notice
    }

    pub fn scroll_back(&self) -> u16 {
        self.scroll_back
    }

    pub fn edit(&mut self, input: Input, chat: &TranscriptController) {
        if self.input.input(input) {
            chat.set_draft(self.input_text());
        }
    }

    pub fn paste(&mut self, text: &str, chat: &TranscriptController) {
        self.input.insert_str(text);
        chat.set_draft(self.input_text());
    }

    /// Turn the draft box into a command. Slash lines are commands and
    /// leave the draft empty; anything else is sent as the draft.
    pub fn submit(&mut self, chat: &TranscriptController) -> Option<ShellCommand> {
        let text = self.input_text();
        if text.trim().is_empty() {
            return None;
        }
        self.notice.clear();
        self.scroll_back = 0;
        if text.trim_start().starts_with('/') {
            chat.set_draft("");
            self.input = draft_input("", self.placeholder);
            return ShellCommand::parse(&text);
        }
        chat.set_draft(text);
        Some(ShellCommand::Send)
    }

    /// Pick up draft changes made by the controller: rollback, templates,
    /// dictation.
    pub fn sync_draft(&mut self, chat: &TranscriptController) {
        let draft = chat.draft();
        if draft != self.input_text() {
            self.input = draft_input(&draft, self.placeholder);
        }
    }

    pub fn show(&mut self, notice: Vec<String>) {
        if !notice.is_empty() {
            self.notice = notice;
        }
    }

    pub fn dismiss(&mut self) {
        self.notice.clear();
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(rows);
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, chat: &TranscriptController) {
        let messages = chat.messages();
        let error = chat.error();
        let screen = Screen {
            title: &self.title,
            messages: &messages,
            copied: chat.copied_message(),
            sending: chat.is_sending(),
            listening: chat.is_listening(),
            show_templates: self.show_templates,
            error: error.as_deref(),
            notice: &self.notice,
            scroll_back: self.scroll_back,
        };
        ui::draw(frame, &screen, &self.input);
    }
}

/// Leave the alternate screen even when the process panics.
pub fn restore_terminal_on_panic() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableBracketedPaste,
            DisableMouseCapture,
            cursor::Show
        );
        previous(info);
    }));
}

fn enter() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        EnterAlternateScreen,
        EnableBracketedPaste,
        EnableMouseCapture
    )?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the full-screen chat until the user quits, logs out or the session
/// expires.
pub async fn run(shell: &mut ChatShell) -> Result<Flow> {
    let mut terminal = enter()?;
    let flow = event_loop(&mut terminal, shell).await;
    leave(&mut terminal)?;
    flow
}

async fn event_loop<B: Backend>(terminal: &mut Terminal<B>, shell: &mut ChatShell) -> Result<Flow> {
    let chat = shell.controller().clone();
    let mut view = ChatView::new(shell);
    let mut events = EventsService::new(TICK);

    loop {
        view.sync_draft(&chat);
        terminal.draw(|frame| view.draw(frame, &chat))?;

        let command = match events.next().await? {
            UiEvent::Quit => return Ok(Flow::Quit),
            UiEvent::Tick => {
                chat.poll_voice();
                None
            }
            UiEvent::Edit(input) => {
                view.edit(input, &chat);
                None
            }
            UiEvent::Paste(text) => {
                view.paste(&text, &chat);
                None
            }
            UiEvent::Submit => view.submit(&chat),
            UiEvent::ToggleVoice => Some(ShellCommand::Voice),
            UiEvent::CopyLatest => Some(ShellCommand::Copy(1)),
            UiEvent::Export => Some(ShellCommand::Export(None)),
            UiEvent::Dismiss => {
                view.dismiss();
                Some(ShellCommand::Dismiss)
            }
            UiEvent::ScrollUp => {
                view.scroll_up(1);
                None
            }
            UiEvent::ScrollDown => {
                view.scroll_down(1);
                None
            }
            UiEvent::PageUp => {
                view.scroll_up(PAGE);
                None
            }
            UiEvent::PageDown => {
                view.scroll_down(PAGE);
                None
            }
        };

        if let Some(command) = command {
            let flow = run_command(terminal, shell, &mut view, command).await?;
            if flow != Flow::Continue {
                return Ok(flow);
            }
        }
    }
}

/// Execute one command, redrawing while it runs so the pending message
/// and the sending state stay visible.
async fn run_command<B: Backend>(
    terminal: &mut Terminal<B>,
    shell: &mut ChatShell,
    view: &mut ChatView,
    command: ShellCommand,
) -> Result<Flow> {
    let chat = shell.controller().clone();
    let mut redraw = time::interval(REDRAW);
    let running = shell.execute(command);
    tokio::pin!(running);

    let (flow, notice) = loop {
        tokio::select! {
            outcome = &mut running => break outcome,
            _ = redraw.tick() => {
                terminal.draw(|frame| view.draw(frame, &chat))?;
            }
        }
    };
    view.show(notice);
    Ok(flow)
}
