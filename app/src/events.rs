use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEventKind, MouseEventKind};
use futures::StreamExt;
use std::time::Duration;
use tokio::time;
use tui_textarea::{Input, Key};

/// What the chat screen reacts to.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Editing input for the draft box.
    Edit(Input),
    Paste(String),
    Submit,
    ToggleVoice,
    CopyLatest,
    Export,
    Dismiss,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Quit,
    /// Nothing happened for a while, or the terminal was resized.
    Tick,
}

// `tui_textarea::Input` (0.2) implements neither `PartialEq` nor does `Key`,
// so compare the edit payload through its derived `Debug` form.
impl PartialEq for UiEvent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (UiEvent::Edit(a), UiEvent::Edit(b)) => format!("{a:?}") == format!("{b:?}"),
            (UiEvent::Paste(a), UiEvent::Paste(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

/// Key bindings. Alt+Enter falls through to the draft as a newline.
pub fn map_key(input: Input) -> UiEvent {
    match input {
        Input {
            key: Key::Char('c' | 'q'),
            ctrl: true,
            ..
        } => UiEvent::Quit,
        Input {
            key: Key::Enter,
            alt: false,
            ..
        } => UiEvent::Submit,
        Input {
            key: Key::Char('r'),
            ctrl: true,
            ..
        } => UiEvent::ToggleVoice,
        Input {
            key: Key::Char('y'),
            ctrl: true,
            ..
        } => UiEvent::CopyLatest,
        Input {
            key: Key::Char('e'),
            ctrl: true,
            ..
        } => UiEvent::Export,
        Input { key: Key::Esc, .. } => UiEvent::Dismiss,
        Input { key: Key::Up, .. }
        | Input {
            key: Key::MouseScrollUp,
            ..
        } => UiEvent::ScrollUp,
        Input { key: Key::Down, .. }
        | Input {
            key: Key::MouseScrollDown,
            ..
        } => UiEvent::ScrollDown,
        Input {
            key: Key::PageUp, ..
        }
        | Input {
            key: Key::Char('u'),
            ctrl: true,
            ..
        } => UiEvent::PageUp,
        Input {
            key: Key::PageDown, ..
        }
        | Input {
            key: Key::Char('d'),
            ctrl: true,
            ..
        } => UiEvent::PageDown,
        input => UiEvent::Edit(input),
    }
}

/// Merges terminal input with a periodic tick so voice results and the
/// copy acknowledgement show up without a keypress.
pub struct EventsService {
    crossterm_events: EventStream,
    tick: Duration,
}

impl EventsService {
    pub fn new(tick: Duration) -> Self {
        Self {
            crossterm_events: EventStream::new(),
            tick,
        }
    }

    fn handle_crossterm(event: CrosstermEvent) -> Option<UiEvent> {
        match event {
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                Some(map_key(key.into()))
            }
            CrosstermEvent::Paste(text) => Some(UiEvent::Paste(text)),
            CrosstermEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => Some(UiEvent::ScrollUp),
                MouseEventKind::ScrollDown => Some(UiEvent::ScrollDown),
                _ => None,
            },
            CrosstermEvent::Resize(..) => Some(UiEvent::Tick),
            _ => None,
        }
    }

    pub async fn next(&mut self) -> Result<UiEvent> {
        loop {
            let event = tokio::select! {
                event = self.crossterm_events.next() => match event {
                    Some(Ok(event)) => Self::handle_crossterm(event),
                    Some(Err(err)) => return Err(err.into()),
                    None => Some(UiEvent::Quit),
                },
                _ = time::sleep(self.tick) => Some(UiEvent::Tick),
            };
            if let Some(event) = event {
                return Ok(event);
            }
        }
    }
}
