use chrono::{DateTime, Local, Utc};
use parley_core::state::{Message, Sender};
use parley_core::templates::PROMPT_TEMPLATES;
use parley_core::User;
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Padding, Paragraph, Wrap};
use std::fmt::Write;
use tui_textarea::TextArea;
use uuid::Uuid;

pub fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::Assistant => "AI",
    }
}

fn sender_style(sender: Sender) -> Style {
    let color = match sender {
        Sender::User => Color::Cyan,
        Sender::Assistant => Color::Green,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    let local: DateTime<Local> = DateTime::from(time);
    local.format("%H:%M:%S").to_string()
}

/// One transcript entry; `copied` marks the message with a fresh copy ack.
pub fn message_lines(message: &Message, copied: Option<Uuid>) -> Vec<Line<'static>> {
    let mut header = vec![
        Span::styled(sender_label(message.sender), sender_style(message.sender)),
        Span::styled(
            format!("  {}", format_timestamp(message.created_at)),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if copied == Some(message.id) {
        header.push(Span::styled("  (copied)", Style::default().fg(Color::Yellow)));
    }

    let mut lines = vec![Line::from(header)];
    lines.extend(
        message
            .content
            .lines()
            .map(|line| Line::from(format!("  {line}"))),
    );
    lines.push(Line::default());
    lines
}

fn template_lines() -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        "Quick Start Templates",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.extend(
        PROMPT_TEMPLATES
            .iter()
            .enumerate()
            .map(|(index, template)| Line::from(format!("  {}. {}", index + 1, template))),
    );
    lines.push(Line::from(Span::styled(
        "Type /template <n> to use one.",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

pub fn render_welcome(user: &User) -> String {
    format!("AI Assistant | Welcome back, {} [{}]", user.full_name, user.initials())
}

pub fn render_templates() -> String {
    let mut out = String::from("Quick Start Templates");
    for (index, template) in PROMPT_TEMPLATES.iter().enumerate() {
        let _ = write!(out, "\n  {}. {}", index + 1, template);
    }
    out
}

pub fn render_profile(user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Full name:  {}", user.full_name);
    let _ = writeln!(out, "Email:      {}", user.email);
    if let Some(last_login) = user.last_login_display() {
        let _ = writeln!(out, "Last login: {last_login}");
    }
    if let Some(avatar) = &user.avatar {
        let _ = writeln!(out, "Avatar:     {avatar}");
    }
    out.trim_end().to_string()
}

pub const HELP: &str = "\
Commands:
  /templates        list quick-start prompts
  /template <n>     put prompt <n> into the draft
  /send             send the current draft
  /copy [n]         copy the n-th most recent AI reply (default 1)
  /export [dir]     save the transcript as JSON
  /voice            start or stop voice input
  /dismiss          clear the current error
  /profile          show your account
  /logout           sign out
  /quit             leave
Keys: Enter send, Alt+Enter newline, Ctrl+R voice, Ctrl+Y copy,
Ctrl+E export, Esc dismiss, Up/Down scroll, Ctrl+C quit.";

const KEY_HINTS: &str = "Enter send | /help | Ctrl+R voice | Ctrl+C quit";

/// Everything the chat screen shows, borrowed for one frame.
pub struct Screen<'a> {
    pub title: &'a str,
    pub messages: &'a [Message],
    pub copied: Option<Uuid>,
    pub sending: bool,
    pub listening: bool,
    pub show_templates: bool,
    pub error: Option<&'a str>,
    pub notice: &'a [String],
    /// Lines scrolled back from the newest message.
    pub scroll_back: u16,
}

pub fn transcript_lines(screen: &Screen) -> Vec<Line<'static>> {
    if screen.messages.is_empty() {
        return if screen.show_templates {
            template_lines()
        } else {
            Vec::new()
        };
    }
    let mut lines: Vec<Line<'static>> = screen
        .messages
        .iter()
        .flat_map(|message| message_lines(message, screen.copied))
        .collect();
    if screen.sending {
        lines.push(Line::from(Span::styled(
            "AI is typing...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

/// Rows the lines take once wrapped to `width`.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn status_line(screen: &Screen) -> Line<'static> {
    let status = if let Some(error) = screen.error {
        Span::styled(
            format!("{error} (Esc to dismiss)"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if screen.sending {
        Span::styled("Sending...", Style::default().fg(Color::Yellow))
    } else if screen.listening {
        Span::styled("Listening...", Style::default().fg(Color::Magenta))
    } else {
        Span::styled(KEY_HINTS, Style::default().fg(Color::DarkGray))
    };
    Line::from(status)
}

pub fn input_block(placeholder: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .title(placeholder.to_string())
        .padding(Padding::new(1, 1, 0, 0))
}

pub fn draw<B: Backend>(frame: &mut Frame<B>, screen: &Screen, input: &TextArea) {
    let notice_height = screen
        .notice
        .iter()
        .map(|entry| entry.lines().count())
        .sum::<usize>();
    let notice_height = u16::try_from(notice_height).unwrap_or(u16::MAX);
    let notice_height = if notice_height == 0 {
        0
    } else {
        notice_height.saturating_add(2)
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Min(1),
            Constraint::Max(notice_height),
            Constraint::Length(1),
            Constraint::Max(4),
        ])
        .split(frame.size());

    let transcript_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(screen.title.to_string())
        .padding(Padding::new(1, 1, 0, 0));
    let inner = transcript_block.inner(layout[0]);
    let lines = transcript_lines(screen);
    let bottom = wrapped_height(&lines, inner.width).saturating_sub(inner.height);
    let offset = bottom.saturating_sub(screen.scroll_back);
    frame.render_widget(
        Paragraph::new(lines)
            .block(transcript_block)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0)),
        layout[0],
    );

    if notice_height > 0 {
        frame.render_widget(
            Paragraph::new(screen.notice.join("\n"))
                .block(Block::default().borders(Borders::ALL).title("Esc to close"))
                .wrap(Wrap { trim: false }),
            layout[1],
        );
    }

    frame.render_widget(Paragraph::new(status_line(screen)), layout[2]);

    if screen.sending {
        frame.render_widget(
            Paragraph::new("Sending...")
                .block(input_block(""))
                .alignment(Alignment::Center),
            layout[3],
        );
    } else {
        frame.render_widget(input.widget(), layout[3]);
    }
}
