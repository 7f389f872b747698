use crate::support::Harness;
use parley::shell::Flow;
use parley::{ChatShell, ChatView, ShellCommand, ShellSettings};
use parley_core::TranscriptController;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use tui_textarea::{Input, Key};

fn type_text(view: &mut ChatView, chat: &TranscriptController, text: &str) {
    for c in text.chars() {
        view.edit(
            Input {
                key: Key::Char(c),
                ctrl: false,
                alt: false,
            },
            chat,
        );
    }
}

fn rendered(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    buffer
        .content
        .chunks(usize::from(buffer.area.width))
        .map(|row| row.iter().map(|cell| cell.symbol.as_str()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn typing_keeps_the_draft_in_step() {
    let harness = Harness::signed_in().await;
    let shell =
        ChatShell::new(harness.sessions.clone(), harness.controller(), ShellSettings::default());
    let chat = shell.controller().clone();
    let mut view = ChatView::new(&shell);

    assert_eq!(view.submit(&chat), None);

    type_text(&mut view, &chat, "hello");
    assert_eq!(chat.draft(), "hello");

    assert_eq!(view.submit(&chat), Some(ShellCommand::Send));
    assert_eq!(chat.draft(), "hello");
}

#[tokio::test]
async fn slash_lines_become_commands() {
    let harness = Harness::signed_in().await;
    let mut shell =
        ChatShell::new(harness.sessions.clone(), harness.controller(), ShellSettings::default());
    let chat = shell.controller().clone();
    let mut view = ChatView::new(&shell);

    type_text(&mut view, &chat, "/template 2");
    let command = view.submit(&chat);
    assert_eq!(command, Some(ShellCommand::Template(2)));
    assert_eq!(chat.draft(), "");
    assert_eq!(view.input_text(), "");

    let (flow, notice) = shell.execute(ShellCommand::Template(2)).await;
    assert_eq!(flow, Flow::Continue);
    view.show(notice);
    view.sync_draft(&chat);

    let template = parley_core::templates::template(2).expect("second template");
    assert_eq!(view.input_text(), template);
    assert_eq!(view.notice(), ["Template 2 is in the draft.".to_string()]);

    view.dismiss();
    assert!(view.notice().is_empty());
}

#[tokio::test]
async fn failed_send_puts_text_back_in_the_input() {
    let mut harness = Harness::signed_in().await;
    harness
        .server
        .mock("POST", "/api/chat/sessions")
        .with_status(500)
        .create_async()
        .await;
    let mut shell =
        ChatShell::new(harness.sessions.clone(), harness.controller(), ShellSettings::default());
    let chat = shell.controller().clone();
    let mut view = ChatView::new(&shell);

    type_text(&mut view, &chat, "keep me");
    let command = view.submit(&chat).expect("send command");
    shell.execute(command).await;
    view.sync_draft(&chat);

    assert_eq!(view.input_text(), "keep me");
    assert!(chat.messages().is_empty());
    assert_eq!(chat.error().as_deref(), Some("Failed to create chat session"));
}

#[tokio::test]
async fn screen_shows_conversation_and_error() {
    let mut harness = Harness::signed_in().await;
    harness
        .server
        .mock("POST", "/api/chat/sessions")
        .with_status(201)
        .with_body(r#"{"_id":"s-1"}"#)
        .create_async()
        .await;
    harness
        .server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(r#"{"reply":"pong"}"#)
        .create_async()
        .await;
    let mut shell =
        ChatShell::new(harness.sessions.clone(), harness.controller(), ShellSettings::default());
    let chat = shell.controller().clone();
    let mut view = ChatView::new(&shell);
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

    terminal.draw(|frame| view.draw(frame, &chat)).unwrap();
    let screen = rendered(&terminal);
    assert!(screen.contains("Welcome back, Ada Lovelace"));
    assert!(screen.contains("Quick Start Templates"));

    shell.execute(ShellCommand::Message("ping".into())).await;
    shell.execute(ShellCommand::Voice).await;
    view.scroll_up(3);
    view.scroll_down(5);
    assert_eq!(view.scroll_back(), 0);

    terminal.draw(|frame| view.draw(frame, &chat)).unwrap();
    let screen = rendered(&terminal);
    assert!(screen.contains("ping"));
    assert!(screen.contains("pong"));
    assert!(!screen.contains("Quick Start Templates"));
    assert!(screen.contains("not supported"));
}
