use crate::support::Harness;
use mockito::Matcher;
use parley::shell::Flow;
use parley::{ChatShell, ShellCommand, ShellSettings};
use serde_json::json;

fn shell_for(harness: &Harness, settings: ShellSettings) -> ChatShell {
    ChatShell::new(harness.sessions.clone(), harness.controller(), settings)
}

async fn mock_backend(harness: &mut Harness, reply: &str) {
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
        .with_body(json!({ "reply": reply }).to_string())
        .create_async()
        .await;
}

#[tokio::test]
async fn title_greets_user() {
    let harness = Harness::signed_in().await;
    let shell = shell_for(&harness, ShellSettings::default());

    assert_eq!(shell.title(), "AI Assistant | Welcome back, Ada Lovelace [AL]");
    assert!(shell.settings().show_templates_on_start);

    harness.sessions.logout();
    assert_eq!(shell.title(), "AI Assistant");
}

#[tokio::test]
async fn template_then_send_delivers_it() {
    let mut harness = Harness::signed_in().await;
    let template = parley_core::templates::template(1).expect("first template");
    harness
        .server
        .mock("POST", "/api/chat/sessions")
        .with_status(201)
        .with_body(r#"{"_id":"s-1"}"#)
        .create_async()
        .await;
    let chat_mock = harness
        .server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({ "prompt": template })))
        .with_status(200)
        .with_body(r#"{"reply":"Sure."}"#)
        .create_async()
        .await;
    let mut shell = shell_for(&harness, ShellSettings::default());

    let (flow, output) = shell.execute(ShellCommand::Template(1)).await;
    assert_eq!(flow, Flow::Continue);
    assert_eq!(output, vec!["Template 1 is in the draft.".to_string()]);
    assert_eq!(shell.controller().draft(), template);

    let (flow, output) = shell.execute(ShellCommand::Send).await;
    assert_eq!(flow, Flow::Continue);
    assert!(output.is_empty());
    assert_eq!(shell.controller().draft(), "");
    let messages = shell.controller().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Sure.");
    chat_mock.assert_async().await;
}

#[tokio::test]
async fn export_writes_into_directory() {
    let mut harness = Harness::signed_in().await;
    mock_backend(&mut harness, "exported").await;
    let dir = tempfile::TempDir::new().unwrap();
    let mut shell = shell_for(&harness, ShellSettings::default());

    let (_, output) = shell
        .execute(ShellCommand::Export(Some(dir.path().to_path_buf())))
        .await;
    assert_eq!(output, vec!["Nothing to export yet.".to_string()]);

    shell.execute(ShellCommand::Message("hello".into())).await;
    let (_, output) = shell
        .execute(ShellCommand::Export(Some(dir.path().to_path_buf())))
        .await;

    assert!(output[0].starts_with("Exported to "));
    let written: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(written[0].starts_with("chat-export-"));
}

#[tokio::test]
async fn copy_marks_latest_reply() {
    let mut harness = Harness::signed_in().await;
    mock_backend(&mut harness, "copy this").await;
    let mut shell = shell_for(&harness, ShellSettings::default());

    let (_, output) = shell.execute(ShellCommand::Copy(1)).await;
    assert_eq!(output, vec!["No reply to copy.".to_string()]);

    shell.execute(ShellCommand::Message("hello".into())).await;
    let (_, output) = shell.execute(ShellCommand::Copy(1)).await;

    assert_eq!(output, vec!["Copied the reply to the clipboard.".to_string()]);
    assert_eq!(harness.clipboard.contents().as_deref(), Some("copy this"));
    let reply = shell.controller().messages()[1].id;
    assert_eq!(shell.controller().copied_message(), Some(reply));
}

#[tokio::test]
async fn logout_leaves_the_chat() {
    let harness = Harness::signed_in().await;
    let mut shell = shell_for(&harness, ShellSettings::default());

    let (flow, _) = shell.execute(ShellCommand::Logout).await;

    assert_eq!(flow, Flow::LoggedOut);
    assert!(!harness.sessions.is_authenticated());
}

#[tokio::test]
async fn expired_session_ends_the_chat() {
    let mut harness = Harness::signed_in().await;
    harness
        .server
        .mock("POST", "/api/chat/sessions")
        .with_status(403)
        .create_async()
        .await;
    let mut shell = shell_for(&harness, ShellSettings::default());

    let (flow, output) = shell.execute(ShellCommand::Message("hello".into())).await;

    assert_eq!(flow, Flow::Expired);
    assert!(output
        .iter()
        .any(|line| line.contains("Your session has expired")));
    assert!(!harness.sessions.is_authenticated());
}

#[tokio::test]
async fn unknown_and_unavailable_commands_keep_going() {
    let harness = Harness::signed_in().await;
    let mut shell = shell_for(&harness, ShellSettings::default());

    let (flow, output) = shell.execute(ShellCommand::Unknown("/nope".into())).await;
    assert_eq!(flow, Flow::Continue);
    assert!(output[0].contains("Unknown command `/nope`"));

    let (_, output) = shell.execute(ShellCommand::Template(42)).await;
    assert_eq!(output, vec!["There is no template 42.".to_string()]);

    let (flow, output) = shell.execute(ShellCommand::Voice).await;
    assert_eq!(flow, Flow::Continue);
    assert!(output.is_empty());
    assert!(shell
        .controller()
        .error()
        .is_some_and(|error| error.contains("not supported")));

    shell.execute(ShellCommand::Dismiss).await;
    assert_eq!(shell.controller().error(), None);

    let (flow, _) = shell.execute(ShellCommand::Quit).await;
    assert_eq!(flow, Flow::Quit);
}
