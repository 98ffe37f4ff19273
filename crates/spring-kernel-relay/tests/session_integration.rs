#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Integration tests for the kernel session: cell → command → output.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;

use common::{FakeEngine, start_connector};
use spring_kernel_core::{Command, LuaState, OutputLine};
use spring_kernel_relay::{CellStatus, KernelSession};

#[tokio::test]
async fn cell_runs_in_selected_state_and_state_sticks() {
    let connector = start_connector(Duration::from_secs(5)).await;
    let mut engine = FakeEngine::connect(connector.local_addr()).await;
    let mut session = KernelSession::new(connector.handle(), LuaState::default());

    let cell = tokio::spawn(async move {
        let out = session.execute_cell("%sluarules\nreturn 1").await;
        (session, out)
    });
    assert_eq!(
        engine.next_command().await,
        Command::execute("\nreturn 1", "sluarules")
    );
    engine.respond(&json!([["1", null], ["done", "help"]])).await;

    let (mut session, out) = cell.await.unwrap();
    assert_eq!(out.status, CellStatus::Ok);
    assert_eq!(
        out.lines,
        vec![
            OutputLine::new("LuaRules Synced", "state-info"),
            OutputLine::plain("1"),
            OutputLine::new("done", "help"),
        ]
    );
    assert_eq!(session.state(), LuaState::SyncedLuaRules);

    let cell = tokio::spawn(async move { session.execute_cell("return 2").await });
    assert_eq!(
        engine.next_command().await,
        Command::execute("return 2", "sluarules")
    );
    engine.respond(&json!([["2", null]])).await;
    assert_eq!(cell.await.unwrap().status, CellStatus::Ok);
}

#[tokio::test]
async fn local_magics_do_not_reach_the_engine() {
    // No engine ever connects; these cells must not wait on one.
    let connector = start_connector(Duration::from_secs(30)).await;
    let mut session = KernelSession::new(connector.handle(), LuaState::LuaMenu);

    let help = session.execute_cell("%help").await;
    assert_eq!(help.status, CellStatus::Ok);
    assert_eq!(help.lines[0].style.as_deref(), Some("help"));

    let list = session.execute_cell("%lsmagic").await;
    assert!(list.lines[0].text.starts_with("Available magics:"));

    let unknown = session.execute_cell("%bogus").await;
    assert_eq!(unknown.status, CellStatus::Error);
    assert_eq!(
        unknown.lines,
        vec![OutputLine::new("No such magic: %bogus", "error")]
    );
    assert_eq!(session.state(), LuaState::LuaMenu);
}

#[tokio::test]
async fn timeout_is_reported_as_warning() {
    let connector = start_connector(Duration::from_millis(200)).await;
    let mut session = KernelSession::new(connector.handle(), LuaState::LuaUi);

    let out = session.execute_cell("return 1").await;
    assert_eq!(out.status, CellStatus::Error);
    assert_eq!(
        out.lines,
        vec![OutputLine::new("Timeout executing task", "warning")]
    );
}

#[tokio::test]
async fn show_returns_image_path() {
    let connector = start_connector(Duration::from_secs(5)).await;
    let mut engine = FakeEngine::connect(connector.local_addr()).await;
    let mut session = KernelSession::new(connector.handle(), LuaState::LuaUi);

    let cell = tokio::spawn(async move { session.execute_cell("%show").await });
    assert_eq!(engine.next_command().await, Command::Show);
    engine.respond(&json!({"imgPath": "/tmp/shot.png"})).await;

    let out = cell.await.unwrap();
    assert_eq!(out.status, CellStatus::Ok);
    assert_eq!(out.image, Some(PathBuf::from("/tmp/shot.png")));
}

#[tokio::test]
async fn engine_vanishing_is_reported_without_hanging() {
    let connector = start_connector(Duration::from_secs(5)).await;
    let mut engine = FakeEngine::connect(connector.local_addr()).await;
    let mut session = KernelSession::new(connector.handle(), LuaState::LuaUi);

    let cell = tokio::spawn(async move { session.execute_cell("os.exit()").await });
    engine.next_command().await;
    drop(engine);

    let out = cell.await.unwrap();
    assert_eq!(out.status, CellStatus::Error);
    assert_eq!(out.lines[0], OutputLine::new("LuaUI", "state-info"));
    assert_eq!(out.lines[1].style.as_deref(), Some("warning"));
}
