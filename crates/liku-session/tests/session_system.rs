//! Integration tests for the session actor and manager, driven entirely
//! through their public async handles.

use liku_game::tic_tac_toe::{Config, Move, TicTacToe};
use liku_game::{Erased, GameRegistry};
use liku_registry::AgentId;
use liku_session::{SeatRequest, SessionConfig, SessionEvent, SessionManager, SessionMode, SessionStatus};
use tokio::sync::mpsc;

fn registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry.register("tic_tac_toe", || Box::new(Erased::<TicTacToe>::new(Config)));
    registry
}

fn channel() -> (mpsc::UnboundedSender<SessionEvent>, mpsc::UnboundedReceiver<SessionEvent>) {
    mpsc::unbounded_channel()
}

#[tokio::test]
async fn test_two_players_join_and_ready_starts_the_game() {
    let mut manager = SessionManager::new(registry());
    let id = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, SessionConfig::default()).unwrap();
    let handle = manager.handle(id).unwrap().clone();

    let x = AgentId::new();
    let o = AgentId::new();
    let (x_tx, mut x_rx) = channel();
    let (o_tx, _o_rx) = channel();

    handle.join(x, SeatRequest::Player { preferred_slot: Some("X".into()) }, x_tx).await.unwrap();
    handle.join(o, SeatRequest::Player { preferred_slot: Some("O".into()) }, o_tx).await.unwrap();
    handle.ready(x).await.unwrap();
    let autostarted = handle.ready(o).await.unwrap();
    assert!(autostarted);

    let info = handle.get_info().await.unwrap();
    assert_eq!(info.status, SessionStatus::Playing);
    assert_eq!(info.player_count, 2);

    // x should have seen its own join, O's join, and the game-started event.
    let mut saw_started = false;
    while let Ok(event) = x_rx.try_recv() {
        if matches!(event, SessionEvent::GameStarted { .. }) {
            saw_started = true;
        }
    }
    assert!(saw_started);
}

#[tokio::test]
async fn test_spectator_join_rejected_when_session_disallows_it() {
    let mut manager = SessionManager::new(registry());
    let mut config = SessionConfig::default();
    config.spectator_allowed = false;
    let id = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, config).unwrap();
    let handle = manager.handle(id).unwrap().clone();

    let (tx, _rx) = channel();
    let err = handle.join(AgentId::new(), SeatRequest::Spectator, tx).await.unwrap_err();
    assert!(matches!(err, liku_session::SessionError::SpectatorsDisallowed));
}

#[tokio::test]
async fn test_submit_move_sequence_produces_a_win_and_broadcasts_it() {
    let mut manager = SessionManager::new(registry());
    let mut config = SessionConfig::default();
    config.start_player_policy = liku_session::StartPlayerPolicy::Explicit("X".into());
    let id = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, config).unwrap();
    let handle = manager.handle(id).unwrap().clone();

    let x = AgentId::new();
    let o = AgentId::new();
    let (x_tx, mut x_rx) = channel();
    let (o_tx, _o_rx) = channel();
    handle.join(x, SeatRequest::Player { preferred_slot: Some("X".into()) }, x_tx).await.unwrap();
    handle.join(o, SeatRequest::Player { preferred_slot: Some("O".into()) }, o_tx).await.unwrap();
    handle.ready(x).await.unwrap();
    handle.ready(o).await.unwrap();

    let mv = |r: usize, c: usize| serde_json::to_value(Move { row: r, col: c }).unwrap();
    handle.submit_move(x, mv(0, 0)).await.unwrap();
    handle.submit_move(o, mv(1, 0)).await.unwrap();
    handle.submit_move(x, mv(0, 1)).await.unwrap();
    handle.submit_move(o, mv(1, 1)).await.unwrap();
    let result = handle.submit_move(x, mv(0, 2)).await.unwrap();
    assert!(result.outcome.is_some());

    let info = handle.get_info().await.unwrap();
    assert_eq!(info.status, SessionStatus::Finished);

    let mut saw_ended = false;
    while let Ok(event) = x_rx.try_recv() {
        if matches!(event, SessionEvent::GameEnded { .. }) {
            saw_ended = true;
        }
    }
    assert!(saw_ended);
}

#[tokio::test]
async fn test_submit_move_out_of_turn_is_rejected() {
    let mut manager = SessionManager::new(registry());
    let mut config = SessionConfig::default();
    config.start_player_policy = liku_session::StartPlayerPolicy::Explicit("X".into());
    let id = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, config).unwrap();
    let handle = manager.handle(id).unwrap().clone();

    let x = AgentId::new();
    let o = AgentId::new();
    let (x_tx, _x_rx) = channel();
    let (o_tx, _o_rx) = channel();
    handle.join(x, SeatRequest::Player { preferred_slot: Some("X".into()) }, x_tx).await.unwrap();
    handle.join(o, SeatRequest::Player { preferred_slot: Some("O".into()) }, o_tx).await.unwrap();
    handle.ready(x).await.unwrap();
    handle.ready(o).await.unwrap();

    let err = handle.submit_move(o, serde_json::to_value(Move { row: 0, col: 0 }).unwrap()).await.unwrap_err();
    assert!(matches!(err, liku_session::SessionError::NotYourTurn(_)));
}

#[tokio::test]
async fn test_leave_during_play_ends_the_session_by_forfeit() {
    let mut manager = SessionManager::new(registry());
    let mut config = SessionConfig::default();
    config.start_player_policy = liku_session::StartPlayerPolicy::Explicit("X".into());
    let id = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, config).unwrap();
    let handle = manager.handle(id).unwrap().clone();

    let x = AgentId::new();
    let o = AgentId::new();
    let (x_tx, _x_rx) = channel();
    let (o_tx, mut o_rx) = channel();
    handle.join(x, SeatRequest::Player { preferred_slot: Some("X".into()) }, x_tx).await.unwrap();
    handle.join(o, SeatRequest::Player { preferred_slot: Some("O".into()) }, o_tx).await.unwrap();
    handle.ready(x).await.unwrap();
    handle.ready(o).await.unwrap();

    let outcome = handle.leave(x).await.unwrap();
    assert!(outcome.was_player);

    let info = handle.get_info().await.unwrap();
    assert_eq!(info.status, SessionStatus::Finished);

    let mut saw_ended = false;
    while let Ok(event) = o_rx.try_recv() {
        if matches!(event, SessionEvent::GameEnded { .. }) {
            saw_ended = true;
        }
    }
    assert!(saw_ended);
}

#[tokio::test]
async fn test_destroy_session_removes_it_from_the_manager() {
    let mut manager = SessionManager::new(registry());
    let id = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, SessionConfig::default()).unwrap();
    assert_eq!(manager.session_count(), 1);
    manager.destroy_session(id).unwrap();
    assert_eq!(manager.session_count(), 0);
    assert!(manager.handle(id).is_err());
}
