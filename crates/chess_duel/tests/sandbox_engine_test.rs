//! Integration tests for the sandbox rule engine.

mod common;

use std::sync::{Arc, Mutex};

use chess_duel::{
    Coordinate, EngineStatus, GameMode, MatchBinding, Move, MoveExchange, MoveOutcome, PieceKind,
    RuleEngine, SandboxEngine, Side,
};
use common::mv;

/// In-memory exchange recording sent moves and replaying queued ones.
#[derive(Clone, Default)]
struct FakeExchange {
    sent: Arc<Mutex<Vec<Move>>>,
    inbox: Arc<Mutex<Vec<Move>>>,
    down: Arc<Mutex<bool>>,
}

impl MoveExchange for FakeExchange {
    fn send_move(&mut self, mv: Move) -> bool {
        if *self.down.lock().expect("lock") {
            return false;
        }
        self.sent.lock().expect("lock").push(mv);
        true
    }

    fn receive_move(&mut self) -> Option<Move> {
        let mut inbox = self.inbox.lock().expect("lock");
        (!inbox.is_empty()).then(|| inbox.remove(0))
    }

    fn is_connected(&self) -> bool {
        !*self.down.lock().expect("lock")
    }
}

fn online_engine(side: Side) -> (SandboxEngine, FakeExchange) {
    let exchange = FakeExchange::default();
    let mut engine = SandboxEngine::new();
    let mode = match side {
        Side::White => GameMode::HostOnline,
        Side::Black => GameMode::JoinOnline,
    };
    engine.start_match(MatchBinding::online(mode, side, Box::new(exchange.clone())));
    (engine, exchange)
}

#[test]
fn test_no_match_before_start() {
    let mut engine = SandboxEngine::new();

    assert_eq!(engine.submit_move(mv((4, 1), (4, 3))), MoveOutcome::NoMatch);
    assert_eq!(engine.update(), EngineStatus::Idle);
}

#[test]
fn test_local_match_alternates_sides() {
    let mut engine = SandboxEngine::new();
    engine.start_match(MatchBinding::local());

    assert_eq!(engine.submit_move(mv((4, 6), (4, 4))), MoveOutcome::Rejected);
    assert_eq!(engine.submit_move(mv((4, 1), (4, 3))), MoveOutcome::Applied);
    assert_eq!(engine.snapshot().to_move, Side::Black);
    assert_eq!(engine.submit_move(mv((4, 6), (4, 4))), MoveOutcome::Applied);
    assert_eq!(engine.snapshot().to_move, Side::White);
}

#[test]
fn test_cannot_land_on_own_piece_or_stay_put() {
    let mut engine = SandboxEngine::new();
    engine.start_match(MatchBinding::local());

    assert_eq!(engine.submit_move(mv((0, 0), (0, 1))), MoveOutcome::Rejected);
    assert_eq!(engine.submit_move(mv((4, 1), (4, 1))), MoveOutcome::Rejected);
    assert_eq!(engine.submit_move(mv((4, 3), (4, 4))), MoveOutcome::Rejected);
}

#[test]
fn test_pawn_on_far_rank_becomes_queen() {
    let mut engine = SandboxEngine::new();
    engine.start_match(MatchBinding::local());

    engine.submit_move(mv((0, 1), (0, 5)));
    engine.submit_move(mv((7, 6), (7, 5)));
    assert_eq!(engine.submit_move(mv((0, 5), (1, 7))), MoveOutcome::Applied);

    let promoted = engine
        .snapshot()
        .piece_at(Coordinate::new(1, 7).expect("b8"))
        .expect("piece on b8");
    assert_eq!(promoted.kind, PieceKind::Queen);
    assert_eq!(promoted.side, Side::White);
}

#[test]
fn test_king_capture_finishes_match() {
    let mut engine = SandboxEngine::new();
    engine.start_match(MatchBinding::local());

    engine.submit_move(mv((3, 0), (4, 7)));

    let finished = EngineStatus::Finished {
        winner: Some(Side::White),
    };
    assert_eq!(engine.update(), finished);
    assert_eq!(engine.submit_move(mv((4, 6), (4, 4))), MoveOutcome::NoMatch);
}

#[test]
fn test_online_local_move_is_sent() {
    let (mut engine, exchange) = online_engine(Side::White);

    assert_eq!(engine.submit_move(mv((4, 1), (4, 3))), MoveOutcome::Applied);

    assert_eq!(*exchange.sent.lock().expect("lock"), vec![mv((4, 1), (4, 3))]);
}

#[test]
fn test_online_refuses_moves_on_opponent_turn() {
    let (mut engine, exchange) = online_engine(Side::Black);

    assert_eq!(engine.submit_move(mv((4, 6), (4, 4))), MoveOutcome::NotYourTurn);
    assert!(exchange.sent.lock().expect("lock").is_empty());
}

#[test]
fn test_peer_moves_are_applied_on_update() {
    let (mut engine, exchange) = online_engine(Side::Black);
    exchange.inbox.lock().expect("lock").push(mv((4, 1), (4, 3)));

    assert_eq!(engine.update(), EngineStatus::InProgress);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.last_move, Some(mv((4, 1), (4, 3))));
    assert_eq!(snapshot.to_move, Side::Black);
    assert_eq!(engine.submit_move(mv((4, 6), (4, 4))), MoveOutcome::Applied);
}

#[test]
fn test_unacceptable_peer_move_is_ignored() {
    let (mut engine, exchange) = online_engine(Side::Black);
    exchange.inbox.lock().expect("lock").push(mv((4, 6), (4, 4)));

    engine.update();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.last_move, None);
    assert_eq!(snapshot.to_move, Side::White);
}

#[test]
fn test_link_down_blocks_local_move() {
    let (mut engine, exchange) = online_engine(Side::White);
    *exchange.down.lock().expect("lock") = true;

    assert_eq!(engine.submit_move(mv((4, 1), (4, 3))), MoveOutcome::LinkDown);
    assert_eq!(engine.snapshot().last_move, None);
}

#[test]
fn test_end_match_resets_to_idle() {
    let (mut engine, _exchange) = online_engine(Side::White);

    engine.end_match();

    assert_eq!(engine.snapshot().status, EngineStatus::Idle);
    assert_eq!(engine.submit_move(mv((4, 1), (4, 3))), MoveOutcome::NoMatch);
}
