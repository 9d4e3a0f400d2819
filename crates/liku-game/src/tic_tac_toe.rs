//! Reference [`GameProtocol`] implementation: 3x3 tic-tac-toe.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::{ActionResult, GameError, GameProtocol, Outcome, Slot};

const SIZE: usize = 3;

/// Tic-tac-toe has no per-session tunables beyond the fixed board size.
#[derive(Debug, Clone, Default)]
pub struct Config;

/// A single cell placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

/// The authoritative tic-tac-toe board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    board: [[Option<Slot>; SIZE]; SIZE],
    current: Slot,
    move_count: u32,
    last_move: Option<(Move, Slot)>,
    outcome: Option<Outcome>,
}

pub struct TicTacToe;

impl GameProtocol for TicTacToe {
    type Config = Config;
    type State = State;
    type Action = Move;

    fn slots(_config: &Config) -> Vec<Slot> {
        vec!["X".to_string(), "O".to_string()]
    }

    fn initial_state(_config: &Config) -> State {
        State {
            board: Default::default(),
            current: "X".to_string(),
            move_count: 0,
            last_move: None,
            outcome: None,
        }
    }

    fn is_legal(state: &State, _slot: &Slot, action: &Move) -> bool {
        in_range(action) && state.outcome.is_none() && state.board[action.row][action.col].is_none()
    }

    fn apply_action(state: &State, slot: &Slot, action: &Move) -> Result<(State, ActionResult), GameError> {
        if state.outcome.is_some() {
            return Err(GameError::AlreadyFinished);
        }
        if !in_range(action) {
            return Err(GameError::OutOfRange);
        }
        if state.board[action.row][action.col].is_some() {
            return Err(GameError::Occupied);
        }

        let mut next = state.clone();
        next.board[action.row][action.col] = Some(slot.clone());
        next.move_count += 1;
        next.last_move = Some((*action, slot.clone()));

        next.outcome = winning_line(&next.board)
            .map(|line| Outcome::Win { slot: slot.clone(), winning_line: Some(line) })
            .or_else(|| board_full(&next.board).then_some(Outcome::Draw));

        if next.outcome.is_none() {
            next.current = other_slot(slot);
        }

        let outcome = next.outcome.clone();
        Ok((next, ActionResult { outcome }))
    }

    fn next_to_move(state: &State) -> Option<Slot> {
        if state.outcome.is_some() {
            None
        } else {
            Some(state.current.clone())
        }
    }

    fn render(state: &State) -> Value {
        let board: Vec<Vec<Value>> = state
            .board
            .iter()
            .map(|row| row.iter().map(|cell| cell.clone().map_or(Value::Null, Value::from)).collect())
            .collect();
        let last_move = state.last_move.as_ref().map(|(mv, slot)| {
            json!({ "row": mv.row, "col": mv.col, "player": slot })
        });
        json!({
            "board": board,
            "currentPlayer": state.outcome.is_none().then(|| state.current.clone()),
            "moveCount": state.move_count,
            "lastMove": last_move,
            "outcome": state.outcome.clone(),
        })
    }
}

fn in_range(action: &Move) -> bool {
    action.row < SIZE && action.col < SIZE
}

fn other_slot(slot: &Slot) -> Slot {
    if slot == "X" { "O".to_string() } else { "X".to_string() }
}

fn board_full(board: &[[Option<Slot>; SIZE]; SIZE]) -> bool {
    board.iter().all(|row| row.iter().all(Option::is_some))
}

/// Checks every row, column, and diagonal for three matching slots, per
/// spec.md §4.5 step 6's ordering: winning line before draw.
fn winning_line(board: &[[Option<Slot>; SIZE]; SIZE]) -> Option<Vec<(usize, usize)>> {
    let lines: [[(usize, usize); 3]; 8] = [
        [(0, 0), (0, 1), (0, 2)],
        [(1, 0), (1, 1), (1, 2)],
        [(2, 0), (2, 1), (2, 2)],
        [(0, 0), (1, 0), (2, 0)],
        [(0, 1), (1, 1), (2, 1)],
        [(0, 2), (1, 2), (2, 2)],
        [(0, 0), (1, 1), (2, 2)],
        [(0, 2), (1, 1), (2, 0)],
    ];
    lines.into_iter().find(|line| {
        let first = &board[line[0].0][line[0].1];
        first.is_some() && line.iter().all(|&(r, c)| board[r][c] == *first)
    }).map(|line| line.to_vec())
}
