//! Sanitizes and classifies inbound `action` names into the closed
//! namespace set from spec.md §4.9, before the hub dispatches to the
//! relevant component.
//!
//! Generalizes `arcforge/src/handler.rs`'s `handle_system_message` /
//! `handle_game_message` split: that split was a two-way branch on frame
//! shape; this is an N-way classification over the sanitized action name,
//! since the wire now carries one closed vocabulary of verbs instead of
//! two ad hoc message enums.

use crate::error::HubError;

/// One command the router recognizes, with just enough of its operand
/// extracted to route it — the hub pulls any remaining payload fields
/// itself, since their shape is component-specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `game_*` / `chess_*` session actions. `op` is the suffix after the
    /// namespace prefix (`join`, `ready`, `move`, `leave`, `rematch`).
    Game { op: String },
    HostGame,
    JoinMatch,
    CancelMatch,
    ListMatches,
    SpectateMatch,
    /// A universal key/action name from the fixed menu/input vocabulary.
    UniversalInput { name: String },
    Chat { op: String },
}

/// Key/action names every client may send regardless of game type, per
/// spec.md §4.9's "closed set of universal key/action names".
const UNIVERSAL_INPUTS: &[&str] = &[
    "up", "down", "left", "right", "enter", "space", "escape", "menu_up", "menu_down", "menu_select", "menu_back",
];

const GAME_OPS: &[&str] = &["join", "ready", "move", "leave", "rematch"];
const CHAT_OPS: &[&str] = &[
    "join", "leave", "send", "whisper", "system", "react", "unreact", "mute", "unmute", "kick", "delete", "typing",
];

/// Whitelists alphanumeric and underscore, lowercases everything else.
/// Per spec.md §4.9: "Validates and sanitizes input (whitelist alphanumeric
/// and underscore; everything lowercased)".
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').map(|c| c.to_ascii_lowercase()).collect()
}

/// Classifies a sanitized action name into a [`Command`], or fails
/// `INVALID_ACTION` naming the valid set, per spec.md §4.9.
pub fn classify(raw_action: &str) -> Result<Command, HubError> {
    let action = sanitize(raw_action);

    if let Some(op) = action.strip_prefix("game_").or_else(|| action.strip_prefix("chess_")) {
        if GAME_OPS.contains(&op) {
            return Ok(Command::Game { op: op.to_string() });
        }
    }
    if let Some(op) = action.strip_prefix("chat_") {
        if CHAT_OPS.contains(&op) {
            return Ok(Command::Chat { op: op.to_string() });
        }
    }
    match action.as_str() {
        "host_game" => return Ok(Command::HostGame),
        "join_match" => return Ok(Command::JoinMatch),
        "cancel_match" => return Ok(Command::CancelMatch),
        "list_matches" => return Ok(Command::ListMatches),
        "spectate_match" => return Ok(Command::SpectateMatch),
        _ => {}
    }
    if UNIVERSAL_INPUTS.contains(&action.as_str()) {
        return Ok(Command::UniversalInput { name: action });
    }

    Err(HubError::InvalidAction(action, valid_actions_summary()))
}

fn valid_actions_summary() -> String {
    let mut names: Vec<String> = Vec::new();
    names.extend(GAME_OPS.iter().map(|op| format!("game_{op}")));
    names.extend(["host_game", "join_match", "cancel_match", "list_matches", "spectate_match"].iter().map(|s| s.to_string()));
    names.extend(CHAT_OPS.iter().map(|op| format!("chat_{op}")));
    names.extend(UNIVERSAL_INPUTS.iter().map(|s| s.to_string()));
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_punctuation_and_lowercases() {
        assert_eq!(sanitize("Game_Move!"), "game_move");
    }

    #[test]
    fn test_classify_recognizes_a_game_op() {
        assert_eq!(classify("game_move").unwrap(), Command::Game { op: "move".to_string() });
    }

    #[test]
    fn test_classify_recognizes_a_chess_op_via_the_same_suffix_set() {
        assert_eq!(classify("chess_move").unwrap(), Command::Game { op: "move".to_string() });
    }

    #[test]
    fn test_classify_recognizes_matchmaking_verbs() {
        assert_eq!(classify("host_game").unwrap(), Command::HostGame);
        assert_eq!(classify("JOIN_MATCH").unwrap(), Command::JoinMatch);
    }

    #[test]
    fn test_classify_recognizes_universal_input() {
        assert_eq!(classify("up").unwrap(), Command::UniversalInput { name: "up".to_string() });
    }

    #[test]
    fn test_classify_rejects_unknown_action_with_valid_set_in_detail() {
        let err = classify("teleport").unwrap_err();
        match err {
            HubError::InvalidAction(action, detail) => {
                assert_eq!(action, "teleport");
                assert!(detail.contains("game_move"));
            }
            other => panic!("expected InvalidAction, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_rejects_a_game_op_not_in_the_fixed_set() {
        let err = classify("game_teleport").unwrap_err();
        assert!(matches!(err, HubError::InvalidAction(_, _)));
    }
}
