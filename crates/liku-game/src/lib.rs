//! Pluggable game-protocol abstraction.
//!
//! Individual games implement the strongly-typed [`GameProtocol`] trait;
//! [`erased::Erased`] adapts any of them to the object-safe
//! [`ErasedGameProtocol`] so the session manager can hold one per session
//! without being generic over every game type at once. [`tic_tac_toe::TicTacToe`]
//! is the reference implementation this workspace ships with.

pub mod erased;
pub mod protocol;
pub mod registry;
pub mod tic_tac_toe;

pub use erased::{Erased, ErasedGameProtocol};
pub use protocol::{ActionResult, GameError, GameProtocol, Outcome, Slot};
pub use registry::GameRegistry;
