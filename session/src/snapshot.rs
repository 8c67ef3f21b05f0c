//! Immutable views of session state handed to subscribers.

use chessdesk_common::{GameMode, MoveFlags, PieceKind, PlayerSide, PositionToken, Square};

/// Complete, immutable snapshot of session state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub position: PositionToken,
    pub turn: PlayerSide,
    pub mode: GameMode,
    pub difficulty: u8,
    pub flags: MoveFlags,
    pub is_over: bool,
    pub selected: Option<SelectionSnapshot>,
    pub move_log: Vec<MoveRecord>,
    pub history_len: usize,
    pub undo_available: bool,
    pub engine_thinking: bool,
    pub pending_promotion: Option<PromotionPrompt>,
}

/// The selected square and its legal destinations, once fetched.
#[derive(Debug, Clone)]
pub struct SelectionSnapshot {
    pub square: Square,
    pub destinations: Vec<Square>,
}

/// A single applied move. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub mover: PlayerSide,
}

/// An unresolved promotion: the move is parked until the player picks a
/// piece, dismisses the chooser, or the attempt is cancelled outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionPrompt {
    pub color: PlayerSide,
    pub from: Square,
    pub to: Square,
}
