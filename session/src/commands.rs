//! Commands accepted by the session actor, and the session error type.

use chessdesk_common::{GameMode, OccupiedSquare, PieceKind, PositionToken, Square};
use tokio::sync::{broadcast, oneshot};

use crate::events::SessionEvent;
use crate::snapshot::SessionSnapshot;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("No promotion is pending")]
    NoPendingPromotion,
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Parameters for a fresh game. The position token is passed through to the
/// arbiter untouched; omitting it selects the conventional start.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: GameMode,
    pub difficulty: u8,
    pub position: Option<PositionToken>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::TwoPlayer,
            difficulty: 3,
            position: None,
        }
    }
}

/// How the player answered (or failed to answer) a promotion prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionChoice {
    Piece(PieceKind),
    /// Chooser closed without a pick; promotes to queen by policy.
    Dismiss,
    /// Abandon the whole move attempt. Distinct from a queen choice.
    Cancel,
}

/// Reply to a drag-and-drop attempt from the board view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Accepted,
    /// The view must snap the piece back; the session was not mutated.
    Rejected,
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
/// Note: there is no "trigger engine" command; the actor schedules the
/// engine itself whenever a mutation makes it the engine's turn.
pub enum SessionCommand {
    /// The board view reports a square activation (click/tap), together
    /// with whatever piece it is showing there.
    ActivateSquare {
        square: Square,
        piece: Option<OccupiedSquare>,
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Drag-based entry into the same move protocol, bypassing selection.
    DragMove {
        from: Square,
        to: Square,
        piece: OccupiedSquare,
        reply: oneshot::Sender<DragOutcome>,
    },
    ResolvePromotion {
        choice: PromotionChoice,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    Undo {
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    NewGame {
        config: GameConfig,
        reply: oneshot::Sender<SessionSnapshot>,
    },
    SetDifficulty {
        level: u8,
        reply: oneshot::Sender<()>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown,
}
