//! Events broadcast to the board view and UI surface.

use chessdesk_common::{MoveFlags, Square};

use crate::snapshot::{MoveRecord, PromotionPrompt, SessionSnapshot};

/// Everything subscribers can observe about a session. The board view
/// follows `StateChanged` for piece placement; the UI surface renders the
/// rest as chrome.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    DestinationsHighlighted {
        square: Square,
        destinations: Vec<Square>,
    },
    SelectionCleared,
    PromotionRequested(PromotionPrompt),
    MoveLogAppended(MoveRecord),
    GameOverAnnounced(MoveFlags),
    UndoAvailabilityChanged(bool),
    EngineThinking(bool),
    /// Short-lived notice: rejected input, collaborator trouble, no-ops.
    TransientMessage(String),
}
