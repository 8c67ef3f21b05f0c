//! Game session controller for chessdesk.
//!
//! Owns the turn/selection state machine, the move-execution protocol
//! (including mid-flight promotion disambiguation), the dual-mode undo
//! controller, and the bot-turn scheduler. Move legality is never computed
//! here: every move is arbitrated by the remote [`MoveAuthority`], and the
//! automated opponent is the remote [`MoveEngine`].
//!
//! The controller runs as an actor: [`spawn_session`] starts the task and
//! returns a [`SessionHandle`]; board view and UI surface observe it
//! through [`SessionEvent`] subscriptions.

mod actor;
pub mod commands;
pub mod events;
mod handle;
pub mod snapshot;
mod state;

pub use commands::{DragOutcome, GameConfig, PromotionChoice, SessionError};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use snapshot::{MoveRecord, PromotionPrompt, SelectionSnapshot, SessionSnapshot};

use std::sync::Arc;

use arbiter_client::{MoveAuthority, MoveEngine};
use tokio::sync::{broadcast, mpsc};

/// Spawn a session actor for a fresh game and return a handle to it.
pub fn spawn_session(
    config: GameConfig,
    authority: Arc<dyn MoveAuthority>,
    engine: Arc<dyn MoveEngine>,
) -> SessionHandle {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(256);
    let state = state::SessionState::new(session_id.clone(), config);
    tokio::spawn(actor::run_session_actor(
        state,
        actor::SessionDeps { authority, engine },
        cmd_rx,
        event_tx,
    ));
    SessionHandle::new(session_id, cmd_tx)
}
