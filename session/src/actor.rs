//! The session actor loop.
//!
//! One task owns all mutable state and processes commands sequentially.
//! Collaborator calls that may outlive a command (destination fetches,
//! engine requests) run as spawned tasks whose results re-enter the loop
//! tagged with the sequence number that was current when they started;
//! results carrying an out-of-date tag are discarded. Move validation for
//! a direct input is awaited inline, so a second attempt cannot start
//! before the first resolves.

use std::sync::Arc;

use arbiter_client::{ClientResult, MoveAuthority, MoveEngine};
use chessdesk_common::{
    AuthorityVerdict, MoveDetail, OccupiedSquare, PieceKind, Square,
};
use rand::seq::IndexedRandom;
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use crate::commands::{DragOutcome, GameConfig, PromotionChoice, SessionCommand, SessionError};
use crate::events::SessionEvent;
use crate::snapshot::{PromotionPrompt, SessionSnapshot};
use crate::state::SessionState;

/// Collaborator services the actor consults. Undo never touches either.
pub(crate) struct SessionDeps {
    pub authority: Arc<dyn MoveAuthority>,
    pub engine: Arc<dyn MoveEngine>,
}

/// Results of spawned collaborator requests.
enum IoEvent {
    Destinations {
        seq: u64,
        square: Square,
        result: ClientResult<Vec<MoveDetail>>,
    },
    EngineReply {
        seq: u64,
        result: ClientResult<MoveDetail>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveOrigin {
    Click,
    Drag,
    Promotion,
    Engine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveOutcome {
    Applied,
    PromotionPending,
    Rejected,
    Failed,
}

pub(crate) async fn run_session_actor(
    state: SessionState,
    deps: SessionDeps,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let session_id = state.session_id.clone();
    run_actor_inner(state, deps, cmd_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_actor_inner(
    state: SessionState,
    deps: SessionDeps,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!("Session actor started");

    let (io_tx, mut io_rx) = mpsc::channel(32);
    let mut actor = Actor {
        state,
        deps,
        io_tx,
        event_tx,
    };

    // The engine opens the game when the human plays black.
    actor.maybe_schedule_engine();

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        tracing::info!("Session actor shutting down");
                        break;
                    }
                    Some(cmd) => actor.handle_command(cmd).await,
                }
            }

            Some(io) = io_rx.recv() => actor.handle_io(io).await,
        }
    }

    tracing::info!("Session actor exited");
}

struct Actor {
    state: SessionState,
    deps: SessionDeps,
    io_tx: mpsc::Sender<IoEvent>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl Actor {
    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::ActivateSquare {
                square,
                piece,
                reply,
            } => {
                self.handle_activation(square, piece).await;
                let _ = reply.send(self.state.snapshot());
            }
            SessionCommand::DragMove {
                from,
                to,
                piece,
                reply,
            } => {
                let outcome = self.handle_drag(from, to, piece).await;
                let _ = reply.send(outcome);
            }
            SessionCommand::ResolvePromotion { choice, reply } => {
                let result = self.resolve_promotion(choice).await;
                let _ = reply.send(result);
            }
            SessionCommand::Undo { reply } => {
                let result = self.handle_undo();
                let _ = reply.send(result);
            }
            SessionCommand::NewGame { config, reply } => {
                self.handle_new_game(config);
                let _ = reply.send(self.state.snapshot());
            }
            SessionCommand::SetDifficulty { level, reply } => {
                self.state.difficulty = level;
                tracing::debug!(level, "difficulty updated");
                let _ = reply.send(());
            }
            SessionCommand::GetSnapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            SessionCommand::Subscribe { reply } => {
                let snapshot = self.state.snapshot();
                let rx = self.event_tx.subscribe();
                let _ = reply.send((snapshot, rx));
            }
            SessionCommand::Shutdown => unreachable!(),
        }
    }

    async fn handle_io(&mut self, io: IoEvent) {
        match io {
            IoEvent::Destinations {
                seq,
                square,
                result,
            } => self.handle_destinations(seq, square, result),
            IoEvent::EngineReply { seq, result } => self.handle_engine_reply(seq, result).await,
        }
    }

    // --- Selection workflow ---

    async fn handle_activation(&mut self, square: Square, piece: Option<OccupiedSquare>) {
        if self.state.is_over() {
            self.notify("The game is over");
            return;
        }

        // An open promotion prompt treats any board activation as dismissal.
        if self.state.pending_promotion.is_some() {
            let _ = self.resolve_promotion(PromotionChoice::Dismiss).await;
            return;
        }

        if self.state.mode.is_engine_turn(self.state.turn) {
            self.notify("It's not your turn");
            return;
        }

        let selection = self
            .state
            .selection
            .as_ref()
            .map(|sel| (sel.square, sel.destinations.contains(&square)));
        if let Some((selected, is_destination)) = selection {
            if selected == square {
                // Toggle deselect.
                self.clear_selection();
                return;
            }
            if is_destination {
                self.clear_selection();
                self.attempt_move(selected, square, None, MoveOrigin::Click)
                    .await;
                return;
            }
        }

        match piece {
            Some(p) if p.side == self.state.turn => self.begin_selection(square),
            Some(_) => {
                if self.state.selection.is_some() {
                    self.clear_selection();
                } else {
                    self.notify("It's not your turn");
                }
            }
            None => {
                if self.state.selection.is_some() {
                    self.clear_selection();
                }
            }
        }
    }

    async fn handle_drag(
        &mut self,
        from: Square,
        to: Square,
        piece: OccupiedSquare,
    ) -> DragOutcome {
        if self.state.pending_promotion.is_some() {
            let _ = self.resolve_promotion(PromotionChoice::Dismiss).await;
        }
        if self.state.is_over() {
            self.notify("The game is over");
            return DragOutcome::Rejected;
        }
        if self.state.mode.is_engine_turn(self.state.turn) || piece.side != self.state.turn {
            self.notify("It's not your turn");
            return DragOutcome::Rejected;
        }

        self.clear_selection();
        match self.attempt_move(from, to, None, MoveOrigin::Drag).await {
            MoveOutcome::Applied | MoveOutcome::PromotionPending => DragOutcome::Accepted,
            MoveOutcome::Rejected | MoveOutcome::Failed => DragOutcome::Rejected,
        }
    }

    fn begin_selection(&mut self, square: Square) {
        let seq = self.state.begin_selection(square);
        tracing::debug!(%square, seq, "fetching legal destinations");
        let authority = Arc::clone(&self.deps.authority);
        let position = self.state.position.clone();
        let io_tx = self.io_tx.clone();
        tokio::spawn(async move {
            let result = authority.legal_moves(&position, Some(square)).await;
            let _ = io_tx
                .send(IoEvent::Destinations {
                    seq,
                    square,
                    result,
                })
                .await;
        });
    }

    fn handle_destinations(
        &mut self,
        seq: u64,
        square: Square,
        result: ClientResult<Vec<MoveDetail>>,
    ) {
        let current = matches!(&self.state.selection, Some(sel) if sel.fetch_seq == seq);
        if !current {
            tracing::debug!(%square, seq, "discarding stale destination fetch");
            return;
        }

        match result {
            Ok(moves) => {
                // Promotions report one entry per piece; collapse to squares.
                let mut destinations: Vec<Square> = moves.iter().map(|m| m.to).collect();
                destinations.sort();
                destinations.dedup();

                if destinations.is_empty() {
                    self.clear_selection();
                    self.notify(format!("No legal moves from {square}"));
                    return;
                }
                if let Some(sel) = &mut self.state.selection {
                    sel.destinations = destinations.clone();
                }
                self.emit(SessionEvent::DestinationsHighlighted {
                    square,
                    destinations,
                });
            }
            Err(e) => {
                tracing::warn!(%square, error = %e, "destination fetch failed");
                self.clear_selection();
                self.notify(format!("Could not fetch moves: {e}"));
            }
        }
    }

    // --- Move execution protocol ---

    async fn attempt_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        origin: MoveOrigin,
    ) -> MoveOutcome {
        let verdict = match self
            .deps
            .authority
            .validate_move(&self.state.position, from, to, promotion)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(%from, %to, error = %e, "move authority unreachable");
                self.notify(format!("Move authority unavailable: {e}"));
                return MoveOutcome::Failed;
            }
        };

        match verdict {
            AuthorityVerdict::PromotionRequired => {
                if promotion.is_some() || origin == MoveOrigin::Engine {
                    // A piece was supplied (or the engine should have
                    // supplied one) and the authority still wants more;
                    // reject rather than loop.
                    self.notify("Move rejected: promotion required");
                    return MoveOutcome::Rejected;
                }
                let prompt = PromotionPrompt {
                    color: self.state.turn,
                    from,
                    to,
                };
                self.state.pending_promotion = Some(prompt);
                self.emit(SessionEvent::PromotionRequested(prompt));
                MoveOutcome::PromotionPending
            }
            AuthorityVerdict::Rejected { reason } => {
                tracing::debug!(%from, %to, %reason, "move rejected");
                self.notify(reason);
                MoveOutcome::Rejected
            }
            AuthorityVerdict::Accepted { position, flags } => {
                let record = self
                    .state
                    .apply_accepted(from, to, promotion, position, flags);
                tracing::info!(%from, %to, mover = %record.mover, "move applied");
                self.emit(SessionEvent::MoveLogAppended(record));
                self.emit(SessionEvent::UndoAvailabilityChanged(true));
                self.emit(SessionEvent::StateChanged(self.state.snapshot()));
                if self.state.is_over() {
                    self.emit(SessionEvent::GameOverAnnounced(self.state.flags));
                } else {
                    self.maybe_schedule_engine();
                }
                MoveOutcome::Applied
            }
        }
    }

    // --- Promotion resolution ---

    async fn resolve_promotion(
        &mut self,
        choice: PromotionChoice,
    ) -> Result<SessionSnapshot, SessionError> {
        let Some(prompt) = self.state.pending_promotion.take() else {
            self.notify("No promotion to resolve");
            return Err(SessionError::NoPendingPromotion);
        };

        match choice {
            PromotionChoice::Piece(kind) => {
                self.attempt_move(prompt.from, prompt.to, Some(kind), MoveOrigin::Promotion)
                    .await;
            }
            PromotionChoice::Dismiss => {
                // Closed without a pick: queen, by policy.
                self.attempt_move(
                    prompt.from,
                    prompt.to,
                    Some(PieceKind::Queen),
                    MoveOrigin::Promotion,
                )
                .await;
            }
            PromotionChoice::Cancel => {
                // The whole attempt is abandoned: zero history mutation.
                // Put the board view back on the unchanged position.
                tracing::debug!(from = %prompt.from, to = %prompt.to, "promotion cancelled");
                self.emit(SessionEvent::StateChanged(self.state.snapshot()));
                self.notify("Promotion cancelled");
            }
        }
        Ok(self.state.snapshot())
    }

    // --- Undo controller ---

    fn handle_undo(&mut self) -> Result<SessionSnapshot, SessionError> {
        let was_thinking = self.state.engine_thinking;
        match self.state.apply_undo() {
            Ok(record) => {
                if was_thinking && !self.state.engine_thinking {
                    self.emit(SessionEvent::EngineThinking(false));
                }
                tracing::info!(from = %record.from, to = %record.to, "move undone");
                self.emit(SessionEvent::SelectionCleared);
                self.emit(SessionEvent::UndoAvailabilityChanged(self.state.undo_available()));
                self.emit(SessionEvent::StateChanged(self.state.snapshot()));
                Ok(self.state.snapshot())
            }
            Err(e) => {
                self.notify(e.to_string());
                Err(e)
            }
        }
    }

    // --- Session lifecycle ---

    fn handle_new_game(&mut self, config: GameConfig) {
        if self.state.pending_promotion.take().is_some() {
            // Programmatic cancellation: the in-flight move is abandoned.
            self.notify("Promotion cancelled");
        }
        let was_thinking = self.state.engine_thinking;
        self.state.reset(config);
        if was_thinking {
            self.emit(SessionEvent::EngineThinking(false));
        }
        tracing::info!(mode = ?self.state.mode, "new game");
        self.emit(SessionEvent::SelectionCleared);
        self.emit(SessionEvent::UndoAvailabilityChanged(false));
        self.emit(SessionEvent::StateChanged(self.state.snapshot()));
        self.maybe_schedule_engine();
    }

    // --- Bot turn scheduler ---

    /// Request an engine move if it is the engine's turn and no request is
    /// already owed. Called after every state mutation.
    fn maybe_schedule_engine(&mut self) {
        if self.state.is_over() {
            return;
        }
        if !self.state.mode.is_engine_turn(self.state.turn) {
            return;
        }
        if self.state.engine_request.is_some() {
            return;
        }

        let seq = self.state.begin_engine_request();
        self.emit(SessionEvent::EngineThinking(true));
        tracing::debug!(seq, difficulty = self.state.difficulty, "requesting engine move");

        let engine = Arc::clone(&self.deps.engine);
        let position = self.state.position.clone();
        let difficulty = self.state.difficulty;
        let io_tx = self.io_tx.clone();
        tokio::spawn(async move {
            let result = engine.choose_move(&position, difficulty).await;
            let _ = io_tx.send(IoEvent::EngineReply { seq, result }).await;
        });
    }

    async fn handle_engine_reply(&mut self, seq: u64, result: ClientResult<MoveDetail>) {
        if self.state.engine_request != Some(seq) {
            tracing::debug!(seq, "discarding stale engine reply");
            return;
        }
        self.state.engine_request = None;
        self.state.engine_thinking = false;
        self.emit(SessionEvent::EngineThinking(false));

        match result {
            Ok(mv) => {
                let outcome = self
                    .attempt_move(mv.from, mv.to, mv.promotion, MoveOrigin::Engine)
                    .await;
                if outcome != MoveOutcome::Applied {
                    tracing::error!(from = %mv.from, to = %mv.to, "engine move was not applied");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine failed, falling back to a random legal move");
                self.engine_fallback().await;
            }
        }
    }

    /// Engine-failure fallback: ask the authority for the full legal-move
    /// set and play one at random through the normal protocol.
    async fn engine_fallback(&mut self) {
        let moves = match self
            .deps
            .authority
            .legal_moves(&self.state.position, None)
            .await
        {
            Ok(moves) => moves,
            Err(e) => {
                tracing::warn!(error = %e, "fallback legal-move fetch failed");
                self.notify(format!("Engine unavailable: {e}"));
                return;
            }
        };

        let Some(mv) = moves.choose(&mut rand::rng()).copied() else {
            // No legal reply exists; whatever the authority last reported
            // about the game stands.
            self.notify("Engine cannot move");
            return;
        };
        tracing::info!(from = %mv.from, to = %mv.to, "engine fallback move");
        self.attempt_move(mv.from, mv.to, mv.promotion, MoveOrigin::Engine)
            .await;
    }

    // --- Plumbing ---

    fn clear_selection(&mut self) {
        if self.state.selection.take().is_some() {
            self.emit(SessionEvent::SelectionCleared);
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn notify(&self, text: impl Into<String>) {
        self.emit(SessionEvent::TransientMessage(text.into()));
    }
}
