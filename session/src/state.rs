//! The session aggregate and its invariant-checked mutations.
//!
//! `position_history[i]` is the position *before* `move_log[i]` was applied;
//! the two stacks move in lockstep. Accepted moves push exactly one pair and
//! undo pops exactly one pair, so the symmetry holds by construction, on the
//! engine-fallback path included.

use chessdesk_common::{GameMode, MoveFlags, PlayerSide, PositionToken, Square};

use crate::commands::{GameConfig, SessionError};
use crate::snapshot::{MoveRecord, PromotionPrompt, SelectionSnapshot, SessionSnapshot};

/// Internal mutable state, owned entirely by the session actor. No locks.
pub(crate) struct SessionState {
    pub session_id: String,
    pub position: PositionToken,
    pub turn: PlayerSide,
    pub mode: GameMode,
    pub difficulty: u8,
    pub flags: MoveFlags,
    pub selection: Option<Selection>,
    pub position_history: Vec<PositionToken>,
    pub move_log: Vec<MoveRecord>,
    pub pending_promotion: Option<PromotionPrompt>,
    /// Tag of the engine request currently owed a reply. A reply carrying
    /// any other tag is stale and must be discarded, never applied.
    pub engine_request: Option<u64>,
    pub engine_thinking: bool,
    fetch_seq: u64,
    engine_seq: u64,
}

/// Ephemeral selection state. Destinations stay empty until the fetch
/// tagged `fetch_seq` resolves; a newer selection makes older fetches stale.
pub(crate) struct Selection {
    pub square: Square,
    pub destinations: Vec<Square>,
    pub fetch_seq: u64,
}

impl SessionState {
    pub fn new(session_id: String, config: GameConfig) -> Self {
        let mut state = Self {
            session_id,
            position: PositionToken::standard(),
            turn: PlayerSide::White,
            mode: GameMode::TwoPlayer,
            difficulty: 0,
            flags: MoveFlags::default(),
            selection: None,
            position_history: Vec::new(),
            move_log: Vec::new(),
            pending_promotion: None,
            engine_request: None,
            engine_thinking: false,
            fetch_seq: 0,
            engine_seq: 0,
        };
        state.reset(config);
        state
    }

    /// Reset in place for a new game. Sequence counters are not rewound:
    /// results of requests started before the reset keep stale tags.
    pub fn reset(&mut self, config: GameConfig) {
        self.mode = config.mode;
        self.difficulty = config.difficulty;
        self.position = config.position.unwrap_or_else(PositionToken::standard);
        self.turn = PlayerSide::White;
        self.flags = MoveFlags::default();
        self.selection = None;
        self.position_history.clear();
        self.move_log.clear();
        self.pending_promotion = None;
        self.engine_request = None;
        self.engine_thinking = false;
        self.fetch_seq += 1;
        self.engine_seq += 1;
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            position: self.position.clone(),
            turn: self.turn,
            mode: self.mode,
            difficulty: self.difficulty,
            flags: self.flags,
            is_over: self.is_over(),
            selected: self.selection.as_ref().map(|sel| SelectionSnapshot {
                square: sel.square,
                destinations: sel.destinations.clone(),
            }),
            move_log: self.move_log.clone(),
            history_len: self.position_history.len(),
            undo_available: self.undo_available(),
            engine_thinking: self.engine_thinking,
            pending_promotion: self.pending_promotion,
        }
    }

    pub fn is_over(&self) -> bool {
        self.flags.is_over()
    }

    pub fn undo_available(&self) -> bool {
        !self.position_history.is_empty()
    }

    /// Start a selection on `square`; returns the fetch tag the matching
    /// destinations result must carry.
    pub fn begin_selection(&mut self, square: Square) -> u64 {
        self.fetch_seq += 1;
        self.selection = Some(Selection {
            square,
            destinations: Vec::new(),
            fetch_seq: self.fetch_seq,
        });
        self.fetch_seq
    }

    /// Mark an engine request as owed; returns its tag.
    pub fn begin_engine_request(&mut self) -> u64 {
        self.engine_seq += 1;
        self.engine_request = Some(self.engine_seq);
        self.engine_thinking = true;
        self.engine_seq
    }

    /// Commit an authority-accepted move: one paired push, turn flip, flag
    /// adoption, selection clear.
    pub fn apply_accepted(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<chessdesk_common::PieceKind>,
        new_position: PositionToken,
        flags: MoveFlags,
    ) -> MoveRecord {
        let record = MoveRecord {
            from,
            to,
            promotion,
            mover: self.turn,
        };
        let prior = std::mem::replace(&mut self.position, new_position);
        self.position_history.push(prior);
        self.move_log.push(record.clone());
        self.turn = self.turn.opponent();
        self.flags = flags;
        self.selection = None;
        self.assert_history_symmetry();
        record
    }

    /// Unwind one logical ply.
    ///
    /// In two-player mode this is simply the last move. Against the engine
    /// the meaning depends on whose turn it is: on the human's turn the last
    /// move was the engine's reply and undoing it hands the move back to the
    /// engine (which is deliberately NOT re-invoked); on the engine's turn
    /// the human's own move is unwound, any owed engine reply is invalidated,
    /// and the turn lands on the human's side regardless of what was popped.
    pub fn apply_undo(&mut self) -> Result<MoveRecord, SessionError> {
        let was_engine_turn = self.mode.is_engine_turn(self.turn);
        match (self.position_history.pop(), self.move_log.pop()) {
            (Some(prior), Some(record)) => {
                self.position = prior;
                self.flags = MoveFlags::default();
                self.turn = match self.mode {
                    GameMode::TwoPlayer => record.mover,
                    GameMode::VsEngine { human_side } => {
                        if was_engine_turn {
                            human_side
                        } else {
                            record.mover
                        }
                    }
                };
                if was_engine_turn {
                    self.engine_request = None;
                    self.engine_thinking = false;
                }
                self.selection = None;
                self.pending_promotion = None;
                self.assert_history_symmetry();
                Ok(record)
            }
            (None, None) => Err(SessionError::NothingToUndo),
            _ => Err(SessionError::Internal(
                "history stacks out of step".to_string(),
            )),
        }
    }

    fn assert_history_symmetry(&self) {
        debug_assert_eq!(self.position_history.len(), self.move_log.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessdesk_common::PieceKind;

    fn sq(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    fn two_player_state() -> SessionState {
        SessionState::new("test".to_string(), GameConfig::default())
    }

    fn vs_engine_state(human_side: PlayerSide) -> SessionState {
        SessionState::new(
            "test".to_string(),
            GameConfig {
                mode: GameMode::VsEngine { human_side },
                ..Default::default()
            },
        )
    }

    #[test]
    fn snapshot_initial() {
        let state = two_player_state();
        let snap = state.snapshot();
        assert_eq!(snap.turn, PlayerSide::White);
        assert_eq!(snap.history_len, 0);
        assert!(!snap.undo_available);
        assert!(!snap.is_over);
        assert!(snap.selected.is_none());
    }

    #[test]
    fn accepted_move_pushes_one_pair() {
        let mut state = two_player_state();
        let start = state.position.clone();
        let record = state.apply_accepted(
            sq("e2"),
            sq("e4"),
            None,
            PositionToken::new("after-e4"),
            MoveFlags::default(),
        );
        assert_eq!(record.mover, PlayerSide::White);
        assert_eq!(state.turn, PlayerSide::Black);
        assert_eq!(state.position_history, vec![start]);
        assert_eq!(state.move_log.len(), 1);
    }

    #[test]
    fn undo_restores_position_and_turn() {
        let mut state = two_player_state();
        let start = state.position.clone();
        state.apply_accepted(
            sq("e2"),
            sq("e4"),
            None,
            PositionToken::new("after-e4"),
            MoveFlags::default(),
        );
        let record = state.apply_undo().unwrap();
        assert_eq!(record.from, sq("e2"));
        assert_eq!(state.position, start);
        assert_eq!(state.turn, PlayerSide::White);
        assert!(state.position_history.is_empty());
        assert!(state.move_log.is_empty());
    }

    #[test]
    fn undo_on_empty_history_is_rejected() {
        let mut state = two_player_state();
        assert!(matches!(
            state.apply_undo(),
            Err(SessionError::NothingToUndo)
        ));
    }

    #[test]
    fn undo_clears_game_over() {
        let mut state = two_player_state();
        state.apply_accepted(
            sq("f7"),
            sq("g7"),
            None,
            PositionToken::new("mate"),
            MoveFlags {
                check: true,
                checkmate: true,
                ..Default::default()
            },
        );
        assert!(state.is_over());
        state.apply_undo().unwrap();
        assert!(!state.is_over());
    }

    #[test]
    fn vs_engine_undo_on_human_turn_hands_move_back_to_engine() {
        let mut state = vs_engine_state(PlayerSide::White);
        // Human moves, engine replies.
        state.apply_accepted(
            sq("e2"),
            sq("e4"),
            None,
            PositionToken::new("after-e4"),
            MoveFlags::default(),
        );
        state.apply_accepted(
            sq("e7"),
            sq("e5"),
            None,
            PositionToken::new("after-e5"),
            MoveFlags::default(),
        );
        assert_eq!(state.turn, PlayerSide::White);

        let record = state.apply_undo().unwrap();
        assert_eq!(record.mover, PlayerSide::Black);
        assert_eq!(state.position, PositionToken::new("after-e4"));
        assert_eq!(state.turn, PlayerSide::Black);
        assert_eq!(state.position_history.len(), 1);
    }

    #[test]
    fn vs_engine_undo_on_engine_turn_unwinds_human_move() {
        let mut state = vs_engine_state(PlayerSide::White);
        let start = state.position.clone();
        state.apply_accepted(
            sq("e2"),
            sq("e4"),
            None,
            PositionToken::new("after-e4"),
            MoveFlags::default(),
        );
        let tag = state.begin_engine_request();
        assert_eq!(state.engine_request, Some(tag));

        let record = state.apply_undo().unwrap();
        assert_eq!(record.mover, PlayerSide::White);
        assert_eq!(state.position, start);
        assert_eq!(state.turn, PlayerSide::White);
        assert_eq!(state.engine_request, None);
        assert!(!state.engine_thinking);
        assert!(state.position_history.is_empty());
    }

    #[test]
    fn undo_clears_selection_and_promotion() {
        let mut state = two_player_state();
        state.apply_accepted(
            sq("e2"),
            sq("e4"),
            None,
            PositionToken::new("after-e4"),
            MoveFlags::default(),
        );
        state.begin_selection(sq("g8"));
        state.pending_promotion = Some(PromotionPrompt {
            color: PlayerSide::Black,
            from: sq("a2"),
            to: sq("a1"),
        });
        state.apply_undo().unwrap();
        assert!(state.selection.is_none());
        assert!(state.pending_promotion.is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = vs_engine_state(PlayerSide::White);
        state.apply_accepted(
            sq("e2"),
            sq("e4"),
            None,
            PositionToken::new("after-e4"),
            MoveFlags::default(),
        );
        state.begin_engine_request();
        state.reset(GameConfig {
            mode: GameMode::TwoPlayer,
            difficulty: 1,
            position: Some(PositionToken::new("custom")),
        });
        assert_eq!(state.position, PositionToken::new("custom"));
        assert_eq!(state.turn, PlayerSide::White);
        assert!(state.position_history.is_empty());
        assert!(state.move_log.is_empty());
        assert_eq!(state.engine_request, None);
        assert_eq!(state.mode, GameMode::TwoPlayer);
    }

    #[test]
    fn promotion_piece_recorded_in_log() {
        let mut state = two_player_state();
        state.apply_accepted(
            sq("g7"),
            sq("g8"),
            Some(PieceKind::Queen),
            PositionToken::new("promoted"),
            MoveFlags::default(),
        );
        assert_eq!(state.move_log[0].promotion, Some(PieceKind::Queen));
    }
}
