//! Mock arbiter implementation for testing
//!
//! Only compiled in test mode or with the `mock` feature. Responses are
//! configured with builder methods; every call is recorded in a log so
//! tests can assert on what the controller asked for. Per-square fetch
//! latency and engine latency make stale-result interleavings
//! reproducible under `tokio::time::pause`.

use crate::error::{ClientError, ClientResult};
use crate::traits::{MoveAuthority, MoveEngine};
use async_trait::async_trait;
use chessdesk_common::{AuthorityVerdict, MoveDetail, PieceKind, PositionToken, Square};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type ValidateFn = dyn Fn(&PositionToken, Square, Square, Option<PieceKind>) -> ClientResult<AuthorityVerdict>
    + Send
    + Sync;
type LegalMovesFn =
    dyn Fn(&PositionToken, Option<Square>) -> ClientResult<Vec<MoveDetail>> + Send + Sync;

/// Scriptable stand-in for both collaborator services.
pub struct MockArbiter {
    validate: Option<Box<ValidateFn>>,
    legal_moves: Option<Box<LegalMovesFn>>,
    engine: EngineBehavior,
    engine_delay: Duration,
    fetch_delays: HashMap<Square, Duration>,
    calls: Mutex<Vec<MockCall>>,
}

enum EngineBehavior {
    NotConfigured,
    Reply(MoveDetail),
    Fail(String),
    /// Never answers; models a hung engine call.
    Stall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Validate {
        position: PositionToken,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    },
    LegalMoves {
        position: PositionToken,
        from: Option<Square>,
    },
    ChooseMove {
        position: PositionToken,
        difficulty: u8,
    },
}

impl Default for MockArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArbiter {
    pub fn new() -> Self {
        Self {
            validate: None,
            legal_moves: None,
            engine: EngineBehavior::NotConfigured,
            engine_delay: Duration::ZERO,
            fetch_delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Configure the validate_move response.
    pub fn with_validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&PositionToken, Square, Square, Option<PieceKind>) -> ClientResult<AuthorityVerdict>
            + Send
            + Sync
            + 'static,
    {
        self.validate = Some(Box::new(f));
        self
    }

    /// Configure the legal_moves response.
    pub fn with_legal_moves<F>(mut self, f: F) -> Self
    where
        F: Fn(&PositionToken, Option<Square>) -> ClientResult<Vec<MoveDetail>>
            + Send
            + Sync
            + 'static,
    {
        self.legal_moves = Some(Box::new(f));
        self
    }

    /// Engine always answers with `mv`.
    pub fn with_engine_reply(mut self, mv: MoveDetail) -> Self {
        self.engine = EngineBehavior::Reply(mv);
        self
    }

    /// Engine always fails with a service error.
    pub fn with_engine_failure(mut self, reason: impl Into<String>) -> Self {
        self.engine = EngineBehavior::Fail(reason.into());
        self
    }

    /// Engine never answers.
    pub fn with_engine_stalled(mut self) -> Self {
        self.engine = EngineBehavior::Stall;
        self
    }

    /// Delay engine replies by `delay`.
    pub fn with_engine_delay(mut self, delay: Duration) -> Self {
        self.engine_delay = delay;
        self
    }

    /// Delay legal-move fetches for `from` by `delay`.
    pub fn with_fetch_delay(mut self, from: Square, delay: Duration) -> Self {
        self.fetch_delays.insert(from, delay);
        self
    }

    /// Everything the controller asked for, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn legal_move_fetches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::LegalMoves { .. }))
            .count()
    }

    pub fn validate_calls(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::Validate { .. }))
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MoveAuthority for MockArbiter {
    async fn validate_move(
        &self,
        position: &PositionToken,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> ClientResult<AuthorityVerdict> {
        self.record(MockCall::Validate {
            position: position.clone(),
            from,
            to,
            promotion,
        });
        match &self.validate {
            Some(f) => f(position, from, to, promotion),
            None => Err(ClientError::NotConfigured("validate_move".to_string())),
        }
    }

    async fn legal_moves(
        &self,
        position: &PositionToken,
        from: Option<Square>,
    ) -> ClientResult<Vec<MoveDetail>> {
        self.record(MockCall::LegalMoves {
            position: position.clone(),
            from,
        });
        if let Some(delay) = from.and_then(|sq| self.fetch_delays.get(&sq)) {
            tokio::time::sleep(*delay).await;
        }
        match &self.legal_moves {
            Some(f) => f(position, from),
            None => Err(ClientError::NotConfigured("legal_moves".to_string())),
        }
    }
}

#[async_trait]
impl MoveEngine for MockArbiter {
    async fn choose_move(
        &self,
        position: &PositionToken,
        difficulty: u8,
    ) -> ClientResult<MoveDetail> {
        self.record(MockCall::ChooseMove {
            position: position.clone(),
            difficulty,
        });
        if !self.engine_delay.is_zero() {
            tokio::time::sleep(self.engine_delay).await;
        }
        match &self.engine {
            EngineBehavior::NotConfigured => {
                Err(ClientError::NotConfigured("choose_move".to_string()))
            }
            EngineBehavior::Reply(mv) => Ok(*mv),
            EngineBehavior::Fail(reason) => Err(ClientError::Service(reason.clone())),
            EngineBehavior::Stall => std::future::pending().await,
        }
    }
}
