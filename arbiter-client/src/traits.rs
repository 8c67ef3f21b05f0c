//! Collaborator service contracts consumed by the session controller.
//! Implemented by both the HTTP client and the mock arbiter.

use crate::error::ClientResult;
use async_trait::async_trait;
use chessdesk_common::{AuthorityVerdict, MoveDetail, PieceKind, PositionToken, Square};

/// The remote move authority: the only source of truth for move legality.
#[async_trait]
pub trait MoveAuthority: Send + Sync {
    /// Ask the authority to validate and apply a move against `position`.
    ///
    /// The returned verdict carries the successor position on acceptance;
    /// the caller never derives positions locally.
    async fn validate_move(
        &self,
        position: &PositionToken,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> ClientResult<AuthorityVerdict>;

    /// Enumerate legal moves for `position`, optionally restricted to moves
    /// originating at `from`.
    async fn legal_moves(
        &self,
        position: &PositionToken,
        from: Option<Square>,
    ) -> ClientResult<Vec<MoveDetail>>;
}

/// The automated opponent.
#[async_trait]
pub trait MoveEngine: Send + Sync {
    /// Ask the engine to pick a move for `position`. `difficulty` is opaque
    /// to the session controller and forwarded verbatim.
    async fn choose_move(
        &self,
        position: &PositionToken,
        difficulty: u8,
    ) -> ClientResult<MoveDetail>;
}
