//! HTTP implementation of the arbiter contracts.
//!
//! Speaks the arbiter's JSON protocol: `POST /validate_move`,
//! `POST /get_legal_moves`, and `POST /get_bot_move`. Wire DTOs are private
//! to this module; everything crossing the trait boundary uses the
//! project-owned types from `chessdesk-common`.

use async_trait::async_trait;
use chessdesk_common::{
    AuthorityVerdict, MoveDetail, MoveFlags, PieceKind, PositionToken, Square,
};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::traits::{MoveAuthority, MoveEngine};

/// Client for an arbiter service hosting both the move authority and the
/// engine endpoints.
#[derive(Clone)]
pub struct HttpArbiter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArbiter {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/').to_string();
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ClientError::InvalidAddress(base_url));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: trimmed,
        })
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> ClientResult<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            // Error replies carry {"error": "..."} with a non-2xx status.
            let reason = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("{} returned {}", path, status));
            return Err(ClientError::Service(reason));
        }

        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl MoveAuthority for HttpArbiter {
    async fn validate_move(
        &self,
        position: &PositionToken,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> ClientResult<AuthorityVerdict> {
        let request = ValidateMoveRequest {
            fen: position.as_str(),
            from: from.to_string(),
            to: to.to_string(),
            promotion: promotion.map(|p| p.to_char_lower().to_string()),
        };
        let response: ValidateMoveResponse = self.post("/validate_move", &request).await?;
        verdict_from_wire(response)
    }

    async fn legal_moves(
        &self,
        position: &PositionToken,
        from: Option<Square>,
    ) -> ClientResult<Vec<MoveDetail>> {
        let request = LegalMovesRequest {
            fen: position.as_str(),
            square: from.map(|sq| sq.to_string()),
        };
        let response: LegalMovesResponse = self.post("/get_legal_moves", &request).await?;
        response
            .legal_moves
            .into_iter()
            .map(move_from_wire)
            .collect()
    }
}

#[async_trait]
impl MoveEngine for HttpArbiter {
    async fn choose_move(
        &self,
        position: &PositionToken,
        difficulty: u8,
    ) -> ClientResult<MoveDetail> {
        let request = BotMoveRequest {
            fen: position.as_str(),
            difficulty,
        };
        let response: BotMoveResponse = self.post("/get_bot_move", &request).await?;

        if let Some(error) = response.error {
            return Err(ClientError::Service(error));
        }
        let (from, to) = match (response.from_square, response.to_square) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(ClientError::InvalidData(
                    "bot move reply missing squares".to_string(),
                ))
            }
        };
        move_from_wire(WireMove {
            from,
            to,
            promotion: response.promotion,
        })
    }
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct ValidateMoveRequest<'a> {
    fen: &'a str,
    from: String,
    to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    promotion: Option<String>,
}

#[derive(Deserialize)]
struct ValidateMoveResponse {
    valid: bool,
    #[serde(default)]
    fen: Option<String>,
    #[serde(default)]
    check: bool,
    #[serde(default)]
    checkmate: bool,
    #[serde(default)]
    stalemate: bool,
    #[serde(default)]
    draw: bool,
    #[serde(default)]
    requires_promotion: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct LegalMovesRequest<'a> {
    fen: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    square: Option<String>,
}

#[derive(Deserialize)]
struct LegalMovesResponse {
    legal_moves: Vec<WireMove>,
}

#[derive(Deserialize)]
struct WireMove {
    from: String,
    to: String,
    #[serde(default)]
    promotion: Option<String>,
}

#[derive(Serialize)]
struct BotMoveRequest<'a> {
    fen: &'a str,
    difficulty: u8,
}

#[derive(Deserialize)]
struct BotMoveResponse {
    #[serde(default)]
    from_square: Option<String>,
    #[serde(default)]
    to_square: Option<String>,
    #[serde(default)]
    promotion: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

fn verdict_from_wire(response: ValidateMoveResponse) -> ClientResult<AuthorityVerdict> {
    if response.requires_promotion {
        return Ok(AuthorityVerdict::PromotionRequired);
    }
    if !response.valid {
        return Ok(AuthorityVerdict::Rejected {
            reason: response
                .error
                .unwrap_or_else(|| "Illegal move".to_string()),
        });
    }
    let fen = response.fen.ok_or_else(|| {
        ClientError::InvalidData("accepted move reply missing position".to_string())
    })?;
    Ok(AuthorityVerdict::Accepted {
        position: PositionToken::new(fen),
        flags: MoveFlags {
            check: response.check,
            checkmate: response.checkmate,
            stalemate: response.stalemate,
            draw: response.draw,
        },
    })
}

fn parse_square(name: &str) -> ClientResult<Square> {
    Square::parse(name)
        .ok_or_else(|| ClientError::InvalidData(format!("bad square name: {name:?}")))
}

fn move_from_wire(mv: WireMove) -> ClientResult<MoveDetail> {
    let promotion = match mv.promotion.as_deref() {
        None | Some("") => None,
        Some(p) => Some(
            p.chars()
                .next()
                .and_then(PieceKind::from_char)
                .ok_or_else(|| ClientError::InvalidData(format!("bad promotion piece: {p:?}")))?,
        ),
    };
    Ok(MoveDetail {
        from: parse_square(&mv.from)?,
        to: parse_square(&mv.to)?,
        promotion,
    })
}
