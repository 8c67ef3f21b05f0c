//! Console realization of the board view.
//!
//! Renders the position and reports square occupancy back to the session
//! controller. The controller treats position tokens as opaque; parsing
//! them for display is this view's job, like any board widget.

use chessdesk_common::{OccupiedSquare, PieceKind, PlayerSide, PositionToken, Square};
use cozy_chess::Board;

pub struct BoardView {
    board: Option<Board>,
    flipped: bool,
}

impl BoardView {
    pub fn new() -> Self {
        Self {
            board: None,
            flipped: false,
        }
    }

    /// Toggle orientation (black at the bottom).
    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn set_position(&mut self, position: &PositionToken) {
        match position.as_str().parse::<Board>() {
            Ok(board) => self.board = Some(board),
            Err(e) => {
                tracing::error!(error = %e, "position token is not renderable");
                self.board = None;
            }
        }
    }

    /// What is sitting on `square`, for activation reports.
    pub fn occupant(&self, square: Square) -> Option<OccupiedSquare> {
        let board = self.board.as_ref()?;
        let sq = to_cozy(square);
        let kind = board.piece_on(sq)?;
        let color = board.color_on(sq)?;
        Some(OccupiedSquare {
            side: match color {
                cozy_chess::Color::White => PlayerSide::White,
                cozy_chess::Color::Black => PlayerSide::Black,
            },
            kind: from_cozy_piece(kind),
        })
    }

    pub fn render(&self) -> String {
        let Some(board) = &self.board else {
            return "(no position)".to_string();
        };
        let mut ranks: Vec<u8> = (0..8).collect();
        let mut files: Vec<u8> = (0..8).collect();
        if self.flipped {
            files.reverse();
        } else {
            ranks.reverse();
        }

        let mut out = String::new();
        for &rank in &ranks {
            out.push((b'1' + rank) as char);
            out.push(' ');
            for &file in &files {
                let sq = cozy_chess::Square::new(
                    cozy_chess::File::index(file as usize),
                    cozy_chess::Rank::index(rank as usize),
                );
                let glyph = match (board.piece_on(sq), board.color_on(sq)) {
                    (Some(piece), Some(color)) => {
                        let c = from_cozy_piece(piece).to_char_lower();
                        match color {
                            cozy_chess::Color::White => c.to_ascii_uppercase(),
                            cozy_chess::Color::Black => c,
                        }
                    }
                    _ => '.',
                };
                out.push(glyph);
                out.push(' ');
            }
            out.push('\n');
        }
        out.push_str("  ");
        for &file in &files {
            out.push((b'a' + file) as char);
            out.push(' ');
        }
        while out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

fn to_cozy(square: Square) -> cozy_chess::Square {
    cozy_chess::Square::new(
        cozy_chess::File::index(square.file() as usize),
        cozy_chess::Rank::index(square.rank() as usize),
    )
}

fn from_cozy_piece(piece: cozy_chess::Piece) -> PieceKind {
    match piece {
        cozy_chess::Piece::Pawn => PieceKind::Pawn,
        cozy_chess::Piece::Knight => PieceKind::Knight,
        cozy_chess::Piece::Bishop => PieceKind::Bishop,
        cozy_chess::Piece::Rook => PieceKind::Rook,
        cozy_chess::Piece::Queen => PieceKind::Queen,
        cozy_chess::Piece::King => PieceKind::King,
    }
}
