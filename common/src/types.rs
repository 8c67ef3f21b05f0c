//! Canonical square, piece, and position types for the project.
//! Wire representations are implementation details of the client crate.

use std::fmt;
use std::str::FromStr;

/// Conventional starting position, passed through to the arbiter verbatim.
const STANDARD_START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A board square in algebraic form ("e4"). File and rank are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid square: {0}")]
pub struct SquareParseError(pub String);

impl Square {
    /// Build a square from 0-based file and rank indices.
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    pub fn file(self) -> u8 {
        self.file
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    /// Parse an algebraic square name, returning None on malformed input.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        if !file.is_ascii_lowercase() || !rank.is_ascii_digit() {
            return None;
        }
        Self::new(file as u8 - b'a', (rank as u8).wrapping_sub(b'1'))
    }
}

impl FromStr for Square {
    type Err = SquareParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SquareParseError(s.to_string()))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file) as char,
            (b'1' + self.rank) as char
        )
    }
}

/// Project-owned piece type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub fn to_char_lower(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    pub fn to_char_upper(self) -> char {
        self.to_char_lower().to_ascii_uppercase()
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char_upper())
    }
}

/// Side of the board a player controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSide {
    White,
    Black,
}

impl PlayerSide {
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl fmt::Display for PlayerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque serialized board state. The session controller compares tokens
/// by value and passes them through to the arbiter; it never parses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionToken(String);

impl PositionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The conventional starting position.
    pub fn standard() -> Self {
        Self(STANDARD_START.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PositionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PositionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Game mode determines undo depth and engine scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    TwoPlayer,
    VsEngine { human_side: PlayerSide },
}

impl GameMode {
    /// The engine's side, if an engine participates.
    pub fn engine_side(self) -> Option<PlayerSide> {
        match self {
            Self::TwoPlayer => None,
            Self::VsEngine { human_side } => Some(human_side.opponent()),
        }
    }

    pub fn is_engine_turn(self, turn: PlayerSide) -> bool {
        self.engine_side() == Some(turn)
    }
}

/// What the board view reports sitting on an activated square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupiedSquare {
    pub side: PlayerSide,
    pub kind: PieceKind,
}
