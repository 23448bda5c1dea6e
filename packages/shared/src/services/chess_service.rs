use chess::{Board, BoardStatus, ChessMove, MoveGen, Piece, Square};
use std::str::FromStr;

use crate::{
    models::outcome::{Color, Terminal},
    services::errors::chess_service_errors::ChessServiceError,
};

/// Half-moves without a capture or pawn move after which the game ends automatically.
const AUTOMATIC_DRAW_HALFMOVES: u32 = 150;
/// Occurrences of one position after which the game ends automatically.
const AUTOMATIC_REPETITIONS: usize = 5;

/// Board state plus the counters the `chess` crate does not track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
    /// Hashes of positions since the last irreversible move, current one last.
    history: Vec<u64>,
}

impl Position {
    pub fn starting() -> Self {
        let board = Board::default();
        Position {
            board,
            halfmove_clock: 0,
            fullmove_number: 1,
            history: vec![board.get_hash()],
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }
}

/// Result of applying one move code.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub position: Position,
    /// Standard algebraic notation.
    pub notation: String,
    /// Normalized UCI code.
    pub move_code: String,
}

#[derive(Clone, Default)]
pub struct ChessService;

impl ChessService {
    pub fn new() -> Self {
        ChessService
    }

    pub fn initial_position(&self) -> Position {
        Position::starting()
    }

    pub fn decode(&self, fen: &str) -> Result<Position, ChessServiceError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(ChessServiceError::InvalidPosition(format!(
                "Invalid FEN: {}",
                fen
            )));
        }

        let board = Board::from_str(&format!("{} 0 1", fields[..4].join(" ")))
            .map_err(|e| ChessServiceError::InvalidPosition(format!("Invalid FEN: {}", e)))?;

        let halfmove_clock = parse_counter(fields.get(4), 0, fen)?;
        let fullmove_number = parse_counter(fields.get(5), 1, fen)?.max(1);

        Ok(Position {
            board,
            halfmove_clock,
            fullmove_number,
            history: vec![board.get_hash()],
        })
    }

    pub fn encode(&self, position: &Position) -> String {
        let rendered = format!("{}", position.board);
        let fields: Vec<&str> = rendered.split_whitespace().take(4).collect();
        format!(
            "{} {} {}",
            fields.join(" "),
            position.halfmove_clock,
            position.fullmove_number
        )
    }

    pub fn side_to_move(&self, position: &Position) -> Color {
        position.board.side_to_move().into()
    }

    pub fn legal(&self, position: &Position, move_code: &str) -> bool {
        parse_move_code(move_code)
            .map(|mv| position.board.legal(mv))
            .unwrap_or(false)
    }

    /// Legal moves for the side to move, as UCI codes.
    pub fn legal_moves(&self, position: &Position) -> Vec<String> {
        MoveGen::new_legal(&position.board)
            .map(format_move_code)
            .collect()
    }

    pub fn apply(
        &self,
        position: &Position,
        move_code: &str,
    ) -> Result<AppliedMove, ChessServiceError> {
        let chess_move = parse_move_code(move_code)?;

        let board = position.board;
        if !MoveGen::new_legal(&board).any(|m| m == chess_move) {
            return Err(ChessServiceError::IllegalMove(format!(
                "{} is not legal in this position",
                move_code
            )));
        }

        let next = board.make_move_new(chess_move);
        let irreversible = board.piece_on(chess_move.get_source()) == Some(Piece::Pawn)
            || board.piece_on(chess_move.get_dest()).is_some();

        let (halfmove_clock, mut history) = if irreversible {
            (0, Vec::new())
        } else {
            (position.halfmove_clock + 1, position.history.clone())
        };
        history.push(next.get_hash());

        let fullmove_number = if board.side_to_move() == chess::Color::Black {
            position.fullmove_number + 1
        } else {
            position.fullmove_number
        };

        Ok(AppliedMove {
            notation: san(&board, &next, chess_move),
            move_code: format_move_code(chess_move),
            position: Position {
                board: next,
                halfmove_clock,
                fullmove_number,
                history,
            },
        })
    }

    pub fn is_terminal(&self, position: &Position) -> bool {
        self.classify(position).is_some()
    }

    /// Terminal classification, or `None` while the game continues.
    pub fn classify(&self, position: &Position) -> Option<Terminal> {
        match position.board.status() {
            BoardStatus::Checkmate => {
                let loser: Color = position.board.side_to_move().into();
                return Some(Terminal::Checkmate {
                    winner: loser.opposite(),
                });
            }
            BoardStatus::Stalemate => return Some(Terminal::Stalemate),
            BoardStatus::Ongoing => {}
        }

        if insufficient_material(&position.board) {
            return Some(Terminal::InsufficientMaterial);
        }

        if position.halfmove_clock >= AUTOMATIC_DRAW_HALFMOVES {
            return Some(Terminal::FiftyMove);
        }

        let current = position.board.get_hash();
        let occurrences = position.history.iter().filter(|h| **h == current).count();
        if occurrences >= AUTOMATIC_REPETITIONS {
            return Some(Terminal::Repetition);
        }

        None
    }
}

fn parse_counter(field: Option<&&str>, default: u32, fen: &str) -> Result<u32, ChessServiceError> {
    match field {
        Some(value) => value
            .parse()
            .map_err(|_| ChessServiceError::InvalidPosition(format!("Invalid FEN: {}", fen))),
        None => Ok(default),
    }
}

fn parse_move_code(move_code: &str) -> Result<ChessMove, ChessServiceError> {
    let code = move_code.trim();
    if !code.is_ascii() || !(code.len() == 4 || code.len() == 5) {
        return Err(ChessServiceError::InvalidMove(format!(
            "Malformed move code: {}",
            move_code
        )));
    }

    let from_sq = Square::from_str(&code[0..2])
        .map_err(|_| ChessServiceError::InvalidMove("Invalid from square".to_string()))?;
    let to_sq = Square::from_str(&code[2..4])
        .map_err(|_| ChessServiceError::InvalidMove("Invalid to square".to_string()))?;

    let promotion = match code.get(4..5) {
        Some(p) => match p.to_ascii_lowercase().as_str() {
            "q" => Some(Piece::Queen),
            "r" => Some(Piece::Rook),
            "b" => Some(Piece::Bishop),
            "n" => Some(Piece::Knight),
            _ => {
                return Err(ChessServiceError::InvalidMove(
                    "Invalid promotion piece".to_string(),
                ))
            }
        },
        None => None,
    };

    Ok(ChessMove::new(from_sq, to_sq, promotion))
}

fn format_move_code(chess_move: ChessMove) -> String {
    let promotion = match chess_move.get_promotion() {
        Some(Piece::Queen) => "q",
        Some(Piece::Rook) => "r",
        Some(Piece::Bishop) => "b",
        Some(Piece::Knight) => "n",
        _ => "",
    };
    format!(
        "{}{}{}",
        chess_move.get_source(),
        chess_move.get_dest(),
        promotion
    )
}

fn piece_letter(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "",
        Piece::Knight => "N",
        Piece::Bishop => "B",
        Piece::Rook => "R",
        Piece::Queen => "Q",
        Piece::King => "K",
    }
}

/// Standard algebraic notation for a legal move played on `board`.
fn san(board: &Board, next: &Board, chess_move: ChessMove) -> String {
    let source = chess_move.get_source();
    let dest = chess_move.get_dest();
    let piece = board.piece_on(source).unwrap_or(Piece::Pawn);
    let file_distance =
        (source.get_file().to_index() as i32 - dest.get_file().to_index() as i32).abs();

    let mut notation = if piece == Piece::King && file_distance == 2 {
        if dest.get_file().to_index() > source.get_file().to_index() {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else if piece == Piece::Pawn {
        // En passant captures land on an empty square but always change file.
        let mut text = if file_distance != 0 {
            format!("{}x{}", file_char(source), dest)
        } else {
            dest.to_string()
        };
        if let Some(promotion) = chess_move.get_promotion() {
            text.push('=');
            text.push_str(piece_letter(promotion));
        }
        text
    } else {
        let rivals: Vec<Square> = MoveGen::new_legal(board)
            .filter(|m| {
                m.get_dest() == dest
                    && m.get_source() != source
                    && board.piece_on(m.get_source()) == Some(piece)
            })
            .map(|m| m.get_source())
            .collect();

        let mut text = piece_letter(piece).to_string();
        if !rivals.is_empty() {
            let shares_file = rivals.iter().any(|s| s.get_file() == source.get_file());
            let shares_rank = rivals.iter().any(|s| s.get_rank() == source.get_rank());
            if !shares_file {
                text.push(file_char(source));
            } else if !shares_rank {
                text.push(rank_char(source));
            } else {
                text.push(file_char(source));
                text.push(rank_char(source));
            }
        }
        if board.piece_on(dest).is_some() {
            text.push('x');
        }
        text.push_str(&dest.to_string());
        text
    };

    if next.status() == BoardStatus::Checkmate {
        notation.push('#');
    } else if next.checkers().popcnt() > 0 {
        notation.push('+');
    }
    notation
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

fn insufficient_material(board: &Board) -> bool {
    let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }

    let knights = board.pieces(Piece::Knight).popcnt();
    let bishops = *board.pieces(Piece::Bishop);
    if knights + bishops.popcnt() <= 1 {
        return true;
    }
    if knights > 0 {
        return false;
    }

    let mut shades = bishops.map(|sq| (sq.get_file().to_index() + sq.get_rank().to_index()) % 2);
    match shades.next() {
        Some(first) => shades.all(|shade| shade == first),
        None => true,
    }
}
