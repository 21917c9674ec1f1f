// Perft harness: move-generator validation by exhaustive move-path counting
pub mod board;
pub mod harness;
pub mod perft;

pub use board::{PerftBoard, PerftMove, Position};
pub use perft::{divide, perft, perft_parallel, DepthResult, MoveStack, Perft};
