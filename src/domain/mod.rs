pub mod board;
pub mod card;
pub mod ids;
pub mod list;
pub mod sequence;

pub use board::{Board, BoardDetail, ListDetail};
pub use card::Card;
pub use ids::{BoardId, CardId, ListId};
pub use list::List;
pub use sequence::{is_strictly_ordered, rebalance, sort_sequence, Orderable};
