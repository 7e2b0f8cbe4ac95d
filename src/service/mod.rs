//! Operations over the storage collaborator, one transaction per call.

pub mod boards;
mod placement;
pub mod relocation;

pub use boards::BoardService;
pub use relocation::{MoveCard, MoveList, RelocationService};
