//! Kanban Core
//!
//! Ordered-collection position engine shared by the board client and server.
//!
//! Layers, leaves first:
//! - position: dense position model and the same-scope range-shift calculator
//! - planner: move plans (same-scope reposition, cross-scope move, compaction)
//! - model / command / change / frame: data model and wire types
//! - view: client-side board and card caches
//! - drag: optimistic drag-gesture reducer
//! - merge: remote change merger
//! - session: per-board UI state object tying the client pieces together

pub mod change;
pub mod command;
pub mod drag;
pub mod error;
pub mod frame;
pub mod merge;
pub mod model;
pub mod planner;
pub mod position;
pub mod session;
pub mod view;

pub use change::{ChangeMessage, Channel};
pub use command::{CardMoveValues, CommandResponse, MoveCommand};
pub use drag::{DragPhase, DragReducer, DragSubject, DropOutcome, HoverTarget, PendingMove};
pub use error::{CommandError, CommandResult};
pub use frame::{ClientFrame, ServerFrame};
pub use merge::{MergeOutcome, RemoteMerger};
pub use model::{
    Activity, Attachment, Board, Card, Invitation, List, ListWithCards, User, Visibility,
};
pub use planner::{plan_cross_scope, plan_move, plan_reposition, MovePlan, Relocation, ShiftStep};
pub use position::{is_dense, Position, Positioned, ShiftRange};
pub use session::{BoardSession, Resolution};
pub use view::{BoardView, CardDetailView};
