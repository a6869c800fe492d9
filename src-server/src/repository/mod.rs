//! Repository Layer
//!
//! Data access for boards, lists, cards and invitations. Every method runs
//! its statements inside one transaction on the shared connection.

mod board_repo;
mod card;
mod db;
mod invitation_repo;
mod list;
mod plan_sql;
mod traits;
mod user_repo;

#[cfg(test)]
mod tests;

pub use board_repo::BoardRepository;
pub use card::{
    CardDetailOperations, CardPositioningOperations, CardRepository, DeletedCard,
    RemovedAttachment,
};
pub use db::{init_db, DbConn};
pub use invitation_repo::InvitationRepository;
pub use list::{DeletedList, ListPositioningOperations, ListRepository};
pub use traits::Repository;
pub use user_repo::UserRepository;

/// Every repository over one shared connection
pub struct Repositories {
    pub boards: BoardRepository,
    pub lists: ListRepository,
    pub cards: CardRepository,
    pub invitations: InvitationRepository,
    pub users: UserRepository,
}

impl Repositories {
    pub fn new(conn: DbConn) -> Self {
        Self {
            boards: BoardRepository::new(conn.clone()),
            lists: ListRepository::new(conn.clone()),
            cards: CardRepository::new(conn.clone()),
            invitations: InvitationRepository::new(conn.clone()),
            users: UserRepository::new(conn),
        }
    }
}
