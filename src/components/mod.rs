//! UI Components
//!
//! Leptos components for the home page and the board page.

mod board_page;
mod boards_home;
mod card_detail;
mod card_tile;
mod delete_confirm_button;
mod invitation_inbox;
mod list_column;
mod name_form;

pub use board_page::BoardPage;
pub use boards_home::BoardsHome;
pub use card_detail::CardDetail;
pub use card_tile::CardTile;
pub use delete_confirm_button::DeleteConfirmButton;
pub use invitation_inbox::InvitationInbox;
pub use list_column::ListColumn;
pub use name_form::NameForm;
