mod change;
mod conversation;
mod message;
mod post;
mod relation;
mod unit;
mod user;
mod view;

pub use change::*;
pub use conversation::*;
pub use message::*;
pub use post::*;
pub use relation::*;
pub use unit::*;
pub use user::*;
pub use view::*;
