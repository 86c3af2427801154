pub mod session;
pub mod session_store;

pub use session::Session;
pub use session_store::{SessionEvent, SessionStore};
