pub mod invite;
pub mod message;
pub mod ratelimit;
pub mod room;
pub mod state;
pub mod user;

pub use message::Message;
pub use room::Room;
pub use state::{AuthOutcome, ChatState, OutboundTx, StatusSummary};
pub use user::User;
