//! Bridge session: the state machine joining the two call legs.

pub mod session;
pub mod transcript;

pub use session::{BridgeSession, SessionState};
pub use transcript::Transcript;
