//! Conversation state: transcript, timing, and the turn coordinator

mod coordinator;
mod history;
mod telemetry;

pub use coordinator::{TurnCoordinator, TurnOutcome, TurnState};
pub use history::{ConversationHistory, Role, Turn};
pub use telemetry::{TimingSample, TurnTimer};
