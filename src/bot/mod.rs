/// Command and message handlers
pub mod handlers;
/// Common messaging utilities
pub mod messaging;
/// Reply texts and outcome rendering
pub mod views;
