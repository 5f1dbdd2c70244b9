pub mod events;
pub mod expansion;

// Re-export the essential types
pub use events::{Cursor, EngineEvent, EventKind, ListenerId, Subscription};
pub use expansion::{ClusterExpansionController, ExpansionState, ExpansionTicket};
