pub mod client;
pub mod config;
pub mod conversation;
pub mod input;
pub mod state;

// Re-export main types for convenience
pub use client::{Ask, QueryClient, QueryError};
pub use config::{ClientConfig, Config};
pub use conversation::{Conversation, ConversationView, Entry, SubmitError};
pub use input::InputBuffer;
pub use state::{Message, Sender};
