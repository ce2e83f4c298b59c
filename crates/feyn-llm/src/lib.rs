pub mod client;
pub mod provider;
pub mod transport;

pub use client::FailoverClient;
pub use provider::QianfanProvider;
pub use transport::{ChatMessage, ChatTransport, HttpTransport};
