//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod gateway;
mod generation;
mod store;

pub use gateway::{GatewayError, GatewayOrder, OrderNotes, OrderRequest, PaymentGateway};
pub use generation::{GenerationError, GenerationRequest, PromptTurn, TextGenerator};
pub use store::AccountStore;
