//! # Legal Hex
//!
//! Application service layer and adapters for the legal assistance service.
//!
//! ## Architecture
//!
//! - `service/` - Application services (accounts, payments, chat)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `outbound/` - Payment gateway and text generation clients
//!
//! The services are generic over `R: AccountStore`, allowing different
//! store implementations to be injected; upstream ports are `Arc<dyn _>`.

pub mod inbound;
pub mod openapi;
pub mod outbound;
pub mod service;


pub use service::{
    AccountService, AccountSettings, ChatService, PaymentService, PaymentSettings,
};
