//! Outbound Adapters
//!
//! HTTP clients for the payment gateway and the text generation API.

mod gemini;
mod razorpay;
mod retry;

pub use gemini::GeminiGenerator;
pub use razorpay::RazorpayGateway;
pub use retry::RetryPolicy;
