pub mod client;

pub use client::WebpayClient;
