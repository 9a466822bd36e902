pub mod client;

pub use client::OkxClient;
