pub mod client;

pub use client::CoinMarketCapClient;
