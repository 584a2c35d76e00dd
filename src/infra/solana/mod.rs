pub mod client;

pub use client::SolanaLedgerGateway;
