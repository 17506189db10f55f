//! Core engine for governing shared NEAR accounts through a multisig
//! contract: decoding raw lockup contract state into typed records, building
//! governed requests with explicit gas and deposit budgets, sequencing
//! dependent multi-step operations, and explaining pending actions in human
//! terms.
//!
//! All network access goes through the capability traits in [`chain`];
//! nothing here signs, stores keys, or reaches for globals.

pub mod action;
pub mod chain;
pub mod codec;
pub mod config;
pub mod defi;
pub mod explain;
pub mod lockup;
pub mod multisig;
pub mod request;
pub mod sequencer;
pub mod token;
