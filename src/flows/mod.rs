//! Interactive flows built on top of the integration client.
//!
//! Each flow owns the state behind one screen of the console and catches its
//! own failures, folding them into form errors and session notices.

pub mod connections;
pub mod orders;
pub mod webhooks;
