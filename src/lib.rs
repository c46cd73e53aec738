//! Mailvoice: drafts email replies in a persona's learned voice.
//!
//! An incoming message is embedded, the persona's collection of past sent
//! replies is searched for similar ones, and the best of those are shown to
//! a generative model as style exemplars. The result is a draft plus a
//! confidence score derived from retrieval similarity.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod drafting;
pub mod embedding;
pub mod index;
pub mod logging;
pub mod persona;
pub mod providers;
pub mod server;
