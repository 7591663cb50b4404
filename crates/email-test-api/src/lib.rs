//! Email test dispatch service.
//!
//! Picks recently received emails of a given type from the production mail
//! store and replays them against the incoming-mail endpoint.

pub mod api;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod sink;
pub mod source;

pub use catalog::{EmailType, EmailTypeCatalog, SearchMethod};
pub use config::Config;
pub use dispatch::EmailTestSender;
pub use error::DispatchError;
pub use sink::{EmailSink, HttpEmailSink};
pub use source::{EmailSource, MySqlEmailSource, ReceivedEmail};
