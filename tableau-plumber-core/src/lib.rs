#![doc = "tableau-plumber-core: core logic library for tableau-plumber."]

//! This crate contains the data model, the remote/engine contracts and every
//! orchestration step of tableau-plumber: listing server items, finding them
//! by name, downloading rendered views, building extract files and publishing
//! or refreshing data sources.
//! Concrete HTTP and database transports live in the `tableau-plumber` crate.
//!
//! # Usage
//! Implement [`contract::ServerClient`] (or use the mocks), open a
//! [`session::Session`], then call the operation modules with it.

pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod extract;
pub mod items;
pub mod publish;
pub mod query;
pub mod schema;
pub mod search;
pub mod session;
pub mod table;

pub use error::PlumberError;
