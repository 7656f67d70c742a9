//! Dossier API Library
//!
//! Document lifecycle core for a professional-services firm: opportunities,
//! offers, affaires, reports, invoices, training records and correspondence,
//! all sharing one reference-numbering engine and one transition discipline.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod migrator;
pub mod services;

pub use errors::ServiceError;
pub use events::{Event, EventSender};
pub use services::DossierServices;
