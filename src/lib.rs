//! procdesk: procurement and administration desk over a JSON API
//!
//! Screens load record lists through [`source::DataSource`] (falling back to
//! sample data when the API is unavailable), filter them client-side with
//! [`filter`] and export the visible rows through [`export::ExportAdapter`].

pub mod api;
pub mod config;
pub mod export;
pub mod filter;
pub mod models;
pub mod notify;
pub mod screens;
pub mod source;
pub mod tui;
pub mod view;
