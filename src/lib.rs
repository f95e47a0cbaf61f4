//! # Covet Backend
//!
//! Backend service for the Covet browser extension: it stores "pins"
//! (an image URL plus a short description of a clothing item) in a local
//! SQLite table and, on request, asks an external text/vision model to
//! curate 3 to 5 pins that work together as an outfit, with a short
//! justification per pick.
//!
//! The model's free-text answer is parsed heuristically, and every failure
//! along the way (no credential, unreachable service, unreadable answer)
//! degrades into a randomized selection whose reason text names what went
//! wrong. Availability of *some* curated result outranks surfacing errors
//! for this use case.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`store`] | Pin persistence and text normalization |
//! | [`completion`] | External completion service client |
//! | [`parse`] | Free-text response parsing |
//! | [`curator`] | The curation fallback ladder |
//! | [`server`] | HTTP API |

pub mod completion;
pub mod config;
pub mod curator;
pub mod db;
pub mod migrate;
pub mod models;
pub mod parse;
pub mod server;
pub mod store;
