//! Base types and error handling.
//!
//! - [`LocateError`](locateerror::LocateError): error taxonomy for locate requests
//! - [`ConnectionState`](connstate::ConnectionState): connection lifecycle of a locator

pub mod connstate;
pub mod context;
pub mod locateerror;
