//! Shared types for the jsgate scripted-handler service.
//!
//! This crate holds everything both the server and the CLI need to agree
//! on: the response envelope and error taxonomy (`protocol`), request
//! parameter marshalling (`params`), and HTTP response writing (`http`).

pub mod http;
pub mod params;
pub mod protocol;
