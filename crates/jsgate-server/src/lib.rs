//! jsgate server
//!
//! Hosts JavaScript request handlers in the Boa engine and serves them
//! over HTTP. A handler script defines a global `handle(params)` function
//! returning `{status, errCode, data}`; the server marshals each request's
//! form parameters into the call and writes the validated result back as a
//! JSON envelope.

pub mod host;
pub mod http_router;
pub mod http_server;
pub mod resource_limits;
pub mod runtime;

pub use host::{ExecutionMode, ScriptHost};
pub use http_server::HttpServer;
pub use resource_limits::ResourceLimits;
pub use runtime::{HostRegistry, ScriptContext};
