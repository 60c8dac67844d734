pub mod context;

mod bindings;
mod conversions;
mod fetch;


pub use bindings::HostRegistry;
pub use context::{ScriptContext, ENTRY_POINT};
