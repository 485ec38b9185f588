//! Request parsing and static file transport collaborators.

mod parser;
mod static_files;

pub use parser::{BasicRequestParser, RequestParser};
pub use static_files::{FsStaticTransport, StaticTransport};
