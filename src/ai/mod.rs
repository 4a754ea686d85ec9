mod services;
pub mod types;
mod writer;

pub use services::{ContentServices, RemoteServices};
pub use writer::Writer;
