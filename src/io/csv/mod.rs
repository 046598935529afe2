//! Delimited text reading and CSV writing.

mod read;
mod write;

pub(crate) use read::*;
pub(crate) use write::*;
