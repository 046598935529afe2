mod fs;
mod parse;

pub(crate) use fs::*;
pub(crate) use parse::*;
