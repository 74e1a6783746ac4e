pub mod compile;
pub mod parse;
