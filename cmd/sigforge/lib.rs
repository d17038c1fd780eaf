pub mod cli;
pub mod initializers;
pub mod output;
