pub mod environment;
pub mod object;
