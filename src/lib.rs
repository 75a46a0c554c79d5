pub mod ast;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod gc;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod repl;
pub mod token;

pub use config::Config;
pub use error::{Error, ParseError};
pub use gc::{GcStats, ObjRef};
pub use interpreter::Interpreter;
pub use object::object::Object;
