use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionLiteral;
use crate::gc::ObjRef;

use super::environment::Env;

/// A runtime value stored in the heap.
#[derive(Debug, PartialEq)]
pub enum Object {
    Integer(i64),
    String(String),
    Boolean(bool),
    Null,
    Return(ObjRef),
    Err(String),
    Fn(Function),
}

/// A closure: a function literal paired with the scope it was evaluated in.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub literal: Rc<FunctionLiteral>,
    // The buffer the literal's spans point into
    pub source: Rc<str>,
    pub env: Env,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.literal.arity()
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.literal
            .parameters
            .iter()
            .map(|param| param.name(&self.source))
    }
}

impl Object {
    pub fn obj_type(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::String(_) => "STRING",
            Self::Boolean(_) => "BOOLEAN",
            Self::Null => "NULL",
            Self::Return(_) => "RETURN",
            Self::Err(_) => "ERROR",
            Self::Fn(_) => "FUNCTION",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return(_))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.parameter_names().collect();
        write!(f, "fn({}) {{ ... }}", params.join(", "))
    }
}
