use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::ast::{Block, Expression, Identifier, Infix, Prefix, Program, Statement};
use crate::config::Config;
use crate::gc::{GcStats, Heap, ObjRef};
use crate::object::environment::{Env, Environment};
use crate::object::object::{Function, Object};

/// Result of an infix operation before it is turned into a heap object.
enum Outcome {
    Integer(i64),
    Bool(bool),
    String(String),
    Err(String),
}

/// Tree-walking evaluator. Owns the heap and the global scope of a session.
pub struct Evaluator {
    heap: Heap,
    globals: Env,
    // Scopes of the calls currently being evaluated, innermost last
    scopes: Vec<Env>,
    // Intermediate values held while evaluating sibling expressions
    stash: Vec<ObjRef>,
    // Buffer the spans under evaluation point into
    source: Rc<str>,
    true_obj: ObjRef,
    false_obj: ObjRef,
    null_obj: ObjRef,
    max_call_depth: usize,
}

impl Evaluator {
    pub fn new(config: &Config) -> Self {
        let mut heap = Heap::new(config);
        let true_obj = heap.insert(Object::Boolean(true));
        let false_obj = heap.insert(Object::Boolean(false));
        let null_obj = heap.insert(Object::Null);

        Self {
            heap,
            globals: Rc::new(RefCell::new(Environment::new())),
            scopes: vec![],
            stash: vec![],
            source: Rc::from(""),
            true_obj,
            false_obj,
            null_obj,
            max_call_depth: config.max_call_depth,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    pub fn native_bool(&self, value: bool) -> ObjRef {
        if value {
            self.true_obj
        } else {
            self.false_obj
        }
    }

    /// Evaluates a program against the global scope. `source` must be the
    /// buffer the program was parsed from. Returns `None` for an empty
    /// program.
    pub fn eval_program(&mut self, program: &Program, source: Rc<str>) -> Option<ObjRef> {
        trace!(statements = program.len(), "evaluating program");
        self.source = source;
        let globals = self.globals.clone();

        let mut result = None;
        for statement in program {
            let obj = self.eval_statement(statement, &globals);

            match &self.heap[obj] {
                Object::Return(value) => return Some(*value),
                Object::Err(_) => return Some(obj),
                _ => result = Some(obj),
            }
        }

        result
    }

    fn eval_block(&mut self, block: &Block, env: &Env) -> ObjRef {
        let mut result = self.null_obj;
        for statement in block {
            result = self.eval_statement(statement, env);

            if self.heap[result].is_return() || self.heap[result].is_error() {
                return result;
            }
        }

        result
    }

    fn eval_statement(&mut self, statement: &Statement, env: &Env) -> ObjRef {
        match statement {
            Statement::ExpressionStmt(expr) => self.eval_expr(expr, env),
            Statement::Let(ident, expression) => {
                let val = self.eval_expr(expression, env);
                if self.is_error(val) {
                    return val;
                }
                let name = ident.name(&self.source).to_string();
                env.borrow_mut().set(name, val)
            }
            Statement::Return(expr) => {
                let val = self.eval_expr(expr, env);
                if self.is_error(val) {
                    return val;
                }
                self.alloc(Object::Return(val))
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expression, env: &Env) -> ObjRef {
        match expr {
            Expression::IntLiteral(span) => {
                let text = span.slice(&self.source);
                match text.parse::<i64>() {
                    Ok(value) => self.alloc(Object::Integer(value)),
                    Err(_) => {
                        let message = format!("integer literal out of range: {text}");
                        self.error(message)
                    }
                }
            }
            Expression::StringLiteral(span) => {
                let value = span.slice(&self.source).to_string();
                self.alloc(Object::String(value))
            }
            Expression::Boolean(value) => self.native_bool(*value),
            Expression::Null => self.null_obj,
            Expression::Ident(ident) => self.eval_ident(ident, env),
            Expression::PrefixExpr(op, right) => {
                let right = self.eval_expr(right, env);
                if self.is_error(right) {
                    return right;
                }
                self.eval_prefix_expression(*op, right)
            }
            Expression::InfixExpr(op, left, right) => {
                let left = self.eval_expr(left, env);
                if self.is_error(left) {
                    return left;
                }

                let mark = self.stash.len();
                self.stash.push(left);
                let right = self.eval_expr(right, env);
                if self.is_error(right) {
                    self.stash.truncate(mark);
                    return right;
                }
                self.stash.push(right);

                let result = self.eval_infix_expression(*op, left, right);
                self.stash.truncate(mark);
                result
            }
            Expression::IfExpr(condition, consequence, alternative) => {
                self.eval_if_expression(condition, consequence, alternative.as_ref(), env)
            }
            Expression::FnLiteral(literal) => self.alloc(Object::Fn(Function {
                literal: literal.clone(),
                source: self.source.clone(),
                env: env.clone(),
            })),
            Expression::Call(function, arguments) => {
                self.eval_call_expression(function, arguments, env)
            }
        }
    }

    fn eval_ident(&mut self, ident: &Identifier, env: &Env) -> ObjRef {
        let name = ident.name(&self.source);
        let found = env.borrow().get(name);

        match found {
            Some(obj) => obj,
            None => {
                let message = format!("identifier not found: {name}.");
                self.error(message)
            }
        }
    }

    fn eval_prefix_expression(&mut self, op: Prefix, right: ObjRef) -> ObjRef {
        match op {
            Prefix::Bang => {
                if right == self.true_obj {
                    self.false_obj
                } else if right == self.false_obj || right == self.null_obj {
                    self.true_obj
                } else {
                    self.false_obj
                }
            }
            Prefix::Minus => {
                let negated = match &self.heap[right] {
                    Object::Integer(num) => num
                        .checked_neg()
                        .ok_or_else(|| format!("integer overflow: -{num}")),
                    obj => Err(format!("unknown operator: -{}", obj.obj_type())),
                };

                match negated {
                    Ok(value) => self.alloc(Object::Integer(value)),
                    Err(message) => self.error(message),
                }
            }
        }
    }

    fn eval_infix_expression(&mut self, op: Infix, left: ObjRef, right: ObjRef) -> ObjRef {
        let outcome = match (&self.heap[left], &self.heap[right]) {
            (Object::Integer(l), Object::Integer(r)) => eval_integer_infix_expression(op, *l, *r),
            (Object::String(l), Object::String(r)) => eval_string_infix_expression(op, l, r),
            (l, r) if l.obj_type() != r.obj_type() => Outcome::Err(format!(
                "type mismatch: {} {} {}",
                l.obj_type(),
                op,
                r.obj_type()
            )),
            // Remaining kinds compare by identity
            (l, _) => match op {
                Infix::Eq => Outcome::Bool(left == right),
                Infix::Neq => Outcome::Bool(left != right),
                _ => Outcome::Err(format!(
                    "unknown operator: {} {} {}",
                    l.obj_type(),
                    op,
                    l.obj_type()
                )),
            },
        };

        match outcome {
            Outcome::Integer(value) => self.alloc(Object::Integer(value)),
            Outcome::Bool(value) => self.native_bool(value),
            Outcome::String(value) => self.alloc(Object::String(value)),
            Outcome::Err(message) => self.error(message),
        }
    }

    fn eval_if_expression(
        &mut self,
        condition: &Expression,
        consequence: &Block,
        alternative: Option<&Block>,
        env: &Env,
    ) -> ObjRef {
        let condition = self.eval_expr(condition, env);
        if self.is_error(condition) {
            return condition;
        }

        if self.is_truthy(condition) {
            self.eval_block(consequence, env)
        } else if let Some(alternative) = alternative {
            self.eval_block(alternative, env)
        } else {
            self.null_obj
        }
    }

    fn eval_call_expression(
        &mut self,
        function: &Expression,
        arguments: &[Expression],
        env: &Env,
    ) -> ObjRef {
        let function = self.eval_expr(function, env);
        if self.is_error(function) {
            return function;
        }

        let mark = self.stash.len();
        self.stash.push(function);
        for argument in arguments {
            let evaluated = self.eval_expr(argument, env);
            if self.is_error(evaluated) {
                self.stash.truncate(mark);
                return evaluated;
            }
            self.stash.push(evaluated);
        }

        let args = self.stash[mark + 1..].to_vec();
        let result = self.apply_function(function, &args);
        self.stash.truncate(mark);
        result
    }

    fn apply_function(&mut self, function: ObjRef, args: &[ObjRef]) -> ObjRef {
        let callee = match &self.heap[function] {
            Object::Fn(callee) => Ok(callee.clone()),
            other => Err(other.obj_type()),
        };
        let callee = match callee {
            Ok(callee) => callee,
            Err(kind) => return self.error(format!("not a function: {kind}")),
        };

        if callee.arity() != args.len() {
            let message = format!(
                "wrong number of arguments: expected {}, got {}",
                callee.arity(),
                args.len()
            );
            return self.error(message);
        }
        if self.scopes.len() >= self.max_call_depth {
            let message = format!("maximum call depth of {} exceeded", self.max_call_depth);
            return self.error(message);
        }

        let extended_env = Rc::new(RefCell::new(self.extend_function_env(&callee, args)));
        self.scopes.push(extended_env.clone());
        let caller_source = std::mem::replace(&mut self.source, callee.source.clone());

        let evaluated = self.eval_block(&callee.literal.body, &extended_env);

        self.source = caller_source;
        self.scopes.pop();
        self.unwrap_return_value(evaluated)
    }

    fn extend_function_env(&self, function: &Function, args: &[ObjRef]) -> Environment {
        let mut environment = Environment::new_enclosed_environment(function.env.clone());

        for (name, arg) in function.parameter_names().zip(args) {
            environment.set(name, *arg);
        }

        environment
    }

    fn unwrap_return_value(&self, obj: ObjRef) -> ObjRef {
        match &self.heap[obj] {
            Object::Return(value) => *value,
            _ => obj,
        }
    }

    fn is_truthy(&self, obj: ObjRef) -> bool {
        obj != self.false_obj && obj != self.null_obj
    }

    fn is_error(&self, obj: ObjRef) -> bool {
        self.heap[obj].is_error()
    }

    fn error(&mut self, message: String) -> ObjRef {
        self.alloc(Object::Err(message))
    }

    /// Every allocation goes through here so the collector can run first.
    fn alloc(&mut self, object: Object) -> ObjRef {
        if self.heap.should_collect() {
            self.collect(Some(&object));
        }
        self.heap.insert(object)
    }

    /// Runs a full collection outside of any evaluation.
    pub fn collect_garbage(&mut self) -> GcStats {
        self.collect(None)
    }

    // Roots: the singletons, the global scope, every active call scope, the
    // held intermediates and whatever the object being allocated refers to.
    fn collect(&mut self, pending: Option<&Object>) -> GcStats {
        let mut objects = vec![self.true_obj, self.false_obj, self.null_obj];
        objects.extend_from_slice(&self.stash);
        let mut envs: Vec<&Env> = vec![&self.globals];
        envs.extend(self.scopes.iter());

        match pending {
            Some(Object::Return(value)) => objects.push(*value),
            Some(Object::Fn(function)) => envs.push(&function.env),
            _ => {}
        }

        self.heap.collect(objects, envs)
    }

    /// Frees every object, singletons included. The evaluator must not be
    /// used afterwards.
    pub fn shutdown(&mut self) -> GcStats {
        self.scopes.clear();
        self.stash.clear();
        self.heap.clear()
    }

    /// Display form of a value.
    pub fn inspect(&self, obj: ObjRef) -> String {
        match &self.heap[obj] {
            Object::Integer(value) => value.to_string(),
            Object::String(value) => value.clone(),
            Object::Boolean(value) => value.to_string(),
            Object::Null => String::from("null"),
            Object::Return(value) => self.inspect(*value),
            Object::Err(message) => format!("RUNTIME ERROR: {message}"),
            Object::Fn(function) => function.to_string(),
        }
    }
}

fn eval_integer_infix_expression(op: Infix, left: i64, right: i64) -> Outcome {
    let checked = match op {
        Infix::Eq => return Outcome::Bool(left == right),
        Infix::Neq => return Outcome::Bool(left != right),
        Infix::Lt => return Outcome::Bool(left < right),
        Infix::Gt => return Outcome::Bool(left > right),
        Infix::Slash if right == 0 => return Outcome::Err(String::from("division by zero")),
        Infix::Plus => left.checked_add(right),
        Infix::Minus => left.checked_sub(right),
        Infix::Asterisk => left.checked_mul(right),
        Infix::Slash => left.checked_div(right),
    };

    match checked {
        Some(value) => Outcome::Integer(value),
        None => Outcome::Err(format!("integer overflow: {left} {op} {right}")),
    }
}

fn eval_string_infix_expression(op: Infix, left: &str, right: &str) -> Outcome {
    match op {
        Infix::Plus => Outcome::String(format!("{left}{right}")),
        _ => Outcome::Err(format!("unknown operator: STRING {op} STRING")),
    }
}
