use std::rc::Rc;

use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::evaluator::eval::Evaluator;
use crate::gc::{GcStats, ObjRef};
use crate::object::object::Object;
use crate::parser;

/// One interpreter session: a heap, the interned singletons and a global
/// scope whose bindings persist across `evaluate` calls. Sessions share
/// nothing, so any number can coexist.
pub struct Interpreter {
    evaluator: Evaluator,
    max_nesting_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::init()
    }
}

impl Interpreter {
    pub fn init() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        debug!(
            gc_threshold = config.gc_threshold,
            gc_growth = config.gc_growth,
            max_call_depth = config.max_call_depth,
            max_nesting_depth = config.max_nesting_depth,
            "session initialized"
        );
        Self {
            evaluator: Evaluator::new(&config),
            max_nesting_depth: config.max_nesting_depth,
        }
    }

    /// Parses and evaluates one unit of source against the global scope.
    /// Nothing is evaluated if the source has a parse error.
    pub fn run(&mut self, source: &str) -> Result<Option<ObjRef>, Error> {
        let source: Rc<str> = Rc::from(source);
        let program =
            parser::parse_with_max_depth(&source, self.max_nesting_depth).map_err(Error::Parse)?;

        Ok(self.evaluator.eval_program(&program, source))
    }

    /// Like `run`, but returns the display form of the result.
    pub fn evaluate(&mut self, source: &str) -> Result<Option<String>, Error> {
        let result = self.run(source)?;
        Ok(result.map(|obj| self.render(obj)))
    }

    pub fn render(&self, obj: ObjRef) -> String {
        self.evaluator.inspect(obj)
    }

    pub fn object(&self, obj: ObjRef) -> Option<&Object> {
        self.evaluator.heap().get(obj)
    }

    /// Looks up a global binding.
    pub fn lookup(&self, name: &str) -> Option<ObjRef> {
        self.evaluator.globals().borrow().get(name)
    }

    pub fn collect_garbage(&mut self) -> GcStats {
        self.evaluator.collect_garbage()
    }

    pub fn is_live(&self, obj: ObjRef) -> bool {
        self.evaluator.heap().contains(obj)
    }

    pub fn live_objects(&self) -> usize {
        self.evaluator.heap().len()
    }

    /// Releases every object of the session and reports what was freed.
    pub fn shutdown(mut self) -> GcStats {
        let stats = self.evaluator.shutdown();
        debug!(
            collected = stats.collected,
            remaining = stats.remaining,
            "session shut down"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, Position};
    use crate::token::TokenKind;

    #[test]
    fn test_evaluate() {
        let tests = vec![
            ("5 + 5 * 2 - 10 / 2;", Some("10")),
            ("\"mon\" + \"key\"", Some("monkey")),
            ("let x = 3;", Some("3")),
            ("", None),
            ("   \n\t ", None),
            ("if (false) { 1 }", Some("null")),
            ("5 + true;", Some("RUNTIME ERROR: type mismatch: INTEGER + BOOLEAN")),
            ("fn(x) { x }", Some("fn(x) { ... }")),
        ];

        for i in 0..tests.len() {
            let mut interpreter = Interpreter::init();
            let rendered = interpreter.evaluate(tests[i].0).expect("test input should parse");

            assert_eq!(rendered.as_deref(), tests[i].1, "input: {}", tests[i].0);
        }
    }

    #[test]
    fn test_bindings_persist_between_calls() {
        let mut interpreter = Interpreter::init();

        interpreter.evaluate("let a = 5;").expect("parses");
        interpreter.evaluate("let double = fn(x) { x * 2 };").expect("parses");
        let rendered = interpreter.evaluate("double(a) + 1").expect("parses");

        assert_eq!(rendered.as_deref(), Some("11"));
    }

    #[test]
    fn test_parse_errors_skip_evaluation() {
        let mut interpreter = Interpreter::init();

        let err = interpreter.evaluate("let a = 1; let = 2;").unwrap_err();

        match err {
            Error::Parse(errors) => assert_eq!(
                errors,
                vec![ParseError::UnexpectedToken {
                    expected: TokenKind::Ident,
                    found: TokenKind::Assign,
                    position: Position { line: 1, column: 16 },
                }]
            ),
        }
        assert_eq!(interpreter.lookup("a"), None);
    }

    #[test]
    fn test_shutdown_frees_everything() {
        let mut interpreter = Interpreter::init();
        interpreter.evaluate("let a = 1; let b = \"x\";").expect("parses");
        interpreter.evaluate("let f = fn(n) { f(n) };").expect("parses");

        let stats = interpreter.shutdown();

        assert_eq!(stats.remaining, 0);
        assert!(stats.collected >= 6);
    }
}
