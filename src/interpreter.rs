use std::{
    io::{self, Write},
    mem,
    rc::Rc,
};

use tracing::{debug, instrument, trace};

use crate::{
    ast::{BinaryExpr, CallExpr, Expr, LogicalExpr, Stmt, UnaryExpr},
    callable::{BuiltinFunction, DeclaredFunction},
    environment::{EnvRef, Environment},
    error::{LoxError, RuntimeError, RuntimeErrorKind},
    token::{Token, TokenType},
    value::RuntimeValue,
};

/// How a statement finished: fell through, or is unwinding to the nearest
/// call with a return value.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Normal,
    Return(RuntimeValue),
}

type ExecResult<T> = Result<T, LoxError>;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to standard output.
    pub fn new() -> Interpreter {
        Interpreter::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Interpreter {
        let globals = Environment::new_global();
        for function in BuiltinFunction::globals() {
            let name = function.name();
            globals
                .borrow_mut()
                .define(name, RuntimeValue::Callable(Rc::new(function)));
        }

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            output,
        }
    }

    /// Runs resolved statements in the global scope, stopping at the first
    /// runtime error. Output already written stays written.
    #[instrument(level = "debug", skip_all)]
    pub fn interpret(&mut self, statements: &[Stmt]) -> ExecResult<()> {
        let result = self.execute_all(statements);
        let flushed = self.output.flush();
        debug!(ok = result.is_ok(), "interpretation finished");
        result.and(flushed.map_err(LoxError::from))
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> ExecResult<()> {
        for statement in statements {
            if let Flow::Return(_) = self.execute(statement)? {
                break;
            }
        }
        Ok(())
    }

    /// Evaluates a single resolved expression in the current scope.
    pub fn evaluate(&mut self, expr: &Expr) -> ExecResult<RuntimeValue> {
        match expr {
            Expr::Literal(expr) => Ok(RuntimeValue::from(&expr.value)),
            Expr::Unary(expr) => self.unary(expr),
            Expr::Binary(expr) => self.binary(expr),
            Expr::Logical(expr) => self.logical(expr),
            Expr::Grouping(expr) => self.evaluate(&expr.expression),
            Expr::Variable(expr) => Ok(self.look_up(&expr.name, expr.depth.get())?),
            Expr::Assign(expr) => {
                let value = self.evaluate(&expr.value)?;
                match expr.depth.get() {
                    Some(distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &expr.name,
                        value.clone(),
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&expr.name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Call(expr) => self.call(expr),
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult<Flow> {
        match stmt {
            Stmt::Expression(stmt) => {
                self.evaluate(&stmt.expression)?;
                Ok(Flow::Normal)
            }
            Stmt::Print(stmt) => {
                let value = self.evaluate(&stmt.expression)?;
                writeln!(self.output, "{}", value)?;
                Ok(Flow::Normal)
            }
            Stmt::Var(stmt) => {
                let value = match &stmt.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => RuntimeValue::Nil,
                };
                self.environment
                    .borrow_mut()
                    .define(&stmt.name.lexeme, value);
                Ok(Flow::Normal)
            }
            Stmt::Block(stmt) => {
                let environment = Environment::new_child(&self.environment);
                self.execute_block(&stmt.statements, environment)
            }
            Stmt::If(stmt) => {
                if self.evaluate(&stmt.condition)?.is_truthy() {
                    self.execute(&stmt.then_statement)
                } else if let Some(else_statement) = &stmt.else_statement {
                    self.execute(else_statement)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(stmt) => {
                while self.evaluate(&stmt.condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(&stmt.body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(stmt) => {
                let function =
                    DeclaredFunction::new(Rc::clone(stmt), Rc::clone(&self.environment));
                self.environment
                    .borrow_mut()
                    .define(&stmt.name.lexeme, RuntimeValue::Callable(Rc::new(function)));
                Ok(Flow::Normal)
            }
            Stmt::Return(stmt) => {
                let value = match &stmt.value {
                    Some(value) => self.evaluate(value)?,
                    None => RuntimeValue::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Runs `statements` with `environment` as the current scope and restores
    /// the previous scope afterwards, however the block exits.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
    ) -> ExecResult<Flow> {
        let enclosing = mem::replace(&mut self.environment, environment);

        let mut result = Ok(Flow::Normal);
        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = enclosing;

        result
    }

    fn look_up(&self, name: &Token, depth: Option<usize>) -> Result<RuntimeValue, RuntimeError> {
        match depth {
            Some(distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn unary(&mut self, expr: &UnaryExpr) -> ExecResult<RuntimeValue> {
        let operand = self.evaluate(&expr.expression)?;
        match expr.operator.token_type {
            TokenType::Bang => Ok(RuntimeValue::Bool(!operand.is_truthy())),
            TokenType::Minus => {
                let operand = check_numeric_operand(&expr.operator, &operand)?;
                Ok(RuntimeValue::Number(-operand))
            }
            _ => unreachable!("parser only builds '!' and '-' unary expressions"),
        }
    }

    fn logical(&mut self, expr: &LogicalExpr) -> ExecResult<RuntimeValue> {
        let left = self.evaluate(&expr.left)?;

        let short_circuits = match expr.operator.token_type {
            TokenType::Or => left.is_truthy(),
            _ => !left.is_truthy(),
        };

        if short_circuits {
            Ok(left)
        } else {
            self.evaluate(&expr.right)
        }
    }

    fn binary(&mut self, expr: &BinaryExpr) -> ExecResult<RuntimeValue> {
        let left = self.evaluate(&expr.left)?;
        let right = self.evaluate(&expr.right)?;
        let operator = &expr.operator;

        Ok(match operator.token_type {
            TokenType::Plus => match (&left, &right) {
                (RuntimeValue::Number(left), RuntimeValue::Number(right)) => {
                    RuntimeValue::Number(left + right)
                }
                (RuntimeValue::String(left), RuntimeValue::String(right)) => {
                    RuntimeValue::String(Rc::from(format!("{}{}", left, right)))
                }
                _ => {
                    return Err(RuntimeError::new(
                        operator,
                        RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
                    )
                    .into())
                }
            },
            TokenType::Minus => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Number(left - right)
            }
            TokenType::Slash => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Number(left / right)
            }
            TokenType::Star => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Number(left * right)
            }
            TokenType::Greater => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left > right)
            }
            TokenType::GreaterEqual => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left >= right)
            }
            TokenType::Less => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left < right)
            }
            TokenType::LessEqual => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left <= right)
            }
            TokenType::EqualEqual => RuntimeValue::Bool(left == right),
            TokenType::BangEqual => RuntimeValue::Bool(left != right),
            _ => unreachable!("parser never builds a binary '{}'", operator.lexeme),
        })
    }

    fn call(&mut self, expr: &CallExpr) -> ExecResult<RuntimeValue> {
        let callee = self.evaluate(&expr.callee)?;

        let mut arguments = Vec::with_capacity(expr.arguments.len());
        for argument in &expr.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let function = match callee {
            RuntimeValue::Callable(function) => function,
            other => {
                trace!(callee = other.type_name(), "call of non-callable");
                return Err(RuntimeError::new(&expr.paren, RuntimeErrorKind::NotCallable).into());
            }
        };

        if arguments.len() != function.arity() {
            return Err(RuntimeError::new(
                &expr.paren,
                RuntimeErrorKind::ArityMismatch {
                    expected: function.arity(),
                    got: arguments.len(),
                },
            )
            .into());
        }

        function.call(self, arguments)
    }
}

fn check_numeric_operand(operator: &Token, operand: &RuntimeValue) -> Result<f64, RuntimeError> {
    match operand {
        RuntimeValue::Number(value) => Ok(*value),
        _ => Err(RuntimeError::new(
            operator,
            RuntimeErrorKind::OperandMustBeNumber,
        )),
    }
}

fn check_numeric_operands(
    operator: &Token,
    left_operand: &RuntimeValue,
    right_operand: &RuntimeValue,
) -> Result<(f64, f64), RuntimeError> {
    match (left_operand, right_operand) {
        (RuntimeValue::Number(left), RuntimeValue::Number(right)) => Ok((*left, *right)),
        _ => Err(RuntimeError::new(
            operator,
            RuntimeErrorKind::OperandsMustBeNumbers,
        )),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{lox::SharedOutput, parser::parse, resolver::Resolver, scanner::scan};

    fn run(source: &str) -> (String, ExecResult<()>) {
        let capture = SharedOutput::default();
        let mut interpreter = Interpreter::with_output(Box::new(capture.clone()));
        let statements = parse(scan(source).unwrap()).unwrap();
        Resolver::new().resolve(&statements).unwrap();
        let result = interpreter.interpret(&statements);
        (capture.contents(), result)
    }

    fn output(source: &str) -> String {
        let (output, result) = run(source);
        result.unwrap();
        output
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match run(source).1 {
            Err(LoxError::Runtime(error)) => error,
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_follows_ieee_doubles() {
        assert_eq!(output("print 1 + 2 * 3;"), "7\n");
        assert_eq!(output("print 1 / 2;"), "0.5\n");
        assert_eq!(output("print (1 + 2) * 3 - -1;"), "10\n");
        assert_eq!(output("print 0.1 + 0.2;"), "0.30000000000000004\n");
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(
            output("print 1 < 2; print 2 <= 1; print 3 > 3; print 3 >= 3;"),
            "true\nfalse\nfalse\ntrue\n"
        );
        assert_eq!(
            output("print nil == nil; print nil == false; print \"a\" == \"a\"; print 1 != 1;"),
            "true\nfalse\ntrue\nfalse\n"
        );
    }

    #[test]
    fn truthiness() {
        assert_eq!(output("print !nil; print !0; print !\"\";"), "true\nfalse\nfalse\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(output("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn plus_rejects_mixed_operands() {
        let error = runtime_error("print 1 + \"a\";");
        assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbersOrStrings);
        assert_eq!(error.lexeme, "+");
    }

    #[test]
    fn negating_a_string_fails() {
        let error = runtime_error("print -\"Hello\";");
        assert_eq!(error.kind, RuntimeErrorKind::OperandMustBeNumber);
    }

    #[test]
    fn comparing_non_numbers_fails() {
        let error = runtime_error("print \"a\" < \"b\";");
        assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbers);
    }

    #[test]
    fn undefined_variable() {
        let error = runtime_error("print missing;");
        assert_eq!(
            error.kind,
            RuntimeErrorKind::UndefinedVariable("missing".to_string())
        );
        let error = runtime_error("missing = 1;");
        assert_eq!(
            error.kind,
            RuntimeErrorKind::UndefinedVariable("missing".to_string())
        );
    }

    #[test]
    fn short_circuit_returns_operand_values() {
        assert_eq!(
            output("print \"hi\" or 2; print nil or \"yes\"; print nil and \"bye\";"),
            "hi\nyes\nnil\n"
        );
    }

    #[test]
    fn short_circuit_skips_right_operand() {
        assert_eq!(
            output("var a = 1; false and (a = 2); true or (a = 3); print a;"),
            "1\n"
        );
    }

    #[test]
    fn output_before_a_runtime_error_is_kept() {
        let (output, result) = run("print 1; print -nil; print 2;");
        assert_eq!(output, "1\n");
        assert!(result.is_err());
    }

    #[test]
    fn calling_a_non_callable() {
        let error = runtime_error("\"nope\"();");
        assert_eq!(error.kind, RuntimeErrorKind::NotCallable);
        assert_eq!(error.lexeme, ")");
    }

    #[test]
    fn arity_mismatch_runs_nothing() {
        let (output, result) = run("fun f(a) { print a; } f();");
        assert_eq!(output, "");
        match result {
            Err(LoxError::Runtime(error)) => assert_eq!(
                error.kind,
                RuntimeErrorKind::ArityMismatch {
                    expected: 1,
                    got: 0
                }
            ),
            other => panic!("expected arity error, got {:?}", other),
        }

        let error = runtime_error("fun f(a) { print a; } f(1, 2);");
        assert_eq!(error.to_string(), "Expected 1 arguments but got 2.\n[line 1]");
    }

    #[test]
    fn functions_without_return_yield_nil() {
        assert_eq!(
            output("fun f() {} print f(); fun g() { return; } print g();"),
            "nil\nnil\n"
        );
    }

    #[test]
    fn return_unwinds_loops_and_blocks() {
        assert_eq!(
            output(
                "fun first() { var i = 0; while (true) { { if (i == 3) return i; } i = i + 1; } } \
                 print first();"
            ),
            "3\n"
        );
    }

    #[test]
    fn functions_display_by_name() {
        assert_eq!(
            output("fun hello() {} print hello; print clock;"),
            "<fn hello>\n<native fn clock>\n"
        );
    }

    #[test]
    fn exit_stops_execution() {
        let (output, result) = run("print 1; exit(); print 2;");
        assert_eq!(output, "1\n");
        assert!(matches!(result, Err(LoxError::Exit(0))));
    }

    struct BrokenFlush;

    impl Write for BrokenFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn program_error_outranks_flush_failure() {
        let mut interpreter = Interpreter::with_output(Box::new(BrokenFlush));
        let statements = parse(scan("print 1; -nil;").unwrap()).unwrap();
        Resolver::new().resolve(&statements).unwrap();
        match interpreter.interpret(&statements) {
            Err(LoxError::Runtime(error)) => {
                assert_eq!(error.kind, RuntimeErrorKind::OperandMustBeNumber)
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }

        let statements = parse(scan("print 2;").unwrap()).unwrap();
        assert!(matches!(
            interpreter.interpret(&statements),
            Err(LoxError::Io(_))
        ));
    }

    #[test]
    fn scope_restored_after_error_in_block() {
        let capture = SharedOutput::default();
        let mut interpreter = Interpreter::with_output(Box::new(capture.clone()));

        let statements = parse(scan("var a = 1; { var a = 2; nil(); }").unwrap()).unwrap();
        Resolver::new().resolve(&statements).unwrap();
        assert!(interpreter.interpret(&statements).is_err());

        let statements = parse(scan("print a;").unwrap()).unwrap();
        Resolver::new().resolve(&statements).unwrap();
        interpreter.interpret(&statements).unwrap();
        assert_eq!(capture.contents(), "1\n");
    }
}
