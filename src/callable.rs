use std::{
    fmt,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::trace;

use crate::{
    ast::FunctionStmt,
    environment::{EnvRef, Environment},
    error::LoxError,
    interpreter::{Flow, Interpreter},
    value::RuntimeValue,
};

/// Anything that can appear in callee position.
pub trait LoxCallable: fmt::Display {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, LoxError>;
}

pub struct BuiltinFunction {
    name: &'static str,
    arity: usize,
    function: fn(arguments: &[RuntimeValue]) -> Result<RuntimeValue, LoxError>,
}

impl BuiltinFunction {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Milliseconds since the Unix epoch.
    pub fn clock() -> BuiltinFunction {
        BuiltinFunction {
            name: "clock",
            arity: 0,
            function: |_| {
                let millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_millis())
                    .unwrap_or_default();
                Ok(RuntimeValue::Number(millis as f64))
            },
        }
    }

    /// Ends the program. The embedding driver decides what that means for
    /// the host process.
    pub fn exit() -> BuiltinFunction {
        BuiltinFunction {
            name: "exit",
            arity: 0,
            function: |_| Err(LoxError::Exit(0)),
        }
    }

    /// Every native function installed in the global scope.
    pub fn globals() -> Vec<BuiltinFunction> {
        vec![BuiltinFunction::clock(), BuiltinFunction::exit()]
    }
}

impl LoxCallable for BuiltinFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _: &mut Interpreter,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, LoxError> {
        (self.function)(&arguments)
    }
}

impl fmt::Display for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A function declared in source, closed over the scope it was declared in.
///
/// The declaring scope also binds the function, so the two keep each other
/// alive through `Rc` and are never freed. Each call or loop iteration that
/// declares a function leaks that scope.
pub struct DeclaredFunction {
    declaration: Rc<FunctionStmt>,
    closure: EnvRef,
}

impl DeclaredFunction {
    pub fn new(declaration: Rc<FunctionStmt>, closure: EnvRef) -> DeclaredFunction {
        DeclaredFunction {
            declaration,
            closure,
        }
    }
}

impl LoxCallable for DeclaredFunction {
    fn arity(&self) -> usize {
        self.declaration.parameters.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, LoxError> {
        trace!(function = %self.declaration.name.lexeme, "call");

        let environment = Environment::new_child(&self.closure);
        {
            let mut scope = environment.borrow_mut();
            for (parameter, argument) in self.declaration.parameters.iter().zip(arguments) {
                scope.define(&parameter.lexeme, argument);
            }
        }

        match interpreter.execute_block(&self.declaration.body, environment)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(RuntimeValue::Nil),
        }
    }
}

impl fmt::Display for DeclaredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}
