use std::cell::Cell;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace};

use crate::{
    ast::{Expr, FunctionStmt, Stmt},
    error::StaticError,
    token::Token,
};

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
enum FunctionType {
    None,
    Function,
}

type ResolveResult = Result<(), StaticError>;

/// Static pass between parsing and execution. Rejects scoping mistakes and
/// records on each variable reference how many scopes out its declaration
/// lives. Globals are not tracked and stay unannotated.
pub struct Resolver {
    scopes: Vec<FxHashMap<String, bool>>,
    function_type: FunctionType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            scopes: vec![],
            function_type: FunctionType::None,
        }
    }

    #[instrument(level = "debug", skip_all)]
    pub fn resolve(mut self, statements: &[Stmt]) -> ResolveResult {
        self.resolve_stmts(statements)?;
        debug!("resolved program");
        Ok(())
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) -> ResolveResult {
        for statement in statements {
            self.resolve_stmt(statement)?;
        }
        Ok(())
    }

    fn resolve_stmt(&mut self, statement: &Stmt) -> ResolveResult {
        match statement {
            Stmt::Expression(stmt) => self.resolve_expr(&stmt.expression),
            Stmt::Print(stmt) => self.resolve_expr(&stmt.expression),
            Stmt::Var(stmt) => {
                self.declare(&stmt.name)?;
                if let Some(initializer) = &stmt.initializer {
                    self.resolve_expr(initializer)?;
                }
                self.define(&stmt.name);
                Ok(())
            }
            Stmt::Block(stmt) => {
                self.begin_scope();
                let result = self.resolve_stmts(&stmt.statements);
                self.end_scope();
                result
            }
            Stmt::If(stmt) => {
                self.resolve_expr(&stmt.condition)?;
                self.resolve_stmt(&stmt.then_statement)?;
                if let Some(else_statement) = &stmt.else_statement {
                    self.resolve_stmt(else_statement)?;
                }
                Ok(())
            }
            Stmt::While(stmt) => {
                self.resolve_expr(&stmt.condition)?;
                self.resolve_stmt(&stmt.body)
            }
            Stmt::Function(stmt) => {
                self.declare(&stmt.name)?;
                self.define(&stmt.name);
                self.resolve_function(stmt, FunctionType::Function)
            }
            Stmt::Return(stmt) => {
                if self.function_type == FunctionType::None {
                    return Err(StaticError::resolve(
                        &stmt.keyword,
                        "Can't return from top-level code.",
                    ));
                }
                match &stmt.value {
                    Some(value) => self.resolve_expr(value),
                    None => Ok(()),
                }
            }
        }
    }

    fn resolve_expr(&mut self, expression: &Expr) -> ResolveResult {
        match expression {
            Expr::Literal(_) => Ok(()),
            Expr::Unary(expr) => self.resolve_expr(&expr.expression),
            Expr::Binary(expr) => {
                self.resolve_expr(&expr.left)?;
                self.resolve_expr(&expr.right)
            }
            Expr::Logical(expr) => {
                self.resolve_expr(&expr.left)?;
                self.resolve_expr(&expr.right)
            }
            Expr::Grouping(expr) => self.resolve_expr(&expr.expression),
            Expr::Variable(expr) => {
                if let Some(false) = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&expr.name.lexeme).copied())
                {
                    return Err(StaticError::resolve(
                        &expr.name,
                        "Can't read local variable in its own initializer.",
                    ));
                }
                self.resolve_local(&expr.depth, &expr.name);
                Ok(())
            }
            Expr::Assign(expr) => {
                self.resolve_expr(&expr.value)?;
                self.resolve_local(&expr.depth, &expr.name);
                Ok(())
            }
            Expr::Call(expr) => {
                self.resolve_expr(&expr.callee)?;
                for argument in &expr.arguments {
                    self.resolve_expr(argument)?;
                }
                Ok(())
            }
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) -> ResolveResult {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                return Err(StaticError::resolve(
                    name,
                    "Already a variable with this name in this scope.",
                ));
            }

            scope.insert(name.lexeme.to_string(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.to_string(), true);
        }
    }

    fn resolve_function(
        &mut self,
        stmt: &FunctionStmt,
        function_type: FunctionType,
    ) -> ResolveResult {
        let outer_function_type = self.function_type;
        self.function_type = function_type;

        self.begin_scope();
        let result = self.resolve_function_body(stmt);
        self.end_scope();

        self.function_type = outer_function_type;
        result
    }

    fn resolve_function_body(&mut self, stmt: &FunctionStmt) -> ResolveResult {
        for parameter in &stmt.parameters {
            self.declare(parameter)?;
            self.define(parameter);
        }

        self.resolve_stmts(&stmt.body)
    }

    fn resolve_local(&mut self, depth: &Cell<Option<usize>>, name: &Token) {
        let distance = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(&name.lexeme));

        trace!(name = %name.lexeme, ?distance, "resolved reference");
        depth.set(distance);
    }
}
