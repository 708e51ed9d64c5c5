//! Parenthesized prefix rendering of the syntax tree, for debugging.

use crate::{
    ast::{Expr, Stmt},
    token::LiteralValue,
};

pub fn print_program(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(stmt) => parenthesize(";", [print_expr(&stmt.expression)]),
        Stmt::Print(stmt) => parenthesize("print", [print_expr(&stmt.expression)]),
        Stmt::Var(stmt) => {
            let mut parts = vec![stmt.name.lexeme.clone()];
            parts.extend(stmt.initializer.as_ref().map(print_expr));
            parenthesize("var", parts)
        }
        Stmt::Block(stmt) => parenthesize("block", stmt.statements.iter().map(print_stmt)),
        Stmt::If(stmt) => {
            let mut parts = vec![print_expr(&stmt.condition), print_stmt(&stmt.then_statement)];
            parts.extend(stmt.else_statement.as_ref().map(print_stmt));
            parenthesize("if", parts)
        }
        Stmt::While(stmt) => {
            parenthesize("while", [print_expr(&stmt.condition), print_stmt(&stmt.body)])
        }
        Stmt::Function(stmt) => {
            let parameters = stmt
                .parameters
                .iter()
                .map(|parameter| parameter.lexeme.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let mut parts = vec![stmt.name.lexeme.clone(), format!("({})", parameters)];
            parts.extend(stmt.body.iter().map(print_stmt));
            parenthesize("fun", parts)
        }
        Stmt::Return(stmt) => parenthesize("return", stmt.value.as_ref().map(print_expr)),
    }
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(expr) => match &expr.value {
            LiteralValue::String(value) => format!("\"{}\"", value),
            value => value.to_string(),
        },
        Expr::Unary(expr) => parenthesize(&expr.operator.lexeme, [print_expr(&expr.expression)]),
        Expr::Binary(expr) => parenthesize(
            &expr.operator.lexeme,
            [print_expr(&expr.left), print_expr(&expr.right)],
        ),
        Expr::Logical(expr) => parenthesize(
            &expr.operator.lexeme,
            [print_expr(&expr.left), print_expr(&expr.right)],
        ),
        Expr::Grouping(expr) => parenthesize("group", [print_expr(&expr.expression)]),
        Expr::Variable(expr) => expr.name.lexeme.clone(),
        Expr::Assign(expr) => {
            parenthesize("=", [expr.name.lexeme.clone(), print_expr(&expr.value)])
        }
        Expr::Call(expr) => {
            let mut parts = vec![print_expr(&expr.callee)];
            parts.extend(expr.arguments.iter().map(print_expr));
            parenthesize("call", parts)
        }
    }
}

fn parenthesize(name: &str, parts: impl IntoIterator<Item = String>) -> String {
    let mut out = format!("({}", name);
    for part in parts {
        out.push(' ');
        out.push_str(&part);
    }
    out.push(')');
    out
}
