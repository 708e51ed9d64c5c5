use std::{cell::Cell, rc::Rc};

use crate::token::{LiteralValue, Token};

pub enum Stmt {
    Expression(Box<ExpressionStmt>),
    Print(Box<PrintStmt>),
    Var(Box<VarStmt>),
    Block(Box<BlockStmt>),
    If(Box<IfStmt>),
    While(Box<WhileStmt>),
    Function(Rc<FunctionStmt>),
    Return(Box<ReturnStmt>),
}

pub struct ExpressionStmt {
    pub expression: Expr,
}

pub struct PrintStmt {
    pub expression: Expr,
}

pub struct VarStmt {
    pub name: Token,
    pub initializer: Option<Expr>,
}

pub struct BlockStmt {
    pub statements: Vec<Stmt>,
}

pub struct IfStmt {
    pub condition: Expr,
    pub then_statement: Stmt,
    pub else_statement: Option<Stmt>,
}

pub struct WhileStmt {
    pub condition: Expr,
    pub body: Stmt,
}

/// Shared between the tree and every closure created from it.
pub struct FunctionStmt {
    pub name: Token,
    pub parameters: Vec<Token>,
    pub body: Vec<Stmt>,
}

pub struct ReturnStmt {
    pub keyword: Token,
    pub value: Option<Expr>,
}

pub enum Expr {
    Literal(Box<LiteralExpr>),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Logical(Box<LogicalExpr>),
    Grouping(Box<GroupingExpr>),
    Variable(Box<VariableExpr>),
    Assign(Box<AssignExpr>),
    Call(Box<CallExpr>),
}

pub struct LiteralExpr {
    pub value: LiteralValue,
}

pub struct UnaryExpr {
    pub operator: Token,
    pub expression: Expr,
}

pub struct BinaryExpr {
    pub left: Expr,
    pub operator: Token,
    pub right: Expr,
}

pub struct LogicalExpr {
    pub left: Expr,
    pub operator: Token,
    pub right: Expr,
}

pub struct GroupingExpr {
    pub expression: Expr,
}

pub struct VariableExpr {
    pub name: Token,
    /// Scopes between the reference and its declaration. `None` means global.
    pub depth: Cell<Option<usize>>,
}

pub struct AssignExpr {
    pub name: Token,
    pub value: Expr,
    pub depth: Cell<Option<usize>>,
}

pub struct CallExpr {
    pub callee: Expr,
    pub paren: Token,
    pub arguments: Vec<Expr>,
}

impl Expr {
    pub fn literal(value: LiteralValue) -> Expr {
        Expr::Literal(Box::new(LiteralExpr { value }))
    }

    pub fn variable(name: Token) -> Expr {
        Expr::Variable(Box::new(VariableExpr {
            name,
            depth: Cell::new(None),
        }))
    }

    pub fn assign(name: Token, value: Expr) -> Expr {
        Expr::Assign(Box::new(AssignExpr {
            name,
            value,
            depth: Cell::new(None),
        }))
    }
}

impl Stmt {
    pub fn expression(expression: Expr) -> Stmt {
        Stmt::Expression(Box::new(ExpressionStmt { expression }))
    }

    pub fn block(statements: Vec<Stmt>) -> Stmt {
        Stmt::Block(Box::new(BlockStmt { statements }))
    }
}
