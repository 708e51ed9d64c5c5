use std::rc::Rc;

use tracing::{debug, instrument};

use crate::{
    ast::{
        BinaryExpr, CallExpr, Expr, FunctionStmt, GroupingExpr, IfStmt, LogicalExpr, PrintStmt,
        ReturnStmt, Stmt, UnaryExpr, VarStmt, WhileStmt,
    },
    error::StaticError,
    token::{LiteralValue, Token, TokenType},
};

/// Most arguments a call, or parameters a declaration, may list.
pub const MAX_ARGUMENTS: usize = 255;

type ParseResult<T> = Result<T, StaticError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    repl: bool,
    errors: Vec<StaticError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Parser {
        if !tokens.last().map_or(false, Token::is_eof) {
            let line = tokens.last().map_or(1, |token| token.line);
            tokens.push(Token::new(TokenType::Eof, "", line));
        }

        Parser {
            tokens,
            current: 0,
            repl: false,
            errors: Vec::new(),
        }
    }

    /// Lets the final expression statement omit its semicolon, so a bare
    /// expression typed at a prompt parses.
    pub fn repl_mode(mut self) -> Parser {
        self.repl = true;
        self
    }

    /// Parses every declaration in the token stream. A malformed declaration
    /// is dropped and parsing resumes at the next statement boundary; all
    /// errors are returned in source order.
    #[instrument(level = "debug", skip_all)]
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<StaticError>) {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(statement) = self.declaration_with_sync() {
                statements.push(statement);
            }
        }

        debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );

        (statements, self.errors)
    }

    /// Parses one top-level declaration, keeping at most one error for it:
    /// the first one reported along the way, else the one that aborted it.
    fn declaration_with_sync(&mut self) -> Option<Stmt> {
        let reported = self.errors.len();
        let result = self.declaration();
        self.errors.truncate(reported + 1);

        match result {
            Ok(statement) => Some(statement),
            Err(error) => {
                debug!(%error, "synchronizing after parse error");
                if self.errors.len() == reported {
                    self.errors.push(error);
                }
                self.synchronize();
                None
            }
        }
    }

    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            if self.peek().token_type.starts_statement() {
                return;
            }

            self.advance();
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.match_token(TokenType::Fun) {
            self.function_declaration()
        } else if self.match_token(TokenType::Var) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn function_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect function name.")?;

        self.consume(TokenType::LeftParen, "Expect '(' after function name.")?;

        let mut parameters = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if parameters.len() == MAX_ARGUMENTS {
                    let error = StaticError::parse(
                        self.peek(),
                        format!("Can't have more than {} parameters.", MAX_ARGUMENTS),
                    );
                    self.errors.push(error);
                }

                parameters.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);

                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenType::LeftBrace, "Expect '{' before function body.")?;

        let body = self.block()?;

        Ok(Stmt::Function(Rc::new(FunctionStmt {
            name,
            parameters,
            body,
        })))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;

        let initializer = match self.match_token(TokenType::Equal) {
            true => Some(self.expression()?),
            false => None,
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var(Box::new(VarStmt { name, initializer })))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_token(TokenType::LeftBrace) {
            Ok(Stmt::block(self.block()?))
        } else if self.match_token(TokenType::Print) {
            self.print_stmt()
        } else if self.match_token(TokenType::If) {
            self.if_stmt()
        } else if self.match_token(TokenType::While) {
            self.while_stmt()
        } else if self.match_token(TokenType::For) {
            self.for_stmt()
        } else if self.match_token(TokenType::Return) {
            self.return_stmt()
        } else {
            self.expression_stmt()
        }
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn print_stmt(&mut self) -> ParseResult<Stmt> {
        let expression = self.expression()?;

        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;

        Ok(Stmt::Print(Box::new(PrintStmt { expression })))
    }

    fn if_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;

        let condition = self.expression()?;

        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_statement = self.statement()?;

        let else_statement = match self.match_token(TokenType::Else) {
            true => Some(self.statement()?),
            false => None,
        };

        Ok(Stmt::If(Box::new(IfStmt {
            condition,
            then_statement,
            else_statement,
        })))
    }

    fn while_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;

        let condition = self.expression()?;

        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;

        let body = self.statement()?;

        Ok(Stmt::While(Box::new(WhileStmt { condition, body })))
    }

    /// `for` has no node of its own: it becomes a block holding the
    /// initializer and a `while` whose body ends with the increment.
    fn for_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_token(TokenType::Semicolon) {
            None
        } else if self.match_token(TokenType::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.terminated_expression_stmt()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            Expr::literal(LiteralValue::Bool(true))
        } else {
            self.expression()?
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(expression) = increment {
            body = Stmt::block(vec![body, Stmt::expression(expression)]);
        }

        body = Stmt::While(Box::new(WhileStmt { condition, body }));

        if let Some(statement) = initializer {
            body = Stmt::block(vec![statement, body]);
        }

        Ok(body)
    }

    fn return_stmt(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;

        Ok(Stmt::Return(Box::new(ReturnStmt { keyword, value })))
    }

    fn expression_stmt(&mut self) -> ParseResult<Stmt> {
        let expression = self.expression()?;

        if self.repl && self.is_at_end() {
            return Ok(Stmt::expression(expression));
        }

        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;

        Ok(Stmt::expression(expression))
    }

    fn terminated_expression_stmt(&mut self) -> ParseResult<Stmt> {
        let expression = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::expression(expression))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assign_expr()
    }

    fn assign_expr(&mut self) -> ParseResult<Expr> {
        let expr = self.or_expr()?;

        if self.match_token(TokenType::Equal) {
            let equals = self.previous().clone();
            let value = self.assign_expr()?;

            if let Expr::Variable(variable) = expr {
                return Ok(Expr::assign(variable.name, value));
            }

            // The parser is not confused here, so report without synchronizing.
            self.errors
                .push(StaticError::parse(&equals, "Invalid assignment target."));
        }

        Ok(expr)
    }

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and_expr()?;

        while self.match_token(TokenType::Or) {
            let operator = self.previous().clone();
            let right = self.and_expr()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                operator,
                right,
            }));
        }

        Ok(expr)
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality_expr()?;

        while self.match_token(TokenType::And) {
            let operator = self.previous().clone();
            let right = self.equality_expr()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                operator,
                right,
            }));
        }

        Ok(expr)
    }

    fn equality_expr(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[TokenType::BangEqual, TokenType::EqualEqual],
            Parser::comparison_expr,
        )
    }

    fn comparison_expr(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
            ],
            Parser::term_expr,
        )
    }

    fn term_expr(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenType::Minus, TokenType::Plus], Parser::factor_expr)
    }

    fn factor_expr(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenType::Slash, TokenType::Star], Parser::unary_expr)
    }

    /// One left-associative precedence level: `operand (op operand)*`.
    fn binary_level(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Parser) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;

        while self.match_any(operators) {
            let operator = self.previous().clone();
            let right = operand(self)?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                operator,
                right,
            }))
        }

        Ok(expr)
    }

    fn unary_expr(&mut self) -> ParseResult<Expr> {
        if self.match_any(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let expression = self.unary_expr()?;
            Ok(Expr::Unary(Box::new(UnaryExpr {
                operator,
                expression,
            })))
        } else {
            self.call_expr()
        }
    }

    fn call_expr(&mut self) -> ParseResult<Expr> {
        let mut expression = self.primary_expr()?;

        while self.match_token(TokenType::LeftParen) {
            expression = self.finish_call_expr(expression)?;
        }

        Ok(expression)
    }

    fn finish_call_expr(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() == MAX_ARGUMENTS {
                    let error = StaticError::parse(
                        self.peek(),
                        format!("Can't have more than {} arguments.", MAX_ARGUMENTS),
                    );
                    self.errors.push(error);
                }

                arguments.push(self.expression()?);

                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;

        Ok(Expr::Call(Box::new(CallExpr {
            callee,
            paren,
            arguments,
        })))
    }

    fn primary_expr(&mut self) -> ParseResult<Expr> {
        if self.match_token(TokenType::False) {
            Ok(Expr::literal(LiteralValue::Bool(false)))
        } else if self.match_token(TokenType::True) {
            Ok(Expr::literal(LiteralValue::Bool(true)))
        } else if self.match_token(TokenType::Nil) {
            Ok(Expr::literal(LiteralValue::Nil))
        } else if self.match_any(&[TokenType::Number, TokenType::String]) {
            let value = self.previous().literal.clone().unwrap_or(LiteralValue::Nil);
            Ok(Expr::literal(value))
        } else if self.match_token(TokenType::Identifier) {
            Ok(Expr::variable(self.previous().clone()))
        } else if self.match_token(TokenType::LeftParen) {
            let expression = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            Ok(Expr::Grouping(Box::new(GroupingExpr { expression })))
        } else {
            Err(StaticError::parse(self.peek(), "Expect expression."))
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            return true;
        }

        false
    }

    fn match_any(&mut self, token_types: &[TokenType]) -> bool {
        token_types
            .iter()
            .any(|token_type| self.match_token(*token_type))
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> ParseResult<Token> {
        if self.check(token_type) {
            let token = self.peek().clone();
            self.advance();
            return Ok(token);
        }

        Err(StaticError::parse(self.peek(), message))
    }
}

/// Parses a complete program, surfacing only the first error.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Stmt>, StaticError> {
    let (statements, errors) = Parser::new(tokens).parse();
    match errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(statements),
    }
}
