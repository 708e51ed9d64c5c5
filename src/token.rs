use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
    Semicolon,
    Plus,
    Minus,
    Slash,
    Star,

    // One or two-character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Keywords.
    Var,
    Fun,
    Class,
    This,
    Super,
    If,
    Else,
    For,
    While,
    Print,
    Return,
    And,
    Or,
    True,
    False,
    Nil,

    // Literals.
    Number,
    String,
    Identifier,

    // End of file.
    Eof,
}

impl TokenType {
    /// Maps a reserved word to its keyword token type.
    pub fn keyword(lexeme: &str) -> Option<TokenType> {
        match lexeme {
            "and" => Some(TokenType::And),
            "class" => Some(TokenType::Class),
            "else" => Some(TokenType::Else),
            "false" => Some(TokenType::False),
            "for" => Some(TokenType::For),
            "fun" => Some(TokenType::Fun),
            "if" => Some(TokenType::If),
            "nil" => Some(TokenType::Nil),
            "or" => Some(TokenType::Or),
            "print" => Some(TokenType::Print),
            "return" => Some(TokenType::Return),
            "super" => Some(TokenType::Super),
            "this" => Some(TokenType::This),
            "true" => Some(TokenType::True),
            "var" => Some(TokenType::Var),
            "while" => Some(TokenType::While),
            _ => None,
        }
    }

    /// Tokens that can begin a declaration or statement. The parser stops
    /// discarding tokens at one of these after an error.
    pub fn starts_statement(self) -> bool {
        use TokenType::*;
        matches!(
            self,
            Class | Fun | Var | For | If | While | Print | Return
        )
    }
}

/// Value scanned out of a literal token.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Nil => write!(f, "nil"),
            LiteralValue::Bool(value) => write!(f, "{}", value),
            LiteralValue::Number(value) => write!(f, "{}", value),
            LiteralValue::String(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
    pub literal: Option<LiteralValue>,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, line: usize) -> Token {
        Token {
            token_type,
            lexeme: lexeme.into(),
            line,
            literal: None,
        }
    }

    pub fn with_literal(mut self, literal: LiteralValue) -> Token {
        self.literal = Some(literal);
        self
    }

    pub fn is_eof(&self) -> bool {
        self.token_type == TokenType::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_covers_reserved_words() {
        for word in [
            "and", "class", "else", "false", "for", "fun", "if", "nil", "or", "print", "return",
            "super", "this", "true", "var", "while",
        ] {
            assert!(TokenType::keyword(word).is_some(), "{} is reserved", word);
        }
        assert_eq!(TokenType::keyword("variable"), None);
        assert_eq!(TokenType::keyword("Print"), None);
    }

    #[test]
    fn statement_boundaries() {
        assert!(TokenType::Fun.starts_statement());
        assert!(TokenType::Return.starts_statement());
        assert!(!TokenType::Identifier.starts_statement());
        assert!(!TokenType::Semicolon.starts_statement());
    }
}
