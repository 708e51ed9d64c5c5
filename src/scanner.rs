use tracing::{debug, instrument};

use crate::{
    error::StaticError,
    token::{LiteralValue, Token, TokenType},
};

pub struct Scanner {
    source: Vec<char>,
    line: usize,
    start: usize,
    current: usize,
    tokens: Vec<Token>,
}

impl Scanner {
    pub fn new(source: &str) -> Scanner {
        Scanner {
            source: source.chars().collect(),
            line: 1,
            start: 0,
            current: 0,
            tokens: Vec::new(),
        }
    }

    /// Starts line counting at `line` instead of 1, so a REPL can report the
    /// prompt line a diagnostic came from.
    pub fn with_starting_line(mut self, line: usize) -> Scanner {
        self.line = line;
        self
    }

    /// Scans the whole source. The first error stops scanning; the tokens
    /// produced before it are returned alongside it.
    #[instrument(level = "debug", skip_all)]
    pub fn scan_tokens(mut self) -> (Vec<Token>, Option<StaticError>) {
        while !self.is_at_end() {
            self.start = self.current;
            if let Err(error) = self.scan_token() {
                debug!(line = error.line, "scan aborted");
                return (self.tokens, Some(error));
            }
        }

        self.tokens.push(Token::new(TokenType::Eof, "", self.line));
        debug!(count = self.tokens.len(), "scanned tokens");

        (self.tokens, None)
    }

    fn scan_token(&mut self) -> Result<(), StaticError> {
        let character = self.advance();

        match character {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '.' => self.add_token(TokenType::Dot),
            ',' => self.add_token(TokenType::Comma),
            ';' => self.add_token(TokenType::Semicolon),
            '+' => self.add_token(TokenType::Plus),
            '-' => self.add_token(TokenType::Minus),
            '*' => self.add_token(TokenType::Star),
            '!' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::BangEqual,
                    false => TokenType::Bang,
                };
                self.add_token(token_type)
            }
            '=' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::EqualEqual,
                    false => TokenType::Equal,
                };
                self.add_token(token_type)
            }
            '<' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::LessEqual,
                    false => TokenType::Less,
                };
                self.add_token(token_type)
            }
            '>' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::GreaterEqual,
                    false => TokenType::Greater,
                };
                self.add_token(token_type)
            }
            '/' => {
                if self.match_char('/') {
                    while self.peek() != Some('\n') && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash)
                }
            }
            '"' => return self.string(),
            ' ' | '\t' | '\r' => {}
            '\n' => {
                self.line += 1;
            }
            _ => {
                if is_digit(character) {
                    self.number();
                } else if is_alpha(character) {
                    self.identifier();
                } else {
                    return Err(StaticError::scan(self.line, "Unexpected character."));
                }
            }
        }

        Ok(())
    }

    fn string(&mut self) -> Result<(), StaticError> {
        let start_line = self.line;

        while let Some(character) = self.peek() {
            if character == '"' {
                break;
            }
            if character == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if !self.match_char('"') {
            return Err(StaticError::scan(start_line, "Unterminated string."));
        }

        let value: String = self.source[self.start + 1..self.current - 1]
            .iter()
            .collect();
        self.add_full_token(TokenType::String, Some(LiteralValue::String(value)));
        Ok(())
    }

    fn number(&mut self) {
        while self.peek().map_or(false, is_digit) {
            self.advance();
        }

        // A '.' only belongs to the number when a digit follows it.
        if self.peek() == Some('.') && self.peek_next().map_or(false, is_digit) {
            self.advance();
            while self.peek().map_or(false, is_digit) {
                self.advance();
            }
        }

        let value = self.lexeme().parse::<f64>().unwrap_or(0.0);
        self.add_full_token(TokenType::Number, Some(LiteralValue::Number(value)));
    }

    fn identifier(&mut self) {
        while self.peek().map_or(false, is_alpha_numeric) {
            self.advance();
        }

        let token_type = TokenType::keyword(&self.lexeme()).unwrap_or(TokenType::Identifier);
        self.add_token(token_type)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn advance(&mut self) -> char {
        let current = self.source[self.current];
        self.current += 1;
        current
    }

    fn match_char(&mut self, character: char) -> bool {
        if self.peek() == Some(character) {
            self.current += 1;
            return true;
        }

        false
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_full_token(token_type, None)
    }

    fn add_full_token(&mut self, token_type: TokenType, literal: Option<LiteralValue>) {
        let token = Token::new(token_type, self.lexeme(), self.line);
        self.tokens.push(match literal {
            Some(literal) => token.with_literal(literal),
            None => token,
        })
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }
}

/// Scans `source`, discarding the partial token list on failure.
pub fn scan(source: &str) -> Result<Vec<Token>, StaticError> {
    match Scanner::new(source).scan_tokens() {
        (tokens, None) => Ok(tokens),
        (_, Some(error)) => Err(error),
    }
}

fn is_digit(character: char) -> bool {
    character.is_ascii_digit()
}

fn is_alpha(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_'
}

fn is_alpha_numeric(character: char) -> bool {
    is_digit(character) || is_alpha(character)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::{Location, Stage};

    fn types(source: &str) -> Vec<TokenType> {
        scan(source)
            .unwrap()
            .into_iter()
            .map(|token| token.token_type)
            .collect()
    }

    #[test]
    fn punctuation_and_operators() {
        use TokenType::*;
        assert_eq!(
            types("(){},.;-+*/ ! != = == < <= > >="),
            vec![
                LeftParen, RightParen, LeftBrace, RightBrace, Comma, Dot, Semicolon, Minus, Plus,
                Star, Slash, Bang, BangEqual, Equal, EqualEqual, Less, LessEqual, Greater,
                GreaterEqual, Eof
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        use TokenType::*;
        assert_eq!(types("1 // two 3\n4"), vec![Number, Number, Eof]);
        assert_eq!(types("// only a comment"), vec![Eof]);
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenType::*;
        assert_eq!(
            types("var _under fun orchid or"),
            vec![Var, Identifier, Fun, Identifier, Or, Eof]
        );
    }

    #[test]
    fn numbers() {
        let tokens = scan("12 3.25").unwrap();
        assert_eq!(tokens[0].literal, Some(LiteralValue::Number(12.0)));
        assert_eq!(tokens[1].literal, Some(LiteralValue::Number(3.25)));
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        let tokens = scan("7.").unwrap();
        assert_eq!(tokens[0].lexeme, "7");
        assert_eq!(tokens[1].token_type, TokenType::Dot);
        assert_eq!(tokens[2].token_type, TokenType::Eof);
    }

    #[test]
    fn strings_count_lines() {
        let tokens = scan("\"a\nb\" x").unwrap();
        assert_eq!(
            tokens[0].literal,
            Some(LiteralValue::String("a\nb".to_string()))
        );
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn non_ascii_text_inside_strings() {
        let tokens = scan("\"héllo wörld\"").unwrap();
        assert_eq!(
            tokens[0].literal,
            Some(LiteralValue::String("héllo wörld".to_string()))
        );
    }

    #[test]
    fn unterminated_string_reports_starting_line() {
        let (tokens, error) = Scanner::new("1;\n\"abc\n\ndef").scan_tokens();
        let error = error.unwrap();
        assert_eq!(error.stage, Stage::Scan);
        assert_eq!(error.line, 2);
        assert_eq!(error.message, "Unterminated string.");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn unexpected_character_stops_scanning() {
        let (tokens, error) = Scanner::new("var a;\n@ var b;").scan_tokens();
        let error = error.unwrap();
        assert_eq!(error.line, 2);
        assert_eq!(error.location, Location::None);
        assert_eq!(error.to_string(), "[line 2] Error: Unexpected character.");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn eof_token_carries_final_line() {
        let tokens = scan("a\nb\n").unwrap();
        let eof = tokens.last().unwrap();
        assert!(eof.is_eof());
        assert_eq!(eof.lexeme, "");
        assert_eq!(eof.line, 3);
    }

    #[test]
    fn starting_line_offsets_diagnostics() {
        let tokens = Scanner::new("x").with_starting_line(5).scan_tokens().0;
        assert_eq!(tokens[0].line, 5);
    }
}
