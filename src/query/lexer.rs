//! XPath expression lexer.

/// XPath token types.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DoubleDot,
    At,
    Pipe,
    Plus,
    Minus,
    Star,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Mod,
    Div,

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    Number(f64),
    String(String),

    /// NCName.
    Name(String),
    /// `prefix:local` or `prefix:*`.
    NameTest(String),
    /// `node`, `text`, `comment`, `processing-instruction` followed by `(`.
    NodeType(String),

    /// Axis name followed by `::`.
    Axis(String),
    DoubleColon,
    Comma,
    Dollar,

    Eof,
}

/// Streaming lexer over an expression string.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::Eof,
        };

        match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                if self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    return self.read_number();
                }
                self.advance(1);
                if self.peek() == Some('.') {
                    self.advance(1);
                    Token::DoubleDot
                } else {
                    Token::Dot
                }
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '|' => {
                self.advance(1);
                Token::Pipe
            }
            '+' => {
                self.advance(1);
                Token::Plus
            }
            '-' => {
                self.advance(1);
                Token::Minus
            }
            '*' => {
                self.advance(1);
                Token::Star
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            '!' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::NotEq
                } else {
                    Token::Name("!".to_string())
                }
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            ',' => {
                self.advance(1);
                Token::Comma
            }
            '$' => {
                self.advance(1);
                Token::Dollar
            }
            ':' => {
                self.advance(1);
                if self.peek() == Some(':') {
                    self.advance(1);
                    Token::DoubleColon
                } else {
                    Token::Name(":".to_string())
                }
            }
            '"' | '\'' => self.read_string(),
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => {
                self.advance(c.len_utf8());
                Token::Name(c.to_string())
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance(1);
        }
        if self.peek() == Some('.') && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            self.advance(1);
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance(1);
            }
        }
        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    fn read_string(&mut self) -> Token {
        let quote = self.peek().unwrap_or('"');
        self.advance(1);
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                break;
            }
            self.advance(c.len_utf8());
        }
        let value = self.input[start..self.pos].to_string();
        self.advance(1);
        Token::String(value)
    }

    fn read_name_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        let name = &self.input[start..self.pos];

        match name {
            "and" => Token::And,
            "or" => Token::Or,
            "mod" => Token::Mod,
            "div" => Token::Div,
            _ => {
                self.skip_whitespace();
                if self.remaining().starts_with("::") {
                    Token::Axis(name.to_string())
                } else if self.peek() == Some('(') {
                    match name {
                        "node" | "text" | "comment" | "processing-instruction" => {
                            Token::NodeType(name.to_string())
                        }
                        _ => Token::Name(name.to_string()),
                    }
                } else if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
                    self.advance(1);
                    if self.peek() == Some('*') {
                        self.advance(1);
                        Token::NameTest(format!("{}:*", name))
                    } else {
                        let local_start = self.pos;
                        while let Some(c) = self.peek() {
                            if is_name_char(c) {
                                self.advance(c.len_utf8());
                            } else {
                                break;
                            }
                        }
                        let local = &self.input[local_start..self.pos];
                        Token::NameTest(format!("{}:{}", name, local))
                    }
                } else {
                    Token::Name(name.to_string())
                }
            }
        }
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
