//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};

/// XPath expression AST.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Document root (`/`).
    Root,
    /// Current context node (`.`).
    Context,
    /// Parent of the context node (`..`).
    Parent,
    /// Union of two node-sets (`|`).
    Union(Box<Expr>, Box<Expr>),
    /// One location step applied to a base expression.
    Path(Box<Expr>, Box<Step>),
    /// Predicate applied to a base expression (`(...)[p]`).
    Filter(Box<Expr>, Box<Expr>),
    /// Function call.
    Function(String, Vec<Expr>),
    /// Binary operation.
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary minus.
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    /// `$name` variable reference.
    Variable(String),
    /// A bare location step relative to the context node.
    Step(Box<Step>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// One location step.
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

/// XPath 1.0 axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }
}

/// Node test within a step.
#[derive(Debug, Clone)]
pub enum NodeTest {
    /// `*`
    Any,
    /// Unprefixed name; matches nodes in no namespace.
    Name(String),
    /// `prefix:local`; the prefix resolves through the query's prefix map.
    QName(String, String),
    /// `prefix:*`
    NamespaceWildcard(String),
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction(target?)`
    ProcessingInstruction(Option<String>),
}

/// Parse an XPath expression string into an AST.
pub fn parse(input: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_expr()?;
    if parser.current != Token::Eof {
        return Err(format!("unexpected trailing token: {:?}", parser.current));
    }
    Ok(expr)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Parser {
            lexer,
            current,
            peeked: None,
        }
    }

    fn advance(&mut self) {
        self.current = match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.next_token(),
        };
    }

    fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token());
        }
        match &self.peeked {
            Some(t) => t,
            None => &Token::Eof,
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        if self.current == token {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {:?}, found {:?}", token, self.current))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and_expr()?;
        while self.current == Token::Or {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality_expr()?;
        while self.current == Token::And {
            self.advance();
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.current {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, String> {
        if self.current == Token::Minus {
            self.advance();
            let expr = self.parse_unary_expr()?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path_expr()?;
        while self.current == Token::Pipe {
            self.advance();
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path_expr(&mut self) -> Result<Expr, String> {
        let mut expr = match &self.current {
            Token::Slash => {
                self.advance();
                if matches!(
                    self.current,
                    Token::Eof
                        | Token::RightBracket
                        | Token::RightParen
                        | Token::Pipe
                        | Token::Comma
                ) {
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                Expr::Path(Box::new(Expr::Root), Box::new(step))
            }
            Token::DoubleSlash => {
                self.advance();
                let step = self.parse_step()?;
                Expr::Path(
                    Box::new(Expr::Path(Box::new(Expr::Root), Box::new(descendant_step()))),
                    Box::new(step),
                )
            }
            _ => return self.parse_filter_expr(),
        };

        loop {
            match self.current {
                Token::Slash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(
                        Box::new(Expr::Path(Box::new(expr), Box::new(descendant_step()))),
                        Box::new(step),
                    );
                }
                Token::LeftBracket => {
                    self.advance();
                    let pred = self.parse_expr()?;
                    self.expect(Token::RightBracket)?;
                    expr = Expr::Filter(Box::new(expr), Box::new(pred));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_filter_expr(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            match self.current {
                Token::LeftBracket => {
                    self.advance();
                    let pred = self.parse_expr()?;
                    self.expect(Token::RightBracket)?;
                    expr = Expr::Filter(Box::new(expr), Box::new(pred));
                }
                Token::Slash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(
                        Box::new(Expr::Path(Box::new(expr), Box::new(descendant_step()))),
                        Box::new(step),
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, String> {
        match &self.current {
            Token::Number(n) => {
                let n = *n;
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance();
                if let Token::Name(name) = &self.current {
                    let name = name.clone();
                    self.advance();
                    Ok(Expr::Variable(name))
                } else {
                    Err("expected variable name after '$'".to_string())
                }
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::Name(name) => {
                let name = name.clone();
                if *self.peek() == Token::LeftParen {
                    self.advance();
                    self.advance();
                    let args = self.parse_function_args()?;
                    Ok(Expr::Function(name, args))
                } else {
                    let step = self.parse_step()?;
                    Ok(Expr::Step(Box::new(step)))
                }
            }
            Token::NameTest(_) | Token::Star | Token::NodeType(_) | Token::Axis(_) => {
                let step = self.parse_step()?;
                Ok(Expr::Step(Box::new(step)))
            }
            Token::At => {
                self.advance();
                let step = self.parse_step_with_axis(Axis::Attribute)?;
                Ok(Expr::Step(Box::new(step)))
            }
            Token::Dot => {
                self.advance();
                Ok(Expr::Context)
            }
            Token::DoubleDot => {
                self.advance();
                Ok(Expr::Parent)
            }
            other => Err(format!("unexpected token: {:?}", other)),
        }
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        self.parse_step_with_axis(Axis::Child)
    }

    fn parse_step_with_axis(&mut self, mut axis: Axis) -> Result<Step, String> {
        // Abbreviated steps inside a path: `.` and `..`.
        if self.current == Token::Dot {
            self.advance();
            return Ok(Step {
                axis: Axis::Self_,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.current == Token::DoubleDot {
            self.advance();
            return Ok(Step {
                axis: Axis::Parent,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.current == Token::At {
            axis = Axis::Attribute;
            self.advance();
        }
        if let Token::Axis(name) = &self.current {
            axis = Axis::from_name(name).ok_or_else(|| format!("unknown axis: {}", name))?;
            self.advance();
            self.expect(Token::DoubleColon)?;
        }

        let node_test = match &self.current {
            Token::Star => {
                self.advance();
                NodeTest::Any
            }
            Token::Name(name) => {
                let name = name.clone();
                self.advance();
                NodeTest::Name(name)
            }
            Token::NameTest(qname) => {
                let qname = qname.clone();
                self.advance();
                if let Some(prefix) = qname.strip_suffix(":*") {
                    NodeTest::NamespaceWildcard(prefix.to_string())
                } else if let Some((prefix, local)) = qname.split_once(':') {
                    NodeTest::QName(prefix.to_string(), local.to_string())
                } else {
                    NodeTest::Name(qname)
                }
            }
            Token::NodeType(name) => {
                let name = name.clone();
                self.advance();
                self.expect(Token::LeftParen)?;
                let arg = if let Token::String(s) = &self.current {
                    let s = s.clone();
                    self.advance();
                    Some(s)
                } else {
                    None
                };
                self.expect(Token::RightParen)?;
                match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    "processing-instruction" => NodeTest::ProcessingInstruction(arg),
                    other => return Err(format!("unknown node type: {}", other)),
                }
            }
            other => return Err(format!("expected node test, found {:?}", other)),
        };

        let mut predicates = Vec::new();
        while self.current == Token::LeftBracket {
            self.advance();
            predicates.push(self.parse_expr()?);
            self.expect(Token::RightBracket)?;
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.current != Token::RightParen {
            args.push(self.parse_expr()?);
            while self.current == Token::Comma {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(Token::RightParen)?;
        Ok(args)
    }
}

/// The implicit `descendant-or-self::node()` step that `//` abbreviates.
fn descendant_step() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        node_test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        assert!(matches!(parse("/root/child").unwrap(), Expr::Path(..)));
    }

    #[test]
    fn test_descendant_abbreviation() {
        assert!(matches!(parse("//item").unwrap(), Expr::Path(..)));
    }

    #[test]
    fn test_function_call() {
        match parse("count(//item)").unwrap() {
            Expr::Function(name, args) => {
                assert_eq!(name, "count");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_union() {
        assert!(matches!(parse("/a | /b").unwrap(), Expr::Union(..)));
    }

    #[test]
    fn test_parent_step_in_path() {
        assert!(parse("$contexts/..").is_ok());
        assert!(parse("../preceding-sibling::more").is_ok());
    }

    #[test]
    fn test_filtered_group() {
        assert!(parse("(/a/b)[1]/c").is_ok());
    }

    #[test]
    fn test_malformed_expressions_rejected() {
        assert!(parse("/root[").is_err());
        assert!(parse("foo(").is_err());
        assert!(parse("/root/").is_err());
        assert!(parse("]").is_err());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse("/a )").is_err());
    }
}
