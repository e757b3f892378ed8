use crate::any::Any;

use super::{
    ast::{AssignOp, Ast, BinaryOp, CompareOp, LogicOp, UnaryOp},
    lexer::{tokenize, Token},
    ScriptError,
};

/// Parse a script: one or more expressions separated by `;`.
pub fn parse_program(source: &str) -> Result<Vec<Ast>, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };

    let mut program = Vec::new();
    loop {
        if parser.at_end() {
            break;
        }
        program.push(parser.expression()?);
        if !parser.consume_if(&Token::Semicolon) {
            break;
        }
    }

    if !parser.at_end() {
        return Err(ScriptError::Parse(format!(
            "unexpected token {:?}",
            parser.tokens[parser.pos]
        )));
    }
    if program.is_empty() {
        return Err(ScriptError::Parse("empty script".to_string()));
    }

    Ok(program)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume_if(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ScriptError> {
        if self.consume_if(&token) {
            Ok(())
        } else {
            Err(ScriptError::Parse(format!(
                "expected {token:?}, found {:?}",
                self.peek()
            )))
        }
    }

    /// Lowest precedence: assignment, right associative. The left-hand side
    /// must be a plain name.
    fn expression(&mut self) -> Result<Ast, ScriptError> {
        let lhs = self.ternary()?;

        let op = match self.peek() {
            Some(Token::Assign) => AssignOp::Assign,
            Some(Token::AssignCreate) => AssignOp::AssignCreate,
            Some(Token::AddAssign) => AssignOp::AddAssign,
            Some(Token::SubAssign) => AssignOp::SubAssign,
            Some(Token::MulAssign) => AssignOp::MulAssign,
            Some(Token::DivAssign) => AssignOp::DivAssign,
            _ => return Ok(lhs),
        };
        self.pos += 1;

        let name = match lhs {
            Ast::Name(name) => name,
            _ => {
                return Err(ScriptError::Parse(
                    "left side of an assignment must be a name".to_string(),
                ))
            }
        };

        let rhs = self.expression()?;
        Ok(Ast::Assignment {
            name,
            op,
            rhs: Box::new(rhs),
        })
    }

    fn ternary(&mut self) -> Result<Ast, ScriptError> {
        let condition = self.logic_or()?;

        if !self.consume_if(&Token::Question) {
            return Ok(condition);
        }

        let then_branch = self.expression()?;
        self.expect(Token::Colon)?;
        let else_branch = self.expression()?;

        Ok(Ast::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn logic_or(&mut self) -> Result<Ast, ScriptError> {
        let mut lhs = self.logic_and()?;
        while self.consume_if(&Token::OrOr) {
            let rhs = self.logic_and()?;
            lhs = Ast::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn logic_and(&mut self) -> Result<Ast, ScriptError> {
        let mut lhs = self.concat()?;
        while self.consume_if(&Token::AndAnd) {
            let rhs = self.concat()?;
            lhs = Ast::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn concat(&mut self) -> Result<Ast, ScriptError> {
        let mut lhs = self.bit_or()?;
        while self.consume_if(&Token::DotDot) {
            let rhs = self.bit_or()?;
            lhs = Ast::Binary {
                op: BinaryOp::Concat,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn bit_or(&mut self) -> Result<Ast, ScriptError> {
        let mut lhs = self.bit_and()?;
        loop {
            let op = match self.peek() {
                Some(Token::Pipe) => BinaryOp::BitOr,
                Some(Token::Caret) => BinaryOp::BitXor,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.bit_and()?;
            lhs = Ast::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn bit_and(&mut self) -> Result<Ast, ScriptError> {
        let mut lhs = self.comparison()?;
        while self.consume_if(&Token::Amp) {
            let rhs = self.comparison()?;
            lhs = Ast::Binary {
                op: BinaryOp::BitAnd,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// Comparisons chain: `a < b <= c` holds iff both links hold.
    fn comparison(&mut self) -> Result<Ast, ScriptError> {
        let first = self.additive()?;

        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::Ne,
                Some(Token::Less) => CompareOp::Lt,
                Some(Token::Greater) => CompareOp::Gt,
                Some(Token::LessEq) => CompareOp::Le,
                Some(Token::GreaterEq) => CompareOp::Ge,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.additive()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Ast::Comparison {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn additive(&mut self) -> Result<Ast, ScriptError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Ast::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Ast, ScriptError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Ast::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Ast, ScriptError> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Negate),
            Some(Token::Tilde) => Some(UnaryOp::Complement),
            Some(Token::Bang) => Some(UnaryOp::Not),
            _ => None,
        };

        if let Some(op) = op {
            self.pos += 1;
            let expr = self.unary()?;
            return Ok(Ast::Unary {
                op,
                expr: Box::new(expr),
            });
        }

        self.atom()
    }

    fn atom(&mut self) -> Result<Ast, ScriptError> {
        match self.advance() {
            Some(Token::Int(v)) => Ok(Ast::Literal(Any::new(v))),
            Some(Token::Float(v)) => Ok(Ast::Literal(Any::new(v))),
            Some(Token::Str(v)) => Ok(Ast::Literal(Any::new(v))),
            Some(Token::Ident(name)) => Ok(Ast::Name(name)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(ScriptError::Parse(format!(
                "expected an operand, found {other:?}"
            ))),
        }
    }
}
