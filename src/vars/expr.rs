//! Sandboxed expression language used by `Variable Manager::set`/`evaluate_expression`.
//!
//! A small recursive-descent parser and tree-walking evaluator over a
//! whitelist of safe builtins. No file, process, import, or reflection
//! access is reachable from this grammar by construction: there is no
//! token for any of them, and `Call` only resolves names against
//! [`is_whitelisted`].

use indexmap::IndexMap;

use crate::error::VariableEvaluationError;
use crate::value::Value;

const WHITELIST: &[&str] = &[
    "int", "float", "str", "bool", "list", "dict", "tuple", "set", "len", "min", "max", "sum",
    "sorted", "range", "enumerate", "zip", "round", "abs", "all", "any",
];

pub fn is_whitelisted(name: &str) -> bool {
    WHITELIST.contains(&name)
}

/// Parse and evaluate `text` against `locals`. Does not mutate `locals`.
pub fn evaluate(text: &str, locals: &IndexMap<String, Value>) -> Result<Value, VariableEvaluationError> {
    let tokens = lex(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    parser.expect_eof()?;
    eval(&expr, locals)
}

// ---------------------------------------------------------------- lexer ---

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64, bool),
    Str(String),
    Ident(String),
    True,
    False,
    None_,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Eof,
}

fn lex(text: &str) -> Result<Vec<Tok>, VariableEvaluationError> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut toks = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '+' => { toks.push(Tok::Plus); i += 1; }
            '-' => { toks.push(Tok::Minus); i += 1; }
            '*' => { toks.push(Tok::Star); i += 1; }
            '/' => { toks.push(Tok::Slash); i += 1; }
            '%' => { toks.push(Tok::Percent); i += 1; }
            '(' => { toks.push(Tok::LParen); i += 1; }
            ')' => { toks.push(Tok::RParen); i += 1; }
            '[' => { toks.push(Tok::LBracket); i += 1; }
            ']' => { toks.push(Tok::RBracket); i += 1; }
            '{' => { toks.push(Tok::LBrace); i += 1; }
            '}' => { toks.push(Tok::RBrace); i += 1; }
            ',' => { toks.push(Tok::Comma); i += 1; }
            ':' => { toks.push(Tok::Colon); i += 1; }
            '.' => { toks.push(Tok::Dot); i += 1; }
            '<' => {
                if chars.get(i + 1) == Some(&'=') { toks.push(Tok::Le); i += 2; } else { toks.push(Tok::Lt); i += 1; }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') { toks.push(Tok::Ge); i += 2; } else { toks.push(Tok::Gt); i += 1; }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') { toks.push(Tok::EqEq); i += 2; } else {
                    return Err(VariableEvaluationError::Syntax(format!("unexpected '=' at position {}", i)));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') { toks.push(Tok::Ne); i += 2; } else {
                    return Err(VariableEvaluationError::Syntax(format!("unexpected '!' at position {}", i)));
                }
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                loop {
                    let ch = *chars.get(i).ok_or_else(|| VariableEvaluationError::Syntax("unterminated string".into()))?;
                    if ch == quote {
                        i += 1;
                        break;
                    }
                    if ch == '\\' {
                        i += 1;
                        let esc = *chars.get(i).ok_or_else(|| VariableEvaluationError::Syntax("unterminated string".into()))?;
                        s.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        });
                        i += 1;
                    } else {
                        s.push(ch);
                        i += 1;
                    }
                }
                toks.push(Tok::Str(s));
            }
            '$' => {
                // `$name` is accepted wherever a bare identifier is: the
                // parser (spec §4.6) keeps assignment expressions as raw
                // source text with `$name` preserved, so the evaluator
                // strips the sigil rather than requiring callers to.
                i += 1;
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if start == i {
                    return Err(VariableEvaluationError::Syntax("'$' not followed by a name".into()));
                }
                let word: String = chars[start..i].iter().collect();
                toks.push(Tok::Ident(word));
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text.parse().map_err(|_| VariableEvaluationError::Syntax(format!("invalid number '{}'", text)))?;
                toks.push(Tok::Num(n, !is_float));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                toks.push(match word.as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    "True" => Tok::True,
                    "False" => Tok::False,
                    "None" => Tok::None_,
                    _ => Tok::Ident(word),
                });
            }
            other => return Err(VariableEvaluationError::Syntax(format!("unexpected character '{}'", other))),
        }
    }
    toks.push(Tok::Eof);
    Ok(toks)
}

// --------------------------------------------------------------- parser ---

#[derive(Debug, Clone)]
enum Expr {
    Num(f64, bool),
    Str(String),
    Bool(bool),
    None_,
    Ident(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
}

#[derive(Debug, Clone, Copy)]
enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Tok {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_eof(&self) -> Result<(), VariableEvaluationError> {
        if matches!(self.peek(), Tok::Eof) {
            Ok(())
        } else {
            Err(VariableEvaluationError::Syntax("trailing input after expression".into()))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, VariableEvaluationError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, VariableEvaluationError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Tok::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, VariableEvaluationError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Tok::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, VariableEvaluationError> {
        if matches!(self.peek(), Tok::Not) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, VariableEvaluationError> {
        let mut left = self.parse_arith()?;
        loop {
            let op = match self.peek() {
                Tok::Lt => BinOp::Lt,
                Tok::Gt => BinOp::Gt,
                Tok::Le => BinOp::Le,
                Tok::Ge => BinOp::Ge,
                Tok::EqEq => BinOp::Eq,
                Tok::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_arith()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> Result<Expr, VariableEvaluationError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, VariableEvaluationError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, VariableEvaluationError> {
        match self.peek() {
            Tok::Minus => {
                self.advance();
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_factor()?)))
            }
            Tok::Plus => {
                self.advance();
                self.parse_factor()
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, VariableEvaluationError> {
        let mut base = self.parse_primary()?;
        loop {
            match self.peek() {
                Tok::LParen => {
                    self.advance();
                    let args = self.parse_args(Tok::RParen)?;
                    let name = match base {
                        Expr::Ident(n) => n,
                        _ => return Err(VariableEvaluationError::Forbidden("only named functions may be called".into())),
                    };
                    base = Expr::Call(name, args);
                }
                Tok::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Tok::RBracket)?;
                    base = Expr::Index(Box::new(base), Box::new(index));
                }
                Tok::Dot => {
                    self.advance();
                    let name = match self.advance() {
                        Tok::Ident(n) => n,
                        _ => return Err(VariableEvaluationError::Syntax("expected attribute name after '.'".into())),
                    };
                    base = Expr::Attr(Box::new(base), name);
                }
                _ => break,
            }
        }
        Ok(base)
    }

    fn parse_args(&mut self, closer: Tok) -> Result<Vec<Expr>, VariableEvaluationError> {
        let mut args = Vec::new();
        if self.peek() == &closer {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                Tok::Comma => {
                    self.advance();
                }
                t if t == &closer => {
                    self.advance();
                    break;
                }
                _ => return Err(VariableEvaluationError::Syntax("expected ',' or closing bracket".into())),
            }
        }
        Ok(args)
    }

    fn expect(&mut self, tok: Tok) -> Result<(), VariableEvaluationError> {
        if self.peek() == &tok {
            self.advance();
            Ok(())
        } else {
            Err(VariableEvaluationError::Syntax(format!("expected {:?}", tok)))
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, VariableEvaluationError> {
        match self.advance() {
            Tok::Num(n, is_int) => Ok(Expr::Num(n, is_int)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::True => Ok(Expr::Bool(true)),
            Tok::False => Ok(Expr::Bool(false)),
            Tok::None_ => Ok(Expr::None_),
            Tok::Ident(name) => Ok(Expr::Ident(name)),
            Tok::LParen => {
                let first = self.parse_expr()?;
                if matches!(self.peek(), Tok::Comma) {
                    let mut items = vec![first];
                    while matches!(self.peek(), Tok::Comma) {
                        self.advance();
                        if matches!(self.peek(), Tok::RParen) {
                            break;
                        }
                        items.push(self.parse_expr()?);
                    }
                    self.expect(Tok::RParen)?;
                    Ok(Expr::Tuple(items))
                } else {
                    self.expect(Tok::RParen)?;
                    Ok(first)
                }
            }
            Tok::LBracket => {
                let items = self.parse_args(Tok::RBracket)?;
                Ok(Expr::List(items))
            }
            Tok::LBrace => {
                let mut entries = Vec::new();
                if !matches!(self.peek(), Tok::RBrace) {
                    loop {
                        let key = self.parse_expr()?;
                        self.expect(Tok::Colon)?;
                        let val = self.parse_expr()?;
                        entries.push((key, val));
                        match self.peek() {
                            Tok::Comma => {
                                self.advance();
                            }
                            Tok::RBrace => break,
                            _ => return Err(VariableEvaluationError::Syntax("expected ',' or '}'".into())),
                        }
                    }
                }
                self.expect(Tok::RBrace)?;
                Ok(Expr::Dict(entries))
            }
            other => Err(VariableEvaluationError::Syntax(format!("unexpected token {:?}", other))),
        }
    }
}

impl PartialEq for Tok {
    fn eq(&self, other: &Tok) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

// ------------------------------------------------------------ evaluator ---

fn eval(expr: &Expr, locals: &IndexMap<String, Value>) -> Result<Value, VariableEvaluationError> {
    match expr {
        Expr::Num(n, is_int) => {
            if *is_int && n.fract() == 0.0 {
                Ok(Value::Int(*n as i64))
            } else {
                Ok(Value::Float(*n))
            }
        }
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::None_ => Ok(Value::Null),
        Expr::Ident(name) => locals
            .get(name)
            .cloned()
            .ok_or_else(|| VariableEvaluationError::UndefinedName(name.clone())),
        Expr::Unary(op, inner) => {
            let v = eval(inner, locals)?;
            match op {
                UnOp::Not => Ok(Value::Bool(!v.is_truthy())),
                UnOp::Neg => negate(&v),
            }
        }
        Expr::Binary(op, l, r) => eval_binary(*op, l, r, locals),
        Expr::Call(name, args) => {
            if !is_whitelisted(name) {
                return Err(VariableEvaluationError::Forbidden(format!("call to '{}' is not permitted", name)));
            }
            let evaluated: Vec<Value> = args.iter().map(|a| eval(a, locals)).collect::<Result<_, _>>()?;
            call_builtin(name, evaluated)
        }
        Expr::Attr(base, name) => {
            let v = eval(base, locals)?;
            match v {
                Value::Dict(map) => map
                    .get(name)
                    .cloned()
                    .ok_or_else(|| VariableEvaluationError::Value(format!("no attribute '{}'", name))),
                other => Err(VariableEvaluationError::Value(format!("{} has no attribute '{}'", other.type_name(), name))),
            }
        }
        Expr::Index(base, idx) => {
            let base_v = eval(base, locals)?;
            let idx_v = eval(idx, locals)?;
            index_value(&base_v, &idx_v)
        }
        Expr::List(items) => Ok(Value::List(items.iter().map(|i| eval(i, locals)).collect::<Result<_, _>>()?)),
        Expr::Tuple(items) => Ok(Value::Tuple(items.iter().map(|i| eval(i, locals)).collect::<Result<_, _>>()?)),
        Expr::Dict(entries) => {
            let mut map = IndexMap::new();
            for (k, v) in entries {
                let key = match eval(k, locals)? {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                map.insert(key, eval(v, locals)?);
            }
            Ok(Value::Dict(map))
        }
    }
}

fn negate(v: &Value) -> Result<Value, VariableEvaluationError> {
    match v {
        Value::Int(i) => Ok(Value::Int(-i)),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(VariableEvaluationError::Value(format!("bad operand type for unary -: '{}'", other.type_name()))),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn eval_binary(op: BinOp, l: &Expr, r: &Expr, locals: &IndexMap<String, Value>) -> Result<Value, VariableEvaluationError> {
    if matches!(op, BinOp::And | BinOp::Or) {
        let lv = eval(l, locals)?;
        return match op {
            BinOp::And => {
                if !lv.is_truthy() {
                    Ok(lv)
                } else {
                    eval(r, locals)
                }
            }
            BinOp::Or => {
                if lv.is_truthy() {
                    Ok(lv)
                } else {
                    eval(r, locals)
                }
            }
            _ => unreachable!(),
        };
    }

    let lv = eval(l, locals)?;
    let rv = eval(r, locals)?;

    match op {
        BinOp::Eq => return Ok(Value::Bool(lv == rv)),
        BinOp::Ne => return Ok(Value::Bool(lv != rv)),
        _ => {}
    }

    if let (Value::String(a), Value::String(b)) = (&lv, &rv) {
        return match op {
            BinOp::Add => Ok(Value::String(format!("{}{}", a, b))),
            BinOp::Lt => Ok(Value::Bool(a < b)),
            BinOp::Gt => Ok(Value::Bool(a > b)),
            BinOp::Le => Ok(Value::Bool(a <= b)),
            BinOp::Ge => Ok(Value::Bool(a >= b)),
            _ => Err(VariableEvaluationError::Value(format!("unsupported operator on strings"))),
        };
    }

    if let (Value::List(a), Value::List(b)) = (&lv, &rv) {
        if let BinOp::Add = op {
            let mut combined = a.clone();
            combined.extend(b.clone());
            return Ok(Value::List(combined));
        }
    }

    let (a, b) = match (as_f64(&lv), as_f64(&rv)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(VariableEvaluationError::Value(format!(
                "unsupported operand types: '{}' and '{}'",
                lv.type_name(),
                rv.type_name()
            )))
        }
    };
    let both_int = matches!(lv, Value::Int(_)) && matches!(rv, Value::Int(_));

    match op {
        BinOp::Add => Ok(numeric_result(a + b, both_int)),
        BinOp::Sub => Ok(numeric_result(a - b, both_int)),
        BinOp::Mul => Ok(numeric_result(a * b, both_int)),
        BinOp::Div => {
            if b == 0.0 {
                Err(VariableEvaluationError::Value("division by zero".into()))
            } else {
                Ok(Value::Float(a / b))
            }
        }
        BinOp::Mod => {
            if b == 0.0 {
                Err(VariableEvaluationError::Value("division by zero".into()))
            } else {
                Ok(numeric_result(a.rem_euclid(b), both_int))
            }
        }
        BinOp::Lt => Ok(Value::Bool(a < b)),
        BinOp::Gt => Ok(Value::Bool(a > b)),
        BinOp::Le => Ok(Value::Bool(a <= b)),
        BinOp::Ge => Ok(Value::Bool(a >= b)),
        BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => unreachable!(),
    }
}

fn numeric_result(n: f64, as_int: bool) -> Value {
    if as_int {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

fn index_value(base: &Value, idx: &Value) -> Result<Value, VariableEvaluationError> {
    match (base, idx) {
        (Value::List(items), Value::Int(i)) | (Value::Tuple(items), Value::Int(i)) => {
            resolve_index(items.len(), *i)
                .and_then(|pos| items.get(pos).cloned())
                .ok_or_else(|| VariableEvaluationError::Value("index out of range".into()))
        }
        (Value::String(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            resolve_index(chars.len(), *i)
                .and_then(|pos| chars.get(pos))
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| VariableEvaluationError::Value("index out of range".into()))
        }
        (Value::Dict(map), Value::String(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| VariableEvaluationError::Value(format!("key '{}' not found", key))),
        _ => Err(VariableEvaluationError::Value(format!("{} is not subscriptable", base.type_name()))),
    }
}

fn resolve_index(len: usize, i: i64) -> Option<usize> {
    let idx = if i < 0 { len as i64 + i } else { i };
    if idx < 0 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}

fn as_iterable(v: &Value) -> Result<Vec<Value>, VariableEvaluationError> {
    match v {
        Value::List(items) | Value::Tuple(items) => Ok(items.clone()),
        Value::Dict(map) => Ok(map.keys().map(|k| Value::String(k.clone())).collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(VariableEvaluationError::Value(format!("'{}' object is not iterable", other.type_name()))),
    }
}

fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value, VariableEvaluationError> {
    match name {
        "int" => convert_one(&args, "int", crate::value::TypeSpec::Int),
        "float" => convert_one(&args, "float", crate::value::TypeSpec::Float),
        "str" => Ok(Value::String(args.first().map(|v| v.to_string()).unwrap_or_default())),
        "bool" => Ok(Value::Bool(args.first().map(|v| v.is_truthy()).unwrap_or(false))),
        "list" => Ok(Value::List(as_iterable(args.first().unwrap_or(&Value::List(vec![])))?)),
        "tuple" => Ok(Value::Tuple(as_iterable(args.first().unwrap_or(&Value::List(vec![])))?)),
        "set" => {
            let items = as_iterable(args.first().unwrap_or(&Value::List(vec![])))?;
            let mut seen = Vec::new();
            for item in items {
                if !seen.contains(&item) {
                    seen.push(item);
                }
            }
            Ok(Value::List(seen))
        }
        "dict" => match args.first() {
            Some(Value::Dict(m)) => Ok(Value::Dict(m.clone())),
            None => Ok(Value::Dict(IndexMap::new())),
            Some(other) => Err(VariableEvaluationError::Value(format!("cannot build dict from '{}'", other.type_name()))),
        },
        "len" => {
            let v = args.first().ok_or_else(|| VariableEvaluationError::Value("len() takes exactly one argument".into()))?;
            let n = match v {
                Value::String(s) => s.chars().count(),
                Value::List(items) | Value::Tuple(items) => items.len(),
                Value::Dict(m) => m.len(),
                other => return Err(VariableEvaluationError::Value(format!("object of type '{}' has no len()", other.type_name()))),
            };
            Ok(Value::Int(n as i64))
        }
        "min" | "max" => {
            let items = if args.len() == 1 {
                as_iterable(&args[0])?
            } else {
                args
            };
            reduce_extreme(items, name == "max")
        }
        "sum" => {
            let items = as_iterable(args.first().ok_or_else(|| VariableEvaluationError::Value("sum() takes at least one argument".into()))?)?;
            let mut total = 0.0;
            let mut all_int = true;
            for item in &items {
                let n = as_f64(item).ok_or_else(|| VariableEvaluationError::Value("sum() requires numeric items".into()))?;
                if !matches!(item, Value::Int(_)) {
                    all_int = false;
                }
                total += n;
            }
            Ok(numeric_result(total, all_int))
        }
        "sorted" => {
            let mut items = as_iterable(args.first().ok_or_else(|| VariableEvaluationError::Value("sorted() takes at least one argument".into()))?)?;
            items.sort_by(|a, b| compare_values(a, b).unwrap_or(std::cmp::Ordering::Equal));
            Ok(Value::List(items))
        }
        "range" => build_range(&args),
        "enumerate" => {
            let items = as_iterable(args.first().ok_or_else(|| VariableEvaluationError::Value("enumerate() takes at least one argument".into()))?)?;
            Ok(Value::List(
                items.into_iter().enumerate().map(|(i, v)| Value::Tuple(vec![Value::Int(i as i64), v])).collect(),
            ))
        }
        "zip" => {
            let lists: Vec<Vec<Value>> = args.iter().map(as_iterable).collect::<Result<_, _>>()?;
            let min_len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
            let mut out = Vec::with_capacity(min_len);
            for i in 0..min_len {
                out.push(Value::Tuple(lists.iter().map(|l| l[i].clone()).collect()));
            }
            Ok(Value::List(out))
        }
        "round" => {
            let n = as_f64(args.first().ok_or_else(|| VariableEvaluationError::Value("round() takes at least one argument".into()))?)
                .ok_or_else(|| VariableEvaluationError::Value("round() requires a numeric argument".into()))?;
            match args.get(1) {
                Some(v) => {
                    let digits = v.as_int().ok_or_else(|| VariableEvaluationError::Value("round() ndigits must be int".into()))? as i32;
                    let factor = 10f64.powi(digits);
                    Ok(Value::Float((n * factor).round() / factor))
                }
                None => Ok(Value::Int(n.round() as i64)),
            }
        }
        "abs" => match args.first() {
            Some(Value::Int(i)) => Ok(Value::Int(i.abs())),
            Some(Value::Float(f)) => Ok(Value::Float(f.abs())),
            _ => Err(VariableEvaluationError::Value("abs() requires a numeric argument".into())),
        },
        "all" => {
            let items = as_iterable(args.first().ok_or_else(|| VariableEvaluationError::Value("all() takes at least one argument".into()))?)?;
            Ok(Value::Bool(items.iter().all(|v| v.is_truthy())))
        }
        "any" => {
            let items = as_iterable(args.first().ok_or_else(|| VariableEvaluationError::Value("any() takes at least one argument".into()))?)?;
            Ok(Value::Bool(items.iter().any(|v| v.is_truthy())))
        }
        _ => unreachable!("checked by is_whitelisted"),
    }
}

fn convert_one(args: &[Value], target_name: &str, target: crate::value::TypeSpec) -> Result<Value, VariableEvaluationError> {
    let v = args.first().cloned().unwrap_or(Value::Int(0));
    crate::coerce::convert(v, &target).map_err(|e| VariableEvaluationError::Value(format!("{} (converting to {})", e, target_name)))
}

fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

fn reduce_extreme(items: Vec<Value>, want_max: bool) -> Result<Value, VariableEvaluationError> {
    let mut iter = items.into_iter();
    let mut best = iter.next().ok_or_else(|| VariableEvaluationError::Value("min()/max() arg is an empty sequence".into()))?;
    for item in iter {
        let ord = compare_values(&item, &best).ok_or_else(|| VariableEvaluationError::Value("unorderable types".into()))?;
        if (want_max && ord == std::cmp::Ordering::Greater) || (!want_max && ord == std::cmp::Ordering::Less) {
            best = item;
        }
    }
    Ok(best)
}

fn build_range(args: &[Value]) -> Result<Value, VariableEvaluationError> {
    let ints: Vec<i64> = args
        .iter()
        .map(|v| v.as_int().ok_or_else(|| VariableEvaluationError::Value("range() requires int arguments".into())))
        .collect::<Result<_, _>>()?;
    let (start, stop, step) = match ints.len() {
        1 => (0, ints[0], 1),
        2 => (ints[0], ints[1], 1),
        3 => (ints[0], ints[1], ints[2]),
        _ => return Err(VariableEvaluationError::Value("range() takes 1 to 3 arguments".into())),
    };
    if step == 0 {
        return Err(VariableEvaluationError::Value("range() arg 3 must not be zero".into()));
    }
    let mut out = Vec::new();
    let mut n = start;
    if step > 0 {
        while n < stop {
            out.push(Value::Int(n));
            n += step;
        }
    } else {
        while n > stop {
            out.push(Value::Int(n));
            n += step;
        }
    }
    Ok(Value::List(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locals() -> IndexMap<String, Value> {
        let mut m = IndexMap::new();
        m.insert("x".to_string(), Value::Int(5));
        m.insert("hosts".to_string(), Value::List(vec![Value::String("a".into()), Value::String("b".into())]));
        m
    }

    #[test]
    fn arithmetic_and_precedence() {
        let v = evaluate("1 + 2 * 3", &locals()).unwrap();
        assert_eq!(v, Value::Int(7));
    }

    #[test]
    fn dollar_prefixed_name_resolves_like_a_bare_identifier() {
        let v = evaluate("$x + 1", &locals()).unwrap();
        assert_eq!(v, Value::Int(6));
    }

    #[test]
    fn division_by_zero_is_value_error() {
        let err = evaluate("1 / 0", &locals()).unwrap_err();
        assert!(matches!(err, VariableEvaluationError::Value(_)));
    }

    #[test]
    fn undefined_name_is_name_error() {
        let err = evaluate("y + 1", &locals()).unwrap_err();
        assert!(matches!(err, VariableEvaluationError::UndefinedName(_)));
    }

    #[test]
    fn whitelisted_builtin_len() {
        let v = evaluate("len(hosts)", &locals()).unwrap();
        assert_eq!(v, Value::Int(2));
    }

    #[test]
    fn forbidden_call_is_rejected() {
        let err = evaluate("open('/etc/passwd')", &locals()).unwrap_err();
        assert!(matches!(err, VariableEvaluationError::Forbidden(_)));
    }

    #[test]
    fn attribute_access_on_dict_for_error_binding() {
        let mut map = IndexMap::new();
        map.insert("message".to_string(), Value::String("boom".into()));
        let mut l = locals();
        l.insert("error".to_string(), Value::Dict(map));
        let v = evaluate("error.message", &l).unwrap();
        assert_eq!(v, Value::String("boom".into()));
    }

    #[test]
    fn list_indexing_supports_negative_index() {
        let v = evaluate("hosts[-1]", &locals()).unwrap();
        assert_eq!(v, Value::String("b".into()));
    }

    #[test]
    fn and_or_short_circuit_return_operand_value() {
        assert_eq!(evaluate("0 or 5", &locals()).unwrap(), Value::Int(5));
        assert_eq!(evaluate("x and 9", &locals()).unwrap(), Value::Int(9));
    }

    #[test]
    fn syntax_error_on_unparseable_expression() {
        let err = evaluate("1 +", &locals()).unwrap_err();
        assert!(matches!(err, VariableEvaluationError::Syntax(_)));
    }
}
