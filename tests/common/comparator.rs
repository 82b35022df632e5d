//! Reads the argmax comparator body back out of generated source and runs
//! it. Only the statement forms the emitters produce are accepted; any
//! other line inside the body fails the read.

use std::collections::HashMap;

use lutgen::Dialect;

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(i64),
    Var(String),
    /// One bit of the vote bus, read as 0 or 1.
    Bit(Box<Expr>),
    Bin(Box<Expr>, char, Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cmp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Set(String, Expr),
    /// Drive every output bit to the same value.
    FillY(Expr),
    SetY(Expr, Expr),
    /// `var` runs from `start` up to, but not including, `end`.
    For {
        var: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },
    If {
        lhs: Expr,
        cmp: Cmp,
        rhs: Expr,
        body: Vec<Stmt>,
    },
}

// ── expressions ──

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(i64),
    Ident(String),
    Sym(char),
}

fn tokenize(text: &str) -> Vec<Token> {
    let text = text.replace("(others => '0')", "0");
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let value: i64 = chars[start..i].iter().collect::<String>().parse().unwrap();
            if chars.get(i) == Some(&'\'') && chars.get(i + 1) == Some(&'b') {
                // sized binary literal such as 1'b1
                i += 2;
                let start = i;
                while i < chars.len() && (chars[i] == '0' || chars[i] == '1') {
                    i += 1;
                }
                let bits: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(i64::from_str_radix(&bits, 2).unwrap()));
            } else if chars.get(i) == Some(&'\'') && chars.get(i + 1) == Some(&'(') {
                // width cast such as 3'(...): the value is unchanged
                i += 1;
            } else {
                tokens.push(Token::Num(value));
            }
        } else if c == '\'' {
            let digit = chars
                .get(i + 1)
                .and_then(|d| d.to_digit(10))
                .unwrap_or_else(|| panic!("unexpected literal in '{}'", text));
            if chars.get(i + 2) == Some(&'\'') {
                // character literal such as '1'
                i += 3;
            } else {
                // unsized fill such as '0
                assert_eq!(digit, 0, "only '0 fills are emitted: '{}'", text);
                i += 2;
            }
            tokens.push(Token::Num(digit as i64));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if "+-*()[]".contains(c) {
            tokens.push(Token::Sym(c));
            i += 1;
        } else {
            panic!("unexpected character '{}' in '{}'", c, text);
        }
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, sym: char) -> bool {
        if self.peek() == Some(&Token::Sym(sym)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, sym: char) {
        assert!(self.eat(sym), "expected '{}' at token {}", sym, self.pos);
    }

    fn expr(&mut self) -> Expr {
        let mut lhs = self.term();
        loop {
            let op = if self.eat('+') {
                '+'
            } else if self.eat('-') {
                '-'
            } else {
                return lhs;
            };
            lhs = Expr::Bin(Box::new(lhs), op, Box::new(self.term()));
        }
    }

    fn term(&mut self) -> Expr {
        let mut lhs = self.atom();
        while self.eat('*') {
            lhs = Expr::Bin(Box::new(lhs), '*', Box::new(self.atom()));
        }
        lhs
    }

    fn atom(&mut self) -> Expr {
        let token = self.peek().cloned();
        self.pos += 1;
        match token {
            Some(Token::Num(n)) => Expr::Num(n),
            Some(Token::Ident(name)) if name == "x" => {
                let close = if self.eat('[') {
                    ']'
                } else {
                    self.expect('(');
                    ')'
                };
                let index = self.expr();
                self.expect(close);
                Expr::Bit(Box::new(index))
            }
            Some(Token::Ident(name)) => Expr::Var(name),
            Some(Token::Sym('(')) => {
                let inner = self.expr();
                self.expect(')');
                inner
            }
            other => panic!("unexpected token {:?}", other),
        }
    }
}

fn parse_expr(text: &str) -> Expr {
    let mut parser = Parser {
        tokens: tokenize(text),
        pos: 0,
    };
    let expr = parser.expr();
    assert_eq!(parser.pos, parser.tokens.len(), "trailing input in '{}'", text);
    expr
}

fn parse_cond(text: &str) -> (Expr, Cmp, Expr) {
    let ops = [
        (" >= ", Cmp::Ge),
        (" <= ", Cmp::Le),
        (" == ", Cmp::Eq),
        (" != ", Cmp::Ne),
        (" /= ", Cmp::Ne),
        (" > ", Cmp::Gt),
        (" < ", Cmp::Lt),
        (" = ", Cmp::Eq),
    ];
    for (op, cmp) in ops {
        if let Some((lhs, rhs)) = text.split_once(op) {
            return (parse_expr(lhs), cmp, parse_expr(rhs));
        }
    }
    panic!("unrecognised condition '{}'", text);
}

fn parse_assign(lhs: &str, rhs: &str) -> Stmt {
    let value = parse_expr(rhs);
    let lhs = lhs.trim();
    if lhs == "y" {
        return Stmt::FillY(value);
    }
    if let Some(index) = lhs
        .strip_prefix("y[")
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| lhs.strip_prefix("y(").and_then(|s| s.strip_suffix(')')))
    {
        return Stmt::SetY(parse_expr(index), value);
    }
    assert!(
        lhs.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        "unrecognised assignment target '{}'",
        lhs
    );
    Stmt::Set(lhs.to_string(), value)
}

// ── statement blocks ──

enum Frame {
    Root,
    For { var: String, start: Expr, end: Expr },
    If { lhs: Expr, cmp: Cmp, rhs: Expr },
}

struct Blocks {
    stack: Vec<(Frame, Vec<Stmt>)>,
}

impl Blocks {
    fn new() -> Self {
        Blocks {
            stack: vec![(Frame::Root, Vec::new())],
        }
    }

    fn push(&mut self, stmt: Stmt) {
        self.stack.last_mut().unwrap().1.push(stmt);
    }

    fn open(&mut self, frame: Frame) {
        self.stack.push((frame, Vec::new()));
    }

    /// Close the innermost block; returns the body once the root closes.
    fn close(&mut self) -> Option<Vec<Stmt>> {
        let (frame, body) = self.stack.pop().expect("unbalanced block");
        let stmt = match frame {
            Frame::Root => return Some(body),
            Frame::For { var, start, end } => Stmt::For {
                var,
                start,
                end,
                body,
            },
            Frame::If { lhs, cmp, rhs } => Stmt::If {
                lhs,
                cmp,
                rhs,
                body,
            },
        };
        self.push(stmt);
        None
    }
}

/// Parse the comparator body of an argmax unit.
pub fn read(dialect: Dialect, contents: &str) -> Vec<Stmt> {
    match dialect {
        Dialect::Vhdl => read_vhdl(contents),
        Dialect::SystemVerilog => read_sv(contents),
    }
}

fn read_sv(contents: &str) -> Vec<Stmt> {
    let mut blocks: Option<Blocks> = None;
    for line in contents.lines() {
        let t = line.trim();
        let Some(b) = blocks.as_mut() else {
            if t == "always_comb begin" {
                blocks = Some(Blocks::new());
            }
            continue;
        };
        if t.is_empty() || t.starts_with("//") {
            continue;
        }
        if t == "end" {
            if let Some(body) = b.close() {
                return body;
            }
        } else if let Some(header) = t
            .strip_prefix("for (")
            .and_then(|s| s.strip_suffix(") begin"))
        {
            let parts: Vec<&str> = header.split("; ").collect();
            assert_eq!(parts.len(), 3, "unrecognised loop '{}'", t);
            let (var, start) = parts[0]
                .strip_prefix("int ")
                .and_then(|s| s.split_once(" = "))
                .unwrap_or_else(|| panic!("unrecognised loop init '{}'", t));
            let (bound_var, end) = parts[1]
                .split_once(" < ")
                .unwrap_or_else(|| panic!("unrecognised loop bound '{}'", t));
            assert_eq!(bound_var, var, "loop bound tests another variable: '{}'", t);
            assert_eq!(parts[2], format!("{}++", var), "unrecognised loop step '{}'", t);
            b.open(Frame::For {
                var: var.to_string(),
                start: parse_expr(start),
                end: parse_expr(end),
            });
        } else if let Some(cond) = t
            .strip_prefix("if (")
            .and_then(|s| s.strip_suffix(") begin"))
        {
            let (lhs, cmp, rhs) = parse_cond(cond);
            b.open(Frame::If { lhs, cmp, rhs });
        } else if let Some((lhs, rhs)) = t
            .strip_suffix(';')
            .and_then(|s| s.split_once(" = "))
        {
            b.push(parse_assign(lhs, rhs));
        } else {
            panic!("unrecognised comparator statement '{}'", t);
        }
    }
    panic!("comparator body is never closed");
}

fn read_vhdl(contents: &str) -> Vec<Stmt> {
    let mut in_process = false;
    let mut blocks: Option<Blocks> = None;
    for line in contents.lines() {
        let t = line.trim();
        let Some(b) = blocks.as_mut() else {
            if t.contains(": process") {
                in_process = true;
            } else if in_process && t == "begin" {
                blocks = Some(Blocks::new());
            }
            continue;
        };
        if t.is_empty() || t.starts_with("--") {
            continue;
        }
        if t.starts_with("end process") {
            let body = b.close().expect("unclosed block before end process");
            return body;
        } else if t == "end loop;" || t == "end if;" {
            assert!(b.close().is_none(), "'{}' closes the process body", t);
        } else if let Some(header) = t
            .strip_prefix("for ")
            .and_then(|s| s.strip_suffix(" loop"))
        {
            let (var, range) = header
                .split_once(" in ")
                .unwrap_or_else(|| panic!("unrecognised loop '{}'", t));
            let (start, last) = range
                .split_once(" to ")
                .unwrap_or_else(|| panic!("unrecognised loop range '{}'", t));
            b.open(Frame::For {
                var: var.to_string(),
                start: parse_expr(start),
                end: Expr::Bin(Box::new(parse_expr(last)), '+', Box::new(Expr::Num(1))),
            });
        } else if let Some(cond) = t
            .strip_prefix("if ")
            .and_then(|s| s.strip_suffix(" then"))
        {
            let (lhs, cmp, rhs) = parse_cond(cond);
            b.open(Frame::If { lhs, cmp, rhs });
        } else if let Some(stmt) = t.strip_suffix(';') {
            let (lhs, rhs) = stmt
                .split_once(" := ")
                .or_else(|| stmt.split_once(" <= "))
                .unwrap_or_else(|| panic!("unrecognised comparator statement '{}'", t));
            b.push(parse_assign(lhs, rhs));
        } else {
            panic!("unrecognised comparator statement '{}'", t);
        }
    }
    panic!("comparator process is never closed");
}

// ── execution ──

struct Machine<'a> {
    vars: HashMap<String, i64>,
    bus: &'a [bool],
    y: Vec<Option<bool>>,
}

impl Machine<'_> {
    fn eval(&self, expr: &Expr) -> i64 {
        match expr {
            Expr::Num(n) => *n,
            Expr::Var(name) => *self
                .vars
                .get(name)
                .unwrap_or_else(|| panic!("read of unassigned '{}'", name)),
            Expr::Bit(index) => {
                let i = self.eval(index);
                let bit = usize::try_from(i)
                    .ok()
                    .and_then(|i| self.bus.get(i))
                    .unwrap_or_else(|| panic!("vote bus index {} out of range", i));
                *bit as i64
            }
            Expr::Bin(lhs, op, rhs) => {
                let (l, r) = (self.eval(lhs), self.eval(rhs));
                match op {
                    '+' => l + r,
                    '-' => l - r,
                    '*' => l * r,
                    _ => unreachable!(),
                }
            }
        }
    }

    fn exec(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::Set(name, value) => {
                    let v = self.eval(value);
                    self.vars.insert(name.clone(), v);
                }
                Stmt::FillY(value) => {
                    let bit = self.eval(value) != 0;
                    self.y.iter_mut().for_each(|b| *b = Some(bit));
                }
                Stmt::SetY(index, value) => {
                    let i = self.eval(index);
                    let bit = self.eval(value) != 0;
                    let slot = usize::try_from(i)
                        .ok()
                        .and_then(|i| self.y.get_mut(i))
                        .unwrap_or_else(|| panic!("output index {} out of range", i));
                    *slot = Some(bit);
                }
                Stmt::For {
                    var,
                    start,
                    end,
                    body,
                } => {
                    let (start, end) = (self.eval(start), self.eval(end));
                    for v in start..end {
                        self.vars.insert(var.clone(), v);
                        self.exec(body);
                    }
                }
                Stmt::If {
                    lhs,
                    cmp,
                    rhs,
                    body,
                } => {
                    let (l, r) = (self.eval(lhs), self.eval(rhs));
                    let taken = match cmp {
                        Cmp::Gt => l > r,
                        Cmp::Ge => l >= r,
                        Cmp::Lt => l < r,
                        Cmp::Le => l <= r,
                        Cmp::Eq => l == r,
                        Cmp::Ne => l != r,
                    };
                    if taken {
                        self.exec(body);
                    }
                }
            }
        }
    }
}

/// Run a comparator body on one vote bus and return its output bits.
pub fn run(body: &[Stmt], num_classes: usize, group_size: usize, bus: &[bool]) -> Vec<bool> {
    let mut machine = Machine {
        vars: HashMap::from([
            ("NUM_CLASSES".to_string(), num_classes as i64),
            ("GROUP_SIZE".to_string(), group_size as i64),
        ]),
        bus,
        y: vec![None; num_classes],
    };
    machine.exec(body);
    machine
        .y
        .into_iter()
        .enumerate()
        .map(|(i, b)| b.unwrap_or_else(|| panic!("output bit {} is never driven", i)))
        .collect()
}
