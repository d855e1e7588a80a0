use crate::error::HoaError;

/// Boolean edge label over atomic proposition indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    True,
    False,
    Ap(usize),
    Not(Box<Label>),
    And(Box<Label>, Box<Label>),
    Or(Box<Label>, Box<Label>),
}

/// Concrete syntax used when printing a label.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LabelStyle {
    /// `0&!1 | t`, proposition indices.
    Hoa,
    /// `a & !b | 1`, proposition names.
    Dot,
    /// `(a && !b)`, fully parenthesized.
    Spin,
    /// `| & a ! b t`, prefix notation with quoted names.
    Lbtt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    True,
    False,
    Ap(usize),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(text: &str) -> Result<Vec<Token>, HoaError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((pos, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            't' => Token::True,
            'f' => Token::False,
            '!' => Token::Not,
            '&' => Token::And,
            '|' => Token::Or,
            '(' => Token::Open,
            ')' => Token::Close,
            '@' => return Err(HoaError::Unsupported("label aliases")),
            c if c.is_ascii_digit() => {
                let mut end = pos + c.len_utf8();
                while let Some(&(next, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = next + d.len_utf8();
                    chars.next();
                }
                let index = text[pos..end]
                    .parse()
                    .map_err(|_| HoaError::unexpected("proposition index", &text[pos..end]))?;
                Token::Ap(index)
            }
            _ => return Err(HoaError::unexpected("label", &text[pos..])),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Deepest label tree accepted, counting negations, parentheses and operator
/// chains alike.
pub(crate) const MAX_LABEL_DEPTH: usize = 256;

struct LabelParser {
    tokens: Vec<Token>,
    pos: usize,
    ap_count: usize,
    nesting: usize,
}

fn deeper(depth: usize) -> Result<usize, HoaError> {
    if depth < MAX_LABEL_DEPTH {
        Ok(depth + 1)
    } else {
        Err(HoaError::LabelTooDeep {
            max: MAX_LABEL_DEPTH,
        })
    }
}

impl LabelParser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// Runs `parse` one nesting level down.
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<(Label, usize), HoaError>,
    ) -> Result<(Label, usize), HoaError> {
        self.nesting = deeper(self.nesting)?;
        let parsed = parse(self)?;
        self.nesting -= 1;
        Ok(parsed)
    }

    // Each rule returns the parsed subtree with its depth.
    fn disjunction(&mut self) -> Result<(Label, usize), HoaError> {
        let (mut label, mut depth) = self.conjunction()?;
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            let (rhs, rhs_depth) = self.conjunction()?;
            depth = deeper(depth.max(rhs_depth))?;
            label = Label::Or(Box::new(label), Box::new(rhs));
        }
        Ok((label, depth))
    }

    fn conjunction(&mut self) -> Result<(Label, usize), HoaError> {
        let (mut label, mut depth) = self.negation()?;
        while self.peek() == Some(Token::And) {
            self.pos += 1;
            let (rhs, rhs_depth) = self.negation()?;
            depth = deeper(depth.max(rhs_depth))?;
            label = Label::And(Box::new(label), Box::new(rhs));
        }
        Ok((label, depth))
    }

    fn negation(&mut self) -> Result<(Label, usize), HoaError> {
        match self.bump() {
            Some(Token::Not) => {
                let (inner, depth) = self.nested(Self::negation)?;
                Ok((Label::Not(Box::new(inner)), deeper(depth)?))
            }
            Some(Token::True) => Ok((Label::True, 1)),
            Some(Token::False) => Ok((Label::False, 1)),
            Some(Token::Ap(index)) if index < self.ap_count => Ok((Label::Ap(index), 1)),
            Some(Token::Ap(index)) => Err(HoaError::UndefinedAp {
                index,
                count: self.ap_count,
            }),
            Some(Token::Open) => {
                let inner = self.nested(Self::disjunction)?;
                match self.bump() {
                    Some(Token::Close) => Ok(inner),
                    other => Err(HoaError::unexpected("`)`", &describe(other))),
                }
            }
            other => Err(HoaError::unexpected("label operand", &describe(other))),
        }
    }
}

fn describe(token: Option<Token>) -> String {
    match token {
        None => String::new(),
        Some(Token::True) => "t".into(),
        Some(Token::False) => "f".into(),
        Some(Token::Ap(index)) => index.to_string(),
        Some(Token::Not) => "!".into(),
        Some(Token::And) => "&".into(),
        Some(Token::Or) => "|".into(),
        Some(Token::Open) => "(".into(),
        Some(Token::Close) => ")".into(),
    }
}

impl Label {
    /// Parses the text between `[` and `]`, rejecting indices `>= ap_count`.
    pub fn parse(text: &str, ap_count: usize) -> Result<Self, HoaError> {
        let mut parser = LabelParser {
            tokens: tokenize(text)?,
            pos: 0,
            ap_count,
            nesting: 0,
        };
        let (label, _) = parser.disjunction()?;
        match parser.peek() {
            None => Ok(label),
            other => Err(HoaError::unexpected("end of label", &describe(other))),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Label::Or(..) => 1,
            Label::And(..) => 2,
            _ => 3,
        }
    }

    pub fn render(&self, style: LabelStyle, names: &[String]) -> String {
        let mut out = String::new();
        match style {
            LabelStyle::Lbtt => self.write_prefix(&mut out, names),
            _ => self.write_infix(&mut out, style, names),
        }
        out
    }

    fn write_atom(&self, out: &mut String, style: LabelStyle, names: &[String]) {
        match (self, style) {
            (Label::True, LabelStyle::Hoa | LabelStyle::Lbtt) => out.push('t'),
            (Label::False, LabelStyle::Hoa | LabelStyle::Lbtt) => out.push('f'),
            (Label::True, _) => out.push('1'),
            (Label::False, _) => out.push('0'),
            (Label::Ap(index), LabelStyle::Hoa) => out.push_str(&index.to_string()),
            (Label::Ap(index), LabelStyle::Lbtt) => {
                out.push_str(&lbtt_name(&ap_name(*index, names)))
            }
            (Label::Ap(index), _) => out.push_str(&ap_name(*index, names)),
            _ => {}
        }
    }

    fn write_infix(&self, out: &mut String, style: LabelStyle, names: &[String]) {
        let (and, or) = match style {
            LabelStyle::Hoa => ("&", " | "),
            LabelStyle::Spin => (" && ", " || "),
            _ => (" & ", " | "),
        };
        match self {
            Label::Not(inner) => {
                out.push('!');
                inner.write_operand(out, style, names, 3);
            }
            Label::And(lhs, rhs) | Label::Or(lhs, rhs) => {
                let (op, prec) = if matches!(self, Label::And(..)) {
                    (and, 2)
                } else {
                    (or, 1)
                };
                let wrap = style == LabelStyle::Spin;
                if wrap {
                    out.push('(');
                }
                lhs.write_operand(out, style, names, prec);
                out.push_str(op);
                rhs.write_operand(out, style, names, prec);
                if wrap {
                    out.push(')');
                }
            }
            atom => atom.write_atom(out, style, names),
        }
    }

    fn write_operand(&self, out: &mut String, style: LabelStyle, names: &[String], parent: u8) {
        let needs_parens = style != LabelStyle::Spin && self.precedence() < parent;
        if needs_parens {
            out.push('(');
        }
        self.write_infix(out, style, names);
        if needs_parens {
            out.push(')');
        }
    }

    fn write_prefix(&self, out: &mut String, names: &[String]) {
        match self {
            Label::Not(inner) => {
                out.push_str("! ");
                inner.write_prefix(out, names);
            }
            Label::And(lhs, rhs) | Label::Or(lhs, rhs) => {
                out.push_str(if matches!(self, Label::And(..)) { "& " } else { "| " });
                lhs.write_prefix(out, names);
                out.push(' ');
                rhs.write_prefix(out, names);
            }
            atom => atom.write_atom(out, LabelStyle::Lbtt, names),
        }
    }
}

fn ap_name(index: usize, names: &[String]) -> String {
    names
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("p{index}"))
}

fn lbtt_name(name: &str) -> String {
    let bare = name
        .strip_prefix('p')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
    if bare {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}
