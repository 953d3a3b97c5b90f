//! Grammar for C++ template parameter lists.
//!
//! Only the `template<...>` prefix of a declaration is modeled. Each parameter
//! is tried against an ordered list of alternatives and the first one that is
//! followed by `,` or the closing `>` wins:
//!
//! 1. type parameter (`class`/`typename`), with or without a default
//! 2. template template parameter (a nested `template<...>` plus a type parameter)
//! 3. non-type parameter, a run with balanced `<...>` and `(...)` groups, or
//!    failing that a loose run of characters up to `,` or `>`
//!
//! The non-type rule is approximate: an expression with an unmatched `<` (a
//! bare comparison) falls back to the loose run, which stops at the first `,`
//! or `>`.

use crate::models::TemplateParameter;

/// Nested `template<...>` lists deeper than this are rejected
const MAX_NESTING: usize = 32;

/// Result of parsing a `template<...>` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    pub params: Vec<TemplateParameter>,
    /// Byte offset just past the closing `>`
    pub consumed: usize,
}

/// Parse `text` as a template prefix; anything after the closing `>` is ignored.
pub fn parse_template_prefix(text: &str) -> Option<ParsedTemplate> {
    let mut parser = TemplateParser::new(text);
    let params = parser.template_list()?;
    Some(ParsedTemplate {
        params,
        consumed: parser.pos,
    })
}

/// Parse exactly one parameter; the whole input must be consumed.
pub fn parse_parameter(text: &str) -> Option<TemplateParameter> {
    let mut parser = TemplateParser::new(text);
    parser.standalone = true;
    parser.skip_ws();
    let param = parser.param()?;
    parser.skip_ws();
    (parser.pos == text.len()).then_some(param)
}

/// Backtracking recursive-descent parser over the raw bytes of the input.
///
/// All tokens the grammar cares about are ASCII, so every position it stops
/// at is a char boundary.
pub struct TemplateParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    /// End of input also terminates a parameter
    standalone: bool,
}

/// `(is_pack, name, default)` of a type parameter
type TypeParts = (bool, String, String);

impl<'a> TemplateParser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
            standalone: false,
        }
    }

    /// `"template" ws "<" params ">"`
    pub fn template_list(&mut self) -> Option<Vec<TemplateParameter>> {
        let start = self.pos;
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let result = self.template_list_inner();
        self.depth -= 1;
        if result.is_none() {
            self.pos = start;
        }
        result
    }

    fn template_list_inner(&mut self) -> Option<Vec<TemplateParameter>> {
        self.eat_str("template")?;
        self.skip_ws();
        self.eat_byte(b'<')?;
        self.skip_ws();

        let mut params = Vec::new();
        if self.eat_byte(b'>').is_some() {
            return Some(params);
        }

        loop {
            params.push(self.param()?);
            self.skip_ws();
            match self.peek()? {
                b',' => {
                    self.pos += 1;
                    self.skip_ws();
                }
                b'>' => {
                    self.pos += 1;
                    return Some(params);
                }
                _ => return None,
            }
        }
    }

    fn param(&mut self) -> Option<TemplateParameter> {
        let start = self.pos;

        if let Some((is_pack, name, default)) = self.type_param() {
            return Some(TemplateParameter::Type {
                is_pack,
                name,
                default,
            });
        }
        self.pos = start;

        if let Some(param) = self.template_param() {
            return Some(param);
        }
        self.pos = start;

        let param = self.non_type_param()?;
        if self.at_param_end() {
            Some(param)
        } else {
            self.pos = start;
            None
        }
    }

    /// Either type parameter form, each required to end the parameter
    fn type_param(&mut self) -> Option<TypeParts> {
        let start = self.pos;

        if let Some(parts) = self.type_param_with_default() {
            if self.at_param_end() {
                return Some(parts);
            }
        }
        self.pos = start;

        if let Some(parts) = self.type_param_no_default() {
            if self.at_param_end() {
                return Some(parts);
            }
        }
        self.pos = start;
        None
    }

    /// `("class" | "typename") name "=" type_like`
    fn type_param_with_default(&mut self) -> Option<TypeParts> {
        self.type_keyword()?;
        let name = self.take_while(|b| !matches!(b, b',' | b'=' | b'<' | b'>'));
        self.eat_byte(b'=')?;
        self.skip_ws();
        let default = self.type_like()?;
        Some((false, name.trim().to_string(), default.trim().to_string()))
    }

    /// `("class" | "typename") ["..."] name`
    fn type_param_no_default(&mut self) -> Option<TypeParts> {
        self.type_keyword()?;
        self.skip_ws();
        let is_pack = self.eat_str("...").is_some();
        self.skip_ws();
        let name = self.take_while(|b| !matches!(b, b',' | b'=' | b'<' | b'>'));
        Some((is_pack, name.trim().to_string(), String::new()))
    }

    /// `template<...> type_param`
    fn template_param(&mut self) -> Option<TemplateParameter> {
        let params = self.template_list()?;
        self.skip_ws();
        let (is_pack, name, default) = self.type_param()?;
        Some(TemplateParameter::Template {
            params,
            is_pack,
            name,
            default,
        })
    }

    /// Balanced run ending the parameter, else anything up to `,` or `>`
    fn non_type_param(&mut self) -> Option<TemplateParameter> {
        let start = self.pos;
        if let Some(value) = self.balanced_run() {
            if self.at_param_end() {
                return Some(TemplateParameter::non_type(value.trim()));
            }
        }
        self.pos = start;

        let value = self.take_while(|b| !matches!(b, b',' | b'>')).trim();
        if value.is_empty() {
            return None;
        }
        Some(TemplateParameter::non_type(value))
    }

    /// Like [`type_like`](Self::type_like), but `(...)` groups are skipped too
    fn balanced_run(&mut self) -> Option<&'a str> {
        let start = self.pos;
        loop {
            match self.peek() {
                None | Some(b',') | Some(b'>') => break,
                Some(b'<') => self.angle_group()?,
                Some(b'(') => self.paren_group()?,
                Some(_) => {
                    self.take_while(|b| !matches!(b, b',' | b'<' | b'>' | b'('));
                }
            }
        }
        let text = &self.src[start..self.pos];
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Identifier-like runs interleaved with balanced `<...>` groups, stopping
    /// at a top-level `,` or `>`. Fails on unbalanced nesting.
    fn type_like(&mut self) -> Option<&'a str> {
        let start = self.pos;
        loop {
            match self.peek() {
                None | Some(b',') | Some(b'>') => break,
                Some(b'<') => self.angle_group()?,
                Some(_) => {
                    self.take_while(|b| !matches!(b, b',' | b'<' | b'>'));
                }
            }
        }
        let text = &self.src[start..self.pos];
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// `<` ... `>` with nesting; commas and `(...)` groups are allowed inside
    fn angle_group(&mut self) -> Option<()> {
        self.eat_byte(b'<')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek()? {
                b'(' => {
                    self.paren_group()?;
                    continue;
                }
                b'<' => depth += 1,
                b'>' => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        Some(())
    }

    /// `(` ... `)` with nesting; angle brackets inside are plain characters
    fn paren_group(&mut self) -> Option<()> {
        self.eat_byte(b'(')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek()? {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        Some(())
    }

    fn type_keyword(&mut self) -> Option<()> {
        let start = self.pos;
        if self.eat_str("typename").is_none() && self.eat_str("class").is_none() {
            return None;
        }
        if self.peek().is_some_and(is_ident_byte) {
            self.pos = start;
            return None;
        }
        Some(())
    }

    fn at_param_end(&self) -> bool {
        let rest = &self.src.as_bytes()[self.pos..];
        match rest.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b) => matches!(b, b',' | b'>'),
            None => self.standalone,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eat_byte(&mut self, expected: u8) -> Option<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn eat_str(&mut self, expected: &str) -> Option<()> {
        if self.src[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            Some(())
        } else {
            None
        }
    }

    fn skip_ws(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace());
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && pred(bytes[self.pos]) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}
