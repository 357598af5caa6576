//! Recursive-descent parser for the declaration dialect.
//!
//! Accepted shapes, one per header line:
//!
//! ```text
//! struct|union <Name> ["<alias>"] :      followed by indented members
//! struct|union <Name> ["<alias>"]        opaque, no body
//! <type> <name> ["<alias>"](<type> <name>, ...)
//! enum <Name> ["<alias>"] :              body is skipped
//! typedef <type> (*<Name> ["<alias>"])(...)
//! ```
//!
//! A leading `cdef`, `ctypedef` or `cpdef` is accepted, so real `.pxd` files
//! parse; `extern from`, `cimport` and comment lines are skipped. A block body is
//! every following line indented deeper than its header, up to a blank line.

use std::collections::VecDeque;
use std::iter::{Enumerate, Peekable};
use std::str::Lines;

use tracing::debug;

use crate::error::{DeclwrapError, Result};
use crate::lexer::{self, Token};
use crate::record::{Arg, Block, DeclarationRecord, EnumDecl, Field, Function, Typedef, TypeToken};
use crate::typemap::scalar_type;

const DECL_PREFIXES: &[&str] = &["cdef", "ctypedef", "cpdef"];
const NOISE_WORDS: &[&str] = &["from", "cimport", "import", "extern", "include", "pass"];
const TRAILING_WORDS: &[&str] = &["nogil", "except", "noexcept", "with", "gil"];

/// Parser over the text of one declaration source.
///
/// The parser holds no cursor; each [`iter`](Self::iter) starts again from
/// the first line.
#[derive(Debug, Clone, Copy)]
pub struct DeclarationParser<'a> {
    text: &'a str,
    strict: bool,
}

impl<'a> DeclarationParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            strict: false,
        }
    }

    /// In strict mode every unmatched line is yielded as a parse error instead of dropped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// A lazy sequence of records in source order.
    pub fn iter(&self) -> Declarations<'a> {
        Declarations {
            lines: self.text.lines().enumerate().peekable(),
            strict: self.strict,
            pending: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Collects every record, failing on the first error.
    pub fn records(&self) -> Result<Vec<DeclarationRecord>> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &DeclarationParser<'a> {
    type Item = Result<DeclarationRecord>;
    type IntoIter = Declarations<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`DeclarationParser::iter`].
pub struct Declarations<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    strict: bool,
    pending: VecDeque<Result<DeclarationRecord>>,
    dropped: usize,
}

impl<'a> Declarations<'a> {
    /// Lines dropped so far because they matched no declaration shape.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn unmatched(&mut self, line: usize, detail: impl Into<String>) {
        let detail = detail.into();
        if self.strict {
            self.pending.push_back(Err(DeclwrapError::Parse { line, detail }));
        } else {
            debug!(line, %detail, "dropping unmatched declaration line");
            self.dropped += 1;
        }
    }

    fn reject(&mut self, err: DeclwrapError) {
        match err {
            DeclwrapError::Parse { line, detail } => self.unmatched(line, detail),
            other => self.pending.push_back(Err(other)),
        }
    }

    /// Consumes the body of a block opened at `header_indent`.
    ///
    /// A blank line ends the body and is consumed with it.
    fn take_body(&mut self, header_indent: usize) -> Vec<(usize, &'a str)> {
        let mut body = Vec::new();
        while let Some(&(idx, text)) = self.lines.peek() {
            if lexer::is_blank(text) {
                self.lines.next();
                break;
            }
            if lexer::is_comment(text) {
                self.lines.next();
                continue;
            }
            if lexer::indent_of(text) <= header_indent {
                break;
            }
            self.lines.next();
            body.push((idx + 1, text));
        }
        body
    }

    fn parse_line(&mut self, line: usize, text: &'a str) {
        if lexer::is_blank(text) || lexer::is_comment(text) || is_noise(text) {
            return;
        }
        let indent = lexer::indent_of(text);
        let tokens = match lexer::tokenize(line, text) {
            Ok(tokens) => tokens,
            Err(err) => return self.reject(err),
        };

        let mut cursor = Cursor::new(line, &tokens);
        let mut is_typedef = false;
        while let Some(Token::Ident(word)) = cursor.peek() {
            if !DECL_PREFIXES.contains(&word) {
                break;
            }
            is_typedef |= word == "ctypedef";
            cursor.bump();
        }
        if cursor.eat_ident("typedef") {
            is_typedef = true;
        }
        cursor.eat_ident("packed");

        match cursor.peek() {
            Some(Token::Ident("struct")) | Some(Token::Ident("union")) => {
                self.parse_block(cursor, indent);
            }
            Some(Token::Ident("enum")) => self.parse_enum(cursor, indent),
            _ if is_typedef => self.parse_typedef(cursor),
            _ => match parse_function(&mut cursor) {
                Ok(func) => self.pending.push_back(Ok(DeclarationRecord::Function(func))),
                Err(err) => self.reject(err),
            },
        }
    }

    fn parse_block(&mut self, mut cursor: Cursor<'_, 'a>, indent: usize) {
        let is_union = cursor.eat_ident("union");
        if !is_union {
            cursor.eat_ident("struct");
        }
        let (name, alias, has_body) = match parse_block_header(&mut cursor) {
            Ok(header) => header,
            Err(err) => {
                if cursor.ends_with_colon() {
                    self.take_body(indent);
                }
                return self.reject(err);
            }
        };

        let mut fields = Vec::new();
        if has_body {
            for (line, text) in self.take_body(indent) {
                match parse_member(line, text) {
                    Ok(Some(field)) => fields.push(field),
                    Ok(None) => {}
                    Err(err) => self.reject(err),
                }
            }
        }

        let block = Block {
            name: name.to_string(),
            alias: alias.map(str::to_string),
            fields,
            opaque: !has_body,
        };
        let record = if is_union {
            DeclarationRecord::Union(block)
        } else {
            DeclarationRecord::Struct(block)
        };
        self.pending.push_back(Ok(record));
    }

    fn parse_enum(&mut self, mut cursor: Cursor<'_, 'a>, indent: usize) {
        cursor.eat_ident("enum");
        let name = cursor.eat_ident_any();
        let alias = cursor.eat_alias();
        let has_body = cursor.eat(Token::Colon);
        if has_body {
            self.take_body(indent);
        }
        if let Err(err) = cursor.expect_end() {
            return self.reject(err);
        }
        // Anonymous enums only introduce constants.
        let Some(name) = name else {
            return;
        };
        self.pending.push_back(Ok(DeclarationRecord::Enum(EnumDecl {
            name: name.to_string(),
            alias: alias.map(str::to_string),
        })));
    }

    fn parse_typedef(&mut self, mut cursor: Cursor<'_, 'a>) {
        if !cursor.contains(Token::LParen) {
            // Plain type aliases carry nothing the generator can use.
            debug!(line = cursor.line, "skipping plain type alias");
            return;
        }
        match parse_fn_pointer(&mut cursor) {
            Ok(typedef) => self.pending.push_back(Ok(DeclarationRecord::Typedef(typedef))),
            Err(err) => self.reject(err),
        }
    }
}

impl Iterator for Declarations<'_> {
    type Item = Result<DeclarationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let (idx, text) = self.lines.next()?;
            self.parse_line(idx + 1, text);
        }
    }
}

fn is_noise(text: &str) -> bool {
    text.split_whitespace()
        .find(|word| !DECL_PREFIXES.contains(word))
        .is_some_and(|word| NOISE_WORDS.contains(&word))
}

/// Name, alias and whether a `:` opens a body.
fn parse_block_header<'a>(cursor: &mut Cursor<'_, 'a>) -> Result<(&'a str, Option<&'a str>, bool)> {
    let name = cursor.expect_ident("block name")?;
    let alias = cursor.eat_alias();
    let has_body = cursor.eat(Token::Colon);
    cursor.expect_end()?;
    Ok((name, alias, has_body))
}

/// Parse one member line; `pass` yields nothing.
fn parse_member(line: usize, text: &str) -> Result<Option<Field>> {
    let tokens = lexer::tokenize(line, text)?;
    let mut cursor = Cursor::new(line, &tokens);
    if cursor.eat_ident("pass") {
        cursor.expect_end()?;
        return Ok(None);
    }
    let (ty, name) = cursor.typed_name("member")?;
    let array = cursor.eat_array();
    // The quoted native name of a member is not needed.
    cursor.eat_alias();
    cursor.expect_end()?;
    Ok(Some(Field {
        ty,
        name: name.to_string(),
        array: array.map(str::to_string),
    }))
}

fn parse_function(cursor: &mut Cursor<'_, '_>) -> Result<Function> {
    let (return_type, name) = cursor.typed_name("function")?;
    let alias = cursor.eat_alias();
    cursor.expect(Token::LParen, "'(' after function name")?;
    let args = parse_args(cursor)?;
    cursor.skip_trailing();
    cursor.expect_end()?;
    Ok(Function {
        return_type,
        name: name.to_string(),
        alias: alias.map(str::to_string),
        args,
    })
}

/// Parse an argument list up to and including the closing `)`.
fn parse_args(cursor: &mut Cursor<'_, '_>) -> Result<Vec<Arg>> {
    let mut args = Vec::new();
    if cursor.eat(Token::RParen) {
        return Ok(args);
    }
    if cursor.peek() == Some(Token::Ident("void")) && cursor.peek_at(1) == Some(Token::RParen) {
        cursor.bump();
        cursor.bump();
        return Ok(args);
    }
    loop {
        if cursor.peek() == Some(Token::Ellipsis) {
            return Err(cursor.error("variadic functions are not supported"));
        }
        let mut words = Vec::new();
        let mut depth = 0;
        loop {
            match cursor.peek() {
                Some(Token::Ident(word)) => words.push(word),
                Some(Token::Star) => depth += 1,
                // Array parameters decay to pointers.
                Some(Token::Array(_)) => depth += 1,
                _ => break,
            }
            cursor.bump();
        }
        let named = words.len() > 1
            && matches!(cursor.prev(), Some(Token::Ident(_)) | Some(Token::Array(_)))
            && !is_multiword_scalar(&words);
        let name = if named {
            words.pop().map(str::to_string)
        } else {
            None
        };
        let ty = TypeToken::from_words(words, depth)
            .map_err(|err| cursor.error(&format!("argument {}: {err}", args.len() + 1)))?;
        let name = name.unwrap_or_else(|| format!("arg{}", args.len()));
        args.push(Arg { ty, name });

        match cursor.peek() {
            Some(Token::Comma) => cursor.bump(),
            Some(Token::RParen) => {
                cursor.bump();
                return Ok(args);
            }
            Some(other) => return Err(cursor.error(&format!("unexpected {} in arguments", other.describe()))),
            None => return Err(cursor.error("missing ')'")),
        }
    }
}

/// `unsigned long` is one type, not `unsigned` named `long`.
fn is_multiword_scalar(words: &[&str]) -> bool {
    let base: Vec<&str> = words
        .iter()
        .copied()
        .filter(|word| !matches!(*word, "const" | "volatile"))
        .collect();
    base.len() > 1 && scalar_type(&base.join(" ")).is_some()
}

fn parse_fn_pointer(cursor: &mut Cursor<'_, '_>) -> Result<Typedef> {
    let mut words = Vec::new();
    let mut depth = 0;
    loop {
        match cursor.peek() {
            Some(Token::Ident(word)) => words.push(word),
            Some(Token::Star) => depth += 1,
            _ => break,
        }
        cursor.bump();
    }
    let return_type = TypeToken::from_words(words, depth).map_err(|err| cursor.error(&err.to_string()))?;
    cursor.expect(Token::LParen, "'(' before typedef name")?;
    cursor.eat(Token::Star);
    let name = cursor.expect_ident("typedef name")?;
    let alias = cursor.eat_alias();
    cursor.expect(Token::RParen, "')' after typedef name")?;
    cursor.expect(Token::LParen, "parameter list")?;
    let mut nesting = 1;
    while nesting > 0 {
        match cursor.peek() {
            Some(Token::LParen) => nesting += 1,
            Some(Token::RParen) => nesting -= 1,
            Some(_) => {}
            None => return Err(cursor.error("missing ')'")),
        }
        cursor.bump();
    }
    cursor.skip_trailing();
    cursor.expect_end()?;
    Ok(Typedef {
        return_type,
        name: name.to_string(),
        alias: alias.map(str::to_string),
    })
}

/// Position within the tokens of one line.
struct Cursor<'t, 'a> {
    line: usize,
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn new(line: usize, tokens: &'t [Token<'a>]) -> Self {
        Self {
            line,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn prev(&self) -> Option<Token<'a>> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i).copied())
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, token: Token<'_>) -> bool {
        if self.peek() == Some(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        self.eat(Token::Ident(word))
    }

    fn eat_ident_any(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Ident(word)) => {
                self.bump();
                Some(word)
            }
            _ => None,
        }
    }

    fn eat_alias(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Alias(alias)) => {
                self.bump();
                Some(alias)
            }
            _ => None,
        }
    }

    fn eat_array(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Array(inner)) => {
                self.bump();
                Some(inner)
            }
            _ => None,
        }
    }

    fn contains(&self, token: Token<'_>) -> bool {
        self.tokens[self.pos..].contains(&token)
    }

    fn ends_with_colon(&self) -> bool {
        self.tokens.last() == Some(&Token::Colon)
    }

    fn expect(&mut self, token: Token<'_>, what: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<&'a str> {
        self.eat_ident_any()
            .ok_or_else(|| self.error(&format!("expected {what}")))
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(&format!("unexpected {}", token.describe()))),
        }
    }

    /// Skips Cython call annotations such as `nogil` or `except -1`.
    fn skip_trailing(&mut self) {
        while let Some(Token::Ident(word)) = self.peek() {
            if !TRAILING_WORDS.contains(&word) {
                break;
            }
            self.bump();
            if word == "except" {
                self.pos = self.tokens.len();
            }
        }
    }

    /// A type followed by a name: `const char* name`.
    fn typed_name(&mut self, what: &str) -> Result<(TypeToken, &'a str)> {
        let mut words = Vec::new();
        let mut depth = 0;
        loop {
            match self.peek() {
                Some(Token::Ident(word)) => words.push(word),
                Some(Token::Star) => depth += 1,
                _ => break,
            }
            self.bump();
        }
        if !matches!(self.prev(), Some(Token::Ident(_))) || words.len() < 2 {
            return Err(self.error(&format!("expected {what} type and name")));
        }
        let name = words.pop().unwrap_or_default();
        let ty = TypeToken::from_words(words, depth).map_err(|err| self.error(&err.to_string()))?;
        Ok((ty, name))
    }

    fn error(&self, detail: &str) -> DeclwrapError {
        DeclwrapError::Parse {
            line: self.line,
            detail: detail.to_string(),
        }
    }
}
