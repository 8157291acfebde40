// Structural scanner for Terraform HCL
//
// Not a full HCL parser. It tokenizes enough of the language to prove that
// strings, heredocs, comments and brackets are well-formed, and recovers the
// block tree (kind, labels, attributes, nested blocks) the reviewer lints.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

static HCL_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:hcl|terraform|tf)[ \t]*\r?\n(.*?)```").expect("valid regex")
});

static ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("valid regex"));

static VAR_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bvar\.([A-Za-z_][A-Za-z0-9_-]*)").expect("valid regex"));

/// Pull the configuration out of a model response.
///
/// Prefers an `hcl`/`terraform` fence, then any fence, then the whole text.
pub fn extract_code(response: &str) -> String {
    HCL_FENCE
        .captures(response)
        .or_else(|| ANY_FENCE.captures(response))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(response)
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unterminated string starting on line {line}")]
    UnterminatedString { line: usize },

    #[error("heredoc `{marker}` starting on line {line} is never terminated")]
    UnterminatedHeredoc { marker: String, line: usize },

    #[error("comment starting on line {line} is never closed")]
    UnterminatedComment { line: usize },

    #[error("unexpected `{found}` on line {line}")]
    UnexpectedClose { found: char, line: usize },

    #[error("`{found}` on line {line} does not match `{open}` opened on line {open_line}")]
    MismatchedClose {
        open: char,
        open_line: usize,
        found: char,
        line: usize,
    },

    #[error("`{open}` opened on line {line} is never closed")]
    Unclosed { open: char, line: usize },

    #[error("expected `{{` after `{header}` on line {line}")]
    MissingBlockBody { header: String, line: usize },

    #[error("attribute `{name}` on line {line} has no value")]
    MissingValue { name: String, line: usize },

    #[error("unexpected {found} on line {line}")]
    Unexpected { found: String, line: usize },
}

/// `name = value` inside a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Source text of the value expression, trimmed
    pub raw: String,
    pub line: usize,
    literal: Option<String>,
}

impl Attribute {
    /// The value when it is a plain quoted string without interpolation
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    pub line: usize,
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// `resource "aws_vpc" "main"` style header for messages
    pub fn header(&self) -> String {
        let mut header = self.kind.clone();
        for label in &self.labels {
            header.push_str(&format!(" \"{}\"", label));
        }
        header
    }
}

/// Top level of one configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HclDocument {
    pub blocks: Vec<Block>,
    /// Attributes at file level (not valid in a `.tf` file)
    pub stray_attributes: Vec<Attribute>,
    references: BTreeSet<String>,
}

impl HclDocument {
    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    /// `resource` blocks of the given type
    pub fn resources_of_type<'a>(&'a self, ty: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks_of("resource").filter(move |b| b.label(0) == Some(ty))
    }

    pub fn declared_variables(&self) -> BTreeSet<&str> {
        self.blocks_of("variable").filter_map(|b| b.label(0)).collect()
    }

    /// Names referenced as `var.<name>` in code, strings and heredocs.
    /// Comments are not searched.
    pub fn variable_references(&self) -> &BTreeSet<String> {
        &self.references
    }
}

/// Scan `source` into a block tree, failing on the first structural error.
pub fn scan(source: &str) -> Result<HclDocument, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser {
        source,
        tokens: &tokens,
        pos: 0,
    };
    let (stray_attributes, blocks) = parser.parse_body(false)?;
    let references = VAR_REF
        .captures_iter(&code_text(source, &tokens))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    Ok(HclDocument {
        blocks,
        stray_attributes,
        references,
    })
}

/// The source with everything between tokens (whitespace and comments)
/// collapsed to a single space.
fn code_text(source: &str, tokens: &[Token]) -> String {
    let mut text = String::with_capacity(source.len());
    let mut last = 0;
    for token in tokens {
        if token.start > last {
            text.push(' ');
        }
        text.push_str(&source[token.start..token.end]);
        last = token.end;
    }
    text
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Str { text: String, template: bool },
    Heredoc,
    Open(char),
    Close(char),
    Assign,
    Newline,
    Other,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    start: usize,
    end: usize,
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    open: Vec<(char, usize)>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            open: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        self.tokens.push(Token {
            kind,
            line,
            start,
            end: self.pos,
        });
    }

    fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some(b) = self.peek(0) {
            let start = self.pos;
            let line = self.line;
            match b {
                b'\n' => {
                    self.pos += 1;
                    self.push(TokenKind::Newline, start, line);
                    self.line += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'#' => self.skip_line(),
                b'/' if self.peek(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'"' => {
                    let template = self.skip_string()?;
                    let text = self.src[start + 1..self.pos - 1].to_string();
                    self.push(TokenKind::Str { text, template }, start, line);
                }
                b'<' if self.peek(1) == Some(b'<') && self.heredoc_marker().is_some() => {
                    self.skip_heredoc()?;
                    self.push(TokenKind::Heredoc, start, line);
                }
                b'{' | b'[' | b'(' => {
                    self.open.push((b as char, line));
                    self.pos += 1;
                    self.push(TokenKind::Open(b as char), start, line);
                }
                b'}' | b']' | b')' => {
                    let found = b as char;
                    match self.open.pop() {
                        None => return Err(SyntaxError::UnexpectedClose { found, line }),
                        Some((open, open_line)) if closer_for(open) != found => {
                            return Err(SyntaxError::MismatchedClose {
                                open,
                                open_line,
                                found,
                                line,
                            })
                        }
                        Some(_) => {}
                    }
                    self.pos += 1;
                    self.push(TokenKind::Close(found), start, line);
                }
                b'=' => {
                    if matches!(self.peek(1), Some(b'=') | Some(b'>')) {
                        self.pos += 2;
                        self.push(TokenKind::Other, start, line);
                    } else {
                        self.pos += 1;
                        self.push(TokenKind::Assign, start, line);
                    }
                }
                b'!' | b'<' | b'>' if self.peek(1) == Some(b'=') => {
                    self.pos += 2;
                    self.push(TokenKind::Other, start, line);
                }
                _ if b.is_ascii_alphabetic() || b == b'_' => {
                    while matches!(self.peek(0), Some(c) if c.is_ascii_alphanumeric() || c == b'_' || c == b'-')
                    {
                        self.pos += 1;
                    }
                    let ident = self.src[start..self.pos].to_string();
                    self.push(TokenKind::Ident(ident), start, line);
                }
                _ => {
                    let width = self.src[start..].chars().next().map_or(1, char::len_utf8);
                    self.pos += width;
                    self.push(TokenKind::Other, start, line);
                }
            }
        }

        if let Some(&(open, line)) = self.open.first() {
            return Err(SyntaxError::Unclosed { open, line });
        }
        Ok(self.tokens)
    }

    fn skip_line(&mut self) {
        while matches!(self.peek(0), Some(c) if c != b'\n') {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => return Err(SyntaxError::UnterminatedComment { line }),
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.pos += 2;
                    return Ok(());
                }
                Some(b'\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a quoted string starting at `"`. Returns whether it contains
    /// `${...}` or `%{...}` template sequences.
    fn skip_string(&mut self) -> Result<bool, SyntaxError> {
        let line = self.line;
        let mut template = false;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => return Err(SyntaxError::UnterminatedString { line }),
                Some(b'\\') => self.pos += 2,
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(template);
                }
                Some(b'$') | Some(b'%') if self.peek(1) == self.peek(0) && self.peek(2) == Some(b'{') => {
                    // `$${` / `%%{` are escaped literals
                    self.pos += 3;
                }
                Some(b'$') | Some(b'%') if self.peek(1) == Some(b'{') => {
                    template = true;
                    self.pos += 2;
                    self.skip_template(line)?;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a template expression up to its closing `}`; may contain nested strings.
    fn skip_template(&mut self, string_line: usize) -> Result<(), SyntaxError> {
        let mut depth = 1usize;
        loop {
            match self.peek(0) {
                None => return Err(SyntaxError::UnterminatedString { line: string_line }),
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'"') => {
                    self.skip_string()?;
                }
                Some(b'\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// `<<EOT` / `<<-EOT` followed by a newline; returns the marker.
    fn heredoc_marker(&self) -> Option<&'a str> {
        let mut cursor = self.pos + 2;
        if self.bytes.get(cursor) == Some(&b'-') {
            cursor += 1;
        }
        let marker_start = cursor;
        while matches!(self.bytes.get(cursor), Some(c) if c.is_ascii_alphanumeric() || *c == b'_') {
            cursor += 1;
        }
        if cursor == marker_start {
            return None;
        }
        let marker = &self.src[marker_start..cursor];
        if self.bytes.get(cursor) == Some(&b'\r') {
            cursor += 1;
        }
        (self.bytes.get(cursor) == Some(&b'\n')).then_some(marker)
    }

    fn skip_heredoc(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        let marker = self.heredoc_marker().unwrap_or_default();
        let header_end = match self.src[self.pos..].find('\n') {
            Some(offset) => self.pos + offset,
            None => return Err(SyntaxError::UnterminatedHeredoc { marker: marker.to_string(), line }),
        };

        let mut cursor = header_end + 1;
        self.line += 1;
        loop {
            if cursor >= self.bytes.len() {
                return Err(SyntaxError::UnterminatedHeredoc {
                    marker: marker.to_string(),
                    line,
                });
            }
            let line_end = self.src[cursor..]
                .find('\n')
                .map_or(self.bytes.len(), |offset| cursor + offset);
            if self.src[cursor..line_end].trim() == marker {
                self.pos = line_end;
                return Ok(());
            }
            cursor = line_end + 1;
            self.line += 1;
        }
    }
}

fn closer_for(open: char) -> char {
    match open {
        '{' => '}',
        '[' => ']',
        _ => ')',
    }
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn kind_at(&self, offset: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.kind_at(0), Some(TokenKind::Newline)) {
            self.pos += 1;
        }
    }

    /// Parse attributes and blocks until EOF or, inside a block, the closing `}`.
    fn parse_body(&mut self, in_block: bool) -> Result<(Vec<Attribute>, Vec<Block>), SyntaxError> {
        let mut attributes = Vec::new();
        let mut blocks = Vec::new();

        loop {
            self.skip_newlines();
            let Some(token) = self.tokens.get(self.pos) else {
                return Ok((attributes, blocks));
            };

            match &token.kind {
                TokenKind::Close('}') if in_block => {
                    self.pos += 1;
                    return Ok((attributes, blocks));
                }
                TokenKind::Ident(name) => {
                    if matches!(self.kind_at(1), Some(TokenKind::Assign)) {
                        self.pos += 2;
                        attributes.push(self.attribute(name, token.line)?);
                    } else {
                        blocks.push(self.block(name, token.line)?);
                    }
                }
                other => {
                    return Err(SyntaxError::Unexpected {
                        found: describe(other, &self.source[token.start..token.end]),
                        line: token.line,
                    })
                }
            }
        }
    }

    fn attribute(&mut self, name: &str, line: usize) -> Result<Attribute, SyntaxError> {
        let first = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::Open(_) => depth += 1,
                TokenKind::Close(_) if depth == 0 => break,
                TokenKind::Close(_) => depth -= 1,
                TokenKind::Newline if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }

        let value = &self.tokens[first..self.pos];
        let (Some(head), Some(tail)) = (value.first(), value.last()) else {
            return Err(SyntaxError::MissingValue {
                name: name.to_string(),
                line,
            });
        };

        let literal = match value {
            [Token {
                kind: TokenKind::Str { text, template: false },
                ..
            }] => Some(text.clone()),
            _ => None,
        };

        Ok(Attribute {
            name: name.to_string(),
            raw: self.source[head.start..tail.end].trim().to_string(),
            line,
            literal,
        })
    }

    fn block(&mut self, kind: &str, line: usize) -> Result<Block, SyntaxError> {
        self.pos += 1;
        let mut labels = Vec::new();
        loop {
            match self.kind_at(0) {
                Some(TokenKind::Str { text, .. }) => labels.push(text.clone()),
                Some(TokenKind::Ident(label)) => labels.push(label.clone()),
                Some(TokenKind::Open('{')) => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    let mut header = kind.to_string();
                    for label in &labels {
                        header.push_str(&format!(" \"{}\"", label));
                    }
                    return Err(SyntaxError::MissingBlockBody { header, line });
                }
            }
            self.pos += 1;
        }

        let (attributes, blocks) = self.parse_body(true)?;
        Ok(Block {
            kind: kind.to_string(),
            labels,
            line,
            attributes,
            blocks,
        })
    }
}

fn describe(kind: &TokenKind, text: &str) -> String {
    match kind {
        TokenKind::Str { .. } => format!("string {}", text),
        TokenKind::Heredoc => "heredoc".to_string(),
        _ => format!("`{}`", text),
    }
}
