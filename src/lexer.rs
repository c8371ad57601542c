use crate::diagnostics::MAX_LEXEME_LEN;
use crate::symbols::SymbolTable;
use crate::token::{LexError, Token, TokenKind, lookup_keyword};

const TWO_CHAR_OPS: &[&[u8]] = &[b"<=", b">=", b"!=", b"<>"];

/// Longest prefix of `text` that fits in `max` bytes without splitting a
/// character.
fn clip(text: &str, max: usize) -> &str {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// `MESSAGE: text`, clipped to `MAX_LEXEME_LEN`.
fn error_token(error: LexError, text: &str, line: usize, column: usize) -> Token {
    let message = error.message();
    let room = MAX_LEXEME_LEN.saturating_sub(message.len() + 2);
    Token::new(
        TokenKind::Error(error),
        format!("{message}: {}", clip(text, room)),
        line,
        column,
    )
}

/// States of a numeric literal while it is being scanned. A dot moves
/// `Integer` to `Float`; any further dot is a dead end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberState {
    Integer,
    Float,
    Invalid,
}

impl NumberState {
    fn on_dot(self) -> Self {
        match self {
            NumberState::Integer => NumberState::Float,
            NumberState::Float | NumberState::Invalid => NumberState::Invalid,
        }
    }
}

/// Hand-written scanner over an in-memory source. Non-keyword identifiers
/// are registered in the scanner's own symbol table as they are seen.
pub struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    finished: bool,
    symbols: SymbolTable,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            finished: false,
            symbols: SymbolTable::new(),
        }
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if byte & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new character
            self.column += 1;
        }
        Some(byte)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// True once the token starting at `start` has grown past the limit.
    fn over_limit(&self, start: usize) -> bool {
        self.pos - start > MAX_LEXEME_LEN
    }

    /// Give up on the token starting at `start`; scanning stops here.
    fn too_long(&self, start: usize, line: usize, column: usize) -> Token {
        error_token(LexError::TokenTooLong, &self.input[start..], line, column)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.advance();
        }
    }

    /// Produce the next token. Once `EndOfInput` has been returned, further
    /// calls keep returning `EndOfInput`.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let (line, column) = (self.line, self.column);
        let start = self.pos;

        let Some(b) = self.peek() else {
            return Token::new(TokenKind::EndOfInput, "EOF", line, column);
        };

        let kind = match b {
            b'-' if self.peek_at(1) == Some(b'-') => return self.lex_comment(line, column),
            b'\'' | b'"' => return self.lex_string(line, column),
            b'0'..=b'9' => return self.lex_number(line, column),
            b if b.is_ascii_alphabetic() || b == b'_' => return self.lex_word(line, column),
            b';' => {
                self.advance();
                TokenKind::Semicolon
            }
            b',' | b'(' | b')' | b'.' => {
                self.advance();
                TokenKind::Delimiter
            }
            b'+' | b'-' | b'*' | b'/' | b'=' | b'<' | b'>' | b'!' => {
                let remaining = &self.bytes[self.pos..];
                let width = if TWO_CHAR_OPS.iter().any(|op| remaining.starts_with(op)) {
                    2
                } else {
                    1
                };
                for _ in 0..width {
                    self.advance();
                }
                TokenKind::Operator
            }
            _ => return self.lex_invalid(line, column),
        };

        Token::new(kind, self.slice(start, self.pos), line, column)
    }

    fn lex_comment(&mut self, line: usize, column: usize) -> Token {
        // Skip the '--'
        self.advance();
        self.advance();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.advance();
        }
        let text = clip(self.slice(start, self.pos), MAX_LEXEME_LEN);
        Token::new(TokenKind::Comment, text, line, column)
    }

    fn lex_string(&mut self, line: usize, column: usize) -> Token {
        let start = self.pos;
        let Some(delimiter) = self.advance() else {
            return Token::new(TokenKind::EndOfInput, "EOF", line, column);
        };
        loop {
            match self.peek() {
                None => {
                    let text = self.slice(start, self.pos);
                    return error_token(LexError::UnterminatedString, text, line, column);
                }
                Some(b) => {
                    self.advance();
                    if self.over_limit(start) {
                        return self.too_long(start, line, column);
                    }
                    if b == delimiter {
                        let text = self.slice(start, self.pos);
                        return Token::new(TokenKind::String, text, line, column);
                    }
                }
            }
        }
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Token {
        let start = self.pos;
        let mut state = NumberState::Integer;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => {
                    self.advance();
                    if self.over_limit(start) {
                        return self.too_long(start, line, column);
                    }
                }
                b'.' => {
                    state = state.on_dot();
                    self.advance();
                    if state == NumberState::Invalid {
                        break;
                    }
                }
                _ => break,
            }
        }

        let text = self.slice(start, self.pos);
        match state {
            NumberState::Integer => Token::new(TokenKind::Integer, text, line, column),
            NumberState::Float => Token::new(TokenKind::Float, text, line, column),
            NumberState::Invalid => {
                error_token(LexError::MultipleDecimalPoints, text, line, column)
            }
        }
    }

    fn lex_word(&mut self, line: usize, column: usize) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
                if self.over_limit(start) {
                    return self.too_long(start, line, column);
                }
            } else {
                break;
            }
        }
        let word = self.slice(start, self.pos);

        match lookup_keyword(word) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), word, line, column),
            None => {
                self.symbols.add(word);
                Token::new(TokenKind::Identifier, word, line, column)
            }
        }
    }

    fn lex_invalid(&mut self, line: usize, column: usize) -> Token {
        let ch = self.input[self.pos..].chars().next().unwrap_or('\0');
        for _ in 0..ch.len_utf8() {
            self.advance();
        }
        error_token(LexError::InvalidCharacter, ch.encode_utf8(&mut [0; 4]), line, column)
    }
}

/// Yields tokens up to and including the first `EndOfInput` or `Error`.
impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if matches!(token.kind, TokenKind::EndOfInput | TokenKind::Error(_)) {
            self.finished = true;
        }
        Some(token)
    }
}

/// Scan the whole input, comments included.
pub fn tokenize(input: &str) -> Vec<Token> {
    Scanner::new(input).collect()
}
