//! Token cursor shared by the tree builders.
//!
//! Wraps the MsSqlDialect tokenizer output. The full token stream (comments
//! and whitespace included) is kept so node text can be rebuilt verbatim,
//! while the cursor itself only ever stands on significant tokens.
//!
//! Before parsing, the stream is normalized so that every variable, system
//! variable and temporary-table name is one `Word` regardless of how the
//! tokenizer split its `@`, `@@` or `#` prefix.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Span, Token, TokenWithSpan, Tokenizer, Word};

use super::identifier_utils::{format_word, token_source_text};

pub struct TokenParser {
    tokens: Vec<TokenWithSpan>,
    significant: Vec<usize>,
    pos: usize,
}

impl TokenParser {
    /// Tokenizes `sql` with the MsSql dialect.
    ///
    /// Returns the tokenizer's message when the text cannot be tokenized
    /// (for instance an unterminated string literal).
    pub fn new(sql: &str) -> Result<Self, String> {
        let dialect = MsSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .map_err(|e| e.to_string())?;
        Ok(Self::from_tokens(split_bang_equals(tokens, sql)))
    }

    pub fn from_tokens(tokens: Vec<TokenWithSpan>) -> Self {
        let tokens = merge_prefixed_words(tokens);
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
            .map(|(i, _)| i)
            .collect();
        Self {
            tokens,
            significant,
            pos: 0,
        }
    }

    /// Hands the token stream over to the finished tree.
    pub fn into_parts(self) -> (Vec<TokenWithSpan>, Vec<usize>) {
        (self.tokens, self.significant)
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.significant.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.significant.len());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.significant.len()
    }

    // ========================================================================
    // Token access
    // ========================================================================

    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.peek(0)
    }

    #[inline]
    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.significant
            .get(self.pos + offset)
            .map(|i| &self.tokens[*i].token)
    }

    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// 1-based line of the significant token at `pos` (or of the last token
    /// when `pos` is past the end).
    pub fn line_at(&self, pos: usize) -> usize {
        let index = match self.significant.get(pos) {
            Some(i) => *i,
            None => match self.significant.last() {
                Some(i) => *i,
                None => return 1,
            },
        };
        (self.tokens[index].span.start.line as usize).max(1)
    }

    /// Whether the current and next significant tokens touch (no whitespace
    /// or comment between them).
    pub fn next_is_adjacent(&self) -> bool {
        match (
            self.significant.get(self.pos),
            self.significant.get(self.pos + 1),
        ) {
            (Some(a), Some(b)) => *b == *a + 1,
            _ => false,
        }
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    /// The word `offset` tokens ahead, if it is an unquoted word.
    #[inline]
    pub fn peek_keyword(&self, offset: usize) -> Option<&str> {
        match self.peek(offset) {
            Some(Token::Word(w)) if w.quote_style.is_none() => Some(w.value.as_str()),
            _ => None,
        }
    }

    /// Whether the current token is the unquoted word `word` (case-insensitive).
    ///
    /// Bracketed and double-quoted words are identifiers and never match.
    #[inline]
    pub fn check_word_ci(&self, word: &str) -> bool {
        self.peek_word_ci(0, word)
    }

    #[inline]
    pub fn peek_word_ci(&self, offset: usize, word: &str) -> bool {
        self.peek_keyword(offset)
            .is_some_and(|w| w.eq_ignore_ascii_case(word))
    }

    /// Whether the next tokens are exactly the unquoted words in `words`.
    pub fn check_words_ci(&self, words: &[&str]) -> bool {
        words
            .iter()
            .enumerate()
            .all(|(i, w)| self.peek_word_ci(i, w))
    }

    /// Whether the current token is any of the unquoted words in `words`.
    pub fn check_any_word_ci(&self, words: &[&str]) -> bool {
        self.peek_keyword(0)
            .is_some_and(|w| words.iter().any(|c| c.eq_ignore_ascii_case(w)))
    }

    /// Whether the token `offset` ahead is any of the unquoted words in `words`.
    pub fn check_any_word_ci_at(&self, offset: usize, words: &[&str]) -> bool {
        self.peek_keyword(offset)
            .is_some_and(|w| words.iter().any(|c| c.eq_ignore_ascii_case(w)))
    }

    /// Compares token types without comparing the inner value.
    #[inline]
    pub fn check_token(&self, expected: &Token) -> bool {
        self.current()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    #[inline]
    pub fn peek_token(&self, offset: usize, expected: &Token) -> bool {
        self.peek(offset)
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    // ========================================================================
    // Expect methods (check and advance)
    // ========================================================================

    pub fn eat_word_ci(&mut self, word: &str) -> bool {
        if self.check_word_ci(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the whole word sequence or nothing.
    pub fn eat_words_ci(&mut self, words: &[&str]) -> bool {
        if self.check_words_ci(words) {
            self.pos += words.len();
            true
        } else {
            false
        }
    }

    pub fn eat_token(&mut self, expected: &Token) -> bool {
        if self.check_token(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes and uppercases the current unquoted word.
    pub fn take_keyword(&mut self) -> Option<String> {
        let word = self.peek_keyword(0)?.to_ascii_uppercase();
        self.advance();
        Some(word)
    }

    // ========================================================================
    // Identifier parsing
    // ========================================================================

    /// Consumes a possibly multi-part name (`srv.db.schema.obj`, `db..obj`,
    /// `.obj`) and returns it as written.
    pub fn parse_multipart_name(&mut self) -> Option<String> {
        let start = self.pos;
        let mut text = String::new();
        let mut expect_part = true;

        // Leading dots
        while self.check_token(&Token::Period) {
            text.push('.');
            self.advance();
        }

        loop {
            match self.current() {
                Some(Token::Word(w)) if expect_part => {
                    text.push_str(&format_word(w));
                    self.advance();
                    expect_part = false;
                }
                Some(Token::Period) => {
                    text.push('.');
                    self.advance();
                    expect_part = true;
                }
                // `t.*`
                Some(Token::Mul) if expect_part && !text.is_empty() => break,
                _ => break,
            }
        }

        if text.is_empty() || text.chars().all(|c| c == '.') {
            self.pos = start;
            return None;
        }
        Some(text)
    }

    /// Consumes one identifier part, returning it as written.
    pub fn parse_identifier(&mut self) -> Option<String> {
        match self.current() {
            Some(Token::Word(w)) => {
                let text = format_word(w);
                self.advance();
                Some(text)
            }
            _ => None,
        }
    }

    /// Consumes an unsigned integer literal.
    pub fn parse_positive_integer(&mut self) -> Option<u64> {
        match self.current() {
            Some(Token::Number(n, _)) => {
                let value = n.parse().ok()?;
                self.advance();
                Some(value)
            }
            _ => None,
        }
    }

    // ========================================================================
    // Skipping and text reconstruction
    // ========================================================================

    /// Skips a balanced parenthesized group starting at the current `(`.
    pub fn skip_parenthesized(&mut self) {
        if !self.check_token(&Token::LParen) {
            return;
        }
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Consumes a balanced parenthesized group and returns its inner text.
    pub fn consume_parenthesized(&mut self) -> Option<String> {
        if !self.check_token(&Token::LParen) {
            return None;
        }
        let start = self.pos + 1;
        self.skip_parenthesized();
        let end = self.pos.saturating_sub(1);
        Some(self.text_between(start, end))
    }

    /// Source text of significant tokens `start..end`, with inner whitespace
    /// and comments included.
    pub fn text_between(&self, start: usize, end: usize) -> String {
        if start >= end || start >= self.significant.len() {
            return String::new();
        }
        let first = self.significant[start];
        let last = self.significant[(end - 1).min(self.significant.len() - 1)];
        self.tokens[first..=last]
            .iter()
            .map(|t| token_source_text(&t.token))
            .collect()
    }

    /// Display text of the current token, used for operator matching.
    pub fn current_text(&self) -> String {
        self.current().map(|t| t.to_string()).unwrap_or_default()
    }
}

/// The tokenizer yields the same `Neq` token for `<>` and `!=`. The source
/// text is consulted to turn `!=` back into `!` followed by `=`.
fn split_bang_equals(tokens: Vec<TokenWithSpan>, sql: &str) -> Vec<TokenWithSpan> {
    if !sql.contains("!=") {
        return tokens;
    }
    let lines: Vec<&str> = sql.lines().collect();
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.token != Token::Neq {
            out.push(token);
            continue;
        }
        let start = token.span.start;
        let first_char = lines
            .get((start.line as usize).saturating_sub(1))
            .and_then(|line| line.chars().nth((start.column as usize).saturating_sub(1)));
        if first_char == Some('!') {
            let eq_start = Location {
                line: start.line,
                column: start.column + 1,
            };
            out.push(TokenWithSpan {
                token: Token::ExclamationMark,
                span: Span::new(start, eq_start),
            });
            out.push(TokenWithSpan {
                token: Token::Eq,
                span: Span::new(eq_start, token.span.end),
            });
        } else {
            out.push(token);
        }
    }
    out
}

/// Merges `@`, `@@`, `#` and `##` prefixes with the word that immediately
/// follows them, and a `0` number directly followed by an `x...` word into a
/// hex literal.
fn merge_prefixed_words(tokens: Vec<TokenWithSpan>) -> Vec<TokenWithSpan> {
    let mut out: Vec<TokenWithSpan> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let text = token.token.to_string();
        let is_prefix = !text.is_empty() && text.chars().all(|c| c == '@' || c == '#');
        if is_prefix && !matches!(token.token, Token::Word(_)) {
            let mut prefix = text;
            let span = token.span;
            // `@` `@` `ERROR` arrives as separate tokens in some tokenizer versions.
            while let Some(next) = iter.peek() {
                let next_text = next.token.to_string();
                if !matches!(next.token, Token::Word(_))
                    && !next_text.is_empty()
                    && next_text.chars().all(|c| c == '@' || c == '#')
                {
                    prefix.push_str(&next_text);
                    iter.next();
                } else {
                    break;
                }
            }
            match iter.peek() {
                Some(TokenWithSpan {
                    token: Token::Word(w),
                    ..
                }) if w.quote_style.is_none() => {
                    let value = format!("{prefix}{}", w.value);
                    iter.next();
                    out.push(TokenWithSpan {
                        token: Token::Word(Word {
                            value,
                            quote_style: None,
                            keyword: Keyword::NoKeyword,
                        }),
                        span,
                    });
                }
                _ => out.push(TokenWithSpan {
                    token: Token::Word(Word {
                        value: prefix,
                        quote_style: None,
                        keyword: Keyword::NoKeyword,
                    }),
                    span,
                }),
            }
            continue;
        }

        if let Token::Number(n, _) = &token.token {
            if n == "0" {
                if let Some(TokenWithSpan {
                    token: Token::Word(w),
                    ..
                }) = iter.peek()
                {
                    let digits = w.value.strip_prefix(['x', 'X']);
                    if w.quote_style.is_none()
                        && digits.is_some_and(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
                    {
                        let digits = digits.unwrap_or_default().to_string();
                        iter.next();
                        out.push(TokenWithSpan {
                            token: Token::HexStringLiteral(digits),
                            span: token.span,
                        });
                        continue;
                    }
                }
            }
        }

        out.push(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(sql: &str) -> Vec<String> {
        let parser = TokenParser::new(sql).unwrap();
        let (tokens, significant) = parser.into_parts();
        significant
            .iter()
            .map(|i| token_source_text(&tokens[*i].token).into_owned())
            .collect()
    }

    #[test]
    fn test_variables_are_single_words() {
        assert_eq!(words("SELECT @x, @@ERROR"), vec!["SELECT", "@x", ",", "@@ERROR"]);
    }

    #[test]
    fn test_temp_table_is_single_word() {
        let w = words("SELECT * FROM #tmp");
        assert_eq!(w.last().map(String::as_str), Some("#tmp"));
    }

    #[test]
    fn test_check_word_ci_ignores_quoted_words() {
        let parser = TokenParser::new("[select]").unwrap();
        assert!(!parser.check_word_ci("SELECT"));
        let parser = TokenParser::new("select").unwrap();
        assert!(parser.check_word_ci("SELECT"));
    }

    #[test]
    fn test_parse_multipart_name() {
        let mut parser = TokenParser::new("srv.[my db]..t x").unwrap();
        assert_eq!(parser.parse_multipart_name().as_deref(), Some("srv.[my db]..t"));
        assert!(parser.check_word_ci("x"));
    }

    #[test]
    fn test_bang_equals_is_kept_apart_from_angle_brackets() {
        assert_eq!(words("a != b"), vec!["a", "!", "=", "b"]);
        assert_eq!(words("a <> b"), vec!["a", "<>", "b"]);
    }

    #[test]
    fn test_line_tracking() {
        let parser = TokenParser::new("SELECT 1\n\nPRINT 2").unwrap();
        assert_eq!(parser.line_at(0), 1);
        assert_eq!(parser.line_at(2), 3);
    }

    #[test]
    fn test_consume_parenthesized() {
        let mut parser = TokenParser::new("(a, (b)) c").unwrap();
        assert_eq!(parser.consume_parenthesized().as_deref(), Some("a, (b)"));
        assert!(parser.check_word_ci("c"));
    }
}
