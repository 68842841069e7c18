use super::grammar::TokenKind;
use predictive::Token;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub position: usize,
    pub rest: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rest: String = self.rest.chars().take(16).collect();
        write!(f, "cannot tokenize input at {}: {:?}", self.position, rest)
    }
}

impl Error for LexError {}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_paren(c: char) -> bool {
    c == '(' || c == ')'
}

fn skip_len(s: &str) -> usize {
    s.chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum()
}

fn lparen_len(s: &str) -> usize {
    if s.starts_with('(') {
        1
    } else {
        0
    }
}

fn rparen_len(s: &str) -> usize {
    if s.starts_with(')') {
        1
    } else {
        0
    }
}

fn digits_len(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

// -?\d+(\.\d*)?
fn number_len(s: &str) -> usize {
    let sign = if s.starts_with('-') { 1 } else { 0 };
    let integer = digits_len(&s[sign..]);
    if integer == 0 {
        return 0;
    }
    let end = sign + integer;
    if s[end..].starts_with('.') {
        end + 1 + digits_len(&s[end + 1..])
    } else {
        end
    }
}

// A word character, then anything up to a space or a paren
fn identifier_len(s: &str) -> usize {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_word(c) => {
            c.len_utf8()
                + chars
                    .take_while(|c| !c.is_whitespace() && !is_paren(*c))
                    .map(char::len_utf8)
                    .sum::<usize>()
        }
        _ => 0,
    }
}

///! Lazily scans S-expression source. Whitespace is skipped, one `Eos` token ends the stream.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input,
            position: 0,
            done: false,
        }
    }

    fn extract(&mut self) -> Result<Token<TokenKind>, LexError> {
        loop {
            let rest = &self.input[self.position..];
            if rest.is_empty() {
                self.done = true;
                return Ok(Token::new(TokenKind::Eos, "", self.position));
            }
            let skipped = skip_len(rest);
            if skipped > 0 {
                self.position += skipped;
                continue;
            }
            // First match wins, numbers before identifiers
            let matchers: [(TokenKind, fn(&str) -> usize); 4] = [
                (TokenKind::LPar, lparen_len),
                (TokenKind::RPar, rparen_len),
                (TokenKind::Number, number_len),
                (TokenKind::Identifier, identifier_len),
            ];
            let found = matchers
                .iter()
                .map(|(kind, matcher)| (*kind, matcher(rest)))
                .find(|(_, len)| *len > 0);
            return match found {
                Some((kind, len)) => {
                    let token = Token::new(kind, &rest[..len], self.position);
                    self.position += len;
                    Ok(token)
                }
                None => {
                    self.done = true;
                    Err(LexError {
                        position: self.position,
                        rest: rest.to_owned(),
                    })
                }
            };
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<TokenKind>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            None
        } else {
            Some(self.extract())
        }
    }
}

#[cfg(test)]
pub fn tokenize(input: &str) -> Result<Vec<Token<TokenKind>>, LexError> {
    Lexer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::{tokenize, LexError, Lexer};
    use crate::grammar::TokenKind;
    use predictive::Token;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_expression() {
        assert_eq!(
            tokenize("(foo 1 -2.5)").unwrap(),
            vec![
                Token::new(TokenKind::LPar, "(", 0),
                Token::new(TokenKind::Identifier, "foo", 1),
                Token::new(TokenKind::Number, "1", 5),
                Token::new(TokenKind::Number, "-2.5", 7),
                Token::new(TokenKind::RPar, ")", 11),
                Token::new(TokenKind::Eos, "", 12),
            ]
        );
    }

    #[test]
    fn identifiers_stop_at_parens() {
        assert_eq!(
            kinds("(a (b-c! x.y))"),
            vec![
                TokenKind::LPar,
                TokenKind::Identifier,
                TokenKind::LPar,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::RPar,
                TokenKind::RPar,
                TokenKind::Eos,
            ]
        );
    }

    #[test]
    fn numbers_before_identifiers() {
        let tokens = tokenize("1. 12ab").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["1.", "12", "ab", ""]);
    }

    #[test]
    fn ascii_word_characters() {
        assert_eq!(
            tokenize("(é)").unwrap_err(),
            LexError {
                position: 1,
                rest: "é)".to_owned(),
            }
        );
        assert_eq!(
            kinds("(_x a-é)")[1..3],
            [TokenKind::Identifier, TokenKind::Identifier]
        );
    }

    #[test]
    fn whitespace_only() {
        assert_eq!(kinds(" \t\n "), vec![TokenKind::Eos]);
        assert_eq!(kinds(""), vec![TokenKind::Eos]);
    }

    #[test]
    fn unknown_input() {
        assert_eq!(
            tokenize("(foo #bar)").unwrap_err(),
            LexError {
                position: 5,
                rest: "#bar)".to_owned(),
            }
        );
    }

    #[test]
    fn lazy_and_fused() {
        let mut lexer = Lexer::new("( -");
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::LPar);
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());

        let mut lexer = Lexer::new("x");
        assert!(lexer.next().unwrap().is_ok());
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Eos);
        assert!(lexer.next().is_none());
    }
}
