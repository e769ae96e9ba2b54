//! The external lexer's in-crate stand-in (spec §6). Not the focus of the
//! front end's design — it exists so the four passes can be driven
//! end-to-end without a separate crate. Tokenizes with `logos`, following
//! the same Logos-enum-to-domain-enum split the teacher uses in
//! `parser/lexer.rs`.

mod token;

pub use token::{Keyword, Payload, Punct, Token, TokenClass};

use crate::base::Interner;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Raw {
    #[regex(r"//[^\n]*")]
    #[regex(r"/\*([^*]|\*[^/])*\*/")]
    Comment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9][0-9A-Za-z]*")]
    Number,

    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    #[token("_")]
    DontCare,

    #[token(";")]
    Semi,
    #[token("::")]
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("&&&")]
    Mask,
    #[token("==")]
    EqEq,
    #[token("=")]
    Assign,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token("<<")]
    Shl,
    #[token("<")]
    Lt,
    #[token(">=")]
    GtEq,
    #[token(">>")]
    Shr,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&&")]
    AndAnd,
    #[token("&")]
    Amp,
    #[token("||")]
    OrOr,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

/// Tokenize `source` into the token array the parser consumes.
///
/// Comment tokens are included in the stream (the parser's token window
/// skips them on `advance`, per spec §6); a trailing `EndOfInput` token is
/// always appended.
pub fn lex(source: &str, interner: &mut Interner) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = Raw::lexer(source);
    let mut line: u32 = 1;
    let mut col: u32 = 1;

    while let Some(result) = lexer.next() {
        let text = lexer.slice();
        let (t_line, t_col) = (line, col);
        advance_position(text, &mut line, &mut col);

        let Ok(raw) = result else {
            tokens.push(Token::new(
                TokenClass::LexicalError,
                interner.intern(text),
                t_line,
                t_col,
                Payload::None,
            ));
            continue;
        };

        let (klass, payload) = classify(raw, text);
        tokens.push(Token::new(klass, interner.intern(text), t_line, t_col, payload));
    }

    tokens.push(Token::new(
        TokenClass::EndOfInput,
        interner.intern(""),
        line,
        col,
        Payload::None,
    ));
    tokens
}

fn advance_position(text: &str, line: &mut u32, col: &mut u32) {
    for ch in text.chars() {
        if ch == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    }
}

fn classify(raw: Raw, text: &str) -> (TokenClass, Payload) {
    match raw {
        Raw::Comment => (TokenClass::Comment, Payload::None),
        // The lexer never classifies a reserved word as `Keyword` — that
        // rewrite depends on the active scope and happens exclusively in
        // the parser's token window (C2). Every identifier-shaped lexeme,
        // reserved or not, starts out as plain `Identifier`.
        Raw::Ident => (TokenClass::Identifier, Payload::None),
        Raw::Number => (TokenClass::IntLiteral, parse_int_literal(text)),
        Raw::Str => {
            let inner = &text[1..text.len().saturating_sub(1)];
            (TokenClass::StringLiteral, Payload::Str(inner.to_string()))
        }
        Raw::DontCare => (TokenClass::DontCare, Payload::None),
        Raw::Semi => (TokenClass::Punct(Punct::Semi), Payload::None),
        Raw::Colon => (TokenClass::Punct(Punct::Colon), Payload::None),
        Raw::Comma => (TokenClass::Punct(Punct::Comma), Payload::None),
        Raw::Dot => (TokenClass::Punct(Punct::Dot), Payload::None),
        Raw::Mask => (TokenClass::Punct(Punct::Mask), Payload::None),
        Raw::EqEq => (TokenClass::Punct(Punct::EqEq), Payload::None),
        Raw::Assign => (TokenClass::Punct(Punct::Assign), Payload::None),
        Raw::NotEq => (TokenClass::Punct(Punct::NotEq), Payload::None),
        Raw::LtEq => (TokenClass::Punct(Punct::LtEq), Payload::None),
        Raw::Shl => (TokenClass::Punct(Punct::Shl), Payload::None),
        Raw::Lt => (TokenClass::Punct(Punct::Lt), Payload::None),
        Raw::GtEq => (TokenClass::Punct(Punct::GtEq), Payload::None),
        Raw::Shr => (TokenClass::Punct(Punct::Shr), Payload::None),
        Raw::Gt => (TokenClass::Punct(Punct::Gt), Payload::None),
        Raw::Bang => (TokenClass::Punct(Punct::Bang), Payload::None),
        Raw::Tilde => (TokenClass::Punct(Punct::Tilde), Payload::None),
        Raw::AndAnd => (TokenClass::Punct(Punct::AndAnd), Payload::None),
        Raw::Amp => (TokenClass::Punct(Punct::Amp), Payload::None),
        Raw::OrOr => (TokenClass::Punct(Punct::OrOr), Payload::None),
        Raw::Pipe => (TokenClass::Punct(Punct::Pipe), Payload::None),
        Raw::Caret => (TokenClass::Punct(Punct::Caret), Payload::None),
        Raw::Plus => (TokenClass::Punct(Punct::Plus), Payload::None),
        Raw::Minus => (TokenClass::Punct(Punct::Minus), Payload::None),
        Raw::Star => (TokenClass::Punct(Punct::Star), Payload::None),
        Raw::Slash => (TokenClass::Punct(Punct::Slash), Payload::None),
        Raw::LParen => (TokenClass::Punct(Punct::LParen), Payload::None),
        Raw::RParen => (TokenClass::Punct(Punct::RParen), Payload::None),
        Raw::LBrace => (TokenClass::Punct(Punct::LBrace), Payload::None),
        Raw::RBrace => (TokenClass::Punct(Punct::RBrace), Payload::None),
        Raw::LBracket => (TokenClass::Punct(Punct::LBracket), Payload::None),
        Raw::RBracket => (TokenClass::Punct(Punct::RBracket), Payload::None),
    }
}

/// Parses an integer literal with an optional width/signedness suffix, e.g.
/// `8w10` (8-bit value 10), `16s42` (16-bit signed value 42), or a bare `42`
/// (signed, width sized to the literal's magnitude).
fn parse_int_literal(text: &str) -> Payload {
    let digits_end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    let (leading, rest) = text.split_at(digits_end);

    if rest.is_empty() {
        let value: i64 = leading.parse().unwrap_or(0);
        let width = 64u32.saturating_sub(value.leading_zeros()).max(1);
        return Payload::Integer {
            is_signed: true,
            width,
            value,
        };
    }

    // `<width>w<value>` or `<width>s<value>`: width from the leading digits,
    // signedness from the separator, value from the remaining digits.
    let is_signed = rest.starts_with('s');
    let value_digits = &rest[1..];
    let width: u32 = leading.parse().unwrap_or(32);
    let value: i64 = value_digits.parse().unwrap_or(0);
    Payload::Integer {
        is_signed,
        width,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_str(src: &str) -> Vec<Token> {
        let mut interner = Interner::new();
        lex(src, &mut interner)
    }

    #[test]
    fn reserved_words_still_lex_as_plain_identifiers() {
        // The scope-sensitive rewrite to `Keyword`/`TypeIdentifier` is the
        // parser's job (C2); the lexer has no scope to consult.
        let tokens = lex_str("header struct");
        assert_eq!(tokens[0].klass, TokenClass::Identifier);
        assert_eq!(tokens[1].klass, TokenClass::Identifier);
    }

    #[test]
    fn plain_identifier_stays_identifier() {
        let tokens = lex_str("PortId_t");
        assert_eq!(tokens[0].klass, TokenClass::Identifier);
    }

    #[test]
    fn comments_are_emitted_but_marked_trivia() {
        let tokens = lex_str("// hi\nbit");
        assert_eq!(tokens[0].klass, TokenClass::Comment);
        assert!(tokens[0].klass.is_trivia());
        assert_eq!(tokens[1].klass, TokenClass::Identifier);
    }

    #[test]
    fn width_suffixed_integer_literal() {
        let tokens = lex_str("8w10");
        match &tokens[0].payload {
            Payload::Integer {
                is_signed,
                width,
                value,
            } => {
                assert!(!is_signed);
                assert_eq!(*width, 8);
                assert_eq!(*value, 10);
            }
            other => panic!("expected integer payload, got {other:?}"),
        }
    }

    #[test]
    fn bare_integer_literal_is_signed() {
        let tokens = lex_str("42");
        match &tokens[0].payload {
            Payload::Integer { is_signed, value, .. } => {
                assert!(*is_signed);
                assert_eq!(*value, 42);
            }
            other => panic!("expected integer payload, got {other:?}"),
        }
    }

    #[test]
    fn mask_operator_is_not_split_into_ampersands() {
        let tokens = lex_str("a &&& b");
        assert_eq!(tokens[1].klass, TokenClass::Punct(Punct::Mask));
    }

    #[test]
    fn ends_with_end_of_input() {
        let tokens = lex_str("bit");
        assert_eq!(tokens.last().unwrap().klass, TokenClass::EndOfInput);
    }

    #[test]
    fn unterminated_token_is_lexical_error() {
        let tokens = lex_str("@@@");
        assert_eq!(tokens[0].klass, TokenClass::LexicalError);
    }
}
