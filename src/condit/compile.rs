//! Expression text back to CONDIT bytecode.
//!
//! The grammar matches the decompiler's output:
//!
//! ```text
//! fullexpr := run (SEP run)*
//! run      := term (OP term)*
//! term     := "byte[" addr "]" | "word[" addr "]" | imm | "(" fullexpr ")"
//! ```
//!
//! A parenthesized right operand compiles to a separator control byte
//! (`0x80 | op`); a plain operand compiles to an inline control byte. `?N`
//! accepts the raw operation codes the decompiler prints for reserved
//! operations. Immediate and variable-width encoding choices go through an
//! [`OperandPolicy`], so a recompiled program is guaranteed semantically --
//! not byte -- identical to the original: the original authoring tools
//! sometimes chose wider encodings than necessary.

use logos::Logos;
use std::ops::Range;

use crate::errors::ParseError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"/\*[^*]*\*/")]
enum Token {
    #[regex(r"byte\[[^\]]*\]")]
    ByteVar,
    #[regex(r"word\[[^\]]*\]")]
    WordVar,
    #[regex(r"0[xX][0-9A-Fa-f]+")]
    Hex,
    #[regex(r"[0-9]+")]
    Dec,
    #[regex(r"\?[0-9]+")]
    RawOp,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
}

impl Token {
    fn operator_code(self) -> Option<u8> {
        Some(match self {
            Self::EqEq => 0x00,
            Self::Lt => 0x01,
            Self::Gt => 0x02,
            Self::BangEq => 0x03,
            Self::LtEq => 0x04,
            Self::GtEq => 0x05,
            Self::Plus => 0x06,
            Self::Minus => 0x07,
            Self::Amp => 0x08,
            Self::Pipe => 0x09,
            _ => return None,
        })
    }
}

/// Whether an immediate is emitted as one byte (`Imm8`) or a little-endian
/// word (`Imm16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmWidth {
    Narrow,
    Wide,
}

/// The recompiler's encoding choices for operands.
///
/// Original resources are inconsistent about widths, so the choice is a
/// swappable policy rather than a hard-coded rule; a caller with knowledge
/// of the original bytes can substitute its own to improve byte-for-byte
/// round-trip fidelity.
pub trait OperandPolicy {
    /// Width for an immediate value. `Narrow` is only honored for values
    /// that actually fit in one byte.
    fn imm_width(&self, value: u16) -> ImmWidth;

    /// Tag byte for a word-variable reference; anything in `0x00` or
    /// `0x02..=0x7F` decodes identically.
    fn word_var_tag(&self) -> u8 {
        0x00
    }
}

/// Encode each immediate in the fewest bytes that hold it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowestFit;

impl OperandPolicy for NarrowestFit {
    fn imm_width(&self, value: u16) -> ImmWidth {
        if value <= 0xFF {
            ImmWidth::Narrow
        } else {
            ImmWidth::Wide
        }
    }
}

/// Encode every immediate as a 16-bit word, as some original resources do.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysWide;

impl OperandPolicy for AlwaysWide {
    fn imm_width(&self, _value: u16) -> ImmWidth {
        ImmWidth::Wide
    }
}

/// Compile expression text into CONDIT bytecode with the default
/// [`NarrowestFit`] policy.
/// ```
/// let bytecode = hsq::condit::compile("byte[0x2A] == 0x50").unwrap();
/// assert_eq!(bytecode, [0x01, 0x2A, 0x00, 0x80, 0x50, 0xFF]);
/// ```
pub fn compile(source: &str) -> Result<Vec<u8>, ParseError> {
    compile_with_policy(source, &NarrowestFit)
}

/// Compile expression text into CONDIT bytecode, encoding operands through
/// `policy`.
pub fn compile_with_policy(
    source: &str,
    policy: &dyn OperandPolicy,
) -> Result<Vec<u8>, ParseError> {
    let tokens = lex(source)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        out: Vec::new(),
        policy,
    };
    parser.expression()?;
    if let Some((_, span)) = parser.peek() {
        return Err(ParseError::TrailingInput { pos: span.start });
    }
    parser.out.push(0xFF);
    Ok(parser.out)
}

fn lex(source: &str) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(ParseError::UnexpectedFragment {
                    pos: lexer.span().start,
                })
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    out: Vec<u8>,
    policy: &'a dyn OperandPolicy,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<(Token, Range<usize>)> {
        self.tokens.get(self.pos).map(|(t, s)| (*t, s.clone()))
    }

    fn advance(&mut self) -> Result<(Token, Range<usize>), ParseError> {
        let (token, span) = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEnd {
                pos: self.source.len(),
            })?;
        self.pos += 1;
        Ok((token, span))
    }

    fn expect(&mut self, want: Token, err: fn(usize) -> ParseError) -> Result<(), ParseError> {
        match self.peek() {
            Some((token, _)) if token == want => {
                self.pos += 1;
                Ok(())
            }
            Some((_, span)) => Err(err(span.start)),
            None => Err(err(self.source.len())),
        }
    }

    /// `run (SEP run)*`: the first operand, then operator/operand pairs.
    /// Parenthesized right-hand sides emit separator control bytes and
    /// recurse; plain right-hand sides emit inline control bytes.
    fn expression(&mut self) -> Result<(), ParseError> {
        self.atom()?;

        while let Some((token, span)) = self.peek() {
            let code = if token == Token::RawOp {
                self.pos += 1;
                self.raw_op_code(&span)?
            } else if let Some(code) = token.operator_code() {
                self.pos += 1;
                code
            } else {
                break;
            };

            match self.peek() {
                Some((Token::LParen, _)) => {
                    self.pos += 1;
                    self.out.push(0x80 | code);
                    self.expression()?;
                    self.expect(Token::RParen, |pos| ParseError::UnbalancedParen { pos })?;
                }
                _ => {
                    self.out.push(code);
                    self.atom()?;
                }
            }
        }

        Ok(())
    }

    /// One operand or a parenthesized sub-expression. A leading
    /// parenthesized group is transparent: its bytecode continues the
    /// current run.
    fn atom(&mut self) -> Result<(), ParseError> {
        let (token, span) = self.advance()?;
        match token {
            Token::LParen => {
                self.expression()?;
                self.expect(Token::RParen, |pos| ParseError::UnbalancedParen { pos })
            }
            Token::ByteVar => {
                let addr = self.bracket_addr(&span)?;
                self.out.extend_from_slice(&[0x01, addr]);
                Ok(())
            }
            Token::WordVar => {
                let addr = self.bracket_addr(&span)?;
                let tag = self.policy.word_var_tag();
                self.out.extend_from_slice(&[tag & 0x7F, addr]);
                Ok(())
            }
            Token::Hex | Token::Dec => {
                let value = parse_number(self.text(&span), &span)?;
                match self.policy.imm_width(value) {
                    ImmWidth::Narrow if value <= 0xFF => {
                        self.out.extend_from_slice(&[0x80, value as u8]);
                    }
                    _ => {
                        self.out.push(0x81);
                        self.out.extend_from_slice(&value.to_le_bytes());
                    }
                }
                Ok(())
            }
            _ => Err(ParseError::UnexpectedToken {
                found: self.text(&span).into(),
                pos: span.start,
            }),
        }
    }

    fn text(&self, span: &Range<usize>) -> &'a str {
        &self.source[span.clone()]
    }

    /// The address inside a `byte[...]`/`word[...]` token.
    fn bracket_addr(&self, span: &Range<usize>) -> Result<u8, ParseError> {
        let text = self.text(span);
        let inner = text[5..text.len() - 1].trim();
        let value = parse_number(inner, span)?;
        u8::try_from(value).map_err(|_| ParseError::AddressTooLarge { pos: span.start })
    }

    /// The operation code of a `?N` token, masked to five bits like the
    /// interpreter's dispatch.
    fn raw_op_code(&self, span: &Range<usize>) -> Result<u8, ParseError> {
        let digits = &self.text(span)[1..];
        let code: u32 = digits
            .parse()
            .map_err(|_| ParseError::BadNumber { pos: span.start })?;
        Ok((code & 0x1F) as u8)
    }
}

fn parse_number(text: &str, span: &Range<usize>) -> Result<u16, ParseError> {
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };
    let value = u32::from_str_radix(digits, radix).map_err(|_| ParseError::BadNumber {
        pos: span.start,
    })?;
    u16::try_from(value).map_err(|_| ParseError::NumberTooLarge { pos: span.start })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_comparison() {
        let code = compile("byte[0x2A] == 0x50").unwrap();
        assert_eq!(code, [0x01, 0x2A, 0x00, 0x80, 0x50, 0xFF]);
    }

    #[test]
    fn decimal_and_hex_addresses_agree() {
        assert_eq!(compile("byte[42]").unwrap(), compile("byte[0x2A]").unwrap());
    }

    #[test]
    fn word_variable_and_wide_immediate() {
        let code = compile("word[0x10] != 0x1234").unwrap();
        assert_eq!(code, [0x00, 0x10, 0x03, 0x81, 0x34, 0x12, 0xFF]);
    }

    #[test]
    fn parenthesized_rhs_becomes_separator() {
        let code = compile("(byte[0x2A] >= 0x38) & (word[0x10] != 0x00)").unwrap();
        assert_eq!(
            code,
            [0x01, 0x2A, 0x05, 0x80, 0x38, 0x88, 0x00, 0x10, 0x03, 0x80, 0x00, 0xFF]
        );
    }

    #[test]
    fn chained_inline_run() {
        let code = compile("byte[0x2A] == 0x50 & word[0x10]").unwrap();
        assert_eq!(code, [0x01, 0x2A, 0x00, 0x80, 0x50, 0x08, 0x00, 0x10, 0xFF]);
    }

    #[test]
    fn raw_op_inline_and_separator() {
        assert_eq!(compile("0x01 ?16 0x02").unwrap(), [0x80, 0x01, 0x10, 0x80, 0x02, 0xFF]);
        assert_eq!(
            compile("0x01 ?16 (0x02)").unwrap(),
            [0x80, 0x01, 0x90, 0x80, 0x02, 0xFF]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let code = compile("byte[0x2A] == 0x50/*GameStage check*/").unwrap();
        assert_eq!(code, [0x01, 0x2A, 0x00, 0x80, 0x50, 0xFF]);
    }

    #[test]
    fn always_wide_policy_widens_immediates() {
        let code = compile_with_policy("byte[0x2A] == 0x50", &AlwaysWide).unwrap();
        assert_eq!(code, [0x01, 0x2A, 0x00, 0x81, 0x50, 0x00, 0xFF]);
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(compile("   "), Err(ParseError::Empty)));
    }

    #[test]
    fn error_positions_point_at_offender() {
        match compile("byte[0x2A] == $") {
            Err(ParseError::UnexpectedFragment { pos }) => assert_eq!(pos, 14),
            other => panic!("expected fragment error, got {:?}", other),
        }
        match compile("byte[0x2A] == 0x10000") {
            Err(ParseError::NumberTooLarge { pos }) => assert_eq!(pos, 14),
            other => panic!("expected overflow error, got {:?}", other),
        }
        match compile("byte[0x123]") {
            Err(ParseError::AddressTooLarge { pos }) => assert_eq!(pos, 0),
            other => panic!("expected address error, got {:?}", other),
        }
    }

    #[test]
    fn unbalanced_paren_rejected() {
        assert!(matches!(
            compile("(byte[0x2A] == 0x50"),
            Err(ParseError::UnbalancedParen { .. })
        ));
    }

    #[test]
    fn trailing_input_rejected() {
        assert!(matches!(
            compile("byte[0x2A] 0x50"),
            Err(ParseError::TrailingInput { .. })
        ));
    }
}
