//! The expression vocabulary shared by the CONDIT decompiler and
//! recompiler, plus the evaluator.
//!
//! Decoded programs become a plain binary tree rather than re-running the
//! original accumulator-and-stack interpreter, so a decompiled condition is
//! an inspectable value instead of a side effect of execution order.

use std::fmt;

const TRUE: u16 = 0xFFFF;
const FALSE: u16 = 0x0000;

/// One operand of a condition: a game-state variable reference or an
/// immediate value.
///
/// `ByteVar`/`WordVar` address the interpreter's data segment; the width is
/// part of the reference, not of the variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRef {
    ByteVar(u8),
    WordVar(u8),
    Imm8(u8),
    Imm16(u16),
}

impl OperandRef {
    /// The operand's current 16-bit value under `vars`.
    pub fn value<V: VariableReader + ?Sized>(&self, vars: &V) -> u16 {
        match *self {
            Self::ByteVar(addr) => vars.read_byte(addr) as u16,
            Self::WordVar(addr) => vars.read_word(addr),
            Self::Imm8(val) => val as u16,
            Self::Imm16(val) => val,
        }
    }
}

impl fmt::Display for OperandRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::ByteVar(addr) => write!(f, "byte[{:#04X}]", addr),
            Self::WordVar(addr) => write!(f, "word[{:#04X}]", addr),
            Self::Imm8(val) => write!(f, "{:#04X}", val),
            Self::Imm16(val) => write!(f, "{:#06X}", val),
        }
    }
}

/// A binary operation of the condition VM.
///
/// The interpreter masks control bytes with `0x1F` and indexes a ten-entry
/// jump table; codes `0x0A..=0x1F` fall off the end and evaluate to zero.
/// Those reserved codes are modeled as [`Nop`](Operation::Nop) so printers
/// and evaluators have one uniform path, preserving the original engine's
/// tolerance of nonsensical-but-legal bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `==`, true is 0xFFFF
    Eq,
    /// `<`, unsigned
    Lt,
    /// `>`, unsigned
    Gt,
    /// `!=`
    Ne,
    /// `<=`, signed
    Le,
    /// `>=`, signed
    Ge,
    /// `+`, wrapping
    Add,
    /// `-`, wrapping
    Sub,
    /// `&`, bitwise
    And,
    /// `|`, bitwise
    Or,
    /// reserved code, always evaluates to 0, prints as `?<code>`
    Nop(u8),
}

impl Operation {
    /// Decode a control byte's low five bits into an operation.
    pub fn from_code(code: u8) -> Self {
        match code & 0x1F {
            0x00 => Self::Eq,
            0x01 => Self::Lt,
            0x02 => Self::Gt,
            0x03 => Self::Ne,
            0x04 => Self::Le,
            0x05 => Self::Ge,
            0x06 => Self::Add,
            0x07 => Self::Sub,
            0x08 => Self::And,
            0x09 => Self::Or,
            other => Self::Nop(other),
        }
    }

    /// The five-bit operation index this came from.
    pub fn code(self) -> u8 {
        match self {
            Self::Eq => 0x00,
            Self::Lt => 0x01,
            Self::Gt => 0x02,
            Self::Ne => 0x03,
            Self::Le => 0x04,
            Self::Ge => 0x05,
            Self::Add => 0x06,
            Self::Sub => 0x07,
            Self::And => 0x08,
            Self::Or => 0x09,
            Self::Nop(code) => code,
        }
    }

    /// Apply the operation to two evaluated operands.
    ///
    /// Comparisons yield `0xFFFF`/`0x0000`; `<`/`>` compare unsigned while
    /// `<=`/`>=` compare signed, matching the original interpreter.
    pub fn apply(self, lhs: u16, rhs: u16) -> u16 {
        let truth = |cond: bool| if cond { TRUE } else { FALSE };
        match self {
            Self::Eq => truth(lhs == rhs),
            Self::Lt => truth(lhs < rhs),
            Self::Gt => truth(lhs > rhs),
            Self::Ne => truth(lhs != rhs),
            Self::Le => truth((lhs as i16) <= (rhs as i16)),
            Self::Ge => truth((lhs as i16) >= (rhs as i16)),
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::And => lhs & rhs,
            Self::Or => lhs | rhs,
            Self::Nop(_) => 0,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Eq => f.write_str("=="),
            Self::Lt => f.write_str("<"),
            Self::Gt => f.write_str(">"),
            Self::Ne => f.write_str("!="),
            Self::Le => f.write_str("<="),
            Self::Ge => f.write_str(">="),
            Self::Add => f.write_str("+"),
            Self::Sub => f.write_str("-"),
            Self::And => f.write_str("&"),
            Self::Or => f.write_str("|"),
            Self::Nop(code) => write!(f, "?{}", code),
        }
    }
}

/// Game-state variables as seen by [`Expression::evaluate`].
///
/// Word reads are little endian in the original data segment; the blanket
/// slice impl follows that and treats out-of-range reads as zero.
pub trait VariableReader {
    fn read_byte(&self, addr: u8) -> u8;
    fn read_word(&self, addr: u8) -> u16;
}

impl VariableReader for [u8] {
    fn read_byte(&self, addr: u8) -> u8 {
        self.get(addr as usize).copied().unwrap_or(0)
    }

    fn read_word(&self, addr: u8) -> u16 {
        let lo = self.get(addr as usize).copied().unwrap_or(0);
        let hi = self.get(addr as usize + 1).copied().unwrap_or(0);
        u16::from_le_bytes([lo, hi])
    }
}

/// A decompiled condition.
///
/// Inline control bytes build left-nested chains; separator control bytes
/// produce right-nested composition when the terminator unwinds the
/// deferred stack. The `Display` form mirrors that structure: inline runs
/// print flat, deferred composition prints both sides parenthesized.
/// Grouping therefore reflects the VM's evaluation order, *not* ordinary
/// infix precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Leaf(OperandRef),
    BinOp(Box<Expression>, Operation, Box<Expression>),
}

impl Expression {
    pub(crate) fn bin(lhs: Expression, op: Operation, rhs: Expression) -> Self {
        Self::BinOp(Box::new(lhs), op, Box::new(rhs))
    }

    /// Evaluate the tree to a raw 16-bit result under `vars`.
    pub fn evaluate<V: VariableReader + ?Sized>(&self, vars: &V) -> u16 {
        match self {
            Self::Leaf(operand) => operand.value(vars),
            Self::BinOp(lhs, op, rhs) => op.apply(lhs.evaluate(vars), rhs.evaluate(vars)),
        }
    }

    /// A whole condition is true iff its root evaluates non-zero.
    pub fn is_true<V: VariableReader + ?Sized>(&self, vars: &V) -> bool {
        self.evaluate(vars) != 0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Leaf(operand) => operand.fmt(f),
            Self::BinOp(lhs, op, rhs) => {
                if matches!(**rhs, Self::BinOp(..)) {
                    write!(f, "({}) {} ({})", lhs, op, rhs)
                } else {
                    write!(f, "{} {} {}", lhs, op, rhs)
                }
            }
        }
    }
}
