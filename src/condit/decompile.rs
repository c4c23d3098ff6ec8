//! CONDIT bytecode to [`Expression`] trees.
//!
//! A program is one operand followed by control bytes. The interpreter
//! keeps an accumulator: control bytes below `0x80` fold the next operand
//! in immediately, bytes `0x80..=0xFE` push the accumulator and a deferred
//! operation onto a stack and start a fresh sub-expression, and `0xFF`
//! unwinds the stack in LIFO order. The unwind yields right-nested
//! composition: the innermost (most recently pushed) entry combines with
//! the final accumulator first.

use smallvec::SmallVec;

use super::expr::{Expression, Operation, OperandRef};
use crate::errors::DecodeError;

/// Control byte terminating a program.
pub(crate) const TERMINATOR: u8 = 0xFF;

/// Decode the program starting at `start`, returning its expression tree
/// and the offset one past the terminator.
pub fn decode(data: &[u8], start: usize) -> Result<(Expression, usize), DecodeError> {
    let mut pos = start;
    let mut acc = Expression::Leaf(read_operand(data, &mut pos, start)?);
    let mut stack: SmallVec<[(Expression, Operation); 8]> = SmallVec::new();

    loop {
        let ctrl = next_byte(data, &mut pos, start)?;
        match ctrl {
            TERMINATOR => break,
            inline if inline < 0x80 => {
                let op = Operation::from_code(inline);
                let rhs = read_operand(data, &mut pos, start)?;
                acc = Expression::bin(acc, op, Expression::Leaf(rhs));
            }
            separator => {
                let op = Operation::from_code(separator);
                let fresh = Expression::Leaf(read_operand(data, &mut pos, start)?);
                stack.push((std::mem::replace(&mut acc, fresh), op));
            }
        }
    }

    while let Some((saved, op)) = stack.pop() {
        acc = Expression::bin(saved, op, acc);
    }

    Ok((acc, pos))
}

/// Walk the program starting at `start` without building a tree, returning
/// only the offset one past the terminator. Chain derivation uses this to
/// find where entries converge.
pub fn walk(data: &[u8], start: usize) -> Result<usize, DecodeError> {
    let mut pos = start;
    skip_operand(data, &mut pos, start)?;
    loop {
        match next_byte(data, &mut pos, start)? {
            TERMINATOR => return Ok(pos),
            _ => skip_operand(data, &mut pos, start)?,
        }
    }
}

fn next_byte(data: &[u8], pos: &mut usize, start: usize) -> Result<u8, DecodeError> {
    let byte = *data.get(*pos).ok_or(DecodeError::Unterminated {
        start,
        offset: *pos,
    })?;
    *pos += 1;
    Ok(byte)
}

/// Read one operand at `pos`.
///
/// Tag `0x01` is a byte variable, any other tag below `0x80` a word
/// variable, `0x80` an immediate byte, and `0x81..=0xFF` an immediate
/// little-endian word. Beyond selecting those four ranges the tag value
/// carries no meaning.
fn read_operand(data: &[u8], pos: &mut usize, start: usize) -> Result<OperandRef, DecodeError> {
    let tag = next_byte(data, pos, start)?;
    Ok(match tag {
        0x01 => OperandRef::ByteVar(next_byte(data, pos, start)?),
        0x00..=0x7F => OperandRef::WordVar(next_byte(data, pos, start)?),
        0x80 => OperandRef::Imm8(next_byte(data, pos, start)?),
        _ => {
            let lo = next_byte(data, pos, start)?;
            let hi = next_byte(data, pos, start)?;
            OperandRef::Imm16(u16::from_le_bytes([lo, hi]))
        }
    })
}

fn skip_operand(data: &[u8], pos: &mut usize, start: usize) -> Result<(), DecodeError> {
    let tag = next_byte(data, pos, start)?;
    let extra = if tag > 0x80 { 2 } else { 1 };
    for _ in 0..extra {
        next_byte(data, pos, start)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_operand_program() {
        let (expr, end) = decode(&[0x01, 0xFC, 0xFF], 0).unwrap();
        assert_eq!(expr, Expression::Leaf(OperandRef::ByteVar(0xFC)));
        assert_eq!(end, 3);
    }

    #[test]
    fn inline_run_is_left_nested() {
        // word[0x2A] == 0x50 & 0x01
        let code = [0x00, 0x2A, 0x00, 0x80, 0x50, 0x08, 0x80, 0x01, 0xFF];
        let (expr, end) = decode(&code, 0).unwrap();
        assert_eq!(end, code.len());
        assert_eq!(
            expr,
            Expression::bin(
                Expression::bin(
                    Expression::Leaf(OperandRef::WordVar(0x2A)),
                    Operation::Eq,
                    Expression::Leaf(OperandRef::Imm8(0x50)),
                ),
                Operation::And,
                Expression::Leaf(OperandRef::Imm8(0x01)),
            )
        );
    }

    #[test]
    fn separator_composes_right_nested() {
        // word[0x08] | (byte[0xFC] != 0x00)
        let code = [0x00, 0x08, 0xA9, 0x01, 0xFC, 0x03, 0x80, 0x00, 0xFF];
        let (expr, _) = decode(&code, 0).unwrap();
        assert_eq!(
            expr,
            Expression::bin(
                Expression::Leaf(OperandRef::WordVar(0x08)),
                Operation::Or,
                Expression::bin(
                    Expression::Leaf(OperandRef::ByteVar(0xFC)),
                    Operation::Ne,
                    Expression::Leaf(OperandRef::Imm8(0x00)),
                ),
            )
        );
    }

    #[test]
    fn stack_unwinds_innermost_first() {
        // a SEP1 b SEP2 c FF  =>  a op1 (b op2 c)
        let code = [0x80, 0x01, 0x86, 0x80, 0x02, 0x87, 0x80, 0x03, 0xFF];
        let (expr, _) = decode(&code, 0).unwrap();
        assert_eq!(
            expr,
            Expression::bin(
                Expression::Leaf(OperandRef::Imm8(1)),
                Operation::Add,
                Expression::bin(
                    Expression::Leaf(OperandRef::Imm8(2)),
                    Operation::Sub,
                    Expression::Leaf(OperandRef::Imm8(3)),
                ),
            )
        );
    }

    #[test]
    fn imm16_operand() {
        let (expr, _) = decode(&[0x81, 0x34, 0x12, 0xFF], 0).unwrap();
        assert_eq!(expr, Expression::Leaf(OperandRef::Imm16(0x1234)));
    }

    #[test]
    fn unterminated_program_errors() {
        let err = decode(&[0x01, 0xFC, 0x00, 0x80], 0).unwrap_err();
        assert!(matches!(err, DecodeError::Unterminated { start: 0, .. }));
    }

    #[test]
    fn walk_matches_decode_end() {
        let code = [0x00, 0x08, 0xA9, 0x01, 0xFC, 0x03, 0x80, 0x00, 0xFF];
        let (_, end) = decode(&code, 0).unwrap();
        assert_eq!(walk(&code, 0).unwrap(), end);
    }

    #[test]
    fn walk_from_mid_program_entry_point() {
        // entering after the first clause skips it but converges on the
        // same terminator
        let code = [0x00, 0x08, 0xA9, 0x01, 0xFC, 0x03, 0x80, 0x00, 0xFF];
        assert_eq!(walk(&code, 3).unwrap(), code.len());
    }
}
