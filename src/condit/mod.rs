//! The CONDIT condition system: a stack-based expression bytecode gating
//! story and dialogue triggers on game-state variables.
//!
//! A CONDIT resource (decompressed with [`crate::decompress`]) is an offset
//! table followed by a bytecode area; see [`ConditTable`] for the layout
//! and the shared-tail [`Chain`] structure. Individual programs decompile
//! to [`Expression`] trees with [`decode`], evaluate against any
//! [`VariableReader`], print in a stable textual syntax, and recompile from
//! that syntax with [`compile`].
//!
//! Recompilation is semantics-preserving, not byte-preserving: operand
//! width choices the original authoring tools made inconsistently are
//! resolved by an [`OperandPolicy`]. Note too that printed grouping
//! reflects the VM's deferred-stack evaluation order, not ordinary infix
//! precedence.
//! ```
//! use hsq::condit;
//!
//! let bytecode = [0x01, 0x2A, 0x00, 0x80, 0x50, 0xFF];
//! let (expr, end) = condit::decode(&bytecode, 0).unwrap();
//! assert_eq!(end, bytecode.len());
//! assert_eq!(expr.to_string(), "byte[0x2A] == 0x50");
//! assert_eq!(condit::compile(&expr.to_string()).unwrap(), bytecode);
//! ```

mod compile;
mod decompile;
mod expr;
mod table;

pub use self::compile::{
    compile, compile_with_policy, AlwaysWide, ImmWidth, NarrowestFit, OperandPolicy,
};
pub use self::decompile::{decode, walk};
pub use self::expr::{Expression, Operation, OperandRef, VariableReader};
pub use self::table::{Chain, ConditEntry, ConditTable};
