//! Script Parser (spec C6): turns source text into a `CodeBlock` tree for
//! the Executor (C7) to walk.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{CodeBlock, IfBranch, Statement};
pub use parser::{parse_line, parse_script, Parser};
