//! Lexer, grammar, and the construct tree.

pub mod ast;
mod grammar;
mod include;
mod lexer;

#[cfg(test)]
mod lexer_tests;

pub use grammar::{ParseSession, parse};
pub use include::{FsResolver, IncludeError, IncludeResolver, NoIncludes, StaticResolver};
pub use lexer::{Token, include_path, lex};
