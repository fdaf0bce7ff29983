//! svbore frontend - SystemVerilog subset lexer, parser, and elaborator
//!
//! This crate handles:
//! - Tokenizing SystemVerilog with byte-span fidelity
//! - Parsing the structural surface the XMR engine needs
//! - Elaborating the instance tree and resolving hierarchical names

pub mod ast;
pub mod design;
pub mod error;
pub mod lexer;
pub mod parse;
pub mod source;

// Re-export main types
pub use ast::{
    ArgDirection, HierRef, Instantiation, ModuleDecl, PortDecl, PortDirection, PortListShape,
    SignalDecl, SourceFile, SubroutineDecl,
};
pub use design::{Design, InstanceNode, PathStep, ResolvedRef};
pub use error::{FrontendError, Result};
pub use lexer::{Span, Tok, Token};
pub use parse::parse_file;
pub use source::{SourceLoader, SourceOptions};
