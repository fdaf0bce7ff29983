//! Syntax surface for the engine
//!
//! This is not a full SystemVerilog AST. It records exactly what the
//! XMR engine needs from each module: the header shape (so ports can be
//! injected), declarations with widths, instantiations with their
//! connection-list spans, subroutine signatures, and every dotted-name
//! occurrence with its byte span and read/write classification. Everything
//! else in the source is trivia to the engine and survives rewriting
//! untouched.

use crate::lexer::Span;

/// One parsed source file
#[derive(Debug)]
pub struct SourceFile {
    /// Path the file was loaded from (verbatim, used in output markers)
    pub path: String,
    /// Full original text; all spans index into this
    pub text: String,
    pub modules: Vec<ModuleDecl>,
    /// Files requested by `include directives
    pub includes: Vec<String>,
}

/// Shape of a module's port list, as it appears in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortListShape {
    /// Directioned ports inline in the header: `module m(input wire a);`
    Ansi { close_paren: usize, count: usize },
    /// Names only in the header, declarations in the body
    NonAnsi { close_paren: usize, count: usize },
    /// No port list at all: `module m;`
    None {
        /// Offset right after the module name (and parameter list, if any),
        /// where a port list can be introduced
        insert_at: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

/// A declared port (from an ANSI header or a body direction declaration)
#[derive(Debug, Clone)]
pub struct PortDecl {
    pub name: String,
    pub direction: PortDirection,
    pub width: u32,
}

/// A net or variable declaration
#[derive(Debug, Clone)]
pub struct SignalDecl {
    pub name: String,
    pub width: u32,
}

/// A module instantiation: `child u_child ( ... );`
#[derive(Debug, Clone)]
pub struct Instantiation {
    pub module_name: String,
    pub instance_name: String,
    /// Offset of the `)` closing the connection list
    pub conn_close_paren: usize,
    /// Number of existing connections (named or positional)
    pub connection_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDirection {
    Input,
    Output,
    InOut,
}

/// A subroutine formal argument
#[derive(Debug, Clone)]
pub struct FormalArg {
    pub name: String,
    pub direction: ArgDirection,
}

/// A subroutine visible in a module scope: a DPI import or a local
/// function/task definition. Only the signature matters to the engine.
#[derive(Debug, Clone)]
pub struct SubroutineDecl {
    pub name: String,
    pub args: Vec<FormalArg>,
    pub is_dpi: bool,
}

/// One dotted-name occurrence inside a module body
///
/// `text` is the exact source slice of the reference, selects included,
/// e.g. `u_sub.arr[3]`. It doubles as the lookup key for replacement.
#[derive(Debug, Clone)]
pub struct HierRef {
    pub span: Span,
    pub text: String,
    /// True when the occurrence is the target of an assignment or is bound
    /// to an `output`/`inout` subroutine formal
    pub is_write: bool,
}

/// A call site recorded during scanning; resolved against the module's
/// subroutine table after the module is fully parsed
#[derive(Debug, Clone)]
pub struct CallSite {
    pub callee: String,
    /// Span of each top-level argument item
    pub args: Vec<Span>,
}

/// A parsed module declaration
#[derive(Debug)]
pub struct ModuleDecl {
    pub name: String,
    pub port_list: PortListShape,
    /// Offset right after the header's terminating `;`, the front of the
    /// member list for inserted declarations
    pub header_end: usize,
    /// Offset of the `endmodule` keyword
    pub endmodule_at: usize,
    pub ports: Vec<PortDecl>,
    pub signals: Vec<SignalDecl>,
    pub instances: Vec<Instantiation>,
    pub subroutines: Vec<SubroutineDecl>,
    pub occurrences: Vec<HierRef>,
}

impl ModuleDecl {
    /// Declared width of a named signal or port, if present
    pub fn signal_width(&self, name: &str) -> Option<u32> {
        self.signals
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.width)
            .or_else(|| self.ports.iter().find(|p| p.name == name).map(|p| p.width))
    }

    /// Whether the module declares `name` as a port, net, or variable
    pub fn has_signal(&self, name: &str) -> bool {
        self.signal_width(name).is_some()
    }

    /// Instantiated module-definition name for a child instance name
    pub fn instance_module(&self, instance_name: &str) -> Option<&str> {
        self.instances
            .iter()
            .find(|i| i.instance_name == instance_name)
            .map(|i| i.module_name.as_str())
    }

    pub fn subroutine(&self, name: &str) -> Option<&SubroutineDecl> {
        self.subroutines.iter().find(|s| s.name == name)
    }
}
