//! Module-level SystemVerilog parser
//!
//! Recognizes the structural items the engine needs (headers, declarations,
//! instantiations, subroutine signatures) and scans everything else as
//! balanced token runs. A flat scan over each module's token range collects
//! dotted-name occurrences and call sites; read/write classification happens
//! once the module's subroutine table is complete.
//!
//! The parser is lenient about unknown constructs, which flow through
//! token-by-token, and most malformed input degrades to fewer recognized
//! items rather than a hard failure, mirroring how the engine treats
//! anything it does not understand as trivia. A module header it cannot
//! anchor at all (no name, or an unterminated parameter/port list) is a
//! hard parse error: every later edit offset would be wrong.

use crate::ast::{
    ArgDirection, CallSite, FormalArg, HierRef, Instantiation, ModuleDecl, PortDecl,
    PortDirection, PortListShape, SignalDecl, SourceFile, SubroutineDecl,
};
use crate::error::{line_of, FrontendError, Result};
use crate::lexer::{lex, Span, Tok, Token};
use indexmap::IndexSet;

/// Parse one source file into its module declarations.
///
/// `defines` carries the preprocessor define set across files of a run.
pub fn parse_file(path: &str, text: String, defines: &mut IndexSet<String>) -> Result<SourceFile> {
    let stream = lex(&text, defines);
    let mut parser = Parser {
        src: &text,
        path,
        toks: &stream.tokens,
        pos: 0,
    };

    let mut modules = Vec::new();
    while !parser.eof() {
        if matches!(parser.kind(), Tok::Module | Tok::Macromodule) {
            modules.push(parser.parse_module()?);
        } else {
            parser.bump();
        }
    }

    Ok(SourceFile {
        path: path.to_string(),
        text,
        modules,
        includes: stream.includes,
    })
}

struct Parser<'a> {
    src: &'a str,
    path: &'a str,
    toks: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn eof(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn kind(&self) -> Tok {
        self.kind_at(self.pos)
    }

    fn kind_at(&self, i: usize) -> Tok {
        // Op is a safe "nothing interesting" default past the end
        self.toks.get(i).map(|t| t.kind).unwrap_or(Tok::Op)
    }

    fn span_at(&self, i: usize) -> Span {
        self.toks
            .get(i)
            .map(|t| t.span.clone())
            .unwrap_or(self.src.len()..self.src.len())
    }

    fn text_at(&self, i: usize) -> &'a str {
        &self.src[self.span_at(i)]
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn error_at(&self, offset: usize, message: &str) -> FrontendError {
        FrontendError::Parse {
            path: self.path.to_string(),
            line: line_of(self.src, offset),
            message: message.to_string(),
        }
    }

    /// Token index of the matching closer for the opener at `open`
    fn match_delim(&self, open: usize, open_kind: Tok, close_kind: Tok) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = open;
        while i < self.toks.len() {
            let k = self.kind_at(i);
            if k == open_kind {
                depth += 1;
            } else if k == close_kind {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            i += 1;
        }
        None
    }

    fn skip_to_semi(&mut self) {
        let mut depth = 0i32;
        while !self.eof() {
            match self.kind() {
                Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
                Tok::RParen | Tok::RBracket | Tok::RBrace => depth -= 1,
                Tok::Semi if depth <= 0 => {
                    self.bump();
                    return;
                }
                Tok::Endmodule => return,
                _ => {}
            }
            self.bump();
        }
    }

    //==========================================================================
    // Modules
    //==========================================================================

    fn parse_module(&mut self) -> Result<ModuleDecl> {
        let start_tok = self.pos;
        let kw_at = self.span_at(self.pos).start;
        self.bump(); // module / macromodule

        if self.kind() != Tok::Ident {
            return Err(self.error_at(kw_at, "expected a module name"));
        }
        let name = self.text_at(self.pos).to_string();
        let name_end = self.span_at(self.pos).end;
        self.bump();

        let mut insert_at = name_end;

        // Parameter port list: #( ... )
        if self.kind() == Tok::Hash && self.kind_at(self.pos + 1) == Tok::LParen {
            match self.match_delim(self.pos + 1, Tok::LParen, Tok::RParen) {
                Some(rp) => {
                    insert_at = self.span_at(rp).end;
                    self.pos = rp + 1;
                }
                None => {
                    return Err(self.error_at(
                        self.span_at(self.pos + 1).start,
                        &format!("unterminated parameter list in module '{}'", name),
                    ));
                }
            }
        }

        let mut ports = Vec::new();
        let mut signals = Vec::new();

        let port_list = if self.kind() == Tok::LParen {
            let lp = self.pos;
            match self.match_delim(lp, Tok::LParen, Tok::RParen) {
                Some(rp) => {
                    let shape = self.classify_port_list(lp, rp, &mut ports, &mut signals);
                    self.pos = rp + 1;
                    shape
                }
                None => {
                    return Err(self.error_at(
                        self.span_at(lp).start,
                        &format!("unterminated port list in module '{}'", name),
                    ));
                }
            }
        } else {
            PortListShape::None { insert_at }
        };

        let header_end = if self.kind() == Tok::Semi {
            let e = self.span_at(self.pos).end;
            self.bump();
            e
        } else {
            self.span_at(self.pos).start
        };

        let mut instances = Vec::new();
        let mut subroutines = Vec::new();
        let mut endmodule_at = self.src.len();

        while !self.eof() {
            match self.kind() {
                Tok::Endmodule => {
                    endmodule_at = self.span_at(self.pos).start;
                    self.bump();
                    break;
                }
                Tok::Input | Tok::Output | Tok::Inout => {
                    self.parse_direction_decl(&mut ports, &mut signals);
                }
                Tok::Wire | Tok::Reg | Tok::Logic | Tok::Bit | Tok::Integer | Tok::Int => {
                    self.parse_signal_decl(&mut signals);
                }
                Tok::Import => {
                    self.parse_import(&mut subroutines);
                }
                Tok::Function => {
                    self.parse_subroutine(Tok::Endfunction, &mut subroutines);
                }
                Tok::Task => {
                    self.parse_subroutine(Tok::Endtask, &mut subroutines);
                }
                Tok::Ident if self.at_instantiation() => {
                    self.parse_instantiation(&mut instances);
                }
                _ => self.bump(),
            }
        }

        let end_tok = self.pos;
        let (mut occurrences, calls) = scan_occurrences(self.src, &self.toks[start_tok..end_tok]);

        let decl = ModuleDecl {
            name,
            port_list,
            header_end,
            endmodule_at,
            ports,
            signals,
            instances,
            subroutines,
            occurrences: Vec::new(),
        };
        classify_writes(self.src, &decl, &calls, &mut occurrences);

        Ok(ModuleDecl {
            occurrences,
            ..decl
        })
    }

    /// Decide ANSI vs non-ANSI and, for ANSI, parse the port declarations
    fn classify_port_list(
        &self,
        lp: usize,
        rp: usize,
        ports: &mut Vec<PortDecl>,
        signals: &mut Vec<SignalDecl>,
    ) -> PortListShape {
        let close_paren = self.span_at(rp).start;
        let inner = &self.toks[lp + 1..rp];
        if inner.is_empty() {
            return PortListShape::Ansi {
                close_paren,
                count: 0,
            };
        }

        let is_ansi = inner.iter().any(|t| {
            matches!(
                t.kind,
                Tok::Input
                    | Tok::Output
                    | Tok::Inout
                    | Tok::Wire
                    | Tok::Reg
                    | Tok::Logic
                    | Tok::Bit
                    | Tok::Integer
                    | Tok::Int
            )
        });

        let items = split_top_level(inner);
        if !is_ansi {
            return PortListShape::NonAnsi {
                close_paren,
                count: items.len(),
            };
        }

        let mut dir = PortDirection::Input;
        let mut width = 1u32;
        for item in items {
            if item.is_empty() {
                continue;
            }
            if let Some(d) = direction_of(item[0].kind) {
                dir = d;
                // An explicit direction resets inherited packed range
                width = 1;
            }
            // Name is the last identifier of the item; a leading range (if
            // any) before the name carries the packed width.
            let name_idx = item.iter().rposition(|t| t.kind == Tok::Ident);
            let Some(name_idx) = name_idx else { continue };
            if let Some(w) = packed_width(self.src, &item[..name_idx]) {
                width = w;
            }
            let name = (&self.src[item[name_idx].span.clone()]).to_string();
            ports.push(PortDecl {
                name: name.clone(),
                direction: dir,
                width,
            });
            signals.push(SignalDecl { name, width });
        }

        PortListShape::Ansi {
            close_paren,
            count: ports.len(),
        }
    }

    /// Non-ANSI port declaration in the body: `input [3:0] a, b;`
    fn parse_direction_decl(&mut self, ports: &mut Vec<PortDecl>, signals: &mut Vec<SignalDecl>) {
        let dir = direction_of(self.kind()).unwrap_or(PortDirection::Input);
        self.bump();
        let width = self.parse_decl_prefix();
        for name in self.parse_decl_names() {
            ports.push(PortDecl {
                name: name.clone(),
                direction: dir,
                width,
            });
            signals.push(SignalDecl { name, width });
        }
    }

    /// Net or variable declaration: `wire [7:0] a = expr, b;`
    fn parse_signal_decl(&mut self, signals: &mut Vec<SignalDecl>) {
        let kind = self.kind();
        self.bump();
        let width = if matches!(kind, Tok::Integer | Tok::Int) {
            // Skip qualifiers that may trail the keyword
            while matches!(self.kind(), Tok::Signed | Tok::Unsigned) {
                self.bump();
            }
            32
        } else {
            self.parse_decl_prefix()
        };
        for name in self.parse_decl_names() {
            signals.push(SignalDecl { name, width });
        }
    }

    /// Consume qualifiers and an optional packed range, returning the width
    fn parse_decl_prefix(&mut self) -> u32 {
        while matches!(
            self.kind(),
            Tok::Wire | Tok::Reg | Tok::Logic | Tok::Bit | Tok::Signed | Tok::Unsigned
        ) {
            self.bump();
        }
        if self.kind() == Tok::LBracket {
            if let Some(rb) = self.match_delim(self.pos, Tok::LBracket, Tok::RBracket) {
                let w = packed_width(self.src, &self.toks[self.pos..=rb]);
                self.pos = rb + 1;
                return w.unwrap_or(1);
            }
        }
        1
    }

    /// Parse `a, b [0:3], c = expr ;` returning the declared names
    fn parse_decl_names(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        loop {
            if self.kind() != Tok::Ident {
                self.skip_to_semi();
                return names;
            }
            names.push(self.text_at(self.pos).to_string());
            self.bump();
            // Unpacked dimensions
            while self.kind() == Tok::LBracket {
                match self.match_delim(self.pos, Tok::LBracket, Tok::RBracket) {
                    Some(rb) => self.pos = rb + 1,
                    None => break,
                }
            }
            // Initializer: consume to the next top-level comma or semicolon
            if self.kind() == Tok::Eq {
                let mut depth = 0i32;
                while !self.eof() {
                    match self.kind() {
                        Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
                        Tok::RParen | Tok::RBracket | Tok::RBrace => depth -= 1,
                        Tok::Comma | Tok::Semi if depth <= 0 => break,
                        Tok::Endmodule => return names,
                        _ => {}
                    }
                    self.bump();
                }
            }
            match self.kind() {
                Tok::Comma => self.bump(),
                Tok::Semi => {
                    self.bump();
                    return names;
                }
                _ => {
                    self.skip_to_semi();
                    return names;
                }
            }
        }
    }

    //==========================================================================
    // Instantiations
    //==========================================================================

    fn at_instantiation(&self) -> bool {
        debug_assert_eq!(self.kind(), Tok::Ident);
        let mut j = self.pos + 1;
        if self.kind_at(j) == Tok::Hash && self.kind_at(j + 1) == Tok::LParen {
            match self.match_delim(j + 1, Tok::LParen, Tok::RParen) {
                Some(rp) => j = rp + 1,
                None => return false,
            }
        }
        self.kind_at(j) == Tok::Ident && self.kind_at(j + 1) == Tok::LParen
    }

    fn parse_instantiation(&mut self, instances: &mut Vec<Instantiation>) {
        let module_name = self.text_at(self.pos).to_string();
        self.bump();
        if self.kind() == Tok::Hash && self.kind_at(self.pos + 1) == Tok::LParen {
            if let Some(rp) = self.match_delim(self.pos + 1, Tok::LParen, Tok::RParen) {
                self.pos = rp + 1;
            }
        }
        // One or more instances share the declaration: `m a(...), b(...);`
        loop {
            if self.kind() != Tok::Ident || self.kind_at(self.pos + 1) != Tok::LParen {
                break;
            }
            let instance_name = self.text_at(self.pos).to_string();
            let lp = self.pos + 1;
            let Some(rp) = self.match_delim(lp, Tok::LParen, Tok::RParen) else {
                break;
            };
            let inner = &self.toks[lp + 1..rp];
            let connection_count = if inner.is_empty() {
                0
            } else {
                split_top_level(inner).len()
            };
            instances.push(Instantiation {
                module_name: module_name.clone(),
                instance_name,
                conn_close_paren: self.span_at(rp).start,
                connection_count,
            });
            self.pos = rp + 1;
            if self.kind() == Tok::Comma {
                self.bump();
            } else {
                break;
            }
        }
        if self.kind() == Tok::Semi {
            self.bump();
        }
    }

    //==========================================================================
    // Subroutines
    //==========================================================================

    /// `import "DPI-C" [context|pure] function|task ... name(args);`
    ///
    /// Package imports (`import pkg::*;`) are skipped.
    fn parse_import(&mut self, subroutines: &mut Vec<SubroutineDecl>) {
        self.bump(); // import
        if self.kind() != Tok::Str {
            self.skip_to_semi();
            return;
        }
        self.bump(); // "DPI-C"
        while matches!(self.kind(), Tok::Context | Tok::Pure) {
            self.bump();
        }
        if let Some(mut decl) = self.parse_subroutine_header() {
            decl.is_dpi = true;
            subroutines.push(decl);
        }
        self.skip_to_semi();
    }

    /// Module-level function or task definition; only the signature is kept
    fn parse_subroutine(&mut self, end_kw: Tok, subroutines: &mut Vec<SubroutineDecl>) {
        if let Some(decl) = self.parse_subroutine_header() {
            subroutines.push(decl);
        }
        // Skip the body; the flat occurrence scan still covers it
        while !self.eof() && self.kind() != end_kw && self.kind() != Tok::Endmodule {
            self.bump();
        }
        if self.kind() == end_kw {
            self.bump();
        }
    }

    /// Shared header parse for imports and definitions. Consumes
    /// `function|task [automatic] <ret-type> name [(formals)]` up to (and
    /// including) the formal list, leaving the cursor after the `)` or the
    /// name.
    fn parse_subroutine_header(&mut self) -> Option<SubroutineDecl> {
        if !matches!(self.kind(), Tok::Function | Tok::Task) {
            return None;
        }
        self.bump();
        if self.kind() == Tok::Automatic {
            self.bump();
        }
        // Scan forward to the formal list or declaration end; the name is
        // the last identifier before it.
        let mut name_idx = None;
        while !self.eof() {
            match self.kind() {
                Tok::Ident => {
                    name_idx = Some(self.pos);
                    self.bump();
                }
                Tok::LParen | Tok::Semi | Tok::Endmodule => break,
                Tok::LBracket => match self.match_delim(self.pos, Tok::LBracket, Tok::RBracket) {
                    Some(rb) => self.pos = rb + 1,
                    None => break,
                },
                _ => self.bump(),
            }
        }
        let name = self.text_at(name_idx?).to_string();

        let mut args = Vec::new();
        if self.kind() == Tok::LParen {
            if let Some(rp) = self.match_delim(self.pos, Tok::LParen, Tok::RParen) {
                let inner = &self.toks[self.pos + 1..rp];
                let mut dir = ArgDirection::Input;
                for item in split_top_level(inner) {
                    if item.is_empty() {
                        continue;
                    }
                    match item[0].kind {
                        Tok::Input => dir = ArgDirection::Input,
                        Tok::Output => dir = ArgDirection::Output,
                        Tok::Inout => dir = ArgDirection::InOut,
                        _ => {}
                    }
                    if let Some(t) = item.iter().rev().find(|t| t.kind == Tok::Ident) {
                        args.push(FormalArg {
                            name: self.src[t.span.clone()].to_string(),
                            direction: dir,
                        });
                    }
                }
                self.pos = rp + 1;
            }
        }

        Some(SubroutineDecl {
            name,
            args,
            is_dpi: false,
        })
    }
}

fn direction_of(kind: Tok) -> Option<PortDirection> {
    match kind {
        Tok::Input => Some(PortDirection::Input),
        Tok::Output => Some(PortDirection::Output),
        Tok::Inout => Some(PortDirection::Inout),
        _ => None,
    }
}

/// Split a token run on top-level commas
fn split_top_level<'t>(toks: &'t [Token]) -> Vec<&'t [Token]> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, t) in toks.iter().enumerate() {
        match t.kind {
            Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => depth -= 1,
            Tok::Comma if depth == 0 => {
                items.push(&toks[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&toks[start..]);
    items
}

/// Width of the first packed range `[msb:lsb]` found in a token run, when
/// both bounds are integer literals
fn packed_width(src: &str, toks: &[Token]) -> Option<u32> {
    let lb = toks.iter().position(|t| t.kind == Tok::LBracket)?;
    let msb = toks.get(lb + 1)?;
    let colon = toks.get(lb + 2)?;
    let lsb = toks.get(lb + 3)?;
    let rb = toks.get(lb + 4)?;
    if msb.kind != Tok::Number
        || colon.kind != Tok::Colon
        || lsb.kind != Tok::Number
        || rb.kind != Tok::RBracket
    {
        return None;
    }
    let parse = |t: &Token| src[t.span.clone()].replace('_', "").parse::<i64>().ok();
    let msb = parse(msb)?;
    let lsb = parse(lsb)?;
    Some(((msb - lsb).unsigned_abs() as u32) + 1)
}

//==============================================================================
// Flat occurrence scan
//==============================================================================

/// Collect dotted-name occurrences and call sites over one module's tokens
fn scan_occurrences(src: &str, toks: &[Token]) -> (Vec<HierRef>, Vec<CallSite>) {
    let mut occurrences = Vec::new();
    let mut calls = Vec::new();
    let mut i = 0usize;
    while i < toks.len() {
        if toks[i].kind != Tok::Ident {
            i += 1;
            continue;
        }

        // Call site probe (non-consuming): `name ( ... )`
        if toks.get(i + 1).map(|t| t.kind) == Some(Tok::LParen) {
            if let Some(rp) = match_bracket(toks, i + 1, Tok::LParen, Tok::RParen) {
                let inner = &toks[i + 2..rp];
                let args = if inner.is_empty() {
                    Vec::new()
                } else {
                    split_top_level(inner)
                        .into_iter()
                        .filter(|item| !item.is_empty())
                        .map(|item| {
                            item.first().unwrap().span.start..item.last().unwrap().span.end
                        })
                        .collect()
                };
                calls.push(CallSite {
                    callee: src[toks[i].span.clone()].to_string(),
                    args,
                });
            }
        }

        // Dotted-name probe: ident select* (. ident select*)+
        if let Some(end) = try_occurrence(toks, i) {
            let span = toks[i].span.start..toks[end].span.end;
            let prev = i.checked_sub(1).map(|p| toks[p].kind);
            let next = toks.get(end + 1).map(|t| t.kind);
            let is_write = matches!(next, Some(Tok::Eq) | Some(Tok::Le))
                && matches!(
                    prev,
                    None | Some(Tok::Semi)
                        | Some(Tok::Begin)
                        | Some(Tok::End)
                        | Some(Tok::Else)
                        | Some(Tok::RParen)
                        | Some(Tok::Colon)
                        | Some(Tok::Assign)
                );
            occurrences.push(HierRef {
                text: src[span.clone()].to_string(),
                span,
                is_write,
            });
            i = end + 1;
        } else {
            i += 1;
        }
    }
    (occurrences, calls)
}

/// If `i` starts a dotted name, return the index of its last token
fn try_occurrence(toks: &[Token], i: usize) -> Option<usize> {
    let mut end = i;
    let mut dots = 0usize;
    loop {
        // Selects after the current identifier
        let mut k = end + 1;
        let mut sel_end = end;
        while toks.get(k).map(|t| t.kind) == Some(Tok::LBracket) {
            let rb = match_bracket(toks, k, Tok::LBracket, Tok::RBracket)?;
            sel_end = rb;
            k = rb + 1;
        }
        if toks.get(k).map(|t| t.kind) == Some(Tok::Dot)
            && toks.get(k + 1).map(|t| t.kind) == Some(Tok::Ident)
        {
            end = k + 1;
            dots += 1;
        } else {
            if dots > 0 {
                // Trailing selects belong to the reference
                end = sel_end;
            }
            break;
        }
    }
    if dots > 0 {
        Some(end)
    } else {
        None
    }
}

fn match_bracket(toks: &[Token], open: usize, open_kind: Tok, close_kind: Tok) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < toks.len() {
        if toks[i].kind == open_kind {
            depth += 1;
        } else if toks[i].kind == close_kind {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Mark occurrences bound to `output`/`inout` subroutine formals as writes
fn classify_writes(
    src: &str,
    module: &ModuleDecl,
    calls: &[CallSite],
    occurrences: &mut [HierRef],
) {
    for call in calls {
        let Some(sub) = module.subroutine(&call.callee) else {
            continue;
        };
        for (pos, arg_span) in call.args.iter().enumerate() {
            let Some(formal) = sub.args.get(pos) else {
                break;
            };
            if !matches!(formal.direction, ArgDirection::Output | ArgDirection::InOut) {
                continue;
            }
            let arg_text = src[arg_span.clone()].trim();
            for occ in occurrences.iter_mut() {
                if occ.span.start >= arg_span.start
                    && occ.span.end <= arg_span.end
                    && occ.text == arg_text
                {
                    occ.is_write = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SourceFile {
        let mut defines = IndexSet::new();
        parse_file("test.sv", src.to_string(), &mut defines).unwrap()
    }

    #[test]
    fn parses_ansi_header() {
        let file = parse("module top(input wire clk, output reg [7:0] q);\nendmodule\n");
        let m = &file.modules[0];
        assert_eq!(m.name, "top");
        assert!(matches!(m.port_list, PortListShape::Ansi { count: 2, .. }));
        assert_eq!(m.ports[0].name, "clk");
        assert_eq!(m.ports[0].direction, PortDirection::Input);
        assert_eq!(m.ports[1].name, "q");
        assert_eq!(m.ports[1].direction, PortDirection::Output);
        assert_eq!(m.ports[1].width, 8);
    }

    #[test]
    fn parses_non_ansi_header() {
        let file = parse("module top(a, b);\n  input [3:0] a;\n  output b;\nendmodule\n");
        let m = &file.modules[0];
        assert!(matches!(m.port_list, PortListShape::NonAnsi { count: 2, .. }));
        assert_eq!(m.ports.len(), 2);
        assert_eq!(m.ports[0].width, 4);
    }

    #[test]
    fn parses_headerless_module() {
        let file = parse("module sub;\n  reg sig;\nendmodule\n");
        let m = &file.modules[0];
        assert!(matches!(m.port_list, PortListShape::None { .. }));
        assert_eq!(m.signals[0].name, "sig");
        assert_eq!(m.signals[0].width, 1);
    }

    #[test]
    fn parses_signal_widths() {
        let file = parse("module m;\n  wire [15:0] w;\n  reg [0:7] r;\n  integer i;\nendmodule\n");
        let m = &file.modules[0];
        assert_eq!(m.signal_width("w"), Some(16));
        assert_eq!(m.signal_width("r"), Some(8));
        assert_eq!(m.signal_width("i"), Some(32));
    }

    #[test]
    fn parses_instantiations() {
        let file = parse(
            "module top;\n  sub u_sub(.clk(clk), .d(d));\n  sub u_empty();\n  sub #(.W(4)) u_p(.q(q));\nendmodule\nmodule sub;endmodule\n",
        );
        let m = &file.modules[0];
        assert_eq!(m.instances.len(), 3);
        assert_eq!(m.instances[0].instance_name, "u_sub");
        assert_eq!(m.instances[0].connection_count, 2);
        assert_eq!(m.instances[1].connection_count, 0);
        assert_eq!(m.instances[2].module_name, "sub");
        assert_eq!(m.instances[2].connection_count, 1);
    }

    #[test]
    fn finds_dotted_occurrences() {
        let file = parse("module top;\n  sub u_sub();\n  wire y;\n  assign y = u_sub.sig;\nendmodule\n");
        let m = &file.modules[0];
        assert_eq!(m.occurrences.len(), 1);
        assert_eq!(m.occurrences[0].text, "u_sub.sig");
        assert!(!m.occurrences[0].is_write);
    }

    #[test]
    fn keeps_array_suffix_in_occurrence_text() {
        let file = parse("module top;\n  assign y = u_sub.arr[3];\nendmodule\n");
        assert_eq!(file.modules[0].occurrences[0].text, "u_sub.arr[3]");
    }

    #[test]
    fn named_connections_are_not_occurrences() {
        let file = parse("module top;\n  sub u_sub(.clk(clk), .d(u_x.sig));\nendmodule\n");
        let m = &file.modules[0];
        assert_eq!(m.occurrences.len(), 1);
        assert_eq!(m.occurrences[0].text, "u_x.sig");
    }

    #[test]
    fn classifies_assignment_lhs_as_write() {
        let file = parse(
            "module top;\n  always @(posedge clk) u_sub.sig <= 1'b1;\n  assign u_sub.v = x;\nendmodule\n",
        );
        let m = &file.modules[0];
        assert!(m.occurrences.iter().any(|o| o.text == "u_sub.sig" && o.is_write));
        assert!(m.occurrences.iter().any(|o| o.text == "u_sub.v" && o.is_write));
    }

    #[test]
    fn comparison_is_not_a_write() {
        let file = parse("module top;\n  assign y = u_sub.sig <= 4'h5;\nendmodule\n");
        let m = &file.modules[0];
        assert_eq!(m.occurrences.len(), 1);
        assert!(!m.occurrences[0].is_write);
    }

    #[test]
    fn dpi_output_argument_is_write() {
        let file = parse(
            "module top;\n  import \"DPI-C\" function void get(output bit [7:0] v, input bit d);\n  initial get(u_sub.v, u_sub.d);\nendmodule\n",
        );
        let m = &file.modules[0];
        let sub = m.subroutine("get").unwrap();
        assert_eq!(sub.args[0].direction, ArgDirection::Output);
        assert!(sub.is_dpi);
        assert!(m.occurrences.iter().any(|o| o.text == "u_sub.v" && o.is_write));
        assert!(m.occurrences.iter().any(|o| o.text == "u_sub.d" && !o.is_write));
    }

    #[test]
    fn function_definition_signature() {
        let file = parse(
            "module top;\n  function automatic [7:0] mix(input [7:0] a, output [7:0] b);\n    mix = a;\n  endfunction\nendmodule\n",
        );
        let sub = file.modules[0].subroutine("mix").unwrap();
        assert_eq!(sub.args.len(), 2);
        assert_eq!(sub.args[1].direction, ArgDirection::Output);
    }

    #[test]
    fn malformed_input_does_not_panic() {
        let file = parse("module broken\n  wire x\nendmodule\n");
        assert_eq!(file.modules.len(), 1);
    }

    #[test]
    fn missing_module_name_is_a_parse_error() {
        let mut defines = IndexSet::new();
        let err = parse_file("bad.sv", "module ;\nendmodule\n".to_string(), &mut defines)
            .unwrap_err();
        match err {
            FrontendError::Parse { path, line, message } => {
                assert_eq!(path, "bad.sv");
                assert_eq!(line, 1);
                assert!(message.contains("module name"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_port_list_is_a_parse_error() {
        let mut defines = IndexSet::new();
        let err = parse_file(
            "bad.sv",
            "// header\nmodule m(input wire a,\nendmodule\n".to_string(),
            &mut defines,
        )
        .unwrap_err();
        match err {
            FrontendError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("unterminated port list in module 'm'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_parameter_list_is_a_parse_error() {
        let mut defines = IndexSet::new();
        let err = parse_file(
            "bad.sv",
            "module m #(parameter W = 8;\nendmodule\n".to_string(),
            &mut defines,
        )
        .unwrap_err();
        assert!(matches!(err, FrontendError::Parse { .. }));
        assert!(err.to_string().contains("unterminated parameter list"));
    }

    #[test]
    fn multiple_instances_in_one_declaration() {
        let file = parse("module top;\n  sub a(), b(.x(x));\nendmodule\n");
        let m = &file.modules[0];
        assert_eq!(m.instances.len(), 2);
        assert_eq!(m.instances[1].instance_name, "b");
        assert_eq!(m.instances[1].connection_count, 1);
    }
}
