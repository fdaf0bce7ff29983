//! SystemVerilog lexer using Logos
//!
//! Tokenizes SystemVerilog source into a stream of tokens with byte spans.
//! Whitespace and comments are trivia: they are skipped by the lexer but the
//! spans of real tokens always index into the original text, so later passes
//! can splice edits without disturbing untouched bytes.
//!
//! Compiler directives are handled here as well: `define/`undef maintain a
//! define set, the `ifdef family filters tokens (filtered regions simply
//! produce no tokens, spans stay intact), and `include records the requested
//! file so the source loader can pull it in as an additional compilation
//! input. Any other directive is consumed to the end of its line.

use logos::Logos;
use std::ops::Range;

/// Token kinds for the SystemVerilog subset the engine needs
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum Tok {
    #[token("module")]
    Module,
    #[token("macromodule")]
    Macromodule,
    #[token("endmodule")]
    Endmodule,

    // Port directions
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("inout")]
    Inout,

    // Net and variable kinds
    #[token("wire")]
    Wire,
    #[token("reg")]
    Reg,
    #[token("logic")]
    Logic,
    #[token("bit")]
    Bit,
    #[token("integer")]
    Integer,
    #[token("int")]
    Int,
    #[token("signed")]
    Signed,
    #[token("unsigned")]
    Unsigned,

    #[token("assign")]
    Assign,

    // Procedural introducers
    #[token("always")]
    Always,
    #[token("always_ff")]
    AlwaysFf,
    #[token("always_comb")]
    AlwaysComb,
    #[token("always_latch")]
    AlwaysLatch,
    #[token("initial")]
    Initial,
    #[token("final")]
    Final,

    #[token("begin")]
    Begin,
    #[token("end")]
    End,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("case")]
    Case,
    #[token("casex")]
    Casex,
    #[token("casez")]
    Casez,
    #[token("endcase")]
    Endcase,
    #[token("default")]
    Default,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("repeat")]
    Repeat,
    #[token("forever")]
    Forever,
    #[token("fork")]
    Fork,
    #[token("join")]
    Join,
    #[token("join_any")]
    JoinAny,
    #[token("join_none")]
    JoinNone,

    #[token("generate")]
    Generate,
    #[token("endgenerate")]
    Endgenerate,

    // Subroutines
    #[token("function")]
    Function,
    #[token("endfunction")]
    Endfunction,
    #[token("task")]
    Task,
    #[token("endtask")]
    Endtask,
    #[token("import")]
    Import,
    #[token("context")]
    Context,
    #[token("pure")]
    Pure,
    #[token("void")]
    Void,
    #[token("automatic")]
    Automatic,

    #[token("posedge")]
    Posedge,
    #[token("negedge")]
    Negedge,

    // Punctuation the parser cares about individually
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("#")]
    Hash,
    #[token("@")]
    At,

    /// Blocking assignment / default value
    #[token("=")]
    Eq,
    /// Non-blocking assignment or less-equal comparison
    #[token("<=")]
    Le,

    // Every other operator folds into one kind; the engine never needs to
    // distinguish them, only to keep bracket depth and statement boundaries.
    #[token("==")]
    #[token("!=")]
    #[token("===")]
    #[token("!==")]
    #[token("==?")]
    #[token("!=?")]
    #[token(">=")]
    #[token("<")]
    #[token(">")]
    #[token("<<")]
    #[token(">>")]
    #[token("<<<")]
    #[token(">>>")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("!")]
    #[token("~")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("&&")]
    #[token("||")]
    #[token("~&")]
    #[token("~|")]
    #[token("~^")]
    #[token("^~")]
    #[token("?")]
    #[token("::")]
    #[token("+:")]
    #[token("-:")]
    #[token("->")]
    Op,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_$]*")]
    Ident,
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_$]*")]
    SysIdent,
    #[regex(r"`[a-zA-Z_][a-zA-Z0-9_]*")]
    Directive,

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    Real,
    #[regex(r"([0-9][0-9_]*)?'[sS]?[bBoOdDhH][0-9a-fA-FxXzZ_?]+")]
    BasedNumber,
    #[regex(r"'[01xXzZ]")]
    UnbasedUnsized,
    #[regex(r"[0-9][0-9_]*")]
    Number,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
}

/// Byte range of a token in the original source
pub type Span = Range<usize>;

/// A lexed token with its span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: Tok,
    pub span: Span,
}

impl Token {
    /// Slice the original source for this token's text
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.span.clone()]
    }
}

/// Result of lexing one source file
#[derive(Debug, Default)]
pub struct TokenStream {
    pub tokens: Vec<Token>,
    /// Files named by active `include directives, in order of appearance
    pub includes: Vec<String>,
}

/// Lex `src` into a token stream.
///
/// `defines` seeds the preprocessor define set (from `-D` options) and is
/// updated by `define/`undef directives encountered in the text, so a file
/// can gate later files loaded in the same run.
pub fn lex(src: &str, defines: &mut indexmap::IndexSet<String>) -> TokenStream {
    let mut out = TokenStream::default();
    let mut lexer = Tok::lexer(src);

    // Conditional-compilation stack: one entry per open `ifdef/`ifndef.
    // `active` is whether the current branch emits tokens, `taken` whether
    // any branch of this conditional has been active yet.
    struct CondFrame {
        active: bool,
        taken: bool,
        parent_active: bool,
    }
    let mut cond: Vec<CondFrame> = Vec::new();
    let is_active = |cond: &Vec<CondFrame>| cond.last().map(|f| f.active).unwrap_or(true);

    // Skip every remaining token whose start lies before `limit`
    fn skip_to(lexer: &mut logos::Lexer<Tok>, limit: usize) {
        loop {
            let mut probe = lexer.clone();
            match probe.next() {
                Some(_) if probe.span().start < limit => {
                    lexer.next();
                }
                _ => break,
            }
        }
    }

    while let Some(res) = lexer.next() {
        let span = lexer.span();
        let kind = match res {
            Ok(k) => k,
            // Unknown byte: drop it and keep going, broken inputs must not
            // make the lexer panic
            Err(()) => continue,
        };

        if kind == Tok::Directive {
            let name = &src[span.start + 1..span.end];
            let eol = src[span.end..]
                .find('\n')
                .map(|i| span.end + i)
                .unwrap_or(src.len());
            match name {
                "define" => {
                    if is_active(&cond) {
                        if let Some(word) = first_word(&src[span.end..eol]) {
                            defines.insert(word.to_string());
                        }
                    }
                    // Macro bodies (incl. line continuations) are not expanded
                    let mut stop = eol;
                    while stop < src.len() && src[..stop].ends_with('\\') {
                        stop = src[stop + 1..]
                            .find('\n')
                            .map(|i| stop + 1 + i)
                            .unwrap_or(src.len());
                    }
                    skip_to(&mut lexer, stop);
                }
                "undef" => {
                    if is_active(&cond) {
                        if let Some(word) = first_word(&src[span.end..eol]) {
                            defines.shift_remove(word);
                        }
                    }
                    skip_to(&mut lexer, eol);
                }
                "ifdef" | "ifndef" => {
                    let parent = is_active(&cond);
                    let defined = first_word(&src[span.end..eol])
                        .map(|w| defines.contains(w))
                        .unwrap_or(false);
                    let branch = if name == "ifdef" { defined } else { !defined };
                    cond.push(CondFrame {
                        active: parent && branch,
                        taken: branch,
                        parent_active: parent,
                    });
                    skip_to(&mut lexer, eol);
                }
                "elsif" => {
                    let defined = first_word(&src[span.end..eol])
                        .map(|w| defines.contains(w))
                        .unwrap_or(false);
                    if let Some(frame) = cond.last_mut() {
                        frame.active = frame.parent_active && !frame.taken && defined;
                        frame.taken = frame.taken || defined;
                    }
                    skip_to(&mut lexer, eol);
                }
                "else" => {
                    if let Some(frame) = cond.last_mut() {
                        frame.active = frame.parent_active && !frame.taken;
                        frame.taken = true;
                    }
                    skip_to(&mut lexer, eol);
                }
                "endif" => {
                    cond.pop();
                    skip_to(&mut lexer, eol);
                }
                "include" => {
                    if is_active(&cond) {
                        let rest = &src[span.end..eol];
                        if let Some(path) = quoted_string(rest) {
                            out.includes.push(path.to_string());
                        }
                    }
                    skip_to(&mut lexer, eol);
                }
                // `timescale, `default_nettype, macro uses, ...: the engine
                // does not interpret them, treat the whole line as trivia
                _ => skip_to(&mut lexer, eol),
            }
            continue;
        }

        if is_active(&cond) {
            out.tokens.push(Token { kind, span });
        }
    }

    out
}

fn first_word(s: &str) -> Option<&str> {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some(&s[..end])
    }
}

fn quoted_string(s: &str) -> Option<&str> {
    let open = s.find('"')?;
    let rest = &s[open + 1..];
    let close = rest.find('"')?;
    Some(&rest[..close])
}
