// This file is part of x86fe, an assembler front-end.
// Copyright 2022 Jeffrey Sharp
//
// SPDX-License-Identifier: GPL-3.0-or-later
//
// x86fe is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published
// by the Free Software Foundation, either version 3 of the License,
// or (at your option) any later version.
//
// x86fe is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with x86fe.  If not, see <http://www.gnu.org/licenses/>.

//! Line-oriented lexer: source text to a sequence of [`Line`]s of [`Lexeme`]s.

pub(crate) mod number;
mod reader;

use reader::Reader;

use crate::message::{AsmResult, Diagnostics};

use super::mnemonic::{lookup_directive, lookup_mnemonic};
use super::register::lookup as lookup_register;
use super::token::{Immediate, Lexeme, LexemeKind, Line, Punct};

const DELIMS: &[u8] = b" ,*+-/[]:$";

/// Lexes an entire source file into one [`Line`] of lexemes per non-blank
/// input line. Blank lines (after comment stripping) contribute nothing.
pub fn lex(diag: &Diagnostics, source: &str) -> AsmResult<Vec<Line>> {
    let mut lines = Vec::new();
    for (i, text) in source.lines().enumerate() {
        let line_no = (i + 1) as u32;
        let lexemes = lex_line(diag, line_no, text)?;
        if !lexemes.is_empty() {
            lines.push(lexemes);
        }
    }
    Ok(lines)
}

fn lex_line(diag: &Diagnostics, line_no: u32, text: &str) -> AsmResult<Line> {
    let code = strip_comment(text);
    let raw_tokens = split_line(diag, line_no, code)?;

    let mut lexemes = Line::new();
    for raw in raw_tokens {
        classify(diag, line_no, &raw, &mut lexemes)?;
    }
    validate_brackets_and_labels(diag, line_no, &lexemes)?;
    Ok(lexemes)
}

/// Truncates source text at the first `;` that falls outside a string
/// literal; a semicolon inside quotes is just another character.
fn strip_comment(text: &str) -> &str {
    let mut r = Reader::new(text.as_bytes());
    let mut in_string = false;
    while let Some(b) = r.advance() {
        match b {
            b'"' => in_string = !in_string,
            b';' if !in_string => return &text[..r.position() - 1],
            _ => {}
        }
    }
    text
}

/// Splits a comment-free line into raw token strings on the delimiter set
/// `{space, , * + - / [ ] : $}`, honoring `"`-delimited string literals (in
/// which delimiters are inert). Delimiter characters other than space are
/// themselves emitted as single-character tokens; a bare space only ever
/// separates tokens and never becomes one itself.
fn split_line(diag: &Diagnostics, line_no: u32, text: &str) -> AsmResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    let mut in_string = false;
    let mut r = Reader::new(text.as_bytes());

    while let Some(b) = r.advance() {
        if in_string {
            cur.push(b as char);
            if b == b'"' {
                in_string = false;
            }
            continue;
        }
        if b == b'"' {
            in_string = true;
            cur.push(b as char);
            continue;
        }
        if DELIMS.contains(&b) {
            if !cur.is_empty() {
                tokens.push(std::mem::take(&mut cur));
            }
            if b != b' ' {
                tokens.push((b as char).to_string());
            }
            continue;
        }
        cur.push(b as char);
    }

    if in_string {
        return diag.fail(line_no, "unclosed string literal");
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }
    Ok(tokens)
}

/// Classifies one raw token and appends the resulting lexeme(s) to `lexemes`,
/// applying sign fusion when a numeric literal immediately follows a unary
/// `-`.
fn classify(diag: &Diagnostics, line_no: u32, raw: &str, lexemes: &mut Line) -> AsmResult<()> {
    let lower = raw.to_ascii_lowercase();

    let punct = match lower.as_str() {
        "," => Some(Punct::Comma),
        "*" => Some(Punct::Star),
        "+" => Some(Punct::Plus),
        "-" => Some(Punct::Minus),
        "/" => Some(Punct::Slash),
        "[" => Some(Punct::LBracket),
        "]" => Some(Punct::RBracket),
        ":" => Some(Punct::Colon),
        "$" => Some(Punct::Dollar),
        _ => None,
    };
    if let Some(p) = punct {
        lexemes.push(Lexeme::new(LexemeKind::Punct(p), line_no));
        return Ok(());
    }

    if lower == "equ" {
        lexemes.push(Lexeme::new(LexemeKind::Equ, line_no));
        return Ok(());
    }
    if let Some(m) = lookup_mnemonic(&lower) {
        lexemes.push(Lexeme::new(LexemeKind::Instruction(m), line_no));
        return Ok(());
    }
    if let Some(d) = lookup_directive(&lower) {
        lexemes.push(Lexeme::new(LexemeKind::Directive(d), line_no));
        return Ok(());
    }
    if let Some(r) = lookup_register(&lower) {
        lexemes.push(Lexeme::new(LexemeKind::Register(r), line_no));
        return Ok(());
    }

    if number::looks_numeric(&lower) {
        let magnitude = number::parse_magnitude(&lower)
            .ok_or_else(|| diag.error(line_no, "numeric literal out of range"))?;
        let imm = if is_unary_minus(lexemes) {
            lexemes.pop();
            Immediate::new(number::signed_width(magnitude), number::negate(magnitude))
        } else {
            Immediate::new(number::unsigned_width(magnitude), magnitude)
        };
        lexemes.push(Lexeme::new(LexemeKind::Immediate(imm), line_no));
        return Ok(());
    }

    if raw.len() >= 2 && raw.as_bytes()[0] == b'"' && raw.as_bytes()[raw.len() - 1] == b'"' {
        let bytes = raw[1..raw.len() - 1].as_bytes().to_vec();
        lexemes.push(Lexeme::new(LexemeKind::StringLiteral(bytes), line_no));
        return Ok(());
    }

    lexemes.push(Lexeme::new(LexemeKind::Symbol(lower), line_no));
    Ok(())
}

/// A `-` fuses with the literal that follows it into a negative immediate
/// when it is acting as a unary sign: when it is the first lexeme on the
/// line, or when the lexeme before it is not an Immediate, Register, or
/// Symbol (i.e. it cannot be a binary subtraction operator there).
fn is_unary_minus(lexemes: &Line) -> bool {
    match lexemes.last() {
        Some(l) if l.is_punct(Punct::Minus) => {
            if lexemes.len() < 2 {
                true
            } else {
                !matches!(
                    lexemes[lexemes.len() - 2].kind,
                    LexemeKind::Immediate(_) | LexemeKind::Register(_) | LexemeKind::Symbol(_)
                )
            }
        }
        _ => false,
    }
}

/// Enforces that `[`/`]` nest to depth 0 or 1 and close by line end, and
/// that `:` appears only as the final lexeme of a two-lexeme `symbol :`
/// label line.
fn validate_brackets_and_labels(diag: &Diagnostics, line_no: u32, lexemes: &Line) -> AsmResult<()> {
    let mut depth: i32 = 0;
    for (i, l) in lexemes.iter().enumerate() {
        match &l.kind {
            LexemeKind::Punct(Punct::LBracket) => {
                depth += 1;
                if depth > 1 {
                    return diag.fail(line_no, "nested brackets are not allowed");
                }
            }
            LexemeKind::Punct(Punct::RBracket) => {
                depth -= 1;
                if depth < 0 {
                    return diag.fail(line_no, "unmatched ']'");
                }
            }
            LexemeKind::Punct(Punct::Colon) => {
                if i == 0 {
                    return diag.fail(line_no, "':' cannot begin a line");
                }
                if !(i == lexemes.len() - 1 && lexemes.len() == 2) {
                    return diag.fail(line_no, "a label line must contain only a symbol and ':'");
                }
                if !matches!(lexemes[i - 1].kind, LexemeKind::Symbol(_)) {
                    return diag.fail(line_no, "invalid label name");
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return diag.fail(line_no, "unmatched '['");
    }
    Ok(())
}
