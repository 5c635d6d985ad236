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

//! Constant folding over immediate-and-symbol expressions.
//!
//! An operand expression is a run of terms (immediates or symbols)
//! separated by `+ - * /`. Folding runs as two left-to-right passes, `*`/`/`
//! before `+`/`-`, combining adjacent immediates; a symbol blocks folding
//! across it, since its value isn't known here. What's left after both
//! passes is either a single fully-resolved immediate, or a sequence that
//! still alternates term/operator and mentions at least one symbol, to be
//! carried forward unresolved.

use super::token::{Immediate, Lexeme, LexemeKind, Punct};
use crate::lang::lexer::number::unsigned_width;
use crate::message::{AsmResult, Diagnostics};

/// Folds constant immediates in `tokens` and returns the resulting sequence:
/// a single-element `Immediate` sequence if everything resolved, or an
/// alternating term/operator sequence retaining at least one symbol
/// otherwise. Fails if the expression is malformed or divides by zero.
pub fn squash_immediates(diag: &Diagnostics, line: u32, tokens: &[Lexeme]) -> AsmResult<Vec<Lexeme>> {
    let folded = fold_constants(diag, line, tokens)?;

    if folded.len() == 1 && matches!(folded[0].kind, LexemeKind::Immediate(_)) {
        return Ok(folded);
    }
    if check_unres_imm(&folded) {
        return Ok(folded);
    }
    diag.fail(line, "invalid calculation")
}

/// Runs the multiplicative-then-additive constant-folding passes without
/// the final shape validation `squash_immediates` applies, so callers that
/// mix non-arithmetic tokens (e.g. registers inside a `[...]` operand) can
/// still get adjacent immediates folded.
///
/// Not safe to call on a token stream that may still contain a
/// `register * scale` term: the additive pass has no notion of which
/// immediates belong to such a term, so it would happily fold a scale
/// immediate together with an unrelated displacement immediate sitting on
/// the other side of a `+`/`-`. Callers with that concern should run
/// [`fold_multiplicative`] only, pull out the scale term first, and let
/// whatever walks the remainder do its own addition.
pub fn fold_constants(diag: &Diagnostics, line: u32, tokens: &[Lexeme]) -> AsmResult<Vec<Lexeme>> {
    let folded = fold_multiplicative(diag, line, tokens)?;
    fold_repeatedly(&folded, &[Punct::Plus, Punct::Minus], diag, line)
}

/// Runs just the multiplicative (`*`/`/`) folding pass, combining adjacent
/// immediate-immediate pairs. Leaves everything else, including any
/// `register * scale` term, untouched.
pub fn fold_multiplicative(diag: &Diagnostics, line: u32, tokens: &[Lexeme]) -> AsmResult<Vec<Lexeme>> {
    fold_repeatedly(tokens, &[Punct::Star, Punct::Slash], diag, line)
}

/// Returns whether a squashed token sequence resolved to a single immediate.
pub fn is_resolved(tokens: &[Lexeme]) -> bool {
    matches!(tokens, [t] if matches!(t.kind, LexemeKind::Immediate(_)))
}

/// Validates that `tokens` is a nonempty, odd-length, alternating sequence
/// of terms (immediate or symbol) and arithmetic operators, with at least
/// one symbol term (otherwise it should have fully resolved already).
fn check_unres_imm(tokens: &[Lexeme]) -> bool {
    if tokens.is_empty() || tokens.len() % 2 == 0 {
        return false;
    }
    let mut has_symbol = false;
    for (i, t) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            match &t.kind {
                LexemeKind::Immediate(_) => {}
                LexemeKind::Symbol(_) => has_symbol = true,
                _ => return false,
            }
        } else if !t.is_arithmetic() {
            return false;
        }
    }
    has_symbol
}

fn fold_repeatedly(
    tokens: &[Lexeme],
    ops: &[Punct],
    diag: &Diagnostics,
    line: u32,
) -> AsmResult<Vec<Lexeme>> {
    let mut current = tokens.to_vec();
    loop {
        let (next, changed) = fold_once(&current, ops, diag, line)?;
        current = next;
        if !changed {
            return Ok(current);
        }
    }
}

fn fold_once(
    tokens: &[Lexeme],
    ops: &[Punct],
    diag: &Diagnostics,
    line: u32,
) -> AsmResult<(Vec<Lexeme>, bool)> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut changed = false;
    let mut i = 0;
    while i < tokens.len() {
        if i + 2 < tokens.len() {
            if let (Some(a), Some(b)) = (tokens[i].as_immediate(), tokens[i + 2].as_immediate()) {
                if let LexemeKind::Punct(p) = &tokens[i + 1].kind {
                    let p = *p;
                    if ops.contains(&p) {
                        let combined = apply(diag, line, p, a, b)?;
                        out.push(Lexeme::new(LexemeKind::Immediate(combined), tokens[i].line));
                        changed = true;
                        i += 3;
                        continue;
                    }
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    Ok((out, changed))
}

fn apply(diag: &Diagnostics, line: u32, op: Punct, a: Immediate, b: Immediate) -> AsmResult<Immediate> {
    let value = match op {
        Punct::Star => a.value.wrapping_mul(b.value),
        Punct::Slash => {
            if b.value == 0 {
                return diag.fail(line, "division by zero");
            }
            a.value.wrapping_div(b.value)
        }
        Punct::Plus => a.value.wrapping_add(b.value),
        Punct::Minus => a.value.wrapping_sub(b.value),
        _ => unreachable!("fold_once only dispatches arithmetic operators"),
    };
    let width = unsigned_width(value).max(a.width).max(b.width);
    Ok(Immediate::new(width, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::token::Immediate;

    fn imm(w: u8, v: u64) -> Lexeme {
        Lexeme::new(LexemeKind::Immediate(Immediate::new(w, v)), 1)
    }
    fn op(p: Punct) -> Lexeme {
        Lexeme::new(LexemeKind::Punct(p), 1)
    }
    fn sym(s: &str) -> Lexeme {
        Lexeme::new(LexemeKind::Symbol(s.to_string()), 1)
    }

    #[test]
    fn folds_pure_arithmetic() {
        let diag = Diagnostics::new("t.s");
        let tokens = vec![imm(8, 2), op(Punct::Plus), imm(8, 3), op(Punct::Star), imm(8, 4)];
        let result = squash_immediates(&diag, 1, &tokens).unwrap();
        assert!(is_resolved(&result));
        assert_eq!(result[0].as_immediate().unwrap().value, 14);
    }

    #[test]
    fn respects_multiplicative_precedence() {
        let diag = Diagnostics::new("t.s");
        let tokens = vec![imm(8, 1), op(Punct::Plus), imm(8, 2), op(Punct::Star), imm(8, 3)];
        let result = squash_immediates(&diag, 1, &tokens).unwrap();
        assert_eq!(result[0].as_immediate().unwrap().value, 7);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let diag = Diagnostics::new("t.s");
        let tokens = vec![imm(8, 1), op(Punct::Slash), imm(8, 0)];
        let err = squash_immediates(&diag, 5, &tokens).unwrap_err();
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn leaves_symbol_expression_unresolved() {
        let diag = Diagnostics::new("t.s");
        let tokens = vec![sym("foo"), op(Punct::Plus), imm(8, 1), op(Punct::Plus), imm(8, 1)];
        let result = squash_immediates(&diag, 1, &tokens).unwrap();
        assert!(!is_resolved(&result));
        assert_eq!(result.len(), 3);
        assert_eq!(result[2].as_immediate().unwrap().value, 2);
    }

    #[test]
    fn rejects_malformed_expression() {
        let diag = Diagnostics::new("t.s");
        let tokens = vec![sym("a"), sym("b")];
        let err = squash_immediates(&diag, 2, &tokens).unwrap_err();
        assert_eq!(err.message(), "invalid calculation");
    }
}
