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

//! Classifies the lexemes inside a `[...]` memory operand into a
//! [`Sib`] (scaled-index-byte) shape.
//!
//! Classification runs in two phases: first it finds a single
//! `register * scale` term (in either order) and pulls it out as the index,
//! then it walks whatever remains as a signed sum of at most one more
//! register (the base) and any number of displacement immediates.

use super::ast::Sib;
use super::expr::fold_multiplicative;
use super::register::Register;
use super::token::{Lexeme, LexemeKind, Punct};
use crate::message::{AsmResult, Diagnostics};

/// Classifies the interior lexemes of a `[...]` operand (the brackets
/// themselves already stripped) into a [`Sib`].
///
/// Only the multiplicative pass runs before the scale term is pulled out:
/// running the additive pass first would merge a scale immediate with an
/// unrelated displacement immediate sitting across a `+` from it (e.g.
/// `rbx + rcx*4 + 8` folding `4 + 8` into `12` before the `rcx*4` term is
/// ever recognized). Whatever's left after extraction is walked by
/// `scan_addends`, which does its own signed summation of displacement
/// immediates, so no further folding pass is needed.
pub fn parse_sib(diag: &Diagnostics, line: u32, tokens: &[Lexeme]) -> AsmResult<Sib> {
    if tokens.is_empty() {
        return diag.fail(line, "invalid SIB expression");
    }
    let tokens = fold_multiplicative(diag, line, tokens)?;

    let (mut rest, mut index, mut scale) = extract_scale_term(diag, line, &tokens)?;
    strip_dangling_plus(&mut rest);

    let (base, displacement) = scan_addends(diag, line, &rest, &mut index, &mut scale)?;

    if base.is_none() && index.is_none() && displacement.is_none() {
        return diag.fail(line, "invalid SIB expression");
    }
    Ok(Sib { base, index, scale, displacement })
}

/// Validates that `tokens` is a nonempty, odd-length, alternating sequence
/// of terms (register, immediate, or symbol) and arithmetic operators, with
/// at least one symbol term. Called on the interior of a `[...]` operand
/// that mentions a symbol, before it's carried forward as an
/// [`super::ast::Operand::UnresolvedSib`], to reject malformed brackets
/// (`[foo bar]`, `[foo * * 4]`) up front instead of deferring the error to
/// whatever later pass re-resolves the symbol.
pub fn check_unres_sib(tokens: &[Lexeme]) -> bool {
    if tokens.is_empty() || tokens.len() % 2 == 0 {
        return false;
    }
    let mut has_symbol = false;
    for (i, t) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            match &t.kind {
                LexemeKind::Immediate(_) | LexemeKind::Register(_) => {}
                LexemeKind::Symbol(_) => has_symbol = true,
                _ => return false,
            }
        } else if !t.is_arithmetic() {
            return false;
        }
    }
    has_symbol
}

/// Finds at most one `register * immediate` (or `immediate * register`)
/// term, validates its scale is one of {1,2,4,8}, and removes it from the
/// token stream, returning what's left.
fn extract_scale_term(
    diag: &Diagnostics,
    line: u32,
    tokens: &[Lexeme],
) -> AsmResult<(Vec<Lexeme>, Option<Register>, Option<u8>)> {
    for i in 0..tokens.len() {
        if i + 2 >= tokens.len() || !tokens[i + 1].is_punct(Punct::Star) {
            continue;
        }
        let pair = match (tokens[i].as_register(), tokens[i + 2].as_immediate()) {
            (Some(r), Some(imm)) => Some((r, imm.value)),
            _ => match (tokens[i].as_immediate(), tokens[i + 2].as_register()) {
                (Some(imm), Some(r)) => Some((r, imm.value)),
                _ => None,
            },
        };
        let Some((reg, scale)) = pair else { continue };
        if !matches!(scale, 1 | 2 | 4 | 8) {
            return diag.fail(line, "invalid SIB scale");
        }
        let mut rest = tokens.to_vec();
        // Absorb the operator joining this term to whatever precedes it, so
        // the remaining tokens stay a clean alternating term/operator chain.
        // An index term can only ever be added, never subtracted.
        if i > 0 {
            if !rest[i - 1].is_punct(Punct::Plus) {
                return diag.fail(line, "invalid SIB expression");
            }
            rest.drain(i - 1..i + 3);
        } else {
            rest.drain(i..i + 3);
        }
        return Ok((rest, Some(reg), Some(scale as u8)));
    }
    Ok((tokens.to_vec(), None, None))
}

/// Drops a leading `+` left dangling when a scale term was extracted from
/// the very front of the expression.
fn strip_dangling_plus(tokens: &mut Vec<Lexeme>) {
    if matches!(tokens.first(), Some(t) if t.is_punct(Punct::Plus)) {
        tokens.remove(0);
    }
}

/// Walks a signed sum of terms. A bare register fills the base slot first,
/// then the index slot (with an implied scale of 1) if the index wasn't
/// already claimed by an explicit `register * scale` term; every immediate
/// folds into a running displacement.
fn scan_addends(
    diag: &Diagnostics,
    line: u32,
    tokens: &[Lexeme],
    index: &mut Option<Register>,
    scale: &mut Option<u8>,
) -> AsmResult<(Option<Register>, Option<i64>)> {
    let mut base = None;
    let mut disp_total: i64 = 0;
    let mut has_disp = false;
    let mut sign: i64 = 1;
    let mut expect_term = true;

    for t in tokens {
        if expect_term {
            if let Some(r) = t.as_register() {
                if sign == -1 {
                    return diag.fail(line, "invalid SIB expression");
                }
                if base.is_none() {
                    base = Some(r);
                } else if index.is_none() {
                    *index = Some(r);
                    *scale = Some(1);
                } else {
                    return diag.fail(line, "invalid SIB expression");
                }
            } else if let Some(imm) = t.as_immediate() {
                has_disp = true;
                disp_total = disp_total.wrapping_add(sign.wrapping_mul(imm.value as i64));
            } else {
                return diag.fail(line, "invalid SIB expression");
            }
            expect_term = false;
        } else {
            sign = match &t.kind {
                LexemeKind::Punct(Punct::Plus) => 1,
                LexemeKind::Punct(Punct::Minus) => -1,
                _ => return diag.fail(line, "invalid SIB expression"),
            };
            expect_term = true;
        }
    }
    if expect_term && !tokens.is_empty() {
        return diag.fail(line, "invalid SIB expression");
    }
    if has_disp && !(i32::MIN as i64..=i32::MAX as i64).contains(&disp_total) {
        return diag.fail(line, "displacement larger than 32 bits");
    }
    Ok((base, has_disp.then_some(disp_total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::register::lookup;
    use crate::lang::token::{Immediate, LexemeKind};

    fn reg(name: &str) -> Lexeme {
        Lexeme::new(LexemeKind::Register(lookup(name).unwrap()), 1)
    }
    fn imm(v: u64) -> Lexeme {
        Lexeme::new(LexemeKind::Immediate(Immediate::new(8, v)), 1)
    }
    fn punct(p: Punct) -> Lexeme {
        Lexeme::new(LexemeKind::Punct(p), 1)
    }

    #[test]
    fn base_only() {
        let diag = Diagnostics::new("t.s");
        let sib = parse_sib(&diag, 1, &[reg("rax")]).unwrap();
        assert_eq!(sib.base, lookup("rax"));
        assert_eq!(sib.index, None);
        assert_eq!(sib.displacement, None);
    }

    #[test]
    fn base_plus_index_times_scale() {
        let diag = Diagnostics::new("t.s");
        let tokens = [reg("rax"), punct(Punct::Plus), reg("rbx"), punct(Punct::Star), imm(4)];
        let sib = parse_sib(&diag, 1, &tokens).unwrap();
        assert_eq!(sib.base, lookup("rax"));
        assert_eq!(sib.index, lookup("rbx"));
        assert_eq!(sib.scale, Some(4));
    }

    #[test]
    fn base_plus_displacement() {
        let diag = Diagnostics::new("t.s");
        let tokens = [reg("rax"), punct(Punct::Plus), imm(8)];
        let sib = parse_sib(&diag, 1, &tokens).unwrap();
        assert_eq!(sib.base, lookup("rax"));
        assert_eq!(sib.displacement, Some(8));
    }

    #[test]
    fn rejects_bad_scale() {
        let diag = Diagnostics::new("t.s");
        let tokens = [reg("rbx"), punct(Punct::Star), imm(3)];
        let err = parse_sib(&diag, 9, &tokens).unwrap_err();
        assert_eq!(err.message(), "invalid SIB scale");
    }

    #[test]
    fn rejects_oversized_displacement() {
        let diag = Diagnostics::new("t.s");
        let tokens = [reg("rax"), punct(Punct::Plus), imm(1u64 << 33)];
        let err = parse_sib(&diag, 1, &tokens).unwrap_err();
        assert_eq!(err.message(), "displacement larger than 32 bits");
    }

    #[test]
    fn base_plus_bare_index_implies_scale_one() {
        let diag = Diagnostics::new("t.s");
        let tokens = [reg("rax"), punct(Punct::Plus), reg("rbx")];
        let sib = parse_sib(&diag, 1, &tokens).unwrap();
        assert_eq!(sib.base, lookup("rax"));
        assert_eq!(sib.index, lookup("rbx"));
        assert_eq!(sib.scale, Some(1));
    }

    #[test]
    fn rejects_three_registers() {
        let diag = Diagnostics::new("t.s");
        let tokens = [reg("rax"), punct(Punct::Plus), reg("rbx"), punct(Punct::Plus), reg("rcx")];
        let err = parse_sib(&diag, 1, &tokens).unwrap_err();
        assert_eq!(err.message(), "invalid SIB expression");
    }

    #[test]
    fn keeps_scale_term_intact_around_trailing_displacement() {
        let diag = Diagnostics::new("t.s");
        let tokens = [
            reg("rbx"),
            punct(Punct::Plus),
            reg("rcx"),
            punct(Punct::Star),
            imm(4),
            punct(Punct::Plus),
            imm(8),
        ];
        let sib = parse_sib(&diag, 1, &tokens).unwrap();
        assert_eq!(sib.base, lookup("rbx"));
        assert_eq!(sib.index, lookup("rcx"));
        assert_eq!(sib.scale, Some(4));
        assert_eq!(sib.displacement, Some(8));
    }

    fn sym(s: &str) -> Lexeme {
        Lexeme::new(LexemeKind::Symbol(s.to_string()), 1)
    }

    #[test]
    fn check_unres_sib_accepts_mixed_terms() {
        let tokens = [reg("rbx"), punct(Punct::Plus), sym("foo")];
        assert!(check_unres_sib(&tokens));
    }

    #[test]
    fn check_unres_sib_rejects_adjacent_terms() {
        let tokens = [sym("foo"), sym("bar")];
        assert!(!check_unres_sib(&tokens));
    }

    #[test]
    fn check_unres_sib_rejects_doubled_operator() {
        let tokens = [sym("foo"), punct(Punct::Star), punct(Punct::Star), imm(4)];
        assert!(!check_unres_sib(&tokens));
    }

    #[test]
    fn check_unres_sib_rejects_no_symbol() {
        let tokens = [reg("rbx"), punct(Punct::Plus), imm(4)];
        assert!(!check_unres_sib(&tokens));
    }
}
