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

//! Turns lexed lines into [`Statement`]s.

use super::ast::{AssignmentValue, DirOperand, Operand, Statement};
use super::expr::{fold_multiplicative, is_resolved, squash_immediates};
use super::mnemonic::{Directive, DirectiveOperandKind, Mnemonic};
use super::sib::{check_unres_sib, parse_sib};
use super::token::{Lexeme, LexemeKind, Line, Punct};
use crate::message::{AsmResult, Diagnostics};

/// Parses every lexed line into a [`Statement`], in order.
pub fn parse(diag: &Diagnostics, lines: Vec<Line>) -> AsmResult<Vec<Statement>> {
    lines.iter().map(|line| parse_line(diag, line)).collect()
}

fn parse_line(diag: &Diagnostics, line: &Line) -> AsmResult<Statement> {
    let line_no = line[0].line;
    match line[0].kind.clone() {
        LexemeKind::Instruction(m) => parse_instruction(diag, line_no, m, &line[1..]),
        LexemeKind::Directive(d) => parse_directive(diag, line_no, d, &line[1..]),
        LexemeKind::Symbol(name) => parse_symbol_leader(diag, line_no, name, &line[1..]),
        _ => diag.fail(line_no, "line must start with instruction, directive or label"),
    }
}

fn parse_instruction(diag: &Diagnostics, line_no: u32, m: Mnemonic, rest: &[Lexeme]) -> AsmResult<Statement> {
    let groups = split_operands(diag, line_no, rest)?;
    if groups.len() != m.arity() {
        return diag.fail(line_no, "invalid number of operands");
    }
    let operands = groups
        .into_iter()
        .map(|g| classify_operand(diag, line_no, g))
        .collect::<AsmResult<Vec<_>>>()?;
    Ok(Statement::Instruction { mnemonic: m, operands })
}

fn parse_directive(diag: &Diagnostics, line_no: u32, d: Directive, rest: &[Lexeme]) -> AsmResult<Statement> {
    let groups = split_operands(diag, line_no, rest)?;
    if groups.is_empty() {
        return diag.fail(line_no, "not enough operands for directive");
    }
    let operands = groups
        .into_iter()
        .map(|g| classify_dir_operand(diag, line_no, d, g))
        .collect::<AsmResult<Vec<_>>>()?;
    Ok(Statement::Directive { directive: d, operands })
}

fn parse_symbol_leader(diag: &Diagnostics, line_no: u32, name: String, rest: &[Lexeme]) -> AsmResult<Statement> {
    if rest.len() == 1 && rest[0].is_punct(Punct::Colon) {
        return Ok(Statement::Label { name });
    }
    if matches!(rest.first(), Some(t) if t.kind == LexemeKind::Equ) {
        let expr_tokens = &rest[1..];
        if expr_tokens.is_empty() {
            return diag.fail(line_no, "not enough operands for EQU");
        }
        let folded = squash_immediates(diag, line_no, expr_tokens)?;
        let value = if is_resolved(&folded) {
            AssignmentValue::Resolved(folded[0].as_immediate().unwrap())
        } else {
            AssignmentValue::Unresolved(folded)
        };
        return Ok(Statement::Assignment { name, value });
    }
    diag.fail(line_no, "line must start with instruction, directive or label")
}

/// Splits a token slice on top-level commas, failing on a leading, trailing,
/// or doubled comma.
fn split_operands<'a>(diag: &Diagnostics, line_no: u32, tokens: &'a [Lexeme]) -> AsmResult<Vec<&'a [Lexeme]>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let mut groups = Vec::new();
    let mut start = 0;
    for (i, t) in tokens.iter().enumerate() {
        if t.is_punct(Punct::Comma) {
            if i == start {
                return diag.fail(line_no, "invalid use of commas");
            }
            groups.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    if start == tokens.len() {
        return diag.fail(line_no, "invalid use of commas");
    }
    groups.push(&tokens[start..]);
    Ok(groups)
}

fn classify_operand(diag: &Diagnostics, line_no: u32, tokens: &[Lexeme]) -> AsmResult<Operand> {
    if tokens.is_empty() {
        return diag.fail(line_no, "invalid operand");
    }
    if tokens.len() == 1 {
        if let Some(r) = tokens[0].as_register() {
            return Ok(Operand::Register(r));
        }
    }
    if tokens[0].is_punct(Punct::LBracket) {
        if tokens.len() < 2 || !tokens.last().unwrap().is_punct(Punct::RBracket) {
            return diag.fail(line_no, "invalid operand");
        }
        let interior = &tokens[1..tokens.len() - 1];
        if interior.iter().any(|t| t.as_symbol().is_some()) {
            let folded = fold_multiplicative(diag, line_no, interior)?;
            if !check_unres_sib(&folded) {
                return diag.fail(line_no, "invalid alternation");
            }
            return Ok(Operand::UnresolvedSib(folded));
        }
        let sib = parse_sib(diag, line_no, interior)?;
        return Ok(Operand::Sib(sib));
    }

    let folded = squash_immediates(diag, line_no, tokens)?;
    if is_resolved(&folded) {
        return Ok(Operand::Immediate(folded[0].as_immediate().unwrap()));
    }
    if folded.len() == 1 {
        if let Some(s) = folded[0].as_symbol() {
            return Ok(Operand::Symbol(s.to_string()));
        }
    }
    Ok(Operand::UnresolvedImmediate(folded))
}

fn classify_dir_operand(diag: &Diagnostics, line_no: u32, d: Directive, tokens: &[Lexeme]) -> AsmResult<DirOperand> {
    match d.operand_kind() {
        DirectiveOperandKind::Symbol => {
            if tokens.len() == 1 {
                if let Some(s) = tokens[0].as_symbol() {
                    return Ok(DirOperand::Symbol(s.to_string()));
                }
            }
            diag.fail(line_no, "invalid directive operand")
        }
        DirectiveOperandKind::Immediate => {
            if d.accepts_string() && tokens.len() == 1 {
                if let LexemeKind::StringLiteral(bytes) = &tokens[0].kind {
                    return Ok(DirOperand::String(bytes.clone()));
                }
            }
            let folded = squash_immediates(diag, line_no, tokens)?;
            if is_resolved(&folded) {
                return Ok(DirOperand::Immediate(folded[0].as_immediate().unwrap()));
            }
            Ok(DirOperand::UnresolvedImmediate(folded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::lexer::lex;
    use crate::lang::register::lookup;

    fn parse_source(src: &str) -> Vec<Statement> {
        let diag = Diagnostics::new("t.s");
        let lines = lex(&diag, src).unwrap();
        parse(&diag, lines).unwrap()
    }

    #[test]
    fn parses_two_operand_instruction() {
        let stmts = parse_source("mov rax, rbx");
        match &stmts[0] {
            Statement::Instruction { mnemonic, operands } => {
                assert_eq!(*mnemonic, Mnemonic::Mov);
                assert_eq!(operands[0], Operand::Register(lookup("rax").unwrap()));
                assert_eq!(operands[1], Operand::Register(lookup("rbx").unwrap()));
            }
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    #[test]
    fn parses_memory_operand() {
        let stmts = parse_source("mov rax, [rbx+rcx*4+8]");
        match &stmts[0] {
            Statement::Instruction { operands, .. } => match &operands[1] {
                Operand::Sib(sib) => {
                    assert_eq!(sib.base, lookup("rbx"));
                    assert_eq!(sib.index, lookup("rcx"));
                    assert_eq!(sib.scale, Some(4));
                    assert_eq!(sib.displacement, Some(8));
                }
                other => panic!("expected sib operand, got {:?}", other),
            },
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    #[test]
    fn parses_label() {
        let stmts = parse_source("start:");
        assert_eq!(stmts[0], Statement::Label { name: "start".to_string() });
    }

    #[test]
    fn parses_equ_assignment() {
        let stmts = parse_source("size equ 4+4");
        match &stmts[0] {
            Statement::Assignment { name, value } => {
                assert_eq!(name, "size");
                match value {
                    AssignmentValue::Resolved(imm) => assert_eq!(imm.value, 8),
                    other => panic!("expected resolved value, got {:?}", other),
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn parses_unresolved_equ() {
        let stmts = parse_source("offset equ base+4");
        match &stmts[0] {
            Statement::Assignment { value, .. } => assert!(matches!(value, AssignmentValue::Unresolved(_))),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn parses_directive_with_string() {
        let stmts = parse_source("db \"hi\"");
        match &stmts[0] {
            Statement::Directive { directive, operands } => {
                assert_eq!(*directive, Directive::Db);
                assert_eq!(operands[0], DirOperand::String(b"hi".to_vec()));
            }
            other => panic!("expected directive, got {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_arity() {
        let diag = Diagnostics::new("t.s");
        let lines = lex(&diag, "push rax, rbx").unwrap();
        let err = parse(&diag, lines).unwrap_err();
        assert_eq!(err.message(), "invalid number of operands");
    }

    #[test]
    fn rejects_doubled_comma() {
        let diag = Diagnostics::new("t.s");
        let lines = lex(&diag, "mov rax,, rbx").unwrap();
        let err = parse(&diag, lines).unwrap_err();
        assert_eq!(err.message(), "invalid use of commas");
    }

    #[test]
    fn parses_unresolved_memory_operand() {
        let stmts = parse_source("mov rax, [rbx+foo]");
        match &stmts[0] {
            Statement::Instruction { operands, .. } => {
                assert!(matches!(&operands[1], Operand::UnresolvedSib(_)));
            }
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_unresolved_memory_operand() {
        let diag = Diagnostics::new("t.s");
        let lines = lex(&diag, "mov rax, [foo bar]").unwrap();
        let err = parse(&diag, lines).unwrap_err();
        assert_eq!(err.message(), "invalid alternation");
    }
}
