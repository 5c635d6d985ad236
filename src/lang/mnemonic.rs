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

//! Mnemonic and directive tables.

/// The 31 instruction mnemonics the front-end recognizes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mnemonic {
    Mov, Lea, Push, Pop,
    Add, Sub, Inc, Dec, Imul, Idiv,
    And, Or, Xor, Not, Shl, Shr,
    Jmp, Je, Jne, Jg, Jge, Jl, Jle,
    Ja, Jae, Jb, Jbe,
    Cmp, Call, Ret, Syscall,
}

impl Mnemonic {
    /// Returns the declared operand count for this mnemonic.
    pub fn arity(self) -> usize {
        use Mnemonic::*;
        match self {
            Mov | Lea | Add | Sub | Imul | Idiv | And | Or | Xor | Shl | Shr | Cmp => 2,
            Push | Pop | Inc | Dec | Not
                | Jmp | Je | Jne | Jg | Jge | Jl | Jle | Ja | Jae | Jb | Jbe
                | Call => 1,
            Ret | Syscall => 0,
        }
    }
}

static MNEMONICS: &[(&str, Mnemonic)] = {
    use Mnemonic::*;
    &[
        ("mov", Mov), ("lea", Lea), ("push", Push), ("pop", Pop),
        ("add", Add), ("sub", Sub), ("inc", Inc), ("dec", Dec),
        ("imul", Imul), ("idiv", Idiv),
        ("and", And), ("or", Or), ("xor", Xor), ("not", Not),
        ("shl", Shl), ("shr", Shr),
        ("jmp", Jmp), ("je", Je), ("jne", Jne), ("jg", Jg), ("jge", Jge),
        ("jl", Jl), ("jle", Jle), ("ja", Ja), ("jae", Jae), ("jb", Jb), ("jbe", Jbe),
        ("cmp", Cmp), ("call", Call), ("ret", Ret), ("syscall", Syscall),
    ]
};

/// Looks up a mnemonic by its case-folded spelling.
pub fn lookup_mnemonic(name: &str) -> Option<Mnemonic> {
    MNEMONICS.iter().find(|&&(n, _)| n == name).map(|&(_, m)| m)
}

// ----------------------------------------------------------------------------

/// The operand shape a directive declares: a bare symbol, or an
/// immediate-or-string expression.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DirectiveOperandKind {
    Symbol,
    Immediate,
}

/// The 11 assembler directives the front-end recognizes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Directive {
    Db, Dw, Dd, Dq,
    Resb, Resw, Resd, Resq,
    Global, Extern, Section,
}

impl Directive {
    /// Returns the operand kind this directive declares.
    pub fn operand_kind(self) -> DirectiveOperandKind {
        use Directive::*;
        match self {
            Db | Dw | Dd | Dq | Resb | Resw | Resd | Resq => DirectiveOperandKind::Immediate,
            Global | Extern | Section => DirectiveOperandKind::Symbol,
        }
    }

    /// Returns whether this directive accepts a string-literal operand
    /// (only `db` does, per the data-directive family).
    pub fn accepts_string(self) -> bool {
        matches!(self, Directive::Db)
    }
}

static DIRECTIVES: &[(&str, Directive)] = {
    use Directive::*;
    &[
        ("db", Db), ("dw", Dw), ("dd", Dd), ("dq", Dq),
        ("resb", Resb), ("resw", Resw), ("resd", Resd), ("resq", Resq),
        ("global", Global), ("extern", Extern), ("section", Section),
    ]
};

/// Looks up a directive by its case-folded spelling.
pub fn lookup_directive(name: &str) -> Option<Directive> {
    DIRECTIVES.iter().find(|&&(n, _)| n == name).map(|&(_, d)| d)
}
