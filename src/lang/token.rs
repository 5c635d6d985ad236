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

//! Lexical tokens ("lexemes").

use std::fmt::{self, Display, Formatter};

use super::mnemonic::{Directive, Mnemonic};
use super::register::Register;

/// Punctuation characters recognized by the lexer, carried verbatim as a
/// lexeme kind rather than collapsed into a generic "operator" token, since
/// the parser distinguishes each of them individually.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Punct {
    Comma,
    Star,
    Plus,
    Minus,
    Slash,
    LBracket,
    RBracket,
    Colon,
    Dollar,
}

impl Display for Punct {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Punct::*;
        f.write_str(match self {
            Comma    => ",",
            Star     => "*",
            Plus     => "+",
            Minus    => "-",
            Slash    => "/",
            LBracket => "[",
            RBracket => "]",
            Colon    => ":",
            Dollar   => "$",
        })
    }
}

/// An immediate value together with its declared width.
///
/// `value` holds the raw bit pattern; for negative values it is the
/// two's-complement encoding at the declared `width`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Immediate {
    pub width: u8, // 8, 16, 32, or 64
    pub value: u64,
}

impl Immediate {
    pub fn new(width: u8, value: u64) -> Self {
        debug_assert!(matches!(width, 8 | 16 | 32 | 64));
        Self { width, value }
    }
}

/// The payload-bearing kind of a single source lexeme.
#[derive(Clone, PartialEq, Debug)]
pub enum LexemeKind {
    Directive(Directive),
    Instruction(Mnemonic),
    Register(Register),
    Immediate(Immediate),
    Symbol(String),
    StringLiteral(Vec<u8>),
    Punct(Punct),
    Equ,
}

impl Display for LexemeKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            LexemeKind::Directive(d)     => write!(f, "directive {:?}", d),
            LexemeKind::Instruction(m)   => write!(f, "instruction {:?}", m),
            LexemeKind::Register(r)      => write!(f, "register {}", r),
            LexemeKind::Immediate(i)     => write!(f, "immediate {}", i.value),
            LexemeKind::Symbol(s)        => write!(f, "symbol {}", s),
            LexemeKind::StringLiteral(_) => write!(f, "string literal"),
            LexemeKind::Punct(p)         => write!(f, "'{}'", p),
            LexemeKind::Equ              => write!(f, "'equ'"),
        }
    }
}

/// A single lexeme, tagged with the 1-based source line it came from.
#[derive(Clone, PartialEq, Debug)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub line: u32,
}

impl Lexeme {
    pub fn new(kind: LexemeKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub fn is_punct(&self, p: Punct) -> bool {
        matches!(&self.kind, LexemeKind::Punct(k) if *k == p)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            &self.kind,
            LexemeKind::Punct(Punct::Plus | Punct::Minus | Punct::Star | Punct::Slash)
        )
    }

    pub fn as_immediate(&self) -> Option<Immediate> {
        match &self.kind {
            LexemeKind::Immediate(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_register(&self) -> Option<Register> {
        match &self.kind {
            LexemeKind::Register(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            LexemeKind::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

/// An ordered sequence of lexemes sharing one source line.
pub type Line = Vec<Lexeme>;
