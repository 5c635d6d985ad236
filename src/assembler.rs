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

//! The top-level driver tying lexer, folder, and parser into one pass.

use std::fs;

use crate::lang::ast::Statement;
use crate::lang::{lexer, parser};
use crate::message::{AsmResult, Diagnostics};

/// Runs the front-end pipeline over a single source file.
pub struct Assembler {
    diag: Diagnostics,
}

impl Assembler {
    /// Creates an assembler with no file bound yet.
    pub fn new() -> Self {
        Self { diag: Diagnostics::new("") }
    }

    /// Reads `path`, lexes and parses it, and returns the resulting
    /// statement stream. Any I/O failure is reported as a fatal diagnostic
    /// at line 0, the same shape as a source-level error.
    pub fn assemble_file(&mut self, path: &str) -> AsmResult<Vec<Statement>> {
        self.diag = Diagnostics::new(path);
        let source = fs::read_to_string(path)
            .map_err(|e| self.diag.error(0, format!("could not read file: {e}")))?;
        self.assemble_str(&source)
    }

    /// Lexes and parses already-loaded source text under the current
    /// diagnostics context.
    fn assemble_str(&self, source: &str) -> AsmResult<Vec<Statement>> {
        let lines = lexer::lex(&self.diag, source)?;
        parser::parse(&self.diag, lines)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}
