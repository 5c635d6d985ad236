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

mod assembler;
mod lang;
mod message;

use std::env;
use std::process::ExitCode;

use colored::Colorize;

use assembler::Assembler;

/// The name of the assembler.
pub const PROGRAM_NAME: &str = "x86fe";

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let (path, extra) = (args.next(), args.next());

    let path = match (path, extra) {
        (Some(path), None) => path,
        _ => {
            eprintln!("usage: {} <file>", PROGRAM_NAME);
            return ExitCode::FAILURE;
        }
    };

    let mut asm = Assembler::new();
    match asm.assemble_file(&path) {
        Ok(_statements) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_string().red().bold());
            ExitCode::FAILURE
        }
    }
}
