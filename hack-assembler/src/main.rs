//! Hack Assembler - Main Entry Point
//!
//! A two-pass assembler for the Hack assembly language (`Nand2Tetris` Project 6).
//!
//! # Architecture
//! - **Pass 1**: Builds the symbol table by recording label positions
//! - **Pass 2**: Generates machine code, resolving all symbols
//!
//! # Usage
//! ```bash
//! cargo run <input.asm> [output.hack]
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process;

mod code;
mod error;
mod parser;
mod symbol_table;

use error::{AssemblerError, Result};
use parser::{CommandType, ParserLines};
use symbol_table::SymbolTable;

/// Maximum value a 15-bit A-instruction literal can hold.
const MAX_CONSTANT: i64 = 32_767;

/// Reads assembly file into memory
fn read_lines(path: &str) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    reader
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// First pass: Build symbol table with label addresses
///
/// Scans through all lines and records the ROM address of each label.
/// Label definitions (L-commands) don't generate code, so they don't
/// increment the ROM address counter. Pass 1 only ever calls `add_entry`,
/// never `resolve_or_allocate`, so it stays purely observational.
fn first_pass(lines: &[String], symbol_table: &mut SymbolTable) -> Result<()> {
    let mut rom_address = 0u16;
    let mut parser = ParserLines::from_lines(lines);

    while parser.advance() {
        match parser.command_type()? {
            CommandType::LCommand => {
                // Labels mark the next instruction's address
                let symbol = parser.symbol()?;
                symbol_table.add_entry(symbol, rom_address);
            }
            CommandType::ACommand | CommandType::CCommand => {
                // Actual instructions increment the address
                rom_address += 1;
            }
        }
    }

    Ok(())
}

/// Parses an A-instruction body as a non-negative 15-bit literal, or `None` if
/// it isn't a decimal literal at all (in which case it's a symbol).
fn as_literal(symbol: &str, line: usize) -> Result<Option<u16>> {
    let Ok(value) = symbol.parse::<i64>() else {
        return Ok(None);
    };
    if !(0..=MAX_CONSTANT).contains(&value) {
        return Err(AssemblerError::ConstantOverflow { value, line });
    }
    // value is in 0..=32767, so this narrowing is lossless.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(Some(value as u16))
}

/// Second pass: Generate machine code
///
/// Translates each instruction to binary:
/// - A-commands: Resolve symbols to addresses
/// - C-commands: Encode dest, comp, and jump fields
/// - L-commands: Skip (already processed in pass 1)
fn second_pass(
    lines: &[String],
    symbol_table: &mut SymbolTable,
    writer: &mut BufWriter<File>,
) -> Result<()> {
    let mut ram_address = 16u16; // Variables start at RAM[16]
    let mut parser = ParserLines::from_lines(lines);

    while parser.advance() {
        let line_number = parser.line_number();
        match parser.command_type()? {
            CommandType::ACommand => {
                let symbol = parser.symbol()?;

                // Try to parse as a literal first; otherwise resolve/allocate as a variable.
                let address = match as_literal(symbol, line_number)? {
                    Some(value) => value,
                    None => symbol_table.resolve_or_allocate(symbol, &mut ram_address),
                };

                let instruction = code::encode_a_instruction(address);
                writeln!(writer, "{instruction}")?;
            }
            CommandType::CCommand => {
                let dest = parser.dest()?.unwrap_or("");
                let comp = parser.comp()?.unwrap_or("");
                let jump = parser.jump()?.unwrap_or("");

                let instruction = code::encode_c_instruction(dest, comp, jump, line_number)?;
                writeln!(writer, "{instruction}")?;
            }
            CommandType::LCommand => {
                // Already bound to an address in pass 1; emits no code.
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Determines the output file path: replace a trailing `.asm` (case-insensitive)
/// with `.hack`, or append `.hack` if the input has no such suffix.
fn output_path(input: &str, explicit_output: Option<&str>) -> String {
    if let Some(explicit) = explicit_output {
        return explicit.to_string();
    }

    if input.len() >= 4 && input[input.len() - 4..].eq_ignore_ascii_case(".asm") {
        format!("{}.hack", &input[..input.len() - 4])
    } else {
        format!("{input}.hack")
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if !(2..=3).contains(&args.len()) {
        eprintln!("Usage: {} <input.asm> [output.hack]", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} Add.asm", args[0]);
        eprintln!("  {} Add.asm Add.hack", args[0]);
        process::exit(1);
    }

    let input_path = &args[1];

    // Read source file
    let lines = read_lines(input_path)?;

    // Initialize symbol table with predefined symbols
    let mut symbol_table = SymbolTable::new();

    // Pass 1: Build symbol table
    first_pass(&lines, &mut symbol_table)?;

    // Pass 2: Generate machine code
    let output = output_path(input_path, args.get(2).map(String::as_str));
    let output_file = File::create(&output)?;
    let mut writer = BufWriter::new(output_file);

    second_pass(&lines, &mut symbol_table, &mut writer)?;

    println!("Assembly completed. Output written to {output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
