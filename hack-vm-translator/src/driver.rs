//! Resolves a command-line path into the set of `.vm` files to translate and
//! the single `.asm` file they are translated into, then drives the
//! parser/code-writer pair over each file in turn.

use std::fs;
use std::path::{Path, PathBuf};

use crate::code_writer::CodeWriter;
use crate::error::{Result, TranslateError};
use crate::parser::{CommandType, Parser};

/// Enumerates the `.vm` files named by `input_path` and the `.asm` file the
/// translation is written to.
///
/// A directory input collects every `*.vm` file directly inside it (matched
/// case-insensitively) in sorted order, and writes its output next to the
/// directory, named after the directory itself. A file input translates just
/// that file, and writes its output as a sibling with a `.asm` extension.
///
/// `.asm` input is rejected outright. Writing output to the same path as the
/// input would otherwise truncate a `.asm` file to empty before any commands
/// are read from it, so a `.asm` passed by mistake "translates" into a silent
/// empty file instead of a clear error. Rejecting it up front is cheaper than
/// explaining that later.
pub fn resolve(input_path: &str) -> Result<(Vec<PathBuf>, PathBuf)> {
    let path = Path::new(input_path);

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if ext.eq_ignore_ascii_case("asm") {
            return Err(TranslateError::NoInputFound {
                path: format!("{input_path} (refusing to translate a .asm file)"),
            });
        }
    }

    if path.is_dir() {
        let mut vm_files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("vm"))
            })
            .collect();
        vm_files.sort();

        if vm_files.is_empty() {
            return Err(TranslateError::NoInputFound {
                path: input_path.to_string(),
            });
        }

        let dir_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input_path.to_string());
        let output = path.join(format!("{dir_name}.asm"));
        Ok((vm_files, output))
    } else if path.is_file() {
        let mut output = path.to_path_buf();
        output.set_extension("asm");
        Ok((vec![path.to_path_buf()], output))
    } else {
        Err(TranslateError::NoInputFound {
            path: input_path.to_string(),
        })
    }
}

/// Translates every command in `vm_files`, in order, into `output_path`.
/// Bootstrap code (stack-pointer init + `call Sys.init 0`) is emitted once,
/// before the first file's commands, regardless of how many files there are.
pub fn translate(vm_files: &[PathBuf], output_path: &Path) -> Result<()> {
    let mut code_writer = CodeWriter::new(output_path.to_str().ok_or_else(|| {
        TranslateError::NoInputFound {
            path: output_path.to_string_lossy().into_owned(),
        }
    })?)?;

    code_writer.write_init()?;

    for vm_file in vm_files {
        let file_path = vm_file.to_str().ok_or_else(|| TranslateError::NoInputFound {
            path: vm_file.to_string_lossy().into_owned(),
        })?;

        let mut parser = Parser::new(file_path)?;
        code_writer.set_filename(file_path);

        while parser.has_more_commands() {
            parser.advance();
            let line = parser.line_number();

            match parser.command_type()? {
                CommandType::Arithmetic => {
                    code_writer.write_arithmetic(parser.arg1()?, line)?;
                }
                CommandType::Push => {
                    let segment = parser.arg1()?.to_string();
                    let index = parser.arg2()?;
                    code_writer.write_push_pop("push", &segment, index, line)?;
                }
                CommandType::Pop => {
                    let segment = parser.arg1()?.to_string();
                    let index = parser.arg2()?;
                    code_writer.write_push_pop("pop", &segment, index, line)?;
                }
                CommandType::Label => {
                    code_writer.write_label(parser.arg1()?)?;
                }
                CommandType::Goto => {
                    code_writer.write_goto(parser.arg1()?)?;
                }
                CommandType::If => {
                    code_writer.write_if_goto(parser.arg1()?)?;
                }
                CommandType::Function => {
                    let name = parser.arg1()?.to_string();
                    let num_locals = parser.arg2()?;
                    code_writer.write_function(&name, num_locals)?;
                }
                CommandType::Call => {
                    let name = parser.arg1()?.to_string();
                    let num_args = parser.arg2()?;
                    code_writer.write_call(&name, num_args)?;
                }
                CommandType::Return => {
                    code_writer.write_return()?;
                }
            }
        }
    }

    code_writer.close()
}
