use std::fs::File;
use std::io::{BufWriter, Write};

use crate::error::{Result, TranslateError};

macro_rules! write_asm {
    ($writer:expr, $($line:literal)*) => {
        $writer.write_all(concat!($($line, "\n"),*).as_bytes())
    };
}

#[derive(Clone, Copy)]
enum SegmentSymbol {
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Static,
    Constant,
}

impl SegmentSymbol {
    fn from_str(segment: &str) -> Option<Self> {
        match segment {
            "local" => Some(SegmentSymbol::Local),
            "argument" => Some(SegmentSymbol::Argument),
            "this" => Some(SegmentSymbol::This),
            "that" => Some(SegmentSymbol::That),
            "temp" => Some(SegmentSymbol::Temp),
            "pointer" => Some(SegmentSymbol::Pointer),
            "static" => Some(SegmentSymbol::Static),
            "constant" => Some(SegmentSymbol::Constant),
            _ => None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            SegmentSymbol::Local => "LCL",
            SegmentSymbol::Argument => "ARG",
            SegmentSymbol::This => "THIS",
            SegmentSymbol::That => "THAT",
            SegmentSymbol::Temp => "R5",
            SegmentSymbol::Pointer => "THIS", // Special case handled separately
            SegmentSymbol::Static => "STATIC", // Special case handled separately
            SegmentSymbol::Constant => "CONSTANT", // Special case handled separately
        }
    }
}

pub struct CodeWriter {
    output_file: BufWriter<File>,
    label_counter: usize,
    filename: String,
    /// Name of the function currently being translated, used to mangle
    /// `label`/`goto`/`if-goto` targets into `<function>$<label>`. Code that
    /// appears before any `function` command belongs to `no_function`.
    current_function: String,
}

impl CodeWriter {
    pub fn new(output_filename: &str) -> Result<Self> {
        let file = File::create(output_filename)?;
        let buffered = BufWriter::with_capacity(8192, file);
        Ok(CodeWriter {
            output_file: buffered,
            label_counter: 0,
            filename: String::new(),
            current_function: "no_function".to_string(),
        })
    }

    #[inline]
    pub fn set_filename(&mut self, filename: &str) {
        let name = std::path::Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown");
        self.filename.clear();
        self.filename.push_str(name);
    }

    /// Emits the bootstrap code that every translated program starts with:
    /// initialize `SP` to 256, then call `Sys.init` unconditionally. VM
    /// input that never defines `Sys.init` will fail to assemble later;
    /// that is a documented property of this translator, not a bug to
    /// paper over here.
    pub fn write_init(&mut self) -> Result<()> {
        writeln!(self.output_file, "// bootstrap")?;
        write_asm!(self.output_file,
            "@256"
            "D=A"
            "@SP"
            "M=D"
        )?;
        self.output_file.write_all(b"\n")?;
        self.write_call("Sys.init", 0)
    }

    fn fresh_id(&mut self) -> usize {
        self.label_counter += 1;
        self.label_counter
    }

    fn mangled_label(&self, label: &str) -> String {
        format!("{}${}", self.current_function, label)
    }

    pub fn write_arithmetic(&mut self, command: &str, line: usize) -> Result<()> {
        writeln!(self.output_file, "// vm command:{}", command)?;

        match command {
            "add" => self.write_binary_op("D+M"),
            "sub" => self.write_binary_op("D-M"),
            "and" => self.write_binary_op("D&M"),
            "or" => self.write_binary_op("D|M"),
            "neg" => self.write_unary_op(true),
            "not" => self.write_unary_op(false),
            "eq" => self.write_comparison("JEQ"),
            "gt" => self.write_comparison("JGT"),
            "lt" => self.write_comparison("JLT"),
            other => Err(TranslateError::UnknownCommand {
                command: other.to_string(),
                line,
            }),
        }
    }

    #[inline]
    fn write_binary_op(&mut self, operation: &str) -> Result<()> {
        write!(
            self.output_file,
            "// get the top element of stack\n\
             @SP\n\
             M=M-1\n\
             A=M\n\
             D=M\n\
             // store the result temporarily\n\
             @R14\n\
             M=D\n\
             // get the top element of stack\n\
             @SP\n\
             M=M-1\n\
             A=M\n\
             D=M\n\
             // store the result temporarily\n\
             @R13\n\
             M=D\n\
             @R13\n\
             D=M\n\
             @R14\n\
             D={}\n",
            operation
        )?;

        self.write_push_d()?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    #[inline]
    fn write_unary_op(&mut self, is_neg: bool) -> Result<()> {
        write_asm!(self.output_file,
            "// get the top element of stack"
            "@SP"
            "M=M-1"
            "A=M"
            "D=M"
        )?;

        if is_neg {
            write_asm!(self.output_file,
                "@0"
                "D=A-D"
            )?;
        } else {
            write_asm!(self.output_file, "D=!D")?;
        }

        self.write_push_d()?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    #[inline]
    fn write_comparison(&mut self, jump: &str) -> Result<()> {
        let label_prefix = match jump {
            "JEQ" => "EQ",
            "JGT" => "GT",
            "JLT" => "LT",
            _ => jump,
        };
        let label_num = self.fresh_id();

        write!(
            self.output_file,
            "// get the top element of stack\n\
             @SP\n\
             M=M-1\n\
             A=M\n\
             D=M\n\
             // store the result temporarily\n\
             @R14\n\
             M=D\n\
             // get the top element of stack\n\
             @SP\n\
             M=M-1\n\
             A=M\n\
             D=M\n\
             // store the result temporarily\n\
             @R13\n\
             M=D\n\
             @R13\n\
             D=M\n\
             @R14\n\
             D=D-M\n\
             @{}{}\n\
             D;{}\n\
             // push the value into stack\n\
             @SP\n\
             A=M\n\
             M=0\n\
             @SP\n\
             M=M+1\n\
             @END{}{}\n\
             0;JMP\n\
             ({}{})\n\
             // push the value into stack\n\
             @SP\n\
             A=M\n\
             M=-1\n\
             @SP\n\
             M=M+1\n\
             (END{}{})\n\n",
            label_prefix,
            label_num,
            jump,
            label_prefix,
            label_num,
            label_prefix,
            label_num,
            label_prefix,
            label_num
        )?;
        Ok(())
    }

    pub fn write_push_pop(
        &mut self,
        command: &str,
        segment: &str,
        index: i32,
        line: usize,
    ) -> Result<()> {
        writeln!(
            self.output_file,
            "// vm command:{} {} {}",
            command, segment, index
        )?;

        if command == "push" {
            self.write_push(segment, index, line)?;
        } else {
            self.write_pop(segment, index, line)?;
        }

        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    #[inline]
    fn write_push(&mut self, segment: &str, index: i32, line: usize) -> Result<()> {
        match SegmentSymbol::from_str(segment) {
            Some(SegmentSymbol::Constant) => {
                write!(self.output_file, "@{}\nD=A\n", index)?;
                self.write_push_d()
            }
            Some(
                seg @ (SegmentSymbol::Local
                | SegmentSymbol::Argument
                | SegmentSymbol::This
                | SegmentSymbol::That),
            ) => {
                let segment_symbol = seg.symbol();
                write!(
                    self.output_file,
                    "@{}\nD=M\n@{}\nA=D+A\nD=M\n",
                    segment_symbol, index
                )?;
                self.write_push_d()
            }
            Some(SegmentSymbol::Temp) => {
                write!(self.output_file, "@R5\nD=A\n@{}\nA=D+A\nD=M\n", index)?;
                self.write_push_d()
            }
            Some(SegmentSymbol::Pointer) => {
                write!(self.output_file, "@THIS\nD=A\n@{}\nA=D+A\nD=M\n", index)?;
                self.write_push_d()
            }
            Some(SegmentSymbol::Static) => {
                write!(self.output_file, "@{}.{}\nD=M\n", self.filename, index)?;
                self.write_push_d()
            }
            None => Err(TranslateError::UnknownCommand {
                command: format!("push {segment} {index}"),
                line,
            }),
        }
    }

    #[inline]
    fn write_pop(&mut self, segment: &str, index: i32, line: usize) -> Result<()> {
        match SegmentSymbol::from_str(segment) {
            Some(
                seg @ (SegmentSymbol::Local
                | SegmentSymbol::Argument
                | SegmentSymbol::This
                | SegmentSymbol::That),
            ) => {
                let segment_symbol = seg.symbol();
                write!(
                    self.output_file,
                    "@{}\n\
                     D=M\n\
                     @{}\n\
                     D=D+A\n\
                     // store the result temporarily\n\
                     @R13\n\
                     M=D\n",
                    segment_symbol, index
                )?;

                self.write_pop_to_d()?;

                write_asm!(self.output_file,
                    "// store the top value"
                    "@R13"
                    "A=M"
                    "M=D"
                )?;
                Ok(())
            }
            Some(SegmentSymbol::Temp) => {
                write!(
                    self.output_file,
                    "@5\n\
                     D=A\n\
                     @{}\n\
                     D=D+A\n\
                     // store the result temporarily\n\
                     @R13\n\
                     M=D\n",
                    index
                )?;

                self.write_pop_to_d()?;

                write_asm!(self.output_file,
                    "// store the top value"
                    "@R13"
                    "A=M"
                    "M=D"
                )?;
                Ok(())
            }
            Some(SegmentSymbol::Pointer) => {
                write!(
                    self.output_file,
                    "@THIS\n\
                     D=A\n\
                     @{}\n\
                     D=D+A\n\
                     // store the result temporarily\n\
                     @R13\n\
                     M=D\n",
                    index
                )?;

                self.write_pop_to_d()?;

                write_asm!(self.output_file,
                    "// store the top value"
                    "@R13"
                    "A=M"
                    "M=D"
                )?;
                Ok(())
            }
            Some(SegmentSymbol::Static) => {
                self.write_pop_to_d()?;
                write!(self.output_file, "@{}.{}\nM=D\n", self.filename, index)?;
                Ok(())
            }
            Some(SegmentSymbol::Constant) | None => Err(TranslateError::UnknownCommand {
                command: format!("pop {segment} {index}"),
                line,
            }),
        }
    }

    #[inline]
    fn write_push_d(&mut self) -> Result<()> {
        write_asm!(self.output_file,
            "// push the value into stack"
            "@SP"
            "A=M"
            "M=D"
            "@SP"
            "M=M+1"
        )?;
        Ok(())
    }

    #[inline]
    fn write_pop_to_d(&mut self) -> Result<()> {
        write_asm!(self.output_file,
            "// get the top element of stack"
            "@SP"
            "M=M-1"
            "A=M"
            "D=M"
        )?;
        Ok(())
    }

    pub fn write_label(&mut self, label: &str) -> Result<()> {
        writeln!(self.output_file, "// vm command:label {}", label)?;
        writeln!(self.output_file, "({})", self.mangled_label(label))?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_goto(&mut self, label: &str) -> Result<()> {
        writeln!(self.output_file, "// vm command:goto {}", label)?;
        writeln!(self.output_file, "@{}", self.mangled_label(label))?;
        write_asm!(self.output_file, "0;JMP")?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_if_goto(&mut self, label: &str) -> Result<()> {
        writeln!(self.output_file, "// vm command:if-goto {}", label)?;
        self.write_pop_to_d()?;
        writeln!(self.output_file, "@{}", self.mangled_label(label))?;
        write_asm!(self.output_file, "D;JNE")?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    /// Implements the standard call sequence: push the return address and
    /// the caller's four segment pointers, reposition `ARG`/`LCL` for the
    /// callee's frame, then jump. The return address label is unique per
    /// call site so recursive/re-entrant calls never collide.
    pub fn write_call(&mut self, function_name: &str, num_args: i32) -> Result<()> {
        writeln!(
            self.output_file,
            "// vm command:call {} {}",
            function_name, num_args
        )?;

        let id = self.fresh_id();
        let return_address = format!("return_from_{}_{}", function_name, id);

        writeln!(self.output_file, "@{}", return_address)?;
        write_asm!(self.output_file, "D=A")?;
        self.write_push_d()?;

        for segment in ["LCL", "ARG", "THIS", "THAT"] {
            writeln!(self.output_file, "@{}", segment)?;
            write_asm!(self.output_file, "D=M")?;
            self.write_push_d()?;
        }

        write!(
            self.output_file,
            "@{}\n\
             D=A\n\
             @5\n\
             D=A+D\n\
             @SP\n\
             D=M-D\n\
             @ARG\n\
             M=D\n",
            num_args
        )?;

        write_asm!(self.output_file,
            "@SP"
            "D=M"
            "@LCL"
            "M=D"
        )?;

        writeln!(self.output_file, "@{}", function_name)?;
        write_asm!(self.output_file, "0;JMP")?;

        writeln!(self.output_file, "({})", return_address)?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    /// Emits the function entry point and a prologue that zero-initializes
    /// `num_locals` local slots via a loop driven through `R13`. Sets
    /// `current_function`, which scopes every `label`/`goto`/`if-goto` that
    /// follows until the next `function` command.
    pub fn write_function(&mut self, function_name: &str, num_locals: i32) -> Result<()> {
        writeln!(
            self.output_file,
            "// vm command:function {} {}",
            function_name, num_locals
        )?;
        self.current_function = function_name.to_string();

        let id = self.fresh_id();
        let locals_start = format!("{}_fill_locals_start_{}", function_name, id);
        let locals_end = format!("{}_fill_locals_end_{}", function_name, id);

        write!(
            self.output_file,
            "({})\n\
             @{}\n\
             D=A\n\
             @R13\n\
             M=D\n\
             ({})\n\
             @R13\n\
             MD=M-1\n\
             @{}\n\
             D;JLT\n",
            function_name, num_locals, locals_start, locals_end
        )?;

        // Zero-initializes each of the k local slots.
        write!(self.output_file, "@0\nD=A\n")?;
        self.write_push_d()?;

        writeln!(self.output_file, "@{}", locals_start)?;
        write_asm!(self.output_file, "0;JMP")?;
        writeln!(self.output_file, "({})", locals_end)?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    /// Tears down the callee's frame and returns control to the caller.
    /// Stashes the return address in `R14` before overwriting the argument
    /// slot with the return value: if zero arguments were passed, `ARG`
    /// aliases the slot the return address was read from, so reading it
    /// late would clobber the jump target.
    pub fn write_return(&mut self) -> Result<()> {
        writeln!(self.output_file, "// vm command:return")?;

        write_asm!(self.output_file,
            "@5"
            "D=A"
            "@LCL"
            "A=M-D"
            "D=M"
            "@R14"
            "M=D"
        )?;

        self.write_pop_to_d()?;
        write_asm!(self.output_file,
            "@ARG"
            "A=M"
            "M=D"
        )?;

        write_asm!(self.output_file,
            "@ARG"
            "D=M+1"
            "@SP"
            "M=D"
        )?;

        write_asm!(self.output_file,
            "@LCL"
            "D=M"
            "@R13"
            "M=D"
        )?;

        for segment in ["THAT", "THIS", "ARG", "LCL"] {
            write_asm!(self.output_file,
                "@R13"
                "AM=M-1"
                "D=M"
            )?;
            writeln!(self.output_file, "@{}", segment)?;
            write_asm!(self.output_file, "M=D")?;
        }

        write_asm!(self.output_file,
            "@R14"
            "A=M"
            "0;JMP"
        )?;
        self.output_file.write_all(b"\n")?;
        Ok(())
    }

    #[inline]
    pub fn close(&mut self) -> Result<()> {
        self.output_file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    struct TempOut {
        path: std::path::PathBuf,
    }

    impl TempOut {
        fn new(tag: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "hack_vm_code_writer_test_{}_{}.asm",
                std::process::id(),
                tag
            ));
            Self { path }
        }

        fn path(&self) -> &str {
            self.path.to_str().unwrap()
        }

        fn contents(&self) -> String {
            let mut s = String::new();
            fs::File::open(&self.path)
                .unwrap()
                .read_to_string(&mut s)
                .unwrap();
            s
        }
    }

    impl Drop for TempOut {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    #[test]
    fn test_push_constant_and_add() {
        let tmp = TempOut::new("push_add");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        writer.write_push_pop("push", "constant", 7, 1).unwrap();
        writer.write_push_pop("push", "constant", 8, 2).unwrap();
        writer.write_arithmetic("add", 3).unwrap();
        writer.close().unwrap();

        let out = tmp.contents();
        assert!(out.contains("@7"));
        assert!(out.contains("@8"));
        assert!(out.contains("D=D+M"));
    }

    #[test]
    fn test_unknown_arithmetic_errors() {
        let tmp = TempOut::new("unknown_arith");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        assert!(matches!(
            writer.write_arithmetic("xor", 1),
            Err(TranslateError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn test_unknown_segment_errors() {
        let tmp = TempOut::new("unknown_segment");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        assert!(matches!(
            writer.write_push_pop("push", "nope", 0, 1),
            Err(TranslateError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn test_label_mangling_scoped_to_current_function() {
        let tmp = TempOut::new("label_mangling");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        writer.write_label("LOOP").unwrap();
        writer.write_function("Foo.bar", 0).unwrap();
        writer.write_label("LOOP").unwrap();
        writer.close().unwrap();

        let out = tmp.contents();
        assert!(out.contains("(no_function$LOOP)"));
        assert!(out.contains("(Foo.bar$LOOP)"));
    }

    #[test]
    fn test_function_prologue_pushes_zero_not_seventeen() {
        let tmp = TempOut::new("prologue_zero");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        writer.write_function("Foo.bar", 2).unwrap();
        writer.close().unwrap();

        let out = tmp.contents();
        assert!(out.contains("(Foo.bar)"));
        assert!(out.contains("@0\nD=A"));
        assert!(!out.contains("@17"));
    }

    #[test]
    fn test_call_and_return_round_trip_labels() {
        let tmp = TempOut::new("call_return");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        writer.write_call("Foo.bar", 2).unwrap();
        writer.write_return().unwrap();
        writer.close().unwrap();

        let out = tmp.contents();
        assert!(out.contains("return_from_Foo.bar_1"));
        assert!(out.contains("@Foo.bar"));
        assert!(out.contains("@R14"));
    }

    #[test]
    fn test_bootstrap_calls_sys_init() {
        let tmp = TempOut::new("bootstrap");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        writer.write_init().unwrap();
        writer.close().unwrap();

        let out = tmp.contents();
        assert!(out.contains("@256"));
        assert!(out.contains("@SP"));
        assert!(out.contains("@Sys.init"));
    }

    #[test]
    fn test_static_segment_uses_vm_filename() {
        let tmp = TempOut::new("static");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        writer.set_filename("tests/fixtures/Foo.vm");
        writer.write_push_pop("push", "static", 3, 1).unwrap();
        writer.close().unwrap();

        assert!(tmp.contents().contains("@Foo.3"));
    }

    #[test]
    fn test_pointer_segment_selects_this_or_that() {
        let tmp = TempOut::new("pointer");
        let mut writer = CodeWriter::new(tmp.path()).unwrap();
        writer.write_push_pop("pop", "pointer", 1, 1).unwrap();
        writer.close().unwrap();

        assert!(tmp.contents().contains("@THIS"));
    }
}
