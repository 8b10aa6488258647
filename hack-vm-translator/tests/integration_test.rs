use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn run_translator(input: &Path) -> Result<(), String> {
    let output = Command::new(env!("CARGO_BIN_EXE_vm-translator"))
        .arg(input)
        .output()
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).into_owned());
    }
    Ok(())
}

#[test]
fn translates_single_file_and_emits_bootstrap() {
    let input = fixtures_dir().join("simple_add.vm");
    let output = input.with_extension("asm");
    let _ = fs::remove_file(&output);

    run_translator(&input).expect("translation should succeed");
    let asm = fs::read_to_string(&output).expect("output file should exist");
    let _ = fs::remove_file(&output);

    // Bootstrap always precedes the file's own commands.
    assert!(asm.starts_with("// bootstrap"));
    assert!(asm.contains("@Sys.init"));

    assert!(asm.contains("@7"));
    assert!(asm.contains("@8"));
    assert!(asm.contains("D=D+M"));
}

#[test]
fn translates_every_addressable_segment_and_branch() {
    let input = fixtures_dir().join("stack_test/stack_test.vm");
    let output = input.with_extension("asm");
    let _ = fs::remove_file(&output);

    run_translator(&input).expect("translation should succeed");
    let asm = fs::read_to_string(&output).expect("output file should exist");
    let _ = fs::remove_file(&output);

    assert!(asm.contains("@LCL"));
    assert!(asm.contains("@THIS"));
    assert!(asm.contains("stack_test.0")); // static symbol uses the vm basename
    assert!(asm.contains("@5")); // temp base

    // Label/goto/if-goto all mangled under the file-level scope (no enclosing function).
    assert!(asm.contains("(no_function$SKIP)"));
    assert!(asm.contains("(no_function$END)"));
    assert!(asm.contains("@no_function$SKIP"));
    assert!(asm.contains("@no_function$END"));
}

#[test]
fn translates_directory_with_bootstrap_and_function_call() {
    let dir = fixtures_dir().join("function_calls");
    let output = dir.join("function_calls.asm");
    let _ = fs::remove_file(&output);

    run_translator(&dir).expect("translation should succeed");
    let asm = fs::read_to_string(&output).expect("output file should exist");
    let _ = fs::remove_file(&output);

    // Bootstrap appears exactly once, before any file-specific code.
    assert_eq!(asm.matches("// bootstrap").count(), 1);
    let bootstrap_pos = asm.find("// bootstrap").unwrap();
    let sys_init_def_pos = asm.find("(Sys.init)").unwrap();
    assert!(bootstrap_pos < sys_init_def_pos);

    // Both functions were translated and scoped their own labels.
    assert!(asm.contains("(Sys.init)"));
    assert!(asm.contains("(Main.double)"));
    assert!(asm.contains("(Sys.init$WHILE)"));

    // The call sequence reaches Main.double and the prologue zero-fills its one local.
    assert!(asm.contains("@Main.double"));
    assert!(asm.contains("return_from_Main.double_"));

    // Function prologue must push a literal zero per local, not the historical 17.
    let prologue_start = asm.find("(Main.double)").unwrap();
    let prologue = &asm[prologue_start..prologue_start + 400];
    assert!(prologue.contains("@0\nD=A"));
    assert!(!prologue.contains("@17"));
}

#[test]
fn rejects_asm_input_up_front() {
    let dir = fixtures_dir().join("rejects_asm");
    fs::create_dir_all(&dir).unwrap();
    let asm_path = dir.join("Bogus.asm");
    fs::write(&asm_path, "@0\nD=A\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_vm-translator"))
        .arg(&asm_path)
        .output()
        .expect("process should run");

    let _ = fs::remove_dir_all(&dir);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn errors_on_missing_input_path() {
    let output = Command::new(env!("CARGO_BIN_EXE_vm-translator"))
        .arg("/no/such/path.vm")
        .output()
        .expect("process should run");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}
