mod code_writer;
mod driver;
mod error;
mod parser;

use std::env;

use error::Result;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <input.vm | input directory>", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let (vm_files, output_path) = driver::resolve(input_path)?;
    driver::translate(&vm_files, &output_path)?;

    println!(
        "Translation complete: {} -> {}",
        input_path,
        output_path.display()
    );
    Ok(())
}
