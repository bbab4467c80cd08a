use std::env;
use std::fs;
use std::process::ExitCode;

use jessie::{Interpreter, StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: jessie <script.js>");
        return ExitCode::FAILURE;
    };
    let code = match read_file(file_path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let interp = match Interpreter::new(&code) {
        Ok(interp) => interp,
        Err(err) => {
            eprintln!("{file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    match interp.run(&mut StdPrint) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{file_path}: {err}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("error reading {file_path}: {err}"));
        }
    }
    fs::read_to_string(file_path).map_err(|err| format!("error reading {file_path}: {err}"))
}
