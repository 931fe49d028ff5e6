use std::{env, fs, process::ExitCode};

use embervm::{diagnostic_for_compile_error, Error, Limits, Sandbox, Value};

/// Converts the value consumed by `EXIT_PROGRAM` into a process exit code
/// (§6.3 "exit code = the value consumed by EXIT_PROGRAM"). Non-numeric
/// top-level results (reachable only via an unguarded `return`, since the
/// compiler always appends `LOAD_CONST 0; EXIT_PROGRAM` as a fallback) exit
/// `0`, matching "exit code is 0 when the program reaches end-of-source"
/// (§7).
fn exit_code_for(value: &Value) -> ExitCode {
    match value {
        Value::Number(n) => ExitCode::from(*n as i64 as u8),
        _ => ExitCode::SUCCESS,
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut file_path = None;
    let mut max_instructions = None;
    let mut max_recursion = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--max-instructions" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(n) => max_instructions = Some(n),
                    None => {
                        eprintln!("error: --max-instructions requires a number");
                        return ExitCode::FAILURE;
                    }
                }
            }
            "--max-recursion" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(n) => max_recursion = Some(n),
                    None => {
                        eprintln!("error: --max-recursion requires a number");
                        return ExitCode::FAILURE;
                    }
                }
            }
            path if file_path.is_none() => file_path = Some(path.to_string()),
            other => {
                eprintln!("error: unexpected argument '{other}'");
                return ExitCode::FAILURE;
            }
        }
        i += 1;
    }

    let Some(file_path) = file_path else {
        eprintln!("usage: embervm <source.file> [--max-instructions N] [--max-recursion N]");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(&file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut sandbox = Sandbox::new();
    sandbox.limit(Limits {
        instruction_limit: max_instructions,
        recursion_limit: max_recursion,
    });

    match sandbox.run(&source) {
        Ok(value) => {
            println!("{}", value.to_print_string());
            exit_code_for(&value)
        }
        Err(Error::Compile(ce)) => {
            eprint!("{}", diagnostic_for_compile_error(&source, &ce));
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
