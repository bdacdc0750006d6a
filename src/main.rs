use std::process::ExitCode;

fn main() -> ExitCode {
    match nix_src::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
