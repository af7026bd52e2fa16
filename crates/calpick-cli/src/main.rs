use std::process::ExitCode;

fn main() -> ExitCode {
    match calpick_core::run(std::env::args_os().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("calpick: {err:#}");
            ExitCode::FAILURE
        }
    }
}
