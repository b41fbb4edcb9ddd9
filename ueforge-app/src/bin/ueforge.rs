use std::process::ExitCode;

pub fn main() -> ExitCode {
    match ueforge_app::app::launch() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
