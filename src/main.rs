use std::process::ExitCode;

fn main() -> ExitCode {
    match ocrdesk_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[!] {}", err);
            ExitCode::FAILURE
        }
    }
}
