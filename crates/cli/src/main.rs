use std::process::ExitCode;

fn main() -> ExitCode {
    scriven_cli::run()
}
