use std::process::ExitCode;

fn main() -> ExitCode {
    kitfinder_cli::run()
}
