use std::process::ExitCode;

fn main() -> ExitCode {
  shelfmark_lib::run()
}
