//! trialrun binary entry point.
//!
//! Classified errors (configuration, planning, usage) print one short
//! line; anything unanticipated prints the full diagnostic chain.

fn main() {
    match trialrun_cli::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            match trialrun_cli::classified_message(&err) {
                Some(message) => eprintln!("{message}"),
                None => eprintln!("{err:?}"),
            }
            std::process::exit(2);
        }
    }
}
