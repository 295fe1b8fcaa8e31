use std::io::{self, BufRead, Write};

/// Asks a yes/no question on the terminal. Anything but an explicit yes,
/// including end of input, counts as no.
pub(crate) fn confirm_on_stdin(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => parse_answer(&answer),
    }
}

pub(crate) fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
