/// One line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank or whitespace-only line
    Empty,
    Exit,
    ShowMemory,
    Forget,
    /// Anything else, trimmed
    Query(String),
}

impl Command {
    /// Classify a raw input line. Control words match case-insensitively
    /// after trimming.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            Command::Empty
        } else if trimmed.eq_ignore_ascii_case("exit") {
            Command::Exit
        } else if trimmed.eq_ignore_ascii_case("show memory") {
            Command::ShowMemory
        } else if trimmed.eq_ignore_ascii_case("forget") {
            Command::Forget
        } else {
            Command::Query(trimmed.to_string())
        }
    }
}
