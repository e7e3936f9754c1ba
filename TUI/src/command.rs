use crate::action::Action;

pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> Result<Action, String> {
        let input = input.trim();
        if !input.starts_with('/') {
            return Err("Not a command".to_string());
        }

        let (cmd, _args) = input.split_once(' ').unwrap_or((input, ""));

        match cmd {
            "/help" => Ok(Action::Help),
            "/refresh" => Ok(Action::Refresh),
            "/deselect" => Ok(Action::Deselect),
            "/clear" => Ok(Action::ClearAll),
            "/health" => Ok(Action::Health),
            "/quit" => Ok(Action::Quit),
            _ => Err(format!("Unknown command: {}. Type /help for available commands.", cmd)),
        }
    }
}
