//! Color utilities for CLI output

use console::{Style, StyledObject};
use nodewright_core::RunState;

/// Style a run state with appropriate colors
///
/// - Running -> green bold
/// - Stopped, Error -> red
/// - Starting, Stopping, Paused, Saved -> yellow
/// - other -> dim
pub fn state_style(state: RunState) -> StyledObject<String> {
    let style = match state {
        RunState::Running => Style::new().green().bold(),
        RunState::Stopped | RunState::Error => Style::new().red(),
        RunState::Starting | RunState::Stopping | RunState::Paused | RunState::Saved => {
            Style::new().yellow()
        }
        RunState::None | RunState::Timeout => Style::new().dim(),
    };
    style.apply_to(state.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // StyledObject::to_string() includes ANSI codes when colors are enabled,
    // so only the text content is checked.

    #[test]
    fn state_style_keeps_state_name() {
        for state in [
            RunState::Running,
            RunState::Stopped,
            RunState::Starting,
            RunState::Timeout,
        ] {
            assert!(state_style(state).to_string().contains(&state.to_string()));
        }
    }

    #[test]
    fn state_style_none_is_dim() {
        assert!(state_style(RunState::None).to_string().contains("None"));
    }
}
