#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Chart,
}

#[derive(Default)]
pub struct UIState {
    pub input: String,

    // Command popup state
    pub command_selection: Option<usize>,

    // Which panel is focused
    pub focus: Focus,

    // Overlays
    pub show_help: bool,
    pub confirm_reset: bool,
}

impl UIState {
    pub fn new() -> Self {
        Self::default()
    }
}
