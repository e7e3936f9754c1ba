/// User actions that can be triggered by commands or UI events.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Show help overlay
    Help,
    /// Reload all points from the backend
    Refresh,
    /// Drop the current selection
    Deselect,
    /// Ask for confirmation, then delete everything server-side
    ClearAll,
    /// Probe the backend
    Health,
    /// Quit application
    Quit,
}
