//! Crate-wide constants
//!
//! Single source of truth for intervals, layout spacing, fallback markers
//! and default styling.

/// Execution polling configuration
pub mod polling {
    /// Seconds between execution status fetches
    pub const INTERVAL_SECS: u64 = 2;
}

/// Persisted graph layout
pub mod layout {
    /// Horizontal position of every node in the linear chain
    pub const STEP_X: f64 = 250.0;
    /// Vertical distance between consecutive steps
    pub const STEP_SPACING_Y: f64 = 120.0;
}

/// Literal markers returned when no output can be extracted
pub mod markers {
    pub const NO_OUTPUT: &str = "No output available";
    pub const NO_ERRORS: &str = "No errors available";
}

/// Defaults applied while compiling node descriptors
pub mod descriptor_defaults {
    pub const CATEGORY: &str = "custom";
    pub const VERSION: &str = "1.0.0";
    pub const ICON: &str = "puzzle";
    pub const COLOR: &str = "#6366f1";
}

/// Variable scope names
pub mod scopes {
    pub const INPUT: &str = "input";
    pub const PREVIOUS: &str = "previous";
    pub const STEPS: &str = "steps";
    pub const CONTEXT: &str = "context";
    pub const ENV: &str = "env";
}
