/// Layout used by the date operators when no `with_dtf` override is active.
pub const DEFAULT_DATE_TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Engine-wide switches, passed in explicitly rather than read from globals.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Makes `load` and friends fail instead of reading files
    pub disable_file_ops: bool,
    /// Makes `env`/`strenv` fail instead of reading the environment
    pub disable_env_ops: bool,
    pub date_time_layout: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            disable_file_ops: false,
            disable_env_ops: false,
            date_time_layout: DEFAULT_DATE_TIME_LAYOUT.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_ops(mut self, enabled: bool) -> Self {
        self.disable_file_ops = !enabled;
        self
    }

    pub fn with_env_ops(mut self, enabled: bool) -> Self {
        self.disable_env_ops = !enabled;
        self
    }

    pub fn with_date_time_layout(mut self, layout: impl Into<String>) -> Self {
        self.date_time_layout = layout.into();
        self
    }
}
