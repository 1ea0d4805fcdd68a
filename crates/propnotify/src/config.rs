//! Registry configuration.

/// What `fire_event` does when a listener fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Deliver to every listener, then report all failures together.
    #[default]
    Aggregate,
    /// Stop at the first failing listener and report it.
    FailFast,
}

/// Environment the owning component runs in.
///
/// These flags are carried for the subject owner; the registry itself does
/// not change behavior based on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Whether the subject is being manipulated by a design-time tool.
    pub design_time: bool,
    /// Whether a graphical interface is available.
    pub gui_available: bool,
}

impl Environment {
    /// Set the design-time flag.
    pub fn with_design_time(mut self, design_time: bool) -> Self {
        self.design_time = design_time;
        self
    }

    /// Set the GUI-available flag.
    pub fn with_gui_available(mut self, gui_available: bool) -> Self {
        self.gui_available = gui_available;
        self
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            design_time: false,
            gui_available: true,
        }
    }
}

/// Change registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How listener failures are handled during dispatch.
    pub failure_policy: FailurePolicy,

    /// Convert listener panics into `ListenerError::Panicked`.
    ///
    /// When disabled, a panicking listener unwinds through `fire_event`.
    pub catch_panics: bool,

    /// Environment flags handed to the owning component.
    pub environment: Environment,
}

impl RegistryConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            catch_panics: true,
            environment: Environment::default(),
        }
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Enable or disable panic capture.
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    /// Set the environment flags.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Check if failures are aggregated.
    pub fn aggregates_failures(&self) -> bool {
        self.failure_policy == FailurePolicy::Aggregate
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}
