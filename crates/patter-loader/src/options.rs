/// Options for one script load.
#[derive(Clone, Copy, Default, Debug)]
pub struct LoadOptions {
    debug: bool,
    dry: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps debug-level diagnostics in the load log.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parses and logs, but skips event-bus registration and the addon
    /// trigger hook.
    pub fn with_dry(mut self) -> Self {
        self.dry = true;
        self
    }

    pub fn dry(mut self, dry: bool) -> Self {
        self.dry = dry;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_dry(&self) -> bool {
        self.dry
    }
}
