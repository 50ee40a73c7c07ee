/// Status registry keys read by external monitors.
pub mod keys {
    /// Identity of the probe that is currently running.
    /// Value: `"<probe_version>-<checksum>"`, or `""` when no probe is loaded.
    pub const ACTIVE_IDENTITY: &str = "activeIdentity";

    /// Outcome of the last attach/detach transition.
    /// Value: `"attach"`, `"detach"`, `"prober unload fail"`, or failure text.
    pub const TRANSITION_STATUS: &str = "transitionStatus";

    /// Set once the agent has handled its first valid command.
    /// Value: [`super::status::AGENT_MARKER`]
    pub const AGENT_MARKER: &str = "agentMarker";

    /// Every key the agent writes, in snapshot order.
    pub const ALL: &[&str] = &[ACTIVE_IDENTITY, TRANSITION_STATUS, AGENT_MARKER];
}

/// Fixed status values.
pub mod status {
    /// A probe was attached and started.
    pub const ATTACH: &str = "attach";

    /// The active probe was stopped and released.
    pub const DETACH: &str = "detach";

    /// `stop`/`uninit` failed; the probe was released anyway.
    pub const UNLOAD_FAIL: &str = "prober unload fail";

    /// Marker value published under [`super::keys::AGENT_MARKER`].
    pub const AGENT_MARKER: &str = "rasp-agent";

    /// Status text for a module that failed integrity verification.
    pub fn check_failed(module_path: &str) -> String {
        format!("{module_path} check fail!")
    }

    /// Status text for a module that verified but could not be brought up.
    pub fn loading_failed(module_path: &str) -> String {
        format!("{module_path} loading fail!")
    }
}

/// Compose the `activeIdentity` value for a running probe.
pub fn identity_value(probe_version: &str, checksum: &str) -> String {
    format!("{probe_version}-{checksum}")
}
