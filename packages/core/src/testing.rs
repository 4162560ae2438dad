//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::driver::{Driver, DriverContext, DriverError, DriverOptions, DriverRegistry, RunState};
use crate::host::{AuthOptions, EngineOptions, HostEnv, SwarmOptions};
use crate::poll::PollPolicy;
use crate::provision::{ProvisionError, Provisioner, ProvisionerDetector};
use crate::ssh::{RemoteShell, ShellError, SshTarget};

#[derive(Debug)]
struct MockState {
    state: RunState,
    queued_states: VecDeque<RunState>,
    stick_state: bool,
    state_reads: u32,
    calls: Vec<String>,
    contexts: Vec<DriverContext>,
    provisioning: bool,
    fail_state: bool,
    fail_create: bool,
    fail_start: bool,
    fail_remove: bool,
    fail_provision: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            state: RunState::Stopped,
            queued_states: VecDeque::new(),
            stick_state: false,
            state_reads: 0,
            calls: Vec::new(),
            contexts: Vec::new(),
            provisioning: true,
            fail_state: false,
            fail_create: false,
            fail_start: false,
            fail_remove: false,
            fail_provision: false,
        }
    }
}

/// Shared script and call log for the mock driver and provisioner
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<MockState>>);

impl Recorder {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    fn record(&self, call: &str) {
        self.lock().calls.push(call.to_string());
    }

    /// Operations performed so far, in order (state reads excluded)
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Contexts handed to the mock driver factory, oldest first
    pub fn contexts(&self) -> Vec<DriverContext> {
        self.lock().contexts.clone()
    }

    pub fn state_reads(&self) -> u32 {
        self.lock().state_reads
    }

    pub fn set_state(&self, state: RunState) {
        self.lock().state = state;
    }

    /// States returned by the next state reads before the current one
    pub fn queue_states(&self, states: impl IntoIterator<Item = RunState>) {
        self.lock().queued_states.extend(states);
    }

    /// Keep the current state no matter which operation runs
    pub fn stick_state(&self, stick: bool) {
        self.lock().stick_state = stick;
    }

    pub fn set_provisioning(&self, supported: bool) {
        self.lock().provisioning = supported;
    }

    pub fn fail_state(&self, fail: bool) {
        self.lock().fail_state = fail;
    }

    pub fn fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    pub fn fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    pub fn fail_remove(&self, fail: bool) {
        self.lock().fail_remove = fail;
    }

    pub fn fail_provision(&self, fail: bool) {
        self.lock().fail_provision = fail;
    }

    fn transition(&self, call: &str, to: RunState) {
        let mut state = self.lock();
        state.calls.push(call.to_string());
        if !state.stick_state {
            state.state = to;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MockFields {
    #[serde(rename = "Marker", default)]
    marker: String,
}

/// Scriptable in-memory driver registered as `mock`
#[derive(Debug)]
pub struct MockDriver {
    ctx: DriverContext,
    fields: MockFields,
    recorder: Recorder,
}

impl MockDriver {
    pub const NAME: &'static str = "mock";

    pub fn new(ctx: DriverContext, recorder: Recorder) -> Self {
        Self {
            ctx,
            fields: MockFields::default(),
            recorder,
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn driver_name(&self) -> &'static str {
        Self::NAME
    }

    fn set_config_from_flags(&mut self, flags: &DriverOptions) -> Result<(), DriverError> {
        if let Some(marker) = flags.get("marker") {
            self.fields.marker = marker.to_string();
        }
        Ok(())
    }

    fn supports_provisioning(&self) -> bool {
        self.recorder.lock().provisioning
    }

    async fn create(&mut self) -> Result<(), DriverError> {
        if self.recorder.lock().fail_create {
            self.recorder.record("create");
            return Err(DriverError::Operation("create failed".to_string()));
        }
        self.recorder.transition("create", RunState::Running);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), DriverError> {
        if self.recorder.lock().fail_start {
            self.recorder.record("start");
            return Err(DriverError::Operation("start failed".to_string()));
        }
        self.recorder.transition("start", RunState::Running);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DriverError> {
        self.recorder.transition("stop", RunState::Stopped);
        Ok(())
    }

    async fn kill(&mut self) -> Result<(), DriverError> {
        self.recorder.transition("kill", RunState::Stopped);
        Ok(())
    }

    async fn remove(&mut self) -> Result<(), DriverError> {
        self.recorder.record("remove");
        if self.recorder.lock().fail_remove {
            return Err(DriverError::Operation(format!(
                "cannot remove {}",
                self.ctx.machine_name
            )));
        }
        Ok(())
    }

    async fn state(&self) -> Result<RunState, DriverError> {
        let mut state = self.recorder.lock();
        state.state_reads += 1;
        if state.fail_state {
            return Err(DriverError::Operation("state unavailable".to_string()));
        }
        Ok(state.queued_states.pop_front().unwrap_or(state.state))
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok("tcp://127.0.0.1:2376".to_string())
    }

    async fn ssh_hostname(&self) -> Result<String, DriverError> {
        Ok("127.0.0.1".to_string())
    }

    fn ssh_port(&self) -> Result<u16, DriverError> {
        Ok(22)
    }

    fn ssh_username(&self) -> String {
        "docker".to_string()
    }

    fn ssh_key_path(&self) -> Option<PathBuf> {
        Some(self.ctx.store_path.join("id_rsa"))
    }

    fn save_fields(&self) -> Result<serde_json::Value, DriverError> {
        Ok(serde_json::to_value(&self.fields)?)
    }

    fn load_fields(&mut self, raw: serde_json::Value) -> Result<(), DriverError> {
        self.fields = serde_json::from_value(raw)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ShellLog {
    commands: Vec<String>,
    uploads: Vec<(String, Vec<u8>)>,
    reachable: Vec<String>,
    unreachable_left: u32,
}

/// Remote shell that records commands instead of running them
#[derive(Debug, Default)]
pub struct MockShell {
    log: Mutex<ShellLog>,
    failing: Vec<String>,
    outputs: Vec<(String, String)>,
}

impl MockShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every command containing `pattern`
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    /// Answer commands containing `pattern` with `output`
    pub fn with_output(mut self, pattern: &str, output: &str) -> Self {
        self.outputs.push((pattern.to_string(), output.to_string()));
        self
    }

    /// Report the first `n` reachability checks as failed
    pub fn unreachable_for(self, n: u32) -> Self {
        self.log.lock().unwrap().unreachable_left = n;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().commands.clone()
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.log.lock().unwrap().uploads.clone()
    }

    pub fn reachable_calls(&self) -> Vec<String> {
        self.log.lock().unwrap().reachable.clone()
    }

    fn answer(&self, command: &str) -> Result<String, ShellError> {
        if self.failing.iter().any(|p| command.contains(p.as_str())) {
            return Err(ShellError::CommandFailed {
                command: command.to_string(),
                status: Some(1),
                stderr: "mock failure".to_string(),
            });
        }
        Ok(self
            .outputs
            .iter()
            .find(|(p, _)| command.contains(p.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RemoteShell for MockShell {
    async fn reachable(&self, addr: &str) -> Result<(), ShellError> {
        let mut log = self.log.lock().unwrap();
        log.reachable.push(addr.to_string());
        if log.unreachable_left > 0 {
            log.unreachable_left -= 1;
            return Err(ShellError::Unreachable {
                addr: addr.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn run(&self, _target: &SshTarget, command: &str) -> Result<String, ShellError> {
        self.log.lock().unwrap().commands.push(command.to_string());
        self.answer(command)
    }

    async fn run_with_input(
        &self,
        _target: &SshTarget,
        command: &str,
        input: &[u8],
    ) -> Result<String, ShellError> {
        self.log
            .lock()
            .unwrap()
            .uploads
            .push((command.to_string(), input.to_vec()));
        self.answer(command)
    }
}

/// Provisioner that only records what it was asked to do
pub struct MockProvisioner {
    recorder: Recorder,
}

#[async_trait]
impl Provisioner for MockProvisioner {
    fn name(&self) -> String {
        "mock".to_string()
    }

    async fn provision(
        &self,
        _swarm: &SwarmOptions,
        _auth: &AuthOptions,
        _engine: &EngineOptions,
    ) -> Result<(), ProvisionError> {
        self.recorder.record("provision");
        if self.recorder.lock().fail_provision {
            return Err(ProvisionError::Unsupported("mock".to_string()));
        }
        Ok(())
    }

    async fn configure_auth(&self, _auth: &AuthOptions) -> Result<(), ProvisionError> {
        self.recorder.record("configure_auth");
        Ok(())
    }
}

/// Detector that always hands out a [`MockProvisioner`]
pub struct MockDetector {
    recorder: Recorder,
}

#[async_trait]
impl ProvisionerDetector for MockDetector {
    async fn detect(
        &self,
        _machine_name: &str,
        _driver: &dyn Driver,
    ) -> Result<Box<dyn Provisioner>, ProvisionError> {
        self.recorder.record("detect");
        Ok(Box::new(MockProvisioner {
            recorder: self.recorder.clone(),
        }))
    }
}

/// Built-in drivers plus `mock` bound to `recorder`
pub fn mock_registry(recorder: &Recorder) -> DriverRegistry {
    let mut registry = DriverRegistry::builtin();
    let recorder = recorder.clone();
    registry.register(MockDriver::NAME, move |ctx| {
        recorder.lock().contexts.push(ctx.clone());
        Box::new(MockDriver::new(ctx, recorder.clone()))
    });
    registry
}

/// Host environment with mock collaborators and millisecond waits
pub fn test_env(recorder: &Recorder) -> HostEnv {
    let fast = PollPolicy::new(Duration::from_millis(1), 5);
    HostEnv::default()
        .with_drivers(mock_registry(recorder))
        .with_shell(Arc::new(MockShell::new()))
        .with_provisioners(Arc::new(MockDetector {
            recorder: recorder.clone(),
        }))
        .with_polls(fast, fast)
}
