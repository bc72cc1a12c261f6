//! Shared fakes for orchestration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use svcdeploy_core::config::{DeployConfig, Timings, WrapperConfig};
use svcdeploy_core::fs::{LocalTree, TreeOps};
use svcdeploy_core::service::runner::render_command;
use svcdeploy_core::service::{
    CommandOutcome, CommandRunner, ServiceControl, ServiceQuery, ServiceWrapper,
};
use svcdeploy_core::types::ServiceDefinition;
use tempfile::TempDir;

pub fn ok(command: impl Into<String>) -> CommandOutcome {
    CommandOutcome {
        command: command.into(),
        success: true,
        exit_code: Some(0),
        stdout: String::new(),
        stderr: String::new(),
    }
}

pub fn failed(command: impl Into<String>, stderr: &str, code: i32) -> CommandOutcome {
    CommandOutcome {
        command: command.into(),
        success: false,
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// In-memory service registry acting as both the OS service-control
/// subsystem and the wrapper tool.
#[derive(Default)]
pub struct FakeRegistry {
    /// name -> running
    services: RefCell<HashMap<String, bool>>,
    calls: RefCell<Vec<String>>,
    unknown_queries: RefCell<HashSet<String>>,
    failing: RefCell<HashSet<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a service, as if left behind by a previous run.
    pub fn with_service(self, name: &str, running: bool) -> Self {
        self.services.borrow_mut().insert(name.to_string(), running);
        self
    }

    /// Make `query(name)` report an unreadable answer.
    pub fn query_fails_for(&self, name: &str) {
        self.unknown_queries.borrow_mut().insert(name.to_string());
    }

    /// Make a call fail, keyed like the call log (e.g. `"register A"`).
    pub fn fail(&self, call: &str) {
        self.failing.borrow_mut().insert(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.services.borrow().contains_key(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.services.borrow().get(name).copied().unwrap_or(false)
    }

    fn log(&self, call: String) -> bool {
        let fails = self.failing.borrow().contains(&call);
        self.calls.borrow_mut().push(call);
        !fails
    }
}

impl ServiceControl for FakeRegistry {
    fn query(&self, name: &str) -> ServiceQuery {
        self.calls.borrow_mut().push(format!("query {}", name));
        if self.unknown_queries.borrow().contains(name) {
            return ServiceQuery::Unknown("Access is denied.".to_string());
        }
        match self.services.borrow().get(name) {
            None => ServiceQuery::NotFound,
            Some(true) => ServiceQuery::Running,
            Some(false) => ServiceQuery::Stopped,
        }
    }

    fn start(&self, name: &str) -> CommandOutcome {
        let command = format!("start {}", name);
        if !self.log(command.clone()) {
            return failed(command, "The service could not be started.", 2);
        }
        match self.services.borrow_mut().get_mut(name) {
            Some(running) => {
                *running = true;
                ok(command)
            }
            None => failed(command, "The service name is invalid.", 2),
        }
    }

    fn stop(&self, name: &str) -> CommandOutcome {
        let command = format!("stop {}", name);
        if !self.log(command.clone()) {
            return failed(command, "The service could not be controlled.", 2);
        }
        match self.services.borrow_mut().get_mut(name) {
            Some(running) if *running => {
                *running = false;
                ok(command)
            }
            _ => failed(command, "The service is not started.", 2),
        }
    }
}

impl ServiceWrapper for FakeRegistry {
    fn register(&self, name: &str, _executable: &Path) -> CommandOutcome {
        let command = format!("register {}", name);
        if !self.log(command.clone()) {
            return failed(command, "Error creating service!", 1);
        }
        let mut services = self.services.borrow_mut();
        if services.contains_key(name) {
            return failed(command, "Error creating service: the service already exists", 1);
        }
        services.insert(name.to_string(), false);
        ok(command)
    }

    fn set_app_directory(&self, name: &str, _directory: &Path) -> CommandOutcome {
        let command = format!("set-app-directory {}", name);
        if self.log(command.clone()) {
            ok(command)
        } else {
            failed(command, "Error setting parameter", 1)
        }
    }

    fn set_auto_start(&self, name: &str) -> CommandOutcome {
        let command = format!("set-auto-start {}", name);
        if self.log(command.clone()) {
            ok(command)
        } else {
            failed(command, "Error setting parameter", 1)
        }
    }

    fn unregister(&self, name: &str) -> CommandOutcome {
        let command = format!("unregister {}", name);
        if !self.log(command.clone()) {
            return failed(command, "Can't open service!", 1);
        }
        if self.services.borrow_mut().remove(name).is_some() {
            ok(command)
        } else {
            failed(command, "Can't open service! The specified service does not exist", 1)
        }
    }
}

/// Real filesystem with injectable lock failures.
#[derive(Default)]
pub struct FlakyTree {
    /// Number of upcoming copies that fail with "access denied".
    locked_copies: Cell<u32>,
    /// Paths whose deletion fails with "access denied".
    locked_paths: RefCell<HashSet<PathBuf>>,
    copy_calls: Cell<u32>,
}

impl FlakyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_next_copies(&self, count: u32) {
        self.locked_copies.set(count);
    }

    pub fn lock_path(&self, path: &Path) {
        self.locked_paths.borrow_mut().insert(path.to_path_buf());
    }

    pub fn unlock_all(&self) {
        self.locked_paths.borrow_mut().clear();
    }

    pub fn copy_calls(&self) -> u32 {
        self.copy_calls.get()
    }
}

fn access_denied(path: &Path) -> anyhow::Error {
    anyhow::Error::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
        .context(format!("Failed to access: {}", path.display()))
}

impl TreeOps for FlakyTree {
    fn exists(&self, path: &Path) -> bool {
        LocalTree.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        LocalTree.is_dir(path)
    }

    fn remove_tree(&self, path: &Path) -> anyhow::Result<()> {
        if self.locked_paths.borrow().contains(path) {
            return Err(access_denied(path));
        }
        LocalTree.remove_tree(path)
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> anyhow::Result<()> {
        self.copy_calls.set(self.copy_calls.get() + 1);
        let remaining = self.locked_copies.get();
        if remaining > 0 {
            self.locked_copies.set(remaining - 1);
            // A partial copy is left behind, like a copy interrupted by a lock.
            fs::create_dir_all(dst)?;
            return Err(access_denied(dst));
        }
        LocalTree.copy_tree(src, dst)
    }
}

/// Temp bundle + base directory with payloads for the named services.
pub struct Fixture {
    pub tmp: TempDir,
    pub config: DeployConfig,
}

impl Fixture {
    /// Services get `bundle/<name>/` as source, `base/<name>/` as destination
    /// and `<name>.exe` as executable. Payloads are created for each name.
    pub fn new(names: &[&str]) -> Self {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let bundle = tmp.path().join("bundle");
        let base = tmp.path().join("base");

        let services = names
            .iter()
            .map(|name| {
                let src = bundle.join(name);
                write_file(&src.join(format!("{}.exe", name)), "binary");
                write_file(&src.join("config").join("settings.json"), "{}");
                ServiceDefinition::new(
                    *name,
                    src,
                    base.join(name),
                    base.join(name).join(format!("{}.exe", name)),
                )
                .expect("definition should be valid")
            })
            .collect();

        write_file(&bundle.join("nssm").join("nssm.exe"), "nssm-binary");

        let config = DeployConfig::new(
            base,
            WrapperConfig {
                source: bundle.join("nssm").join("nssm.exe"),
                subdir: PathBuf::from("nssm"),
            },
            Timings::immediate(),
            services,
        )
        .expect("config should be valid");

        Self { tmp, config }
    }

    pub fn base(&self) -> &Path {
        self.config.base_dir()
    }

    pub fn source(&self, name: &str) -> PathBuf {
        self.tmp.path().join("bundle").join(name)
    }

    pub fn destination(&self, name: &str) -> PathBuf {
        self.base().join(name)
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
    }
    fs::write(path, content).expect("write should succeed in test temp dirs");
}

/// Emulates `sc`, `net` and `nssm.exe` output on top of a [`FakeRegistry`].
pub struct SimulatedHost {
    pub registry: FakeRegistry,
    pub commands: RefCell<Vec<String>>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            registry: FakeRegistry::new(),
            commands: RefCell::new(Vec::new()),
        }
    }
}

impl CommandRunner for SimulatedHost {
    fn run(&self, program: &Path, args: &[OsString]) -> CommandOutcome {
        let command = render_command(program, args);
        self.commands.borrow_mut().push(command.clone());

        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        let program = program
            .file_name()
            .map(|p| p.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("");

        let mut outcome = match (program.as_str(), arg(0)) {
            ("sc", "query") => match self.registry.query(arg(1)) {
                ServiceQuery::NotFound => CommandOutcome {
                    command: String::new(),
                    success: false,
                    exit_code: Some(1060),
                    stdout: "[SC] EnumQueryServicesStatus:OpenService FAILED 1060:\r\n\r\nThe specified service does not exist as an installed service.\r\n".to_string(),
                    stderr: String::new(),
                },
                query => {
                    let state = match query {
                        ServiceQuery::Running => "4  RUNNING",
                        _ => "1  STOPPED",
                    };
                    CommandOutcome {
                        stdout: format!(
                            "\r\nSERVICE_NAME: {}\r\n        TYPE               : 10  WIN32_OWN_PROCESS\r\n        STATE              : {}\r\n",
                            arg(1),
                            state
                        ),
                        ..ok("")
                    }
                }
            },
            ("net", "start") => self.registry.start(arg(1)),
            ("net", "stop") => self.registry.stop(arg(1)),
            ("nssm.exe", "install") => self.registry.register(arg(1), Path::new(arg(2))),
            ("nssm.exe", "set") if arg(2) == "AppDirectory" => {
                self.registry.set_app_directory(arg(1), Path::new(arg(3)))
            }
            ("nssm.exe", "set") => self.registry.set_auto_start(arg(1)),
            ("nssm.exe", "remove") => self.registry.unregister(arg(1)),
            _ => failed("", "unknown command", 1),
        };
        outcome.command = command;
        outcome
    }
}
