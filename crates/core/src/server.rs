//! Suite server supervision
//!
//! Spawns the HTTP server the suite pages are served from, polls its TCP
//! port until it accepts connections and tears it down at session end.
//! Which server gets started is resolved from the project layout when the
//! configuration says `auto`.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::options::{RunOptions, ServerChoice};

/// Rack server backends started through `rackup -s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RackBackend {
    Thin,
    Mongrel,
    Webrick,
}

impl RackBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            RackBackend::Thin => "thin",
            RackBackend::Mongrel => "mongrel",
            RackBackend::Webrick => "webrick",
        }
    }
}

/// Resolved server strategy for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerKind {
    /// No server; readiness polling is skipped entirely.
    None,

    /// A rack handler hosted by `rackup`.
    Rack(RackBackend),

    /// Unicorn ships its own launcher with a different argument shape.
    Unicorn,

    /// A task runner target, e.g. the jasmine gem's `rake jasmine`.
    Task(String),
}

impl std::fmt::Display for ServerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerKind::None => write!(f, "none"),
            ServerKind::Rack(backend) => write!(f, "{}", backend.as_str()),
            ServerKind::Unicorn => write!(f, "unicorn"),
            ServerKind::Task(task) => write!(f, "{}", task),
        }
    }
}

enum ServerState {
    NotStarted,
    Running { child: Child, command: String },
    Stopped,
}

/// Owns the server child process for the lifetime of a session.
pub struct ServerSupervisor {
    kind: ServerKind,
    state: ServerState,
}

impl ServerSupervisor {
    pub fn new(kind: ServerKind) -> Self {
        Self {
            kind,
            state: ServerState::NotStarted,
        }
    }

    pub fn kind(&self) -> &ServerKind {
        &self.kind
    }

    /// Spawn the configured server and wait for its port to accept
    /// connections.
    ///
    /// A spawn failure is logged with the exact command and the session
    /// proceeds without a server; later suite requests will produce the
    /// more informative error. A readiness timeout is fatal to the whole
    /// session and surfaces as [`Error::ServerTimeout`].
    pub async fn start(&mut self, options: &RunOptions) -> Result<()> {
        let argv = match command_line(&self.kind, options) {
            Some(argv) => argv,
            None => {
                debug!("No server configured, skipping server startup");
                return Ok(());
            }
        };
        let command = argv.join(" ");

        info!(
            "Starting {} server on port {} in {} environment",
            self.kind, options.port, options.server_env
        );

        match spawn_process(&argv, options) {
            Ok(child) => {
                self.state = ServerState::Running { child, command: command.clone() };
            }
            Err(err) => {
                warn!("Failed to start the server with `{}`: {}", command, err);
                return Ok(());
            }
        }

        if let Err(err) = wait_for_port(options.port, options.server_timeout).await {
            error!(
                "Timed out waiting for the server on port {} after {} seconds.",
                options.port, options.server_timeout
            );
            error!(
                "Check the server configuration or raise the server timeout."
            );
            error!("The server command was: `{}`", command);
            let _ = self.stop();
            return Err(err);
        }

        info!("Server is accepting connections on port {}", options.port);
        Ok(())
    }

    /// Graduated teardown: SIGTERM, a bounded grace period, then SIGKILL.
    /// No-op when nothing was started.
    pub fn stop(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, ServerState::Stopped);
        let mut child = match state {
            ServerState::Running { child, .. } => child,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        info!("Stopping server (pid: {})", child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                for _ in 0..50 {
                    if let Ok(Some(_)) = child.try_wait() {
                        return Ok(());
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }

        let _ = child.kill();
        let _ = child.wait();
        Ok(())
    }
}

impl Drop for ServerSupervisor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Map a configured choice to a concrete strategy, probing the project
/// layout for `auto`.
pub fn resolve(choice: &ServerChoice, spec_dir: &Path) -> ServerKind {
    match choice {
        ServerChoice::Auto => detect(spec_dir),
        ServerChoice::None => ServerKind::None,
        ServerChoice::Thin => ServerKind::Rack(RackBackend::Thin),
        ServerChoice::Mongrel => ServerKind::Rack(RackBackend::Mongrel),
        ServerChoice::Webrick => ServerKind::Rack(RackBackend::Webrick),
        ServerChoice::Unicorn => ServerKind::Unicorn,
        ServerChoice::Task(task) => ServerKind::Task(task.clone()),
    }
}

/// Pick a server strategy from the project layout: a jasmine gem config
/// under the spec dir selects the gem's rake task, a `config.ru` selects
/// the first rack backend found on `PATH` (webrick as fallback),
/// anything else runs serverless.
pub fn detect(spec_dir: &Path) -> ServerKind {
    let path = std::env::var("PATH").unwrap_or_default();
    detect_in(Path::new("."), spec_dir, &path)
}

fn detect_in(root: &Path, spec_dir: &Path, path: &str) -> ServerKind {
    if root.join(spec_dir).join("support").join("jasmine.yml").exists() {
        return ServerKind::Task("jasmine".to_string());
    }
    if root.join("config.ru").exists() {
        if binary_on_path("thin", path) {
            return ServerKind::Rack(RackBackend::Thin);
        }
        if binary_on_path("mongrel", path) {
            return ServerKind::Rack(RackBackend::Mongrel);
        }
        if binary_on_path("unicorn", path) {
            return ServerKind::Unicorn;
        }
        return ServerKind::Rack(RackBackend::Webrick);
    }
    ServerKind::None
}

fn binary_on_path(name: &str, path: &str) -> bool {
    std::env::split_paths(path).any(|dir| {
        let candidate = dir.join(name);
        match candidate.metadata() {
            Ok(meta) => {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    meta.is_file() && meta.permissions().mode() & 0o111 != 0
                }
                #[cfg(not(unix))]
                {
                    meta.is_file()
                }
            }
            Err(_) => false,
        }
    })
}

/// The exact launch command for a server strategy. `None` for the
/// serverless strategy.
pub fn command_line(kind: &ServerKind, options: &RunOptions) -> Option<Vec<String>> {
    let port = options.port.to_string();
    let env = options.server_env.clone();
    match kind {
        ServerKind::None => None,
        ServerKind::Rack(backend) => {
            let mut argv = vec![
                "rackup".to_string(),
                "-E".to_string(),
                env,
                "-p".to_string(),
                port,
                "-s".to_string(),
                backend.as_str().to_string(),
            ];
            if let Some(config) = &options.rackup_config {
                argv.push(config.display().to_string());
            }
            Some(argv)
        }
        ServerKind::Unicorn => Some(vec![
            "unicorn".to_string(),
            "-E".to_string(),
            env,
            "-p".to_string(),
            port,
        ]),
        ServerKind::Task(task) => Some(vec!["rake".to_string(), task.clone()]),
    }
}

fn spawn_process(argv: &[String], options: &RunOptions) -> std::io::Result<Child> {
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .env("COVERAGE", options.coverage.to_string())
        .env(
            "IGNORE_INSTRUMENTATION",
            options.ignore_instrumentation.to_string(),
        );

    if options.server_verbose {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    cmd.spawn()
}

/// Poll `localhost:<port>` with a raw TCP connect every 100ms until a
/// connect succeeds or the wall-clock timeout elapses.
async fn wait_for_port(port: u16, timeout_secs: u64) -> Result<()> {
    let poll = async {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match TcpStream::connect(("localhost", port)).await {
                Ok(stream) => {
                    drop(stream);
                    debug!("Server ready after {} attempts", attempts);
                    return;
                }
                Err(_) => {
                    if attempts == 1 {
                        info!("Waiting for the server to accept connections...");
                    }
                }
            }
            sleep(Duration::from_millis(100)).await;
        }
    };

    match timeout(Duration::from_secs(timeout_secs), poll).await {
        Ok(()) => Ok(()),
        Err(_) => Err(Error::ServerTimeout {
            port,
            seconds: timeout_secs,
        }),
    }
}
