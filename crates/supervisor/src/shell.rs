// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! PTY-backed interactive shells (spec §4.3).
//!
//! `portable-pty`'s master/child handles are blocking, so the read loop,
//! write loop, and wait loop each run on a `spawn_blocking` thread; this
//! module is the domain object those threads feed into, not the WS framing
//! (that lives in `hack-wire::shell_stream` and is driven by the daemon).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::{Mutex, RwLock};
use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use tokio::sync::{broadcast, mpsc};

use hack_core::{Clock, Shell, ShellId, ShellStatus};

use crate::error::SupervisorError;

const OUTPUT_CHANNEL_CAPACITY: usize = 256;
const READ_CHUNK: usize = 8 * 1024;

pub struct ShellEntry {
    pub shell: RwLock<Shell>,
    output_tx: broadcast::Sender<Vec<u8>>,
    input_tx: mpsc::UnboundedSender<Vec<u8>>,
    resize_tx: mpsc::UnboundedSender<(u16, u16)>,
    closed: Arc<AtomicBool>,
    exit_code: Mutex<Option<i32>>,
    last_signal: Mutex<Option<String>>,
}

impl ShellEntry {
    pub fn snapshot(&self) -> Shell {
        self.shell.read().clone()
    }

    /// Set once the child process has exited; `None` until then.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock()
    }

    /// The most recent signal delivered via `ShellSupervisor::signal`, kept
    /// around so the `exit` frame can report what (if anything) killed the
    /// shell — portable-pty's `ExitStatus` doesn't expose the signal itself.
    pub fn last_signal(&self) -> Option<String> {
        self.last_signal.lock().clone()
    }

    pub fn subscribe_output(&self) -> broadcast::Receiver<Vec<u8>> {
        self.output_tx.subscribe()
    }

    pub fn send_input(&self, data: Vec<u8>) -> Result<(), SupervisorError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SupervisorError::Pty("shell is closed".into()));
        }
        self.input_tx.send(data).map_err(|_| SupervisorError::Pty("input channel closed".into()))
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SupervisorError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SupervisorError::Pty("shell is closed".into()));
        }
        {
            let mut shell = self.shell.write();
            shell.cols = cols;
            shell.rows = rows;
        }
        self.resize_tx.send((cols, rows)).map_err(|_| SupervisorError::Pty("resize channel closed".into()))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub struct ShellSupervisor {
    shells: RwLock<HashMap<ShellId, Arc<ShellEntry>>>,
    clock: Arc<dyn Clock>,
}

impl ShellSupervisor {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self { shells: RwLock::new(HashMap::new()), clock })
    }

    pub fn get(&self, id: &ShellId) -> Option<Arc<ShellEntry>> {
        self.shells.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Shell> {
        self.shells.read().values().map(|e| e.snapshot()).collect()
    }

    pub fn spawn(
        self: &Arc<Self>,
        project_id: hack_core::ProjectId,
        cols: u16,
        rows: u16,
        working_dir: String,
        shell_program: String,
    ) -> Result<Arc<ShellEntry>, SupervisorError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 })
            .map_err(|e| SupervisorError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&shell_program);
        cmd.cwd(&working_dir);
        let mut child =
            pair.slave.spawn_command(cmd).map_err(|e| SupervisorError::SpawnFailed(e.to_string()))?;
        drop(pair.slave);

        let reader = pair.master.try_clone_reader().map_err(|e| SupervisorError::Pty(e.to_string()))?;
        let writer = pair.master.take_writer().map_err(|e| SupervisorError::Pty(e.to_string()))?;
        let master: Arc<Mutex<Box<dyn MasterPty + Send>>> = Arc::new(Mutex::new(pair.master));

        let now = self.clock.now_ms();
        let shell = Shell::new(project_id, cols, rows, working_dir.clone(), shell_program.clone(), now);
        let shell_id = shell.id.clone();

        let (output_tx, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (resize_tx, mut resize_rx) = mpsc::unbounded_channel::<(u16, u16)>();
        let closed = Arc::new(AtomicBool::new(false));

        let entry = Arc::new(ShellEntry {
            shell: RwLock::new(shell),
            output_tx: output_tx.clone(),
            input_tx,
            resize_tx,
            closed: Arc::clone(&closed),
            exit_code: Mutex::new(None),
            last_signal: Mutex::new(None),
        });
        self.shells.write().insert(shell_id.clone(), Arc::clone(&entry));

        // Reader thread: pump PTY output into the broadcast channel.
        {
            let output_tx = output_tx.clone();
            let closed = Arc::clone(&closed);
            tokio::task::spawn_blocking(move || {
                let mut reader = reader;
                let mut buf = vec![0u8; READ_CHUNK];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            let _ = output_tx.send(buf[..n].to_vec());
                        }
                        Err(_) => break,
                    }
                }
                closed.store(true, Ordering::Release);
            });
        }

        // Writer thread: drain queued input into the PTY.
        {
            let mut writer = writer;
            tokio::spawn(async move {
                while let Some(chunk) = input_rx.recv().await {
                    if writer.write_all(&chunk).is_err() {
                        break;
                    }
                }
            });
        }

        // Resize handling: each resize request goes through the shared master.
        {
            let master = Arc::clone(&master);
            tokio::spawn(async move {
                while let Some((cols, rows)) = resize_rx.recv().await {
                    let master = Arc::clone(&master);
                    let _ = tokio::task::spawn_blocking(move || {
                        let _ = master.lock().resize(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 });
                    })
                    .await;
                }
            });
        }

        // Wait thread: mark the shell closed once the child process exits.
        {
            let entry = Arc::clone(&entry);
            let closed = Arc::clone(&closed);
            tokio::task::spawn_blocking(move || {
                if let Ok(status) = child.wait() {
                    *entry.exit_code.lock() = Some(status.exit_code() as i32);
                }
                closed.store(true, Ordering::Release);
                entry.shell.write().status = ShellStatus::Closed;
            });
        }

        {
            let mut shell = entry.shell.write();
            shell.status = ShellStatus::Running;
        }
        Ok(entry)
    }

    pub fn signal(&self, id: &ShellId, pid: Option<i32>, signal_name: &str) -> Result<(), SupervisorError> {
        let entry = self.get(id).ok_or_else(|| SupervisorError::ShellNotFound(id.to_string()))?;
        let Some(pid) = pid else { return Ok(()) };
        let sig = match signal_name {
            "INT" => Signal::SIGINT,
            "TERM" => Signal::SIGTERM,
            "KILL" => Signal::SIGKILL,
            other => return Err(SupervisorError::Pty(format!("unsupported signal {other}"))),
        };
        signal::kill(Pid::from_raw(pid), sig).map_err(|e| SupervisorError::Pty(e.to_string()))?;
        *entry.last_signal.lock() = Some(signal_name.to_string());
        Ok(())
    }

    pub fn close(&self, id: &ShellId) -> Result<(), SupervisorError> {
        let entry = self.get(id).ok_or_else(|| SupervisorError::ShellNotFound(id.to_string()))?;
        entry.closed.store(true, Ordering::Release);
        entry.shell.write().status = ShellStatus::Closed;
        Ok(())
    }
}
