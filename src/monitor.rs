//! Optional background observer that logs CPU and memory usage at a fixed
//! interval while a batch runs. Independent of both pipelines.
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sysinfo::{Pid, System};
use tracing::info;

/// One line per CPU core followed by a totals line
fn usage_report(sys: &System, pid: Option<Pid>) -> Vec<String> {
    let mut lines: Vec<String> = sys
        .cpus()
        .iter()
        .enumerate()
        .map(|(idx, cpu)| format!("CPU core {} usage: {:.1}%", idx, cpu.cpu_usage()))
        .collect();
    let rss = pid
        .and_then(|p| sys.process(p))
        .map(|p| p.memory())
        .unwrap_or(0);
    lines.push(format!(
        "CPU: {:.1}% | process memory: {:.1} MB | RAM: {:.1} / {:.1} GB",
        sys.global_cpu_usage(),
        rss as f64 / 1024.0 / 1024.0,
        sys.used_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
        sys.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0
    ));
    lines
}

pub struct ResourceMonitor {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    /// Spawn the observer thread; it samples once per `interval` until stopped
    pub fn start(interval: Duration) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("resource-monitor".into())
            .spawn(move || {
                let mut sys = System::new_all();
                let pid = sysinfo::get_current_pid().ok();
                // Either an explicit stop or a dropped sender ends the loop
                while let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(interval) {
                    sys.refresh_all();
                    for line in usage_report(&sys, pid) {
                        info!("{}", line);
                    }
                }
            })?;
        Ok(Self {
            stop: Some(tx),
            handle: Some(handle),
        })
    }

    /// Stop sampling and wait for the observer thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn report_covers_every_core() {
        let sys = System::new_all();
        let lines = usage_report(&sys, sysinfo::get_current_pid().ok());
        assert_eq!(lines.len(), sys.cpus().len() + 1);
        if !sys.cpus().is_empty() {
            assert!(lines[0].starts_with("CPU core 0 usage"));
        }
        assert!(lines.last().unwrap().starts_with("CPU: "));
    }

    #[test]
    fn stop_returns_promptly() {
        let monitor = ResourceMonitor::start(Duration::from_secs(60)).unwrap();
        let start = Instant::now();
        monitor.stop();
        assert!(start.elapsed() < Duration::from_secs(30));
    }
}
