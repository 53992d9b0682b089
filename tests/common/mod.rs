//! In-memory runtime used by the integration tests.
//!
//! Counts every initialization step and run, can fail a chosen step per
//! attempt, and can hold `load_runtime` behind a semaphore so tests control
//! when an attempt finishes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use pyflow_bridge::ports::{InterpreterRuntime, PackageManager, RuntimeLoader};
use pyflow_bridge::{ExecutionError, SharedRuntime};

pub const EUCLID: &str = "x = 5
y = 10
while x != y:
    if x > y:
        x = x - y
    else:
        y = y - x
";

#[derive(Debug, Default)]
pub struct Counters {
    pub loads: AtomicUsize,
    pub manager_loads: AtomicUsize,
    pub installs: AtomicUsize,
    pub runs: AtomicUsize,
    pub active_runs: AtomicUsize,
    pub max_parallel_runs: AtomicUsize,
}

impl Counters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn manager_loads(&self) -> usize {
        self.manager_loads.load(Ordering::SeqCst)
    }

    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn max_parallel_runs(&self) -> usize {
        self.max_parallel_runs.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Runtime,
    PackageManager,
    Install,
}

#[derive(Debug, Clone)]
pub enum RunBehavior {
    /// Render a crude flowchart of the embedded snippet.
    Flowchart,
    /// Return the script itself.
    Echo,
    Raise { kind: String, message: String },
    NoValue,
}

pub struct FakeLoader {
    pub counters: Arc<Counters>,
    failures: Mutex<VecDeque<Option<FailAt>>>,
    gate: Option<Arc<Semaphore>>,
    behavior: RunBehavior,
    concurrent_runs: bool,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            failures: Mutex::new(VecDeque::new()),
            gate: None,
            behavior: RunBehavior::Flowchart,
            concurrent_runs: false,
        }
    }

    /// One entry per attempt; attempts past the plan succeed.
    pub fn with_failures(self, plan: Vec<Option<FailAt>>) -> Self {
        Self {
            failures: Mutex::new(plan.into()),
            ..self
        }
    }

    pub fn gated(self, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..self
        }
    }

    pub fn with_behavior(self, behavior: RunBehavior) -> Self {
        Self { behavior, ..self }
    }

    pub fn with_concurrent_runs(self) -> Self {
        Self {
            concurrent_runs: true,
            ..self
        }
    }
}

/// Build a `SharedRuntime` over `loader`, returning its counters too.
pub fn shared(loader: FakeLoader) -> (Arc<SharedRuntime>, Arc<Counters>) {
    let counters = Arc::clone(&loader.counters);
    let runtime = SharedRuntime::new(Arc::new(loader), "pyflowchart");
    (Arc::new(runtime), counters)
}

#[async_trait]
impl RuntimeLoader for FakeLoader {
    async fn load_runtime(&self) -> Result<Arc<dyn InterpreterRuntime>> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await?;
        }

        let fail_at = self.failures.lock().unwrap().pop_front().flatten();
        if fail_at == Some(FailAt::Runtime) {
            bail!("runtime exploded");
        }
        Ok(Arc::new(FakeRuntime {
            counters: Arc::clone(&self.counters),
            fail_at,
            behavior: self.behavior.clone(),
            concurrent_runs: self.concurrent_runs,
        }))
    }
}

struct FakeRuntime {
    counters: Arc<Counters>,
    fail_at: Option<FailAt>,
    behavior: RunBehavior,
    concurrent_runs: bool,
}

#[async_trait]
impl InterpreterRuntime for FakeRuntime {
    async fn load_package_manager(&self) -> Result<Arc<dyn PackageManager>> {
        self.counters.manager_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(FailAt::PackageManager) {
            bail!("micropip missing");
        }
        Ok(Arc::new(FakeManager {
            counters: Arc::clone(&self.counters),
            fail: self.fail_at == Some(FailAt::Install),
        }))
    }

    async fn run(&self, script: &str) -> Result<Option<String>, ExecutionError> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active_runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_parallel_runs.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.counters.active_runs.fetch_sub(1, Ordering::SeqCst);

        match &self.behavior {
            RunBehavior::Flowchart => Ok(Some(render(script))),
            RunBehavior::Echo => Ok(Some(script.to_string())),
            RunBehavior::Raise { kind, message } => Err(ExecutionError::Raised {
                kind: kind.clone(),
                message: message.clone(),
            }),
            RunBehavior::NoValue => Ok(None),
        }
    }

    fn supports_concurrent_runs(&self) -> bool {
        self.concurrent_runs
    }

    fn describe(&self) -> String {
        "fake runtime".to_string()
    }
}

struct FakeManager {
    counters: Arc<Counters>,
    fail: bool,
}

#[async_trait]
impl PackageManager for FakeManager {
    async fn install(&self, name: &str) -> Result<()> {
        self.counters.installs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("no matching distribution found for {}", name);
        }
        Ok(())
    }
}

fn render(script: &str) -> String {
    let body = script
        .split_once("code_for_flowchart = \"\"\"\n")
        .and_then(|(_, rest)| rest.split_once("\n\"\"\""))
        .map(|(snippet, _)| snippet)
        .unwrap_or_default();

    let mut lines = vec!["st=>start: start".to_string()];
    for (i, stmt) in body.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
        let kind = if stmt.starts_with("while ") || stmt.starts_with("if ") {
            "condition"
        } else {
            "operation"
        };
        lines.push(format!("n{}=>{}: {}", i, kind, stmt.trim_end_matches(':')));
    }
    lines.push("e=>end: end".to_string());
    lines.join("\n")
}
