use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

use crate::error::TemplateError;
use crate::log_debug;

/// Where a cached path stands.
#[derive(Debug, Clone)]
pub enum CompilationState {
    /// Being compiled by the given thread.
    Compiling(ThreadId),
    Compiled(Arc<str>),
    Failed(TemplateError),
}

impl CompilationState {
    pub fn is_compiled(&self) -> bool {
        matches!(self, CompilationState::Compiled(_))
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            CompilationState::Compiled(code) => Some(code),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Table {
    states: HashMap<PathBuf, CompilationState>,
    /// Path each blocked thread is waiting on.
    waiting: HashMap<ThreadId, PathBuf>,
}

impl Table {
    /// Follows owner → awaited path → owner from `path`; true if the chain
    /// reaches a path `current` holds.
    fn leads_back_to(&self, path: &Path, current: ThreadId) -> bool {
        let mut path = path;
        for _ in 0..=self.waiting.len() {
            let Some(CompilationState::Compiling(owner)) = self.states.get(path) else {
                return false;
            };
            if *owner == current {
                return true;
            }
            match self.waiting.get(owner) {
                Some(next) => path = next.as_path(),
                None => return false,
            }
        }
        false
    }
}

#[derive(Default)]
struct Entries {
    table: Mutex<Table>,
    settled: Condvar,
}

/// Artifact sources by resolved path, shared by every compilation given a clone.
///
/// Each path is compiled at most once; failures are kept and replayed.
/// A thread asking for a path another thread is compiling waits for it,
/// unless that wait would close a cycle of threads including each other.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<Entries>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("len", &self.len()).finish()
    }
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.entries
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().states.is_empty()
    }

    pub fn state(&self, path: &Path) -> Option<CompilationState> {
        self.lock().states.get(path).cloned()
    }

    /// Forgets every settled entry. Paths being compiled are kept.
    pub fn clear(&self) {
        self.lock()
            .states
            .retain(|_, state| matches!(state, CompilationState::Compiling(_)));
    }

    /// Returns the artifact source for `path`, running `compile` if no thread has yet.
    pub fn get_or_compile<F>(&self, path: &Path, compile: F) -> Result<Arc<str>, TemplateError>
    where
        F: FnOnce() -> Result<String, TemplateError>,
    {
        let current = thread::current().id();
        let mut table = self.lock();
        loop {
            match table.states.get(path).cloned() {
                Some(CompilationState::Compiled(code)) => {
                    log_debug!("cache hit for {}", path.display());
                    return Ok(code);
                }
                Some(CompilationState::Failed(err)) => return Err(err),
                Some(CompilationState::Compiling(owner)) if owner == current => {
                    return Err(TemplateError::resolution(format!(
                        "circular include of {}",
                        path.display()
                    )));
                }
                Some(CompilationState::Compiling(_)) if table.leads_back_to(path, current) => {
                    return Err(TemplateError::resolution(format!(
                        "circular include of {} across threads",
                        path.display()
                    )));
                }
                Some(CompilationState::Compiling(_)) => {
                    table.waiting.insert(current, path.to_path_buf());
                    table = self
                        .entries
                        .settled
                        .wait(table)
                        .unwrap_or_else(PoisonError::into_inner);
                    table.waiting.remove(&current);
                }
                None => break,
            }
        }
        table
            .states
            .insert(path.to_path_buf(), CompilationState::Compiling(current));
        drop(table);

        let result = compile().map(Arc::<str>::from);

        let settled = match &result {
            Ok(code) => CompilationState::Compiled(code.clone()),
            Err(err) => CompilationState::Failed(err.clone()),
        };
        self.lock().states.insert(path.to_path_buf(), settled);
        self.entries.settled.notify_all();
        result
    }
}
