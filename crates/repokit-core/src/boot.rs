//! Exactly-once boot per repository type.

use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

use tracing::debug;

use crate::{
    context::RepositoryContext,
    error::{RepositoryError, Result},
    repository::Repository,
    scope::ScopeRegistry,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BootState {
    Booting(ThreadId),
    Booted,
}

/// Tracks which repository types have booted.
///
/// A type is marked as booting before its boot body runs, so a boot body that
/// constructs another repository of the same type doesn't boot it again.
#[derive(Debug, Default)]
pub struct BootRegistry {
    states: Mutex<HashMap<TypeId, BootState>>,
    finished: Condvar,
}

impl BootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TypeId, BootState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_booted<P: 'static>(&self) -> bool {
        self.lock().get(&TypeId::of::<P>()) == Some(&BootState::Booted)
    }

    /// Runs `body` unless type `P` has already booted.
    ///
    /// Returns `Ok(true)` when this call ran the body. A call from the thread
    /// that is currently booting `P` returns `Ok(false)` right away; a call from
    /// any other thread waits for that boot to finish. If the body fails or
    /// panics the mark is cleared, so the next call boots again.
    pub fn boot_if_not_booted<P, F>(&self, body: F) -> Result<bool>
    where
        P: 'static,
        F: FnOnce() -> Result<()>,
    {
        let type_id = TypeId::of::<P>();
        let current = thread::current().id();

        let mut states = self.lock();
        loop {
            match states.get(&type_id) {
                None => break,
                Some(BootState::Booted) => return Ok(false),
                Some(BootState::Booting(owner)) if *owner == current => return Ok(false),
                Some(BootState::Booting(_)) => {
                    states = self
                        .finished
                        .wait(states)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        states.insert(type_id, BootState::Booting(current));
        drop(states);

        debug!(repository = type_name::<P>(), "booting repository");
        let mut guard = BootGuard {
            registry: self,
            type_id,
            completed: false,
        };
        body()?;
        guard.complete();

        debug!(repository = type_name::<P>(), "repository booted");
        Ok(true)
    }
}

/// Clears a booting mark that was not completed and wakes waiters.
struct BootGuard<'a> {
    registry: &'a BootRegistry,
    type_id: TypeId,
    completed: bool,
}

impl BootGuard<'_> {
    fn complete(&mut self) {
        self.registry
            .lock()
            .insert(self.type_id, BootState::Booted);
        self.completed = true;
        self.registry.finished.notify_all();
    }
}

impl Drop for BootGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.registry.lock().remove(&self.type_id);
            self.registry.finished.notify_all();
        }
    }
}

/// Collects the scopes of `P` and installs them into the context's table.
///
/// Registering the same name twice within one repository is a
/// [`RepositoryError::DuplicateScope`]. Clashes with scopes installed by
/// another repository of the same record type follow the context's
/// [`ScopePolicy`](repokit_config::ScopePolicy).
pub fn boot_scopes<P: Repository>(ctx: &RepositoryContext) -> Result<()> {
    let mut registry = ScopeRegistry::<P::Record>::new();
    P::register_scopes(&mut registry)?;

    if let Some(name) = registry.shadowed().first() {
        return Err(RepositoryError::DuplicateScope {
            record: type_name::<P>().to_string(),
            name: name.clone(),
        });
    }

    let installed = registry.apply_scopes(ctx.scopes(), ctx.scope_policy())?;
    debug!(
        repository = type_name::<P>(),
        installed,
        "booted scopes"
    );
    Ok(())
}
