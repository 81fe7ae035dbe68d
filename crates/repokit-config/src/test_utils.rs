use std::env;

/// Restores the environment variables it touched when dropped, even if the
/// test body panicked.
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set<'a>(vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let saved = vars
            .into_iter()
            .map(|(key, value)| {
                let previous = env::var(key).ok();
                env::set_var(key, value);
                (key.to_string(), previous)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}

/// Runs `f` with `vars` set. Callers must be `#[serial]`.
pub fn with_env<'a, F: FnOnce()>(vars: impl IntoIterator<Item = (&'a str, &'a str)>, f: F) {
    let _guard = EnvGuard::set(vars);
    f();
}
