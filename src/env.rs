//! The host-supplied name → value mapping, plus a thin convenience wrapper
//! so host code and [`crate::stdlib`] don't hand-roll `HashMap`
//! boilerplate.

use std::collections::HashMap;

use crate::host;
use crate::value::BVal;

/// Anything that can answer identifier lookups for a single evaluation.
/// The VM only ever reads through this trait — it never mutates the
/// environment, which is part of what makes sharing one environment-free
/// `Program` across threads safe.
pub trait Environment {
    fn get(&self, name: &str) -> Option<&BVal>;
}

/// A `HashMap`-backed [`Environment`].
#[derive(Default, Clone)]
pub struct Env {
    vars: HashMap<String, BVal>,
}

impl Env {
    pub fn new() -> Env {
        Env { vars: HashMap::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, val: BVal) -> &mut Env {
        self.vars.insert(name.into(), val);
        self
    }

    pub fn register_fn(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(&[BVal]) -> BVal + Send + Sync + 'static,
    ) -> &mut Env {
        let name = name.into();
        self.vars.insert(name.clone(), host::from_value_fn(name, arity, f));
        self
    }
}

impl Environment for Env {
    fn get(&self, name: &str) -> Option<&BVal> {
        self.vars.get(name)
    }
}

impl Environment for HashMap<String, BVal> {
    fn get(&self, name: &str) -> Option<&BVal> {
        HashMap::get(self, name)
    }
}
