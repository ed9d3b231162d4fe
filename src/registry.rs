//! Capability Registry.
//!
//! Two disjoint static tables map capability names to implementations: one
//! for engine standard libraries, one for host-provided functions.  Both
//! are compile-time immutable; resolution happens only while a
//! [`Runner`](crate::Runner) is being constructed, never during `run`.

use mlua::{Lua, MultiValue, StdLib};

use crate::baselib;
use crate::error::Error;

/// A named unit of host-provided functionality a Runner can be configured
/// with at construction.  Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// A standard library installer (e.g. `"string"`, `"math"`).
    Library(String),
    /// A single host function bound to a global (e.g. `"print"`).
    Function(String),
}

impl Capability {
    pub fn library(name: impl Into<String>) -> Self {
        Capability::Library(name.into())
    }

    pub fn function(name: impl Into<String>) -> Self {
        Capability::Function(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Capability::Library(name) | Capability::Function(name) => name,
        }
    }
}

/// Signature of a host-provided function capability: a call frame of
/// argument values in, zero or more result values out.
pub(crate) type HostFn = fn(&Lua, MultiValue) -> mlua::Result<MultiValue>;

/// A capability resolved against the registry; installable without further
/// lookups.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Resolved {
    Library(&'static str, StdLib),
    Function(&'static str, HostFn),
}

static LIBRARIES: &[(&str, StdLib)] = &[
    ("coroutine", StdLib::COROUTINE),
    ("table", StdLib::TABLE),
    ("io", StdLib::IO),
    ("os", StdLib::OS),
    ("string", StdLib::STRING),
    ("math", StdLib::MATH),
    ("package", StdLib::PACKAGE),
];

static FUNCTIONS: &[(&str, HostFn)] = &[
    (baselib::TOSTRING, baselib::tostring),
    (baselib::TONUMBER, baselib::tonumber),
    (baselib::ERROR, baselib::error),
    (baselib::TYPE, baselib::type_of),
    (baselib::PRINT, baselib::print),
];

/// Resolve a capability by exact name match against its kind's table.
pub(crate) fn resolve(capability: &Capability) -> Result<Resolved, Error> {
    match capability {
        Capability::Library(name) => LIBRARIES
            .iter()
            .find(|(n, _)| *n == name.as_str())
            .map(|&(n, lib)| Resolved::Library(n, lib)),
        Capability::Function(name) => FUNCTIONS
            .iter()
            .find(|(n, _)| *n == name.as_str())
            .map(|&(n, f)| Resolved::Function(n, f)),
    }
    .ok_or_else(|| Error::UnsupportedCapability(capability.name().to_owned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────
