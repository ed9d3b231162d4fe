//! Script Runner: one reusable interpreter session behind an exclusive
//! lock.
//!
//! A [`Runner`] owns exactly one engine session plus the template recipe it
//! was built from.  `run` serializes all callers, resets a dirty session
//! back to a pristine one, loads the given source, marshals the arguments,
//! performs a protected call, and marshals the results back.  The lock is
//! held for the whole of that, so two script executions can never
//! interleave within one Runner; independent Runners execute truly in
//! parallel.  There is no cancellation or timeout: an infinite-loop script
//! blocks its Runner indefinitely.

use std::fmt;

use mlua::{Function, IntoLua, Lua, LuaOptions, MultiValue, StdLib, Value};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::convert::{to_native, to_script};
use crate::error::{ConversionError, Error};
use crate::registry::{self, Capability, Resolved};
use crate::value::{HostValue, ScriptValue};

// ── RunArgs ───────────────────────────────────────────────────────────────

/// Argument lists accepted by [`Runner::run`].
///
/// Implemented for `()`, for tuples of `Serialize` values up to arity 8
/// (each element marshaled independently with
/// [`to_script`](crate::to_script)), and for `Vec<ScriptValue>` when the
/// caller has already marshaled.
pub trait RunArgs {
    fn into_script_values(self) -> Result<Vec<ScriptValue>, ConversionError>;
}

impl RunArgs for () {
    fn into_script_values(self) -> Result<Vec<ScriptValue>, ConversionError> {
        Ok(Vec::new())
    }
}

impl RunArgs for Vec<ScriptValue> {
    fn into_script_values(self) -> Result<Vec<ScriptValue>, ConversionError> {
        Ok(self)
    }
}

macro_rules! impl_run_args_tuple {
    ($($name:ident)+) => {
        impl<$($name: Serialize),+> RunArgs for ($($name,)+) {
            fn into_script_values(self) -> Result<Vec<ScriptValue>, ConversionError> {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                Ok(vec![$(to_script(&$name)?),+])
            }
        }
    };
}

impl_run_args_tuple!(A);
impl_run_args_tuple!(A B);
impl_run_args_tuple!(A B C);
impl_run_args_tuple!(A B C D);
impl_run_args_tuple!(A B C D E);
impl_run_args_tuple!(A B C D E F);
impl_run_args_tuple!(A B C D E F G);
impl_run_args_tuple!(A B C D E F G H);

// ── Session and template ──────────────────────────────────────────────────

/// One live engine instance plus its clean/dirty flag.
struct Session {
    lua: Lua,
    clean: bool,
}

/// The construction recipe captured when a Runner is built: replaying it
/// yields a pristine, identically configured session.  Capabilities are
/// stored already resolved, so a reset cannot fail on an unknown name.
struct Template {
    skip_std_libs: bool,
    capabilities: Vec<Resolved>,
}

impl Template {
    fn open(&self) -> Result<Lua, Error> {
        let lua = if self.skip_std_libs {
            let lua = Lua::new_with(StdLib::NONE, LuaOptions::default())?;
            // The engine installs the base globals (tostring, type, print,
            // pcall, …) even with no libraries selected.  A skipped session
            // starts bare: clear them all, so the session holds exactly
            // what the capabilities install below.
            let globals = lua.globals();
            let keys = globals
                .clone()
                .pairs::<Value, Value>()
                .map(|pair| pair.map(|(key, _)| key))
                .collect::<mlua::Result<Vec<_>>>()?;
            for key in keys {
                globals.raw_set(key, Value::Nil)?;
            }
            lua
        } else {
            Lua::new()
        };

        for capability in &self.capabilities {
            match *capability {
                Resolved::Library(name, lib) => {
                    lua.load_std_libs(lib).map_err(|e| Error::Install {
                        name: name.to_owned(),
                        source: e,
                    })?;
                }
                Resolved::Function(name, f) => {
                    let install = || -> mlua::Result<()> {
                        lua.globals().set(name, lua.create_function(f)?)
                    };
                    install().map_err(|e| Error::Install {
                        name: name.to_owned(),
                        source: e,
                    })?;
                }
            }
        }

        Ok(lua)
    }
}

// ── Runner ────────────────────────────────────────────────────────────────

/// One logical, serially-reusable interpreter session.
///
/// `Runner` is `Send + Sync`: it may be shared across threads, but all
/// calls to [`run`](Runner::run) on one Runner are strictly serialized.
/// The intended scaling pattern is one Runner per concurrent worker.
pub struct Runner {
    session: Mutex<Session>,
    template: Template,
}

// The engine handle inside Session has no Debug; report the template
// instead, which is what distinguishes one Runner from another.
impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("skip_std_libs", &self.template.skip_std_libs)
            .field("capabilities", &self.template.capabilities)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Build a Runner configured with the named capabilities.
    ///
    /// Every capability is resolved against the registry before anything is
    /// installed; an unknown name or a failed installation aborts
    /// construction, so no partially configured Runner is ever returned.
    ///
    /// With `skip_std_libs` the session starts with no standard libraries
    /// at all, and holds exactly what the capabilities install.
    pub fn new(skip_std_libs: bool, capabilities: &[Capability]) -> Result<Runner, Error> {
        let resolved = capabilities
            .iter()
            .map(registry::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        let template = Template { skip_std_libs, capabilities: resolved };
        let lua = template.open()?;
        debug!(
            capabilities = capabilities.len(),
            skip_std_libs, "runner session configured"
        );

        Ok(Runner {
            session: Mutex::new(Session { lua, clean: true }),
            template,
        })
    }

    /// Load `source`, call the global `function`, and return
    /// `expected_returns` results, each converted with
    /// [`to_native`](crate::to_native).  The call keeps the first
    /// `expected_returns` values the function returned (extras are
    /// discarded, mirroring the engine's fixed-count stack adjustment) and
    /// reads them most-recently-pushed first.
    ///
    /// The Runner's lock is held for the entire call.  A dirty session is
    /// first rebuilt from the template, so script-side state never leaks
    /// between calls.  If the function returns fewer values than
    /// `expected_returns`, the whole call fails; it is never padded into a
    /// partial result list.
    pub fn run<A: RunArgs>(
        &self,
        function: &str,
        source: &str,
        expected_returns: usize,
        args: A,
    ) -> Result<Vec<HostValue>, Error> {
        let mut session = self.session.lock();

        if !session.clean {
            trace!("rebuilding dirty session from template");
            session.lua = self.template.open()?;
            session.clean = true;
        }

        session.lua.load(source).exec().map_err(Error::Load)?;

        let script_args = args.into_script_values()?;
        let mut engine_args = Vec::with_capacity(script_args.len());
        for value in script_args {
            engine_args.push(value.into_lua(&session.lua)?);
        }

        // From here on the session has executed caller code.
        session.clean = false;

        let execution_error = |e: mlua::Error| Error::Execution {
            function: function.to_owned(),
            source: e,
        };

        let target: Function = session
            .lua
            .globals()
            .get(function)
            .map_err(execution_error)?;
        let mut results = target
            .call::<MultiValue>(MultiValue::from_vec(engine_args))
            .map_err(execution_error)?
            .into_vec();

        if results.len() < expected_returns {
            return Err(Error::Execution {
                function: function.to_owned(),
                source: mlua::Error::RuntimeError(format!(
                    "{expected_returns} return values requested, script returned {}",
                    results.len()
                )),
            });
        }

        // A fixed-count call keeps the first `expected_returns` results and
        // discards the rest, as the engine's own stack adjustment does.
        results.truncate(expected_returns);
        let mut out = Vec::with_capacity(expected_returns);
        for value in results.into_iter().rev() {
            let script = ScriptValue::from_engine(value)?;
            out.push(to_native(&script)?);
        }

        trace!(function, returns = out.len(), "script call completed");
        Ok(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baselib;

    #[test]
    fn empty_capability_list_builds_a_bare_session() {
        let runner = Runner::new(true, &[]).unwrap();
        let out = runner
            .run("Run", "function Run() return 1 + 1 end", 1, ())
            .unwrap();
        assert_eq!(out, vec![HostValue::Int(2)]);
    }

    #[test]
    fn results_come_back_most_recent_first() {
        let runner = Runner::new(true, &[]).unwrap();
        let out = runner
            .run("Run", "function Run(a, b) return a + b, 'done' end", 2, (1i64, 2i64))
            .unwrap();
        assert_eq!(out, vec![HostValue::Str("done".into()), HostValue::Int(3)]);
    }

    #[test]
    fn extra_returns_are_discarded_before_reading_top_first() {
        // Requesting 2 of 3 keeps the first two results, then reads them
        // most-recently-pushed first.
        let runner = Runner::new(true, &[]).unwrap();
        let out = runner
            .run("Run", "function Run() return 'a', 'b', 'c' end", 2, ())
            .unwrap();
        assert_eq!(
            out,
            vec![HostValue::Str("b".into()), HostValue::Str("a".into())]
        );
    }

    #[test]
    fn over_requesting_returns_fails_the_whole_call() {
        let runner = Runner::new(true, &[]).unwrap();
        let err = runner
            .run("Run", "function Run() return 1 end", 2, ())
            .unwrap_err();
        match err {
            Error::Execution { function, source } => {
                assert_eq!(function, "Run");
                assert!(source.to_string().contains("2 return values requested"));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[test]
    fn function_capability_is_installed_as_a_global() {
        let runner = Runner::new(true, &[Capability::function(baselib::TYPE)]).unwrap();
        let out = runner
            .run("Run", "function Run() return type(42) end", 1, ())
            .unwrap();
        assert_eq!(out, vec![HostValue::Str("number".into())]);
    }

    #[test]
    fn library_capability_is_installed() {
        let runner = Runner::new(true, &[Capability::library("string")]).unwrap();
        let out = runner
            .run("Run", "function Run(s) return string.upper(s) end", 1, ("abc",))
            .unwrap();
        assert_eq!(out, vec![HostValue::Str("ABC".into())]);
    }

    #[test]
    fn skipped_std_libs_really_are_absent() {
        let runner = Runner::new(true, &[]).unwrap();
        let err = runner
            .run("Run", "function Run() return string.upper('x') end", 1, ())
            .unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }

    #[test]
    fn skipped_sessions_have_no_base_globals() {
        // Without the matching capabilities, the engine's own base
        // functions must not be reachable either.
        let runner = Runner::new(true, &[]).unwrap();
        for body in [
            "function Run() return tostring(42) end",
            "function Run() return type(42) end",
            "function Run() return pcall(function() end) end",
        ] {
            let err = runner.run("Run", body, 1, ()).unwrap_err();
            assert!(matches!(err, Error::Execution { .. }), "{body}");
        }
    }

    #[test]
    fn installed_capability_shadows_nothing_on_a_bare_session() {
        // `type` works only because the capability installed it.
        let bare = Runner::new(true, &[]).unwrap();
        assert!(bare
            .run("Run", "function Run() return type(42) end", 1, ())
            .is_err());

        let with_type = Runner::new(true, &[Capability::function(baselib::TYPE)]).unwrap();
        let out = with_type
            .run("Run", "function Run() return type(42) end", 1, ())
            .unwrap();
        assert_eq!(out, vec![HostValue::Str("number".into())]);
    }

    #[test]
    fn debug_output_reports_the_template() {
        let runner = Runner::new(true, &[Capability::library("string")]).unwrap();
        let rendered = format!("{runner:?}");
        assert!(rendered.contains("skip_std_libs"), "{rendered}");
        assert!(rendered.contains("string"), "{rendered}");
    }
}
