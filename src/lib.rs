//! # luahost
//!
//! An embeddable scripting host: hand small units of Lua code to an
//! interpreter session, pass host values in, get host values back, and
//! reuse the session safely across many invocations.
//!
//! This crate provides:
//! - a bidirectional value-marshaling layer between host data
//!   (`serde::Serialize` shapes) and the script runtime's dynamic value
//!   model ([`to_script`], [`to_native`], [`will_produce_table`]);
//! - a capability registry of named standard libraries and host functions,
//!   consulted once at [`Runner`] construction;
//! - the [`Runner`] itself: one interpreter session, serialized access,
//!   and a clean/dirty lifecycle that rebuilds a pristine session between
//!   invocations.
//!
//! ## Example
//!
//! ```no_run
//! use luahost::{baselib, Capability, Runner};
//!
//! let runner = Runner::new(
//!     true,
//!     &[Capability::library("string"), Capability::function(baselib::PRINT)],
//! )?;
//! let results = runner.run(
//!     "Greet",
//!     "function Greet(name) return 'hello ' .. name end",
//!     1,
//!     ("world",),
//! )?;
//! # Ok::<(), luahost::Error>(())
//! ```

pub mod baselib;
mod convert;
mod error;
mod registry;
mod runner;
mod value;

pub use convert::{to_native, to_script, will_produce_table};
pub use error::{ConversionError, Direction, Error};
pub use registry::Capability;
pub use runner::{RunArgs, Runner};
pub use value::{HostValue, ScriptTable, ScriptValue};
