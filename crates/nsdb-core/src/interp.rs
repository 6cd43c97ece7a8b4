//! Script-level command surface for driver extensions.
//!
//! This is the small slice of the host's interpreter that drivers touch:
//! a table of named commands, a table of named database handles, and a
//! per-virtual-server list of traces that run whenever a new interpreter
//! is created. Drivers register their extension command from
//! [`DbDriver::server_init`](crate::DbDriver::server_init) through a
//! [`ServerRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result, UsageErrorKind};
use crate::handle::Handle;

/// Result value of a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Reply {
    #[default]
    Empty,
    Int(i64),
    Text(String),
    /// A list built element by element
    List(Vec<String>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Empty => Ok(()),
            Reply::Int(n) => write!(f, "{n}"),
            Reply::Text(s) => write!(f, "{s}"),
            Reply::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    if item.is_empty() || item.contains(char::is_whitespace) {
                        write!(f, "{{{item}}}")?;
                    } else {
                        f.write_str(item)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A command callable from an interpreter.
pub trait ObjCommand: Send + Sync {
    /// Run the command. `argv[0]` is the command name.
    fn call(&self, interp: &mut Interp, argv: &[&str]) -> Result<Reply>;
}

impl<F> ObjCommand for F
where
    F: Fn(&mut Interp, &[&str]) -> Result<Reply> + Send + Sync,
{
    fn call(&self, interp: &mut Interp, argv: &[&str]) -> Result<Reply> {
        self(interp, argv)
    }
}

/// One interpreter: registered commands plus the handles it has checked out.
pub struct Interp {
    server: String,
    commands: HashMap<String, Arc<dyn ObjCommand>>,
    handles: HashMap<String, Handle>,
}

impl fmt::Debug for Interp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<_> = self.commands.keys().collect();
        commands.sort();
        f.debug_struct("Interp")
            .field("server", &self.server)
            .field("commands", &commands)
            .field("handles", &self.handles.len())
            .finish()
    }
}

impl Interp {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            commands: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Register (or replace) a command.
    pub fn create_command(&mut self, name: impl Into<String>, command: Arc<dyn ObjCommand>) {
        self.commands.insert(name.into(), command);
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Dispatch `argv[0]` to its registered command.
    pub fn eval(&mut self, argv: &[&str]) -> Result<Reply> {
        let Some(name) = argv.first() else {
            return Err(Error::usage(UsageErrorKind::BadArguments, "empty command"));
        };
        let command = self
            .commands
            .get(*name)
            .cloned()
            .ok_or_else(|| Error::Custom(format!("invalid command name \"{name}\"")))?;
        command.call(self, argv)
    }

    /// Make a handle available to commands under `name`.
    pub fn add_handle(&mut self, name: impl Into<String>, handle: Handle) {
        self.handles.insert(name.into(), handle);
    }

    /// Look up a handle by name.
    pub fn handle_mut(&mut self, name: &str) -> Result<&mut Handle> {
        self.handles
            .get_mut(name)
            .ok_or_else(|| Error::Custom(format!("invalid database id:  \"{name}\"")))
    }

    /// Return a handle to the caller.
    pub fn take_handle(&mut self, name: &str) -> Option<Handle> {
        self.handles.remove(name)
    }
}

/// Builds the standard wrong-arity error, quoting the first `count` words.
pub fn wrong_num_args(argv: &[&str], count: usize, usage: &str) -> Error {
    let mut words: Vec<&str> = argv.iter().take(count).copied().collect();
    if !usage.is_empty() {
        words.push(usage);
    }
    Error::usage(
        UsageErrorKind::BadArguments,
        format!("wrong # args: should be \"{}\"", words.join(" ")),
    )
}

/// Resolve `word` against `options`, accepting exact matches or a unique prefix.
pub fn get_index(word: &str, options: &[&str], what: &str) -> Result<usize> {
    if let Some(i) = options.iter().position(|opt| *opt == word) {
        return Ok(i);
    }

    let matches: Vec<usize> = if word.is_empty() {
        Vec::new()
    } else {
        options
            .iter()
            .enumerate()
            .filter(|(_, opt)| opt.starts_with(word))
            .map(|(i, _)| i)
            .collect()
    };

    if let [only] = matches.as_slice() {
        return Ok(*only);
    }

    let qualifier = if matches.len() > 1 { "ambiguous" } else { "bad" };
    Err(Error::usage(
        UsageErrorKind::BadArguments,
        format!(
            "{qualifier} {what} \"{word}\": must be {}",
            join_alternatives(options)
        ),
    ))
}

fn join_alternatives(options: &[&str]) -> String {
    match options {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{}, or {}", head.join(", "), last),
    }
}

/// Callback run on every interpreter created for a server.
pub type InterpTrace = Arc<dyn Fn(&mut Interp) -> Result<()> + Send + Sync>;

/// Per-virtual-server interpreter create traces.
#[derive(Default)]
pub struct ServerRegistry {
    traces: RwLock<HashMap<String, Vec<InterpTrace>>>,
}

impl fmt::Debug for ServerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let servers: Vec<String> = self
            .traces
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("ServerRegistry")
            .field("servers", &servers)
            .finish()
    }
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `trace` on every interpreter subsequently created for `server`.
    pub fn register_trace(&self, server: &str, trace: InterpTrace) {
        let mut traces = self
            .traces
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        traces.entry(server.to_string()).or_default().push(trace);
    }

    /// Create an interpreter for `server` and run its create traces in
    /// registration order.
    pub fn create_interp(&self, server: &str) -> Result<Interp> {
        let traces: Vec<InterpTrace> = self
            .traces
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(server)
            .cloned()
            .unwrap_or_default();

        let mut interp = Interp::new(server);
        for trace in traces {
            trace(&mut interp)?;
        }
        Ok(interp)
    }
}
