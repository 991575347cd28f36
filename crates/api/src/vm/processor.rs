// Path: crates/api/src/vm/processor.rs

use super::{Sandbox, SandboxView};
use chroma_types::app::{HashValue, Hname, Params};
use chroma_types::error::VmError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Handler of a full (mutating) entry point.
pub type FullHandler = Arc<dyn Fn(&mut dyn Sandbox) -> Result<Params, VmError> + Send + Sync>;

/// Handler of a view entry point.
pub type ViewHandler = Arc<dyn Fn(&mut dyn SandboxView) -> Result<Params, VmError> + Send + Sync>;

/// The handler of an entry point, tagged with its call kind.
#[derive(Clone)]
pub enum Handler {
    /// Receives a [`Sandbox`].
    Full(FullHandler),
    /// Receives a [`SandboxView`].
    View(ViewHandler),
}

/// A named entry point of a contract program.
#[derive(Clone)]
pub struct EntryPoint {
    name: String,
    handler: Handler,
}

impl EntryPoint {
    /// The entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The hname the entry point is addressed by.
    pub fn hname(&self) -> Hname {
        Hname::of(&self.name)
    }

    /// Whether this is a view entry point.
    pub fn is_view(&self) -> bool {
        matches!(self.handler, Handler::View(_))
    }

    /// The handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("view", &self.is_view())
            .finish()
    }
}

/// An executable contract program: a table of entry points.
pub trait ContractProcessor: Send + Sync {
    /// The hash the program is registered under.
    fn program_hash(&self) -> HashValue;
    /// Human readable program name.
    fn name(&self) -> &str;
    /// Looks up an entry point by hname.
    fn entry_point(&self, code: Hname) -> Option<&EntryPoint>;
}

/// Builds a [`ContractProcessor`] from a program binary. One constructor is
/// registered per VM type.
pub type VmConstructor =
    Arc<dyn Fn(&[u8]) -> Result<Arc<dyn ContractProcessor>, VmError> + Send + Sync>;

/// A native contract program assembled from Rust closures.
///
/// ```ignore
/// let counter = ContractInterface::new("counter", "A counter")
///     .func("increment", increment)
///     .view("getCounter", get_counter);
/// ```
#[derive(Clone)]
pub struct ContractInterface {
    name: String,
    description: String,
    program_hash: HashValue,
    entry_points: BTreeMap<Hname, EntryPoint>,
}

impl ContractInterface {
    /// Creates an empty interface. The program hash is derived from the name.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            program_hash: HashValue::digest(&[b"chroma/native/", name.as_bytes()]),
            entry_points: BTreeMap::new(),
        }
    }

    /// Adds a full entry point.
    pub fn func<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut dyn Sandbox) -> Result<Params, VmError> + Send + Sync + 'static,
    {
        self.add(name, Handler::Full(Arc::new(handler)));
        self
    }

    /// Adds a view entry point.
    pub fn view<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut dyn SandboxView) -> Result<Params, VmError> + Send + Sync + 'static,
    {
        self.add(name, Handler::View(Arc::new(handler)));
        self
    }

    fn add(&mut self, name: &str, handler: Handler) {
        let ep = EntryPoint {
            name: name.to_string(),
            handler,
        };
        self.entry_points.insert(ep.hname(), ep);
    }

    /// The contract name.
    pub fn contract_name(&self) -> &str {
        &self.name
    }

    /// The contract description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The hname of the contract name.
    pub fn hname(&self) -> Hname {
        Hname::of(&self.name)
    }

    /// Iterates entry points in hname order.
    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> + '_ {
        self.entry_points.values()
    }
}

impl ContractProcessor for ContractInterface {
    fn program_hash(&self) -> HashValue {
        self.program_hash
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn entry_point(&self, code: Hname) -> Option<&EntryPoint> {
        self.entry_points.get(&code)
    }
}
