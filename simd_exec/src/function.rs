use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::Signature;
use crate::frame::{Frame, FrameLayout};
use crate::mask::LaneMask;

/// Native implementation of a built-in. Reads its arguments from the frame
/// and writes its outputs back into the frame's return/output slots.
pub type BuiltinLambda = dyn Fn(&LaneMask, &mut Frame<'_>) + Send + Sync;

#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub signature: Signature,
    layout: Arc<FrameLayout>,
    lambda: Arc<BuiltinLambda>,
}

/// A call site bound to its implementation. Produced once by
/// [`BuiltinLib::link`]; calling through it never touches the library.
#[derive(Clone)]
pub struct LinkedBuiltin {
    name: String,
    signature: Signature,
    layout: Arc<FrameLayout>,
    lambda: Arc<BuiltinLambda>,
}

/// Registry of built-ins keyed by `(name, signature)`.
///
/// Mutated only while the library is being assembled; afterwards it is shared
/// read-only between linkers and threads.
#[derive(Default, Clone, Debug)]
pub struct BuiltinLib {
    builtins: hashbrown::HashMap<String, Vec<Builtin>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("unknown built-in '{name}'")]
    UnknownBuiltin { name: String },
    #[error("no overload of '{name}' matches {requested}; declared: {declared}")]
    SignatureMismatch {
        name: String,
        requested: Signature,
        declared: String,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to serialize built-in library: {0}")]
    Yaml(#[from] serde_yml::Error),
}

#[derive(Serialize)]
struct BuiltinEntry<'a> {
    name: &'a str,
    signature: &'a Signature,
}

impl Builtin {
    pub fn new<F>(name: &str, signature: Signature, lambda: F) -> Self
    where
        F: Fn(&LaneMask, &mut Frame<'_>) + Send + Sync + 'static,
    {
        let layout = Arc::new(FrameLayout::new(&signature));
        Builtin {
            name: name.to_string(),
            signature,
            layout,
            lambda: Arc::new(lambda),
        }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

impl LinkedBuiltin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub(crate) fn run(&self, mask: &LaneMask, frame: &mut Frame<'_>) {
        (self.lambda)(mask, frame)
    }
}

impl Debug for LinkedBuiltin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedBuiltin")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .field("depth", &self.layout.depth())
            .finish()
    }
}

impl BuiltinLib {
    pub fn declare<F>(&mut self, name: &str, signature: Signature, lambda: F)
    where
        F: Fn(&LaneMask, &mut Frame<'_>) + Send + Sync + 'static,
    {
        self.add(Builtin::new(name, signature, lambda));
    }

    pub fn add(&mut self, builtin: Builtin) {
        let overloads = self.builtins.entry(builtin.name.clone()).or_default();
        if overloads
            .iter()
            .any(|existing| existing.signature == builtin.signature)
        {
            panic!(
                "Built-in already exists: {} {}",
                builtin.name, builtin.signature
            );
        }

        debug!(name = %builtin.name, signature = %builtin.signature, "declared built-in");
        overloads.push(builtin);
    }

    pub fn get(&self, name: &str, signature: &Signature) -> Option<&Builtin> {
        self.by_name(name)
            .iter()
            .find(|builtin| builtin.signature == *signature)
    }

    /// All overloads declared under `name`.
    pub fn by_name(&self, name: &str) -> &[Builtin] {
        self.builtins
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Binds a call site to its implementation.
    pub fn link(&self, name: &str, signature: &Signature) -> Result<LinkedBuiltin, LinkError> {
        let overloads = self.by_name(name);
        if overloads.is_empty() {
            warn!(name, "link failed: unknown built-in");
            return Err(LinkError::UnknownBuiltin {
                name: name.to_string(),
            });
        }

        let Some(builtin) = overloads
            .iter()
            .find(|builtin| builtin.signature == *signature)
        else {
            let declared = overloads
                .iter()
                .map(|builtin| builtin.signature.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            warn!(name, requested = %signature, "link failed: signature mismatch");
            return Err(LinkError::SignatureMismatch {
                name: name.to_string(),
                requested: signature.clone(),
                declared,
            });
        };

        debug!(name, signature = %signature, "linked built-in");
        Ok(LinkedBuiltin {
            name: builtin.name.clone(),
            signature: builtin.signature.clone(),
            layout: Arc::clone(&builtin.layout),
            lambda: Arc::clone(&builtin.lambda),
        })
    }

    pub fn merge(&mut self, other: BuiltinLib) {
        for (_name, overloads) in other.builtins {
            for builtin in overloads {
                self.add(builtin);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Builtin> {
        self.builtins.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.builtins.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared names and signatures, sorted, for consumers that type-check
    /// calls against this library.
    pub fn to_yaml(&self) -> Result<String, RegistryError> {
        let mut entries: Vec<(String, BuiltinEntry<'_>)> = self
            .iter()
            .map(|builtin| {
                (
                    format!("{} {}", builtin.name, builtin.signature),
                    BuiltinEntry {
                        name: &builtin.name,
                        signature: &builtin.signature,
                    },
                )
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let entries: Vec<BuiltinEntry<'_>> = entries.into_iter().map(|(_, entry)| entry).collect();
        Ok(serde_yml::to_string(&entries)?)
    }
}

impl<It> From<It> for BuiltinLib
where
    It: IntoIterator<Item = Builtin>,
{
    fn from(iter: It) -> Self {
        let mut lib = BuiltinLib::default();
        for builtin in iter {
            lib.add(builtin);
        }
        lib
    }
}
