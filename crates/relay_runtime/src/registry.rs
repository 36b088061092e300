//! Interface registry.
//!
//! Maps names to interface records. Records are created on first lookup and live for
//! the lifetime of the registry. A chain may only name interfaces that already exist
//! and may only be set while nothing references the interface yet, so the composition
//! graph can never contain a cycle.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use relay_core::{FastHashMap, fast_map_new, fast_set_new};
use smallvec::SmallVec;
use tracing::debug;

use crate::errors::RuntimeError;
use crate::interface::{HandlerEntry, InterfaceConfig, InterfaceHandle, InterfaceRecord};

type HashMap<K, V> = FastHashMap<K, V>;

const ANONYMOUS: &str = "?";
const FOUNDATION_SIGIL: char = '@';

fn name_pattern() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| {
        Regex::new(r"^@?[A-Za-z_][A-Za-z0-9_.:/-]*$").expect("interface name pattern is valid")
    })
}

pub(crate) struct Registry {
    interfaces: RefCell<HashMap<Rc<str>, Rc<InterfaceRecord>>>,
    anon_seq: Cell<u64>,
    bootstrap: Cell<bool>,
}

impl Registry {
    pub(crate) fn new(bootstrap: bool) -> Self {
        Self {
            interfaces: RefCell::new(fast_map_new()),
            anon_seq: Cell::new(0),
            bootstrap: Cell::new(bootstrap),
        }
    }

    pub(crate) fn is_bootstrapping(&self) -> bool {
        self.bootstrap.get()
    }

    pub(crate) fn finish_bootstrap(&self) {
        if self.bootstrap.replace(false) {
            debug!("interface bootstrap finished");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.interfaces.borrow().len()
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Rc<InterfaceRecord>> {
        self.interfaces.borrow().get(name).cloned()
    }

    pub(crate) fn require(&self, name: &str) -> Result<Rc<InterfaceRecord>, RuntimeError> {
        self.lookup(name)
            .ok_or_else(|| RuntimeError::UnknownInterface(name.to_string()))
    }

    /// Whether `handle` is the record registered under its name.
    pub(crate) fn owns(&self, handle: &InterfaceHandle) -> bool {
        self.lookup(&handle.record.name)
            .is_some_and(|r| Rc::ptr_eq(&r, &handle.record))
    }

    pub(crate) fn snapshot(&self) -> Vec<Rc<InterfaceRecord>> {
        let mut all: Vec<_> = self.interfaces.borrow().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub(crate) fn get_or_create(&self, name: &str) -> Result<InterfaceHandle, RuntimeError> {
        if name == ANONYMOUS {
            let seq = self.anon_seq.get() + 1;
            self.anon_seq.set(seq);
            let name: Rc<str> = Rc::from(format!("{ANONYMOUS}{seq}"));
            return Ok(self.insert(name));
        }
        if !name_pattern().is_match(name) {
            return Err(RuntimeError::InvalidName(name.to_string()));
        }
        if let Some(record) = self.lookup(name) {
            if record.flags().private {
                return Err(RuntimeError::PrivateInterface(name.to_string()));
            }
            return Ok(InterfaceHandle { record });
        }
        // Foundational names can only be created while bootstrapping.
        if name.starts_with(FOUNDATION_SIGIL) && !self.is_bootstrapping() {
            return Err(RuntimeError::InvalidName(name.to_string()));
        }
        Ok(self.insert(Rc::from(name)))
    }

    fn insert(&self, name: Rc<str>) -> InterfaceHandle {
        let record = Rc::new(InterfaceRecord::new(name.clone()));
        self.interfaces.borrow_mut().insert(name.clone(), record.clone());
        debug!(interface = %name, "interface created");
        InterfaceHandle { record }
    }

    /// Applies `config` to `record`. Nothing changes unless every check passes.
    pub(crate) fn configure(
        &self,
        record: &Rc<InterfaceRecord>,
        config: InterfaceConfig,
    ) -> Result<(), RuntimeError> {
        let name = record.name.to_string();
        let flags = record.flags();
        if flags.locked {
            return Err(RuntimeError::Locked(name));
        }
        if config.pristine && !flags.pristine {
            return Err(RuntimeError::NotPristine(name));
        }

        let mut supertypes: Vec<Rc<InterfaceRecord>> = Vec::new();
        if let Some(chain) = &config.chain {
            if record.chain.borrow().is_some() || flags.refd {
                return Err(RuntimeError::ChainFrozen(name));
            }
            for sup in chain {
                if **sup == *record.name {
                    return Err(RuntimeError::SelfChain(name));
                }
                let Some(sup_record) = self.lookup(sup) else {
                    return Err(RuntimeError::UnknownSupertype {
                        name,
                        supertype: sup.clone(),
                    });
                };
                if sup_record.flags().is_final {
                    return Err(RuntimeError::ExtendsFinal {
                        name,
                        supertype: sup.clone(),
                    });
                }
                if !supertypes.iter().any(|s| Rc::ptr_eq(s, &sup_record)) {
                    supertypes.push(sup_record);
                }
            }
        }

        if config.chain.is_some() {
            for sup in &supertypes {
                sup.update_flags(|f| f.refd = true);
            }
            let chain: Rc<[Rc<str>]> = supertypes.iter().map(|s| s.name.clone()).collect();
            debug!(interface = %record.name, chain = ?chain, "chain set");
            *record.chain.borrow_mut() = Some(chain);
        }

        {
            let mut handlers = record.handlers.borrow_mut();
            for (op, handler) in config.handlers {
                let entry = match handler {
                    Some(h) => HandlerEntry::Active(Rc::new(h)),
                    None => HandlerEntry::Stub,
                };
                handlers.insert(op, entry);
            }
        }

        record.update_flags(|f| {
            f.pristine = false;
            f.is_abstract |= config.set_abstract;
            f.is_final |= config.set_final;
            f.singleton |= config.singleton;
            f.private |= config.private;
            f.once |= config.once;
            f.locked |= config.lock || config.once;
        });
        let flags = record.flags();
        debug!(interface = %record.name, ?flags, "interface configured");
        Ok(())
    }

    /// Transitive closure of the chain, `record` first.
    ///
    /// Depth-first pre-order over supertypes in declaration order; every interface
    /// appears once even in diamond-shaped chains.
    pub(crate) fn flat_chain(&self, record: &Rc<InterfaceRecord>) -> Rc<[Rc<str>]> {
        if let Some(flat) = record.flat.get() {
            return flat.clone();
        }
        let mut out: Vec<Rc<str>> = Vec::new();
        let mut seen = fast_set_new();
        let mut stack: SmallVec<[Rc<str>; 8]> = SmallVec::new();
        stack.push(record.name.clone());
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(current) = self.lookup(&name) else {
                continue;
            };
            out.push(name);
            if let Some(chain) = current.chain.borrow().as_ref() {
                for sup in chain.iter().rev() {
                    if !seen.contains(sup) {
                        stack.push(sup.clone());
                    }
                }
            }
        }
        let flat: Rc<[Rc<str>]> = out.into();
        if record.chain_frozen() {
            let _ = record.flat.set(flat.clone());
        }
        flat
    }

    pub(crate) fn all_locked(&self, names: &[Rc<str>]) -> bool {
        names
            .iter()
            .all(|n| self.lookup(n).is_some_and(|r| r.flags().locked))
    }
}
