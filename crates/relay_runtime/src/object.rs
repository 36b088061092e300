//! Object contexts and their public receiver handles.

use std::any::Any;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::params::{Storage, new_storage};

pub(crate) struct ObjectCtx {
    id: u64,
    ty: Rc<str>,
    /// Host state, reachable only from frames whose handler is declared by `ty`.
    state: RefCell<Option<Box<dyn Any>>>,
    persistent: OnceCell<Storage>,
}

/// Public handle to an object. Clones refer to the same object.
#[derive(Clone)]
pub struct Receiver(Rc<ObjectCtx>);

impl Receiver {
    pub(crate) fn new(id: u64, ty: Rc<str>) -> Self {
        Receiver(Rc::new(ObjectCtx {
            id,
            ty,
            state: RefCell::new(None),
            persistent: OnceCell::new(),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn type_name(&self) -> &str {
        &self.0.ty
    }

    pub(crate) fn type_rc(&self) -> &Rc<str> {
        &self.0.ty
    }

    pub fn ptr_eq(&self, other: &Receiver) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Persistent storage, created on first access.
    pub(crate) fn persistent(&self) -> Storage {
        self.0.persistent.get_or_init(new_storage).clone()
    }

    pub fn has_persistent(&self) -> bool {
        self.0.persistent.get().is_some()
    }

    pub(crate) fn set_state(&self, state: Box<dyn Any>) {
        *self.0.state.borrow_mut() = Some(state);
    }

    /// Runs `f` on the state with it taken out of the slot, so `f` may dispatch back
    /// into this object. Nested access sees no state. The state is put back unless `f`
    /// installed a replacement.
    pub(crate) fn with_state<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut state = self.0.state.borrow_mut().take()?;
        let result = state.downcast_mut::<T>().map(f);
        let mut slot = self.0.state.borrow_mut();
        if slot.is_none() {
            *slot = Some(state);
        }
        result
    }
}

impl PartialEq for Receiver {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Receiver {}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}#{}>", self.0.ty, self.0.id)
    }
}
