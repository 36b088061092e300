//! Instance management.

use std::rc::Rc;

use tracing::debug;

use crate::core::params::ParamList;
use crate::dispatch::Attribution;
use crate::errors::{RuntimeError, Signal};
use crate::interface::{ControlOp, InterfaceHandle, InterfaceRecord};
use crate::object::Receiver;
use crate::runtime::Runtime;

impl Runtime {
    /// Creates an object of interface `ty`, running its `@init` handler with `params`.
    ///
    /// Private interfaces are rejected here; use [`Runtime::instantiate_with`].
    pub fn instantiate(&self, ty: &str, params: ParamList) -> Result<Receiver, Signal> {
        let record = self.registry.require(ty)?;
        if record.flags().private {
            return Err(RuntimeError::PrivateInterface(ty.to_string()).into());
        }
        self.instantiate_record(&record, params)
    }

    /// Creates an object through the interface's own handle.
    pub fn instantiate_with(
        &self,
        handle: &InterfaceHandle,
        params: ParamList,
    ) -> Result<Receiver, Signal> {
        if !self.registry.owns(handle) {
            return Err(RuntimeError::UnknownInterface(handle.name().to_string()).into());
        }
        self.instantiate_record(&handle.record, params)
    }

    fn instantiate_record(
        &self,
        record: &Rc<InterfaceRecord>,
        params: ParamList,
    ) -> Result<Receiver, Signal> {
        let flags = record.flags();
        if flags.is_abstract {
            return Err(RuntimeError::AbstractInterface(record.name.to_string()).into());
        }
        if flags.singleton {
            if let Some(existing) = record.instance.borrow().as_ref() {
                return Ok(existing.clone());
            }
        }
        record.update_flags(|f| f.refd = true);

        let receiver = Receiver::new(self.next_object_id(), record.name.clone());
        // Registered before `@init` runs so a nested instantiation gets this object.
        if flags.singleton {
            *record.instance.borrow_mut() = Some(receiver.clone());
        }
        if let Err(err) = self.run_init(record, &receiver, params) {
            if flags.singleton {
                record.instance.borrow_mut().take();
            }
            return Err(err);
        }
        debug!(interface = %record.name, id = receiver.id(), "instance created");
        Ok(receiver)
    }

    fn run_init(
        &self,
        record: &Rc<InterfaceRecord>,
        receiver: &Receiver,
        params: ParamList,
    ) -> Result<(), Signal> {
        let init = ControlOp::Init.op();
        let Some(handler) = self.resolve_in(record, &init, false, false, Some(receiver))? else {
            return Ok(());
        };
        let attribution = Attribution {
            receiver: Some(receiver.clone()),
            ..Attribution::default()
        };
        self.invoke(&handler, init, params, attribution)?;
        Ok(())
    }
}
