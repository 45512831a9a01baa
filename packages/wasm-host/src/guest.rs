//! Resolving and calling guest exports.
//!
//! [`GuestInstance`] is the context object every other component takes: it
//! owns the store, the instance and the ABI exports resolved right after
//! instantiation. Memory views are borrowed from the store, so none can be
//! held across a guest call.

use wasmtime::{
    Extern, Func, Instance, Memory, Store, TypedFunc, Val, ValType, WasmParams, WasmResults,
};

use crate::codec;
use crate::error::{classify_call_error, HostError, Result};
use crate::imports::HostState;
use crate::offset::GuestOffset;

pub const MEMORY_EXPORT: &str = "memory";
pub const ALLOCATE_EXPORT: &str = "allocate";
pub const DEALLOCATE_EXPORT: &str = "deallocate";

/// Exports every guest following the string convention must provide.
#[derive(Clone)]
pub struct GuestAbi {
    pub memory: Memory,
    pub allocate: TypedFunc<i32, i32>,
    pub deallocate: TypedFunc<i32, ()>,
}

pub struct GuestInstance {
    store: Store<HostState>,
    instance: Instance,
    abi: GuestAbi,
    terminate_strings: bool,
}

impl GuestInstance {
    /// Fill the store's instance slot and resolve the ABI exports.
    ///
    /// Must be called immediately after instantiation, before any export
    /// runs.
    pub fn bind(mut store: Store<HostState>, instance: Instance) -> Result<Self> {
        store
            .data()
            .bind(instance)
            .map_err(|err| HostError::Instantiation(err.to_string()))?;

        let memory = lookup_memory(&mut store, instance, MEMORY_EXPORT)?;
        let allocate = lookup_typed(&mut store, instance, ALLOCATE_EXPORT)?;
        let deallocate = lookup_typed(&mut store, instance, DEALLOCATE_EXPORT)?;

        Ok(Self {
            store,
            instance,
            abi: GuestAbi {
                memory,
                allocate,
                deallocate,
            },
            terminate_strings: false,
        })
    }

    pub fn with_terminated_strings(mut self, terminate: bool) -> Self {
        self.terminate_strings = terminate;
        self
    }

    pub fn terminate_strings(&self) -> bool {
        self.terminate_strings
    }

    pub fn abi(&self) -> &GuestAbi {
        &self.abi
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn resolve_function<P, R>(&mut self, name: &str) -> Result<TypedFunc<P, R>>
    where
        P: WasmParams,
        R: WasmResults,
    {
        lookup_typed(&mut self.store, self.instance, name)
    }

    pub fn resolve_memory(&mut self, name: &str) -> Result<Memory> {
        lookup_memory(&mut self.store, self.instance, name)
    }

    /// Call a resolved export. `name` is only used for error reporting.
    pub fn call<P, R>(&mut self, name: &str, func: &TypedFunc<P, R>, args: P) -> Result<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        func.call(&mut self.store, args)
            .map_err(|err| classify_call_error(name, err))
    }

    /// Call an export whose parameters and results are all `i32`, checking
    /// the arguments against its declared signature first.
    pub fn call_dynamic(&mut self, name: &str, args: &[i32]) -> Result<Vec<i32>> {
        let func = lookup_func(&mut self.store, self.instance, name)?;
        let ty = func.ty(&self.store);

        if ty.params().len() != args.len() {
            return Err(HostError::Call {
                export: name.to_string(),
                reason: format!(
                    "expected {} arguments, got {}",
                    ty.params().len(),
                    args.len()
                ),
            });
        }
        let is_i32 = |ty: ValType| matches!(ty, ValType::I32);
        if !ty.params().all(is_i32) || !ty.results().all(is_i32) {
            return Err(HostError::Call {
                export: name.to_string(),
                reason: format!("unsupported signature {ty:?}, only i32 values are supported"),
            });
        }

        let params: Vec<Val> = args.iter().copied().map(Val::I32).collect();
        let mut results = vec![Val::I32(0); ty.results().len()];
        func.call(&mut self.store, &params, &mut results)
            .map_err(|err| classify_call_error(name, err))?;
        Ok(results.iter().filter_map(Val::i32).collect())
    }

    /// A fresh view of linear memory. Re-acquire after every guest call.
    pub fn memory_view(&self) -> &[u8] {
        self.abi.memory.data(&self.store)
    }

    pub fn memory_view_mut(&mut self) -> &mut [u8] {
        self.abi.memory.data_mut(&mut self.store)
    }

    /// Decode the guest string at `offset` with the configured decoding.
    pub fn read_string(&self, offset: GuestOffset) -> String {
        codec::decode_with(
            self.store.data().decoding(),
            self.memory_view(),
            offset.as_usize(),
        )
    }

    pub(crate) fn raw_allocate(&mut self, size: i32) -> anyhow::Result<i32> {
        self.abi.allocate.call(&mut self.store, size)
    }

    pub(crate) fn raw_deallocate(&mut self, offset: i32) -> anyhow::Result<()> {
        self.abi.deallocate.call(&mut self.store, offset)
    }
}

fn lookup_func(store: &mut Store<HostState>, instance: Instance, name: &str) -> Result<Func> {
    instance
        .get_export(&mut *store, name)
        .and_then(Extern::into_func)
        .ok_or_else(|| HostError::ExportNotFound {
            name: name.to_string(),
            expected: "function",
        })
}

fn lookup_typed<P, R>(
    store: &mut Store<HostState>,
    instance: Instance,
    name: &str,
) -> Result<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    let func = lookup_func(store, instance, name)?;
    func.typed::<P, R>(&*store).map_err(|err| HostError::Call {
        export: name.to_string(),
        reason: format!("signature mismatch: {err:#}"),
    })
}

fn lookup_memory(store: &mut Store<HostState>, instance: Instance, name: &str) -> Result<Memory> {
    instance
        .get_export(&mut *store, name)
        .and_then(Extern::into_memory)
        .ok_or_else(|| HostError::ExportNotFound {
            name: name.to_string(),
            expected: "memory",
        })
}
