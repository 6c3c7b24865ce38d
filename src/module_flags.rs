//! Owned copies of a module's `llvm.module.flags` entries.

use crate::enums::ModuleFlagBehavior;
use crate::handle::{owned_kind, Shared};
use crate::support::string_from_parts;
use crate::values::Metadata;
use llvm_sys::core::{
    LLVMDisposeModuleFlagsMetadata, LLVMModuleFlagEntriesGetFlagBehavior,
    LLVMModuleFlagEntriesGetKey, LLVMModuleFlagEntriesGetMetadata,
};
use llvm_sys::prelude::LLVMModuleFlagEntry;
use std::fmt;

owned_kind!(
    pub(crate) ModuleFlagEntriesKind,
    LLVMModuleFlagEntry,
    LLVMDisposeModuleFlagsMetadata,
    "module flag entries"
);

/// A snapshot of the module flags, freed once with `LLVMDisposeModuleFlagsMetadata`.
#[derive(Clone)]
pub struct ModuleFlagEntries {
    handle: Option<Shared<ModuleFlagEntriesKind>>,
    len: usize,
}

impl ModuleFlagEntries {
    /// # Safety
    /// `raw` must be null or an entry array of `len` entries owned by the caller.
    pub(crate) unsafe fn from_raw(raw: *mut LLVMModuleFlagEntry, len: usize) -> Self {
        Self {
            handle: Shared::wrap(raw),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.handle.as_ref().map_or(0, |_| self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn raw_at(&self, index: usize) -> Option<*mut LLVMModuleFlagEntry> {
        if index >= self.len() {
            return None;
        }
        self.handle.as_ref().map(|h| h.as_raw())
    }

    pub fn behavior(&self, index: usize) -> Option<ModuleFlagBehavior> {
        self.raw_at(index).map(|raw| {
            ModuleFlagBehavior::from(unsafe { LLVMModuleFlagEntriesGetFlagBehavior(raw, index as u32) })
        })
    }

    pub fn key(&self, index: usize) -> Option<String> {
        self.raw_at(index).map(|raw| {
            let mut len = 0;
            let ptr = unsafe { LLVMModuleFlagEntriesGetKey(raw, index as u32, &mut len) };
            unsafe { string_from_parts(ptr, len) }
        })
    }

    pub fn metadata(&self, index: usize) -> Option<Metadata<'_>> {
        self.raw_at(index)
            .map(|raw| unsafe { Metadata::from_raw(LLVMModuleFlagEntriesGetMetadata(raw, index as u32)) })
    }

    /// `(behavior, key, metadata)` for every entry.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleFlagBehavior, String, Metadata<'_>)> + '_ {
        (0..self.len()).filter_map(move |i| Some((self.behavior(i)?, self.key(i)?, self.metadata(i)?)))
    }
}

impl fmt::Debug for ModuleFlagEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(behavior, key, _)| (key, behavior)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_flags_snapshot() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("flags").unwrap();
        assert!(module.module_flags().is_empty());

        let version = ctx.i32_type().const_int(5, false).as_metadata();
        module.add_module_flag(ModuleFlagBehavior::Warning, "Dwarf Version", version);
        module.add_module_flag(
            ModuleFlagBehavior::Error,
            "PIC Level",
            ctx.i32_type().const_int(2, false).as_metadata(),
        );

        let flags = module.module_flags();
        assert_eq!(flags.len(), 2);
        let keys: Vec<String> = flags.iter().map(|(_, key, _)| key).collect();
        assert!(keys.contains(&String::from("Dwarf Version")));
        let index = keys.iter().position(|k| k == "Dwarf Version").unwrap();
        assert_eq!(flags.behavior(index), Some(ModuleFlagBehavior::Warning));
        assert_eq!(flags.metadata(index), Some(version));
        assert!(flags.key(2).is_none());
        assert_eq!(module.module_flag("Dwarf Version"), Some(version));
        assert_eq!(module.module_flag("missing"), None);
    }
}
