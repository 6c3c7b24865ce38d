// This module implements the deduplicating ownership cache that every owning LLVM handle goes
// through. LLVM hands out raw pointers freely: the same LLVMModuleRef comes back from
// LLVMGetGlobalParent on every function of a module, and a memory buffer may be handed to
// LLVM for good by LLVMParseIRInContext. Each handle kind (context, module, memory buffer,
// metadata entries, module-flag entries, operand bundle, pass manager, target data, target
// machine, binary, disassembler context) owns a Registry mapping the pointer address to a
// generation-stamped weak slot. Shared::wrap upgrades an existing slot or installs a new cell;
// dropping the last Shared disposes the pointer only if the registry slot still belongs to
// that cell, so a pointer is disposed at most once no matter how many handles observed it.
// Shared::release removes the slot without disposing, transferring ownership to LLVM, and
// refuses while other handles are alive or when the cell was never owned. Handles over objects
// another owner disposes (inkwell's contexts and modules, the parent of a foreign global) are
// handed out inside Borrowed, whose lifetime keeps them from outliving the borrow. Cells can carry per-kind state (contexts attach
// their diagnostic sink). The registry mutex guards only the cache's own bookkeeping.

//! Deduplicating ownership cache for opaque LLVM handles.

use hashbrown::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A kind of LLVM object with a matching dispose function.
pub trait OwnedKind: Sized + 'static {
    /// The opaque type behind the raw pointer (`LLVMOpaqueModule`, ...).
    type Opaque;
    /// Extra state attached to each live cell.
    type State: Default + Send + Sync;
    /// Human readable name, used in logs and errors.
    const NAME: &'static str;

    /// Dispose the underlying LLVM object.
    ///
    /// # Safety
    /// Called exactly once per registered pointer, by the cache.
    unsafe fn dispose(raw: *mut Self::Opaque);

    /// The process-wide registry of this kind.
    fn registry() -> &'static Registry<Self>;
}

struct Slot<K: OwnedKind> {
    generation: u64,
    cell: Weak<Cell<K>>,
}

/// Map from raw pointer address to the live cell owning it.
pub struct Registry<K: OwnedKind> {
    slots: Mutex<HashMap<usize, Slot<K>>>,
    generation: AtomicU64,
}

impl<K: OwnedKind> Registry<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, Slot<K>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of pointers currently owned through this registry.
    pub fn live(&self) -> usize {
        self.lock().len()
    }

    /// Whether `raw` is currently owned through this registry.
    pub fn contains(&self, raw: *mut K::Opaque) -> bool {
        self.lock().contains_key(&(raw as usize))
    }
}

impl<K: OwnedKind> Default for Registry<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared cell holding one raw pointer.
struct Cell<K: OwnedKind> {
    addr: usize,
    generation: u64,
    owned: bool,
    state: K::State,
    _kind: PhantomData<fn() -> K>,
}

impl<K: OwnedKind> Drop for Cell<K> {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        let dispose = {
            let mut slots = K::registry().lock();
            match slots.get(&self.addr) {
                Some(slot) if slot.generation == self.generation => {
                    slots.remove(&self.addr);
                    true
                }
                Some(_) => {
                    log::trace!("{} {:#x} superseded, not disposing", K::NAME, self.addr);
                    false
                }
                None => {
                    log::trace!("{} {:#x} released, not disposing", K::NAME, self.addr);
                    false
                }
            }
        };
        if dispose {
            log::trace!("disposing {} {:#x}", K::NAME, self.addr);
            unsafe { K::dispose(self.addr as *mut K::Opaque) };
        }
    }
}

/// Reference-counted owning handle to an LLVM object of kind `K`.
///
/// All `Shared` handles over the same pointer share one cell; the last one to
/// go disposes the object.
pub struct Shared<K: OwnedKind> {
    cell: Arc<Cell<K>>,
    // LLVM objects are not thread safe; keep handles on the thread that made them.
    _not_send: PhantomData<*const ()>,
}

impl<K: OwnedKind> Shared<K> {
    fn from_cell(cell: Arc<Cell<K>>) -> Self {
        Self {
            cell,
            _not_send: PhantomData,
        }
    }

    /// Take (or join) ownership of `raw`. Returns `None` for a null pointer.
    ///
    /// # Safety
    /// `raw` must be a live object of kind `K` that no other owner disposes.
    pub unsafe fn wrap(raw: *mut K::Opaque) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        let addr = raw as usize;
        let registry = K::registry();
        let mut slots = registry.lock();
        if let Some(cell) = slots.get(&addr).and_then(|slot| slot.cell.upgrade()) {
            return Some(Self::from_cell(cell));
        }
        let generation = registry.generation.fetch_add(1, Ordering::Relaxed);
        let cell = Arc::new(Cell {
            addr,
            generation,
            owned: true,
            state: K::State::default(),
            _kind: PhantomData,
        });
        slots.insert(
            addr,
            Slot {
                generation,
                cell: Arc::downgrade(&cell),
            },
        );
        log::trace!("registered {} {:#x} (generation {})", K::NAME, addr, generation);
        Some(Self::from_cell(cell))
    }

    /// Join an existing owner of `raw` without ever taking ownership.
    pub fn lookup(raw: *mut K::Opaque) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        let slots = K::registry().lock();
        slots
            .get(&(raw as usize))
            .and_then(|slot| slot.cell.upgrade())
            .map(Self::from_cell)
    }

    /// A handle that is neither registered nor disposed.
    ///
    /// # Safety
    /// `raw` must outlive every copy of the returned handle.
    pub unsafe fn unowned(raw: *mut K::Opaque) -> Self {
        Self::from_cell(Arc::new(Cell {
            addr: raw as usize,
            generation: 0,
            owned: false,
            state: K::State::default(),
            _kind: PhantomData,
        }))
    }

    pub fn as_raw(&self) -> *mut K::Opaque {
        self.cell.addr as *mut K::Opaque
    }

    pub fn state(&self) -> &K::State {
        &self.cell.state
    }

    /// Whether dropping the last handle disposes the object.
    pub fn is_owned(&self) -> bool {
        self.cell.owned
    }

    /// Number of handles sharing this cell.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.cell)
    }

    /// Give up ownership so LLVM (or the caller) can dispose the object.
    ///
    /// Fails, handing the handle back, while other handles share the cell or when the cell
    /// never owned the object.
    pub fn release(self) -> Result<*mut K::Opaque, Self> {
        let raw = self.as_raw();
        if !self.cell.owned {
            log::warn!("refusing to release unowned {} {:#x}", K::NAME, self.cell.addr);
            return Err(self);
        }
        {
            let mut slots = K::registry().lock();
            let count = Arc::strong_count(&self.cell);
            if count != 1 {
                log::warn!(
                    "refusing to release {} {:#x}: {} handles alive",
                    K::NAME,
                    self.cell.addr,
                    count
                );
                return Err(self);
            }
            if matches!(slots.get(&self.cell.addr), Some(slot) if slot.generation == self.cell.generation)
            {
                slots.remove(&self.cell.addr);
            }
        }
        log::trace!("released {} {:#x}", K::NAME, self.cell.addr);
        drop(self);
        Ok(raw)
    }
}

impl<K: OwnedKind> Clone for Shared<K> {
    fn clone(&self) -> Self {
        Self::from_cell(Arc::clone(&self.cell))
    }
}

impl<K: OwnedKind> PartialEq for Shared<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cell.addr == other.cell.addr
    }
}

impl<K: OwnedKind> Eq for Shared<K> {}

impl<K: OwnedKind> Hash for Shared<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cell.addr.hash(state);
    }
}

impl<K: OwnedKind> fmt::Debug for Shared<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", K::NAME, self.cell.addr)
    }
}

/// A handle that is only valid while `'a` lasts.
///
/// Wraps views of objects another owner disposes, and navigation results whose owner may be
/// foreign.
pub struct Borrowed<'a, T> {
    inner: T,
    _borrow: PhantomData<&'a ()>,
}

impl<T> Borrowed<'_, T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner,
            _borrow: PhantomData,
        }
    }
}

impl<T> Deref for Borrowed<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: PartialEq> PartialEq<T> for Borrowed<'_, T> {
    fn eq(&self, other: &T) -> bool {
        self.inner == *other
    }
}

impl<T: fmt::Debug> fmt::Debug for Borrowed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Borrowed").field(&self.inner).finish()
    }
}

/// Declare a handle kind together with its registry.
macro_rules! owned_kind {
    ($(#[$meta:meta])* $vis:vis $kind:ident, $opaque:ty, $dispose:path, $name:literal) => {
        $crate::handle::owned_kind!($(#[$meta])* $vis $kind, $opaque, $dispose, $name, state = ());
    };
    ($(#[$meta:meta])* $vis:vis $kind:ident, $opaque:ty, $dispose:path, $name:literal, state = $state:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis enum $kind {}

        impl $crate::handle::OwnedKind for $kind {
            type Opaque = $opaque;
            type State = $state;
            const NAME: &'static str = $name;

            unsafe fn dispose(raw: *mut Self::Opaque) {
                $dispose(raw)
            }

            fn registry() -> &'static $crate::handle::Registry<Self> {
                static REGISTRY: std::sync::LazyLock<$crate::handle::Registry<$kind>> =
                    std::sync::LazyLock::new($crate::handle::Registry::new);
                &REGISTRY
            }
        }
    };
}
pub(crate) use owned_kind;
