// LLVM exposes most of its IR lists (functions, globals, parameters, blocks, instructions,
// uses, named metadata) as intrusive linked lists walked with a GetFirst/GetNext pair. Chain
// turns such a pair into a Rust iterator: it holds the next element and a step function, and
// stops at the first null.

//! Iterators over LLVM's intrusive lists.

use std::iter::FusedIterator;

/// Iterator following a `GetNext*`-style step function.
#[derive(Clone)]
pub struct Chain<T: Copy> {
    next: Option<T>,
    step: fn(T) -> Option<T>,
}

impl<T: Copy> Chain<T> {
    pub(crate) fn new(first: Option<T>, step: fn(T) -> Option<T>) -> Self {
        Self { next: first, step }
    }
}

impl<T: Copy> Iterator for Chain<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let current = self.next?;
        self.next = (self.step)(current);
        Some(current)
    }
}

impl<T: Copy> FusedIterator for Chain<T> {}
