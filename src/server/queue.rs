//! # Cola de Conexiones
//! src/server/queue.rs
//!
//! Cola FIFO thread-safe y sin límite entre el listener y los workers.
//! `pop` bloquea con una `Condvar` (sin busy loop) y libera el lock mientras
//! espera.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

/// Cola FIFO bloqueante
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,

    /// Notifica a los workers cuando la cola deja de estar vacía
    not_empty: Condvar,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // Ningún código hace panic con el lock tomado; si pasara, la cola
        // sigue siendo consistente porque push/pop son atómicos.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Agrega un item al final y despierta a un worker
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Remueve el primer item, bloqueando hasta que haya uno
    pub fn pop(&self) -> T {
        let mut items = self.lock();

        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            items = self
                .not_empty
                .wait(items)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Intenta remover el primer item sin bloquear
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
