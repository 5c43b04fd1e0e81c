//! Lock-bound iterables
//!
//! An [`Iterable`] pairs a [`Cursor`] with the structure it walks. When built
//! by a [`GraphView`](crate::GraphView) it owns a read guard on the view and
//! releases it exactly once: when the cursor first reports exhaustion, on
//! [`Iterable::do_break`], when the cursor fails, or when the iterable is
//! dropped, whichever comes first.

use parking_lot::{ArcRwLockReadGuard, RawRwLock};
use tracing::{trace, warn};

use crate::cursor::Cursor;
use crate::error::{GraphError, Result};
use crate::structure::Structure;

enum Source<'a> {
    Locked(ArcRwLockReadGuard<RawRwLock, Structure>),
    Borrowed(&'a Structure),
    Released,
}

fn structure_of<'s>(source: &'s Source<'_>) -> Option<&'s Structure> {
    match source {
        Source::Locked(guard) => Some(&**guard),
        Source::Borrowed(structure) => Some(*structure),
        Source::Released => None,
    }
}

pub struct Iterable<'a, C: Cursor> {
    source: Source<'a>,
    cursor: C,
    buffered: Option<C::Item>,
    failure: Option<GraphError>,
}

impl<C: Cursor> Iterable<'static, C> {
    /// Bind `cursor` to a read guard the iterable takes ownership of.
    pub fn locked(guard: ArcRwLockReadGuard<RawRwLock, Structure>, cursor: C) -> Self {
        Iterable {
            source: Source::Locked(guard),
            cursor,
            buffered: None,
            failure: None,
        }
    }
}

impl<'a, C: Cursor> Iterable<'a, C> {
    /// Bind `cursor` to a structure the caller already protects.
    pub fn unlocked(structure: &'a Structure, cursor: C) -> Self {
        Iterable {
            source: Source::Borrowed(structure),
            cursor,
            buffered: None,
            failure: None,
        }
    }

    /// Buffer the next element if there is one. Releases the lock the first
    /// time the cursor runs dry or fails.
    pub fn has_next(&mut self) -> bool {
        if self.buffered.is_some() {
            return true;
        }
        let Some(structure) = structure_of(&self.source) else {
            return false;
        };
        match self.cursor.advance(structure) {
            Ok(Some(item)) => {
                self.buffered = Some(item);
                true
            }
            Ok(None) => {
                self.release();
                false
            }
            Err(e) => {
                warn!("Traversal stopped: {}", e);
                self.failure = Some(e);
                self.release();
                false
            }
        }
    }

    /// Stop early and release the lock. Further calls yield nothing.
    pub fn do_break(&mut self) {
        self.buffered = None;
        self.release();
    }

    /// Drain the remaining elements. Reports the error that stopped the
    /// traversal, if any.
    pub fn to_vec(mut self) -> Result<Vec<C::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next() {
            items.push(item);
        }
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(items),
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(self.source, Source::Released)
    }

    /// The error that ended the traversal early.
    pub fn failure(&self) -> Option<&GraphError> {
        self.failure.as_ref()
    }

    /// The structure being walked, until the iterable is released.
    pub fn structure(&self) -> Option<&Structure> {
        structure_of(&self.source)
    }

    fn release(&mut self) {
        if let Source::Locked(guard) = std::mem::replace(&mut self.source, Source::Released) {
            trace!("Releasing read lock on {}", guard.view());
            drop(guard);
        }
    }
}

impl<C: Cursor> Iterator for Iterable<'_, C> {
    type Item = C::Item;

    fn next(&mut self) -> Option<C::Item> {
        if self.has_next() {
            self.buffered.take()
        } else {
            None
        }
    }
}

impl<C: Cursor> Drop for Iterable<'_, C> {
    fn drop(&mut self) {
        self.release();
    }
}
