//! Transaction manager implementation.

use super::state::{Frame, FrameState};
use crate::error::{StoreError, StoreResult};
use crate::lock::{Deadline, ProcessLock};
use happystore_storage::{OrderedStore, StorageResult};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::{RefCell, RefMut};
use std::time::Duration;
use tracing::{debug, warn};

type Gate = ReentrantMutex<RefCell<Session>>;
type GateGuard<'a> = ReentrantMutexGuard<'a, RefCell<Session>>;

/// Everything guarded by the store gate.
struct Session {
    backend: Box<dyn OrderedStore>,
    frames: Vec<Frame>,
    closed: bool,
}

/// Owns the backend connection and the stack of open transaction frames.
///
/// The gate is a reentrant mutex: the thread running an outermost
/// transaction can re-enter it for nested and implicit frames, while every
/// other thread waits. File-backed stores add a [`ProcessLock`] taken by the
/// outermost frame only.
pub(crate) struct TransactionManager {
    gate: Gate,
    process_lock: Option<ProcessLock>,
    lock_timeout: Option<Duration>,
}

impl TransactionManager {
    pub(crate) fn new(
        backend: Box<dyn OrderedStore>,
        process_lock: Option<ProcessLock>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        Self {
            gate: ReentrantMutex::new(RefCell::new(Session {
                backend,
                frames: Vec::new(),
                closed: false,
            })),
            process_lock,
            lock_timeout,
        }
    }

    /// Opens a new frame: an outermost transaction if none is open on this
    /// thread, otherwise a savepoint nested in the innermost frame.
    pub(crate) fn begin(&self) -> StoreResult<ActiveFrame<'_>> {
        self.enter(true)
    }

    /// Joins the innermost open frame on this thread, or opens an outermost
    /// transaction if there is none.
    pub(crate) fn begin_or_join(&self) -> StoreResult<ActiveFrame<'_>> {
        self.enter(false)
    }

    fn enter(&self, nest: bool) -> StoreResult<ActiveFrame<'_>> {
        let deadline = self.lock_timeout.and_then(Deadline::after);
        let guard = self.lock_gate(deadline)?;

        let (frame, owned) = {
            let mut session = borrow(&guard)?;
            if session.closed {
                return Err(StoreError::StoreClosed);
            }

            match session.frames.last().copied() {
                Some(top) if !nest => (top, false),
                Some(top) => {
                    let frame = Frame::nested(top.depth + 1);
                    if let Some(savepoint) = frame.savepoint {
                        session.backend.savepoint(savepoint)?;
                    }
                    session.frames.push(frame);
                    (frame, true)
                }
                None => {
                    if let Some(lock) = &self.process_lock {
                        lock.acquire(deadline).inspect_err(|err| {
                            warn!(path = %lock.path().display(), %err, "lock file unavailable");
                        })?;
                    }
                    if let Err(err) = session.backend.begin() {
                        self.release_process_lock();
                        return Err(err.into());
                    }
                    let frame = Frame::outermost();
                    session.frames.push(frame);
                    (frame, true)
                }
            }
        };

        if owned {
            debug!(depth = frame.depth, "transaction frame opened");
        }

        Ok(ActiveFrame {
            manager: self,
            guard,
            frame,
            owned,
            state: FrameState::Active,
        })
    }

    fn lock_gate(&self, deadline: Option<Deadline>) -> StoreResult<GateGuard<'_>> {
        match deadline {
            None => Ok(self.gate.lock()),
            Some(deadline) => self.gate.try_lock_for(deadline.remaining()).ok_or_else(|| {
                warn!(timeout = ?self.lock_timeout, "timed out waiting for store gate");
                deadline.expired()
            }),
        }
    }

    fn release_process_lock(&self) {
        if let Some(lock) = &self.process_lock {
            if let Err(err) = lock.release() {
                warn!(path = %lock.path().display(), %err, "failed to release lock file");
            }
        }
    }

    /// Returns `true` if the calling thread has an open frame.
    pub(crate) fn in_transaction(&self) -> bool {
        // Succeeds immediately for the owning thread; any other thread
        // cannot be inside a transaction while someone else holds the gate.
        let Some(guard) = self.gate.try_lock() else {
            return false;
        };
        let open = match guard.try_borrow() {
            Ok(session) => !session.frames.is_empty(),
            Err(_) => true,
        };
        open
    }

    /// Closes the backend. Returns `false` if it was already closed.
    pub(crate) fn close(&self) -> StoreResult<bool> {
        let guard = self.lock_gate(self.lock_timeout.and_then(Deadline::after))?;
        let mut session = borrow(&guard)?;
        if !session.frames.is_empty() {
            return Err(StoreError::invalid_operation(
                "cannot close a store from inside one of its transactions",
            ));
        }
        if session.closed {
            return Ok(false);
        }
        session.closed = true;
        session.backend.close()?;
        Ok(true)
    }

    /// Closes the backend without a deadline, for use from `Drop`.
    pub(crate) fn close_blocking(&self) -> StoreResult<bool> {
        let guard = self.gate.lock();
        let mut session = borrow(&guard)?;
        if session.closed || !session.frames.is_empty() {
            return Ok(false);
        }
        session.closed = true;
        session.backend.close()?;
        Ok(true)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("process_lock", &self.process_lock)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

fn borrow<'g>(guard: &'g GateGuard<'_>) -> StoreResult<RefMut<'g, Session>> {
    guard
        .try_borrow_mut()
        .map_err(|_| StoreError::invalid_operation("store re-entered while an operation was running"))
}

/// A frame held open on the current thread.
///
/// Holding an `ActiveFrame` means holding the store gate. Dropping one that
/// was neither committed nor rolled back rolls it back, which covers early
/// returns and unwinding panics alike.
pub(crate) struct ActiveFrame<'a> {
    manager: &'a TransactionManager,
    guard: GateGuard<'a>,
    frame: Frame,
    /// `false` when this handle joined a frame opened further up the stack.
    owned: bool,
    state: FrameState,
}

impl ActiveFrame<'_> {
    /// Depth of the frame this handle operates in.
    pub(crate) fn depth(&self) -> usize {
        self.frame.depth
    }

    /// Runs `f` against the backend.
    pub(crate) fn with_backend<T>(
        &self,
        f: impl FnOnce(&mut dyn OrderedStore) -> StorageResult<T>,
    ) -> StoreResult<T> {
        let mut session = borrow(&self.guard)?;
        if session.closed {
            return Err(StoreError::StoreClosed);
        }
        Ok(f(session.backend.as_mut())?)
    }

    /// Commits the frame into its parent, or to disk if outermost.
    pub(crate) fn commit(mut self) -> StoreResult<()> {
        self.finish(true)
    }

    /// Discards the frame's writes.
    pub(crate) fn rollback(mut self) -> StoreResult<()> {
        self.finish(false)
    }

    fn finish(&mut self, commit: bool) -> StoreResult<()> {
        if self.state != FrameState::Active {
            return Err(StoreError::invalid_operation("transaction frame already finished"));
        }
        self.state = FrameState::RolledBack;
        if !self.owned {
            if commit {
                self.state = FrameState::Committed;
            }
            return Ok(());
        }

        let frame = self.frame;
        let result = {
            let mut session = borrow(&self.guard)?;
            if session.frames.last() != Some(&frame) {
                return Err(StoreError::invalid_operation(
                    "transaction frames finished out of order",
                ));
            }
            session.frames.pop();
            finish_frame(session.backend.as_mut(), frame, commit)
        };

        match (&result, commit) {
            (Ok(()), true) => {
                self.state = FrameState::Committed;
                debug!(depth = frame.depth, "transaction frame committed");
            }
            (Ok(()), false) => debug!(depth = frame.depth, "transaction frame rolled back"),
            (Err(err), _) => warn!(depth = frame.depth, %err, "transaction frame failed to finish"),
        }

        if frame.is_outermost() {
            self.manager.release_process_lock();
        }
        result
    }
}

/// Issues the backend statements that close `frame`. A failed commit is
/// rolled back so the frame never stays half-open.
fn finish_frame(backend: &mut dyn OrderedStore, frame: Frame, commit: bool) -> StoreResult<()> {
    let result = match (frame.savepoint, commit) {
        (None, true) => backend.commit().or_else(|err| {
            if backend.in_transaction() {
                if let Err(rollback_err) = backend.rollback() {
                    warn!(%rollback_err, "rollback after failed commit also failed");
                }
            }
            Err(err)
        }),
        (None, false) => backend.rollback(),
        (Some(savepoint), true) => backend.release(savepoint).or_else(|err| {
            if let Err(rollback_err) = backend.rollback_to(savepoint) {
                warn!(%rollback_err, "rollback after failed release also failed");
            }
            Err(err)
        }),
        (Some(savepoint), false) => backend.rollback_to(savepoint),
    };
    Ok(result?)
}

impl Drop for ActiveFrame<'_> {
    fn drop(&mut self) {
        if self.owned && self.state == FrameState::Active {
            if std::thread::panicking() {
                warn!(depth = self.frame.depth, "rolling back transaction frame during panic");
            }
            if let Err(err) = self.finish(false) {
                warn!(depth = self.frame.depth, %err, "failed to roll back dropped frame");
            }
        }
    }
}
