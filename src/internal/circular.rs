//! Per-thread creation stack: prototype cycle detection and depth limiting.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

const MAX_DEPTH: usize = 1024;

// Thread-local creation state shared by every container on this thread
thread_local! {
    static CREATION_TLS: RefCell<CreationTls> = RefCell::new(CreationTls::default());
}

#[derive(Default)]
struct CreationTls {
    stack: Vec<Frame>,
}

struct Frame {
    container: usize,
    name: String,
    prototype: bool,
}

/// Guard for one component creation on the current thread's stack.
///
/// Entering a prototype that is already being created by the same
/// container on this thread is a circular construction: prototypes have no
/// early reference that could break the loop. Singleton cycles are
/// detected by the singleton registry instead; their frames only count
/// towards the depth limit.
pub(crate) struct CreationGuard {
    container: usize,
}

impl CreationGuard {
    pub(crate) fn enter(container: usize, name: &str, prototype: bool) -> DiResult<Self> {
        CREATION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();

            // Circular detection BEFORE pushing the new name
            if prototype
                && tls
                    .stack
                    .iter()
                    .any(|f| f.container == container && f.prototype && f.name == name)
            {
                let mut path: Vec<String> = tls
                    .stack
                    .iter()
                    .filter(|f| f.container == container)
                    .map(|f| f.name.clone())
                    .collect();
                path.push(name.to_string());
                return Err(DiError::CircularConstruction { path });
            }

            // Depth guard
            if tls.stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(tls.stack.len()));
            }

            tls.stack.push(Frame {
                container,
                name: name.to_string(),
                prototype,
            });
            Ok(Self { container })
        })
    }
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        CREATION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if let Some(last) = tls.stack.pop() {
                debug_assert_eq!(last.container, self.container);
            }
        });
    }
}
