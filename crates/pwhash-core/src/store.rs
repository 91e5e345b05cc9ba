//! Lock-free store for the active cost parameters

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::params::CostParameters;

/// Currently active cost parameters
///
/// Readers take a snapshot with a single atomic load and writers swap in a
/// whole new value, so a reader sees either the old or the new parameters and
/// never blocks a writer.
pub struct ParameterStore {
    current: ArcSwap<CostParameters>,
}

impl ParameterStore {
    pub fn new(params: CostParameters) -> Self {
        Self {
            current: ArcSwap::from_pointee(params),
        }
    }

    /// Snapshot of the active parameters
    pub fn current(&self) -> CostParameters {
        **self.current.load()
    }

    /// Install new parameters, returning the ones they replace
    pub fn replace(&self, params: CostParameters) -> CostParameters {
        *self.current.swap(Arc::new(params))
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_returns_previous() {
        let first = CostParameters::new(1, 1024, 1).unwrap();
        let second = CostParameters::new(2, 2048, 2).unwrap();
        let store = ParameterStore::new(first);

        assert_eq!(store.current(), first);
        assert_eq!(store.replace(second), first);
        assert_eq!(store.current(), second);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_values() {
        let a = CostParameters::new(1, 1024, 1).unwrap();
        let b = CostParameters::new(7, 4096, 9).unwrap();
        let store = Arc::new(ParameterStore::new(a));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    store.replace(if i % 2 == 0 { b } else { a });
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let seen = store.current();
                        assert!(seen == a || seen == b, "torn read: {}", seen);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
