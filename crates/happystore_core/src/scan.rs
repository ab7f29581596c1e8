//! Paged full-store iteration.

use crate::error::StoreResult;
use crate::store::{KeyValuePair, Store};
use happystore_codec::Serializer;
use std::iter::FusedIterator;
use std::ops::Bound;

/// Lazy iterator over every pair in ascending key order.
///
/// Pairs are fetched a page at a time. Each page is read in its own
/// transaction, resuming strictly after the last key of the previous page,
/// so the store gate is never held between calls to `next`. Dropping the
/// iterator early releases nothing because nothing is held.
///
/// A page that fails to load is yielded once as `Err`, and iteration ends.
pub struct Scan<'a, S: Serializer> {
    store: &'a Store<S>,
    page_size: usize,
    lower: Bound<Vec<u8>>,
    page: std::vec::IntoIter<KeyValuePair<S::Value>>,
    done: bool,
}

impl<'a, S: Serializer> Scan<'a, S> {
    pub(crate) fn new(store: &'a Store<S>, page_size: usize) -> Self {
        Self {
            store,
            page_size,
            lower: Bound::Unbounded,
            page: Vec::new().into_iter(),
            done: false,
        }
    }

    /// Pairs fetched per page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl<S: Serializer> Iterator for Scan<'_, S> {
    type Item = StoreResult<KeyValuePair<S::Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pair) = self.page.next() {
            return Some(Ok(pair));
        }
        if self.done {
            return None;
        }

        let page = match self.store.fetch_page(&self.lower, self.page_size) {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        if page.len() < self.page_size {
            self.done = true;
        }
        match page.last() {
            Some((key, _)) => self.lower = Bound::Excluded(key.as_bytes().to_vec()),
            None => {
                self.done = true;
                return None;
            }
        }

        self.page = page.into_iter();
        self.page.next().map(Ok)
    }
}

impl<S: Serializer> FusedIterator for Scan<'_, S> {}

impl<S: Serializer> std::fmt::Debug for Scan<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scan")
            .field("page_size", &self.page_size)
            .field("buffered", &self.page.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{JsonValueSerializer, Store, StoreError};
    use serde_json::json;

    #[test]
    fn empty_store_scans_nothing() {
        let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
        let mut scan = store.scan().unwrap();
        assert_eq!(scan.page_size(), 100);
        assert!(scan.next().is_none());
        assert!(scan.next().is_none());
    }

    #[test]
    fn sees_writes_behind_cursor_only() {
        let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
        store.bulk_set(&[("b", json!(1)), ("d", json!(2))]).unwrap();

        let mut scan = store.scan_with_page_size(1).unwrap();
        assert_eq!(scan.next().unwrap().unwrap().0, "b");
        store.set("a", &json!(0)).unwrap();
        store.set("c", &json!(0)).unwrap();

        let rest: Vec<_> = scan.map(|r| r.unwrap().0).collect();
        assert_eq!(rest, ["c", "d"]);
    }

    #[test]
    fn failing_page_ends_iteration() {
        let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
        store.set("a", &json!(1)).unwrap();
        let mut scan = store.scan_with_page_size(1).unwrap();
        assert!(scan.next().unwrap().is_ok());

        store.close().unwrap();
        assert!(matches!(scan.next(), Some(Err(StoreError::StoreClosed))));
        assert!(scan.next().is_none());
    }

    #[test]
    fn scan_inside_transaction_sees_uncommitted_writes() {
        let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
        store.set("a", &json!(1)).unwrap();
        let keys = store
            .transaction(|txn| {
                txn.set("b", &json!(2))?;
                txn.scan_with_page_size(1)?
                    .map(|r| r.map(|(key, _)| key))
                    .collect::<Result<Vec<_>, _>>()
            })
            .unwrap()
            .committed()
            .unwrap();
        assert_eq!(keys, ["a", "b"]);
    }
}
