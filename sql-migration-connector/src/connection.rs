//! Routes a flavour's actual database handle either to the live driver or
//! to the [`SqlCollector`](crate::collector::SqlCollector), as a per-run
//! decision rather than a per-call branch inside every method (spec §9,
//! "Dry-run routing").

use crate::collector::SqlCollector;
use std::sync::Arc;

/// `T` is whatever live handle a flavour's driver needs (a `quaint` pool, an
/// `oracle::Connection`, ...). When dry-run is active, no live handle is
/// ever constructed — `describe_schema`-style reads still need one, so a
/// dry run that also wants structural reads from a real source keeps its
/// source-side connection live while routing only the target-side writer
/// through `Collecting`.
pub enum Connection<T> {
    Live(T),
    Collecting(Arc<SqlCollector>),
}

impl<T> Connection<T> {
    pub fn is_collecting(&self) -> bool {
        matches!(self, Connection::Collecting(_))
    }

    pub fn live(&self) -> Option<&T> {
        match self {
            Connection::Live(handle) => Some(handle),
            Connection::Collecting(_) => None,
        }
    }

    pub fn collector(&self) -> Option<&Arc<SqlCollector>> {
        match self {
            Connection::Collecting(collector) => Some(collector),
            Connection::Live(_) => None,
        }
    }
}
