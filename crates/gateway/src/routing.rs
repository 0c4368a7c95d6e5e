//! Owner id → service name routing.
//!
//! The front door maps an external owner id to the name of the shard
//! service holding the owner's records. The mapping comes from a static
//! two-column source and is read exactly once; it is never refreshed.
//!
//! [`RoutingCache`] supports two load modes:
//!
//! - **eager**: the table is read before the cache exists, so a missing or
//!   unreadable source is a startup error;
//! - **lazy**: the first lookup starts the read on its own task. Every
//!   lookup, the first included, waits for that single read. A caller that
//!   gives up while waiting does not cancel it. A failed read is logged and
//!   leaves the table empty for the life of the process.

use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{OnceCell, watch};

use crate::error::{GatewayError, GatewayResult};

/// Where a routing table comes from.
#[async_trait]
pub trait RoutingSource: Send + Sync {
    /// Reads every (owner id, service name) pair.
    async fn load(&self) -> GatewayResult<RoutingTable>;
}

/// A two-column CSV file: owner id, service name.
///
/// Blank lines and rows with fewer than two columns are skipped. Columns
/// past the second are ignored. When an owner id appears twice the later
/// row wins. Fields may be double-quoted, with `""` standing for a literal
/// quote; unquoted fields are trimmed.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RoutingSource for CsvFileSource {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> GatewayResult<RoutingTable> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GatewayError::routing_load(format!("cannot read {}", self.path.display()), e)
        })?;
        let table = RoutingTable::parse_csv(&raw);
        tracing::info!(routes = table.len(), "Routing table loaded");
        Ok(table)
    }
}

/// Immutable owner id → service name map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<String, String>,
}

impl RoutingTable {
    /// Reads `source` once.
    ///
    /// # Errors
    ///
    /// Whatever the source fails with; nothing is cached.
    pub async fn load(source: &dyn RoutingSource) -> GatewayResult<Self> {
        source.load().await
    }

    /// Parses two-column CSV text.
    pub fn parse_csv(raw: &str) -> Self {
        let routes = raw
            .lines()
            .filter_map(|line| {
                let mut fields = csv_fields(line).into_iter();
                match (fields.next(), fields.next()) {
                    (Some(owner), Some(service)) => Some((owner, service)),
                    _ => None,
                }
            })
            .collect();
        Self { routes }
    }

    pub fn get(&self, owner_id: &str) -> Option<&str> {
        self.routes.get(owner_id).map(String::as_str)
    }

    /// Every route, sorted by owner id.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { routes: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// Splits one CSV record into fields.
///
/// A quoted field runs to its closing quote and may contain commas; an
/// unterminated quote takes the rest of the line.
fn csv_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    loop {
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}
        let mut field = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '"' if chars.next_if_eq(&'"').is_some() => field.push('"'),
                    '"' => break,
                    c => field.push(c),
                }
            }
            // Anything between the closing quote and the delimiter is dropped.
            while chars.next_if(|c| *c != ',').is_some() {}
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                field.push(c);
            }
            field.truncate(field.trim_end().len());
        }
        fields.push(field);
        if chars.next().is_none() {
            return fields;
        }
    }
}

/// Lazy load state. The sender is taken by the first lookup, which spawns
/// the load; the task fills `table` and then signals on the channel.
struct LazyLoad {
    source: Arc<dyn RoutingSource>,
    table: Arc<OnceCell<RoutingTable>>,
    start: Mutex<Option<watch::Sender<bool>>>,
    done: watch::Receiver<bool>,
}

/// Served when the load task dies without filling the table.
static EMPTY: RoutingTable = RoutingTable { routes: BTreeMap::new() };

impl LazyLoad {
    fn new(source: Arc<dyn RoutingSource>) -> Self {
        let (tx, done) = watch::channel(false);
        Self { source, table: Arc::new(OnceCell::new()), start: Mutex::new(Some(tx)), done }
    }

    async fn get(&self) -> &RoutingTable {
        if let Some(table) = self.table.get() {
            return table;
        }
        let start = self.start.lock().take();
        if let Some(tx) = start {
            let source = Arc::clone(&self.source);
            let table = Arc::clone(&self.table);
            tokio::spawn(async move {
                let loaded = match source.load().await {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        tracing::warn!(error = %e, "Routing table unavailable; all lookups will fail");
                        RoutingTable::default()
                    },
                };
                let _ = table.set(loaded);
                let _ = tx.send(true);
            });
        }
        // Err means the task ended without signalling; the table stays empty.
        let _ = self.done.clone().wait_for(|done| *done).await;
        self.table.get().unwrap_or(&EMPTY)
    }
}

enum Mode {
    Eager(RoutingTable),
    Lazy(LazyLoad),
}

/// Load-once routing table in front of a [`RoutingSource`].
pub struct RoutingCache {
    mode: Mode,
}

impl RoutingCache {
    /// Reads `source` now and serves that table.
    ///
    /// # Errors
    ///
    /// Fails if the source cannot be read.
    pub async fn eager(source: &dyn RoutingSource) -> GatewayResult<Self> {
        Ok(Self::from_table(RoutingTable::load(source).await?))
    }

    /// Serves an already loaded table.
    pub fn from_table(table: RoutingTable) -> Self {
        Self { mode: Mode::Eager(table) }
    }

    /// Defers reading `source` until the first lookup.
    pub fn lazy(source: Arc<dyn RoutingSource>) -> Self {
        Self { mode: Mode::Lazy(LazyLoad::new(source)) }
    }

    /// Resolves an owner id to its service name.
    ///
    /// # Errors
    ///
    /// [`GatewayError::RoutingNotFound`] if the owner id has no route,
    /// including when a lazy load failed.
    pub async fn lookup(&self, owner_id: &str) -> GatewayResult<String> {
        self.table()
            .await
            .get(owner_id)
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::RoutingNotFound { owner_id: owner_id.to_owned() })
    }

    /// The loaded table, loading it first in lazy mode.
    pub async fn table(&self) -> &RoutingTable {
        match &self.mode {
            Mode::Eager(table) => table,
            Mode::Lazy(lazy) => lazy.get().await,
        }
    }

    /// The table if it has been loaded; `None` for a lazy cache not yet used.
    pub fn loaded(&self) -> Option<&RoutingTable> {
        match &self.mode {
            Mode::Eager(table) => Some(table),
            Mode::Lazy(lazy) => lazy.table.get(),
        }
    }
}

impl fmt::Debug for RoutingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Eager(_) => "eager",
            Mode::Lazy(_) => "lazy",
        };
        f.debug_struct("RoutingCache")
            .field("mode", &mode)
            .field("routes", &self.loaded().map(RoutingTable::len))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::basic("HP1,regionalCC1\nHP2,regionalCC2\n", &[("HP1", "regionalCC1"), ("HP2", "regionalCC2")])]
    #[case::blank_lines("\nHP1,regionalCC1\n\n\n", &[("HP1", "regionalCC1")])]
    #[case::short_row("HP1\nHP2,regionalCC2", &[("HP2", "regionalCC2")])]
    #[case::later_row_wins("HP1,regionalCC1\nHP1,regionalCC9", &[("HP1", "regionalCC9")])]
    #[case::extra_columns("HP1,regionalCC1,ignored", &[("HP1", "regionalCC1")])]
    #[case::crlf_and_spaces("HP1 , regionalCC1\r\n", &[("HP1", "regionalCC1")])]
    #[case::quoted(r#""HP1","regionalCC1""#, &[("HP1", "regionalCC1")])]
    #[case::quoted_comma(r#""HP,1", regionalCC1"#, &[("HP,1", "regionalCC1")])]
    #[case::escaped_quote(r#""H""P1",regionalCC1"#, &[("H\"P1", "regionalCC1")])]
    #[case::quoted_keeps_spaces(r#"" HP1 ",regionalCC1"#, &[(" HP1 ", "regionalCC1")])]
    fn test_parse_csv(#[case] raw: &str, #[case] expected: &[(&str, &str)]) {
        let table = RoutingTable::parse_csv(raw);
        assert_eq!(table.entries().collect::<Vec<_>>(), expected);
    }

    /// Counts loads and fails on demand.
    struct CountingSource {
        loads: AtomicUsize,
        result: Option<RoutingTable>,
    }

    #[async_trait]
    impl RoutingSource for CountingSource {
        async fn load(&self) -> GatewayResult<RoutingTable> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.result.clone().ok_or_else(|| GatewayError::RoutingLoad {
                message: "source missing".into(),
                source: None,
            })
        }
    }

    #[tokio::test]
    async fn test_lazy_loads_once() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            result: Some([("HP1", "regionalCC1")].into_iter().collect()),
        });
        let cache = RoutingCache::lazy(Arc::clone(&source) as Arc<dyn RoutingSource>);
        assert!(cache.loaded().is_none());

        assert_eq!(cache.lookup("HP1").await.unwrap(), "regionalCC1");
        assert!(cache.lookup("HP2").await.is_err());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_failure_is_not_retried() {
        let source = Arc::new(CountingSource { loads: AtomicUsize::new(0), result: None });
        let cache = RoutingCache::lazy(Arc::clone(&source) as Arc<dyn RoutingSource>);

        for _ in 0..3 {
            let err = cache.lookup("HP1").await.unwrap_err();
            assert!(matches!(err, GatewayError::RoutingNotFound { .. }));
        }
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loaded(), Some(&RoutingTable::default()));
    }

    #[tokio::test]
    async fn test_cancelled_first_lookup_does_not_reload() {
        struct SlowSource {
            loads: AtomicUsize,
        }

        #[async_trait]
        impl RoutingSource for SlowSource {
            async fn load(&self) -> GatewayResult<RoutingTable> {
                self.loads.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                Ok([("HP1", "regionalCC1")].into_iter().collect())
            }
        }

        let source = Arc::new(SlowSource { loads: AtomicUsize::new(0) });
        let cache = RoutingCache::lazy(Arc::clone(&source) as Arc<dyn RoutingSource>);

        let first =
            tokio::time::timeout(std::time::Duration::from_millis(10), cache.lookup("HP1")).await;
        assert!(first.is_err(), "first lookup should time out while the load is running");

        assert_eq!(cache.lookup("HP1").await.unwrap(), "regionalCC1");
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eager_failure_is_an_error() {
        let source = CountingSource { loads: AtomicUsize::new(0), result: None };
        let err = RoutingCache::eager(&source).await.unwrap_err();
        assert!(matches!(err, GatewayError::RoutingLoad { .. }));
    }

    #[tokio::test]
    async fn test_csv_file_source_missing_file() {
        let source = CsvFileSource::new("/nonexistent/routing.csv");
        let err = source.load().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/routing.csv"));
    }
}
