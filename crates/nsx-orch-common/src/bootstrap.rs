//! Store bulk load at startup.
//!
//! Every store is rebuilt from a full remote listing before any service
//! uses it. [`initialize_stores`] runs the loaders concurrently and returns
//! once all stores are populated, or with the first failure.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::client::ResourceLister;
use crate::error::{NsxError, NsxResult};
use crate::store::{Indexed, ResourceStore};

/// Loads one store from its remote listing.
#[async_trait]
pub trait StoreLoader: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Populates the store and returns the number of records applied.
    async fn load(&self) -> NsxResult<usize>;
}

/// [`StoreLoader`] that pages through a [`ResourceLister`].
pub struct ListerLoader<T, L: ?Sized> {
    store: Arc<ResourceStore<T>>,
    lister: Arc<L>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, L: ?Sized> ListerLoader<T, L> {
    pub fn new(store: Arc<ResourceStore<T>>, lister: Arc<L>) -> Self {
        Self {
            store,
            lister,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, L> StoreLoader for ListerLoader<T, L>
where
    T: Indexed,
    L: ResourceLister<T> + ?Sized + 'static,
{
    fn name(&self) -> &str {
        T::KIND
    }

    async fn load(&self) -> NsxResult<usize> {
        let mut cursor = None;
        let mut count = 0;
        loop {
            let page = self.lister.list_page(cursor.take()).await?;
            for record in page.results {
                self.store.apply(record)?;
                count += 1;
            }
            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(count)
    }
}

/// Loads every store concurrently.
///
/// Returns the total number of records loaded. The first failure aborts
/// the remaining loaders.
pub async fn initialize_stores(loaders: Vec<Arc<dyn StoreLoader>>) -> NsxResult<usize> {
    let mut tasks = JoinSet::new();
    for loader in loaders {
        tasks.spawn(async move {
            let result = loader.load().await;
            (loader.name().to_string(), result)
        });
    }

    let mut total = 0;
    while let Some(joined) = tasks.join_next().await {
        let (name, result) =
            joined.map_err(|e| NsxError::Internal(format!("store loader task failed: {e}")))?;
        match result {
            Ok(count) => {
                info!(store = %name, count, "initialized store");
                total += count;
            }
            Err(e) => {
                error!(store = %name, error = %e, "failed to initialize store");
                tasks.abort_all();
                return Err(e);
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, ClientResult, ListPage};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone)]
    struct Item {
        id: String,
    }

    impl Indexed for Item {
        const KIND: &'static str = "item";

        fn primary_key(&self) -> Option<&str> {
            Some(&self.id)
        }

        fn index_keys(&self, _index: &str) -> Vec<String> {
            Vec::new()
        }

        fn is_tombstone(&self) -> bool {
            false
        }
    }

    struct PagedLister {
        pages: Vec<Vec<&'static str>>,
    }

    #[async_trait]
    impl ResourceLister<Item> for PagedLister {
        async fn list_page(&self, cursor: Option<String>) -> ClientResult<ListPage<Item>> {
            let index: usize = cursor.as_deref().unwrap_or("0").parse().unwrap();
            let results = self.pages[index]
                .iter()
                .map(|id| Item { id: id.to_string() })
                .collect();
            let next = index + 1;
            Ok(ListPage {
                results,
                cursor: (next < self.pages.len()).then(|| next.to_string()),
            })
        }
    }

    struct FailingLister;

    #[async_trait]
    impl ResourceLister<Item> for FailingLister {
        async fn list_page(&self, _cursor: Option<String>) -> ClientResult<ListPage<Item>> {
            Err(ClientError::api(500, "listing failed"))
        }
    }

    #[tokio::test]
    async fn test_loads_all_pages() {
        let store = Arc::new(ResourceStore::<Item>::new(&[]));
        let lister = Arc::new(PagedLister {
            pages: vec![vec!["a", "b"], vec!["c"], vec![]],
        });
        let loader = ListerLoader::new(store.clone(), lister);

        assert_eq!(loader.load().await.unwrap(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(loader.name(), "item");
    }

    #[tokio::test]
    async fn test_initialize_multiple_stores() {
        let first = Arc::new(ResourceStore::<Item>::new(&[]));
        let second = Arc::new(ResourceStore::<Item>::new(&[]));
        let loaders: Vec<Arc<dyn StoreLoader>> = vec![
            Arc::new(ListerLoader::new(
                first.clone(),
                Arc::new(PagedLister { pages: vec![vec!["a"]] }),
            )),
            Arc::new(ListerLoader::new(
                second.clone(),
                Arc::new(PagedLister { pages: vec![vec!["b", "c"]] }),
            )),
        ];

        assert_eq!(initialize_stores(loaders).await.unwrap(), 3);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_initialize_reports_failure() {
        let store = Arc::new(ResourceStore::<Item>::new(&[]));
        let loaders: Vec<Arc<dyn StoreLoader>> =
            vec![Arc::new(ListerLoader::new(store, Arc::new(FailingLister)))];

        let err = initialize_stores(loaders).await.unwrap_err();
        assert!(matches!(err, NsxError::Client(ClientError::Api { code: 500, .. })));
    }
}
