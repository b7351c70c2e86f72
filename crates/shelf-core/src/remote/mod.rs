//! Remote collaborators: catalog, payload fetch, and document store.
//!
//! The cache only consumes these interfaces; it owns no remote wire format.

mod catalog;
mod documents;
mod fetch;

pub use catalog::{
    describe_remote_asset, BookMeta, CatalogEntry, ListOptions, RemoteCatalog, ShelfApiCatalog,
    SortBy,
};
pub use documents::{HttpDocumentStore, RemoteDocumentStore};
pub use fetch::{HttpPayloadFetcher, PayloadFetcher};
