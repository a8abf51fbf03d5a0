mod model;
mod resolver;

pub use model::{CatalogEntry, CatalogVersion, DownloadDescriptor, InstallUnit};
pub use resolver::{CatalogResolver, HttpCatalogResolver};
