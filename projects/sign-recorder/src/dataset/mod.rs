// On-disk dataset: label directories, clip naming and the metadata catalog

pub mod allocator;
pub mod catalog;
pub mod layout;

pub use allocator::ClipAllocator;
pub use catalog::{Catalog, ClipRecord, CsvCatalog};
pub use layout::{list_clips, DatasetLayout};
