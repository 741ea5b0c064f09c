pub mod config;
pub mod dataset;
pub mod document;
pub mod importer;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod summary;

pub mod util {
    pub mod env;
}
