pub mod collection;
pub mod import;
pub mod record;

// Re-export handler functions for use in routing
pub use collection::create as create_post;
pub use collection::delete_all;
pub use collection::list as list_get;
pub use import::post as import_post;
pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::put as record_put;
