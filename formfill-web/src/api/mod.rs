//! HTTP API handlers for formfill-web

pub mod buildinfo;
pub mod forms;
pub mod generate;
pub mod health;
pub mod ui;

pub use buildinfo::get_build_info;
pub use forms::list_forms;
pub use generate::generate_forms;
pub use health::health_routes;
pub use ui::serve_index;
