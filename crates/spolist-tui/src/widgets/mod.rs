pub mod paged_list;
pub mod pane_chrome;
pub mod progress_bar;
pub mod query_input;
pub mod status_bar;
pub mod text;
