pub mod device_list;
pub mod help_overlay;
pub mod playback;
pub mod results_list;
pub mod search_prompt;
