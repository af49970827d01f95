mod command_input;
mod input;
mod key_result;
mod search_input;
mod toasts;

pub use command_input::{CommandEvent, CommandInput};
pub use key_result::KeyResult;
pub use search_input::SearchInput;
pub use toasts::draw_toasts;
