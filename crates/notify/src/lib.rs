pub mod dispatcher;
pub mod telegram;

pub use dispatcher::Dispatcher;
pub use telegram::{split_message, TelegramDispatcher, TELEGRAM_MESSAGE_LIMIT};
