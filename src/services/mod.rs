pub mod expense;
pub mod matcher;
pub mod splitwise;
pub mod token_store;

pub use expense::ExpenseService;
pub use splitwise::SplitwiseClient;
pub use token_store::{MemoryTokenStore, RedisTokenStore, TokenStore};
