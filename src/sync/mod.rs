pub mod audit;
pub mod config;
pub mod driver;
pub mod ledger;
pub mod matcher;
pub mod paths;
pub mod recordings;
pub mod token_store;
pub mod twitch;
pub mod util;
pub mod youtube;
