pub mod api_fetch;
pub mod fake_feed;
pub mod feed;
pub mod http_client;
pub mod scale;
pub mod state;
