pub mod db;
mod error;
mod extractors;
mod handlers;
mod middleware;
pub mod password;
mod router;
mod session;

pub use router::router;
