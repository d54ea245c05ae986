pub mod database;
pub mod ingest;
pub mod scheduler;
pub mod youtube;
