mod chat;
mod graph;
mod posts;
mod tokens;
mod users;
