pub mod errors;
pub mod db;
pub mod author;
pub mod post;

#[cfg(test)]
mod tests;
