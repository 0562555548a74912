pub mod edit;
pub mod import;
pub mod python;
pub mod query;

#[cfg(test)]
mod tests;
