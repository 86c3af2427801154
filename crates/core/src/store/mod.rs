pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod stub;
